//! What goes into the slot and what comes back out of it.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use stagefs_core::VirtualPath;

use crate::error::{Result, StorageError};

/// Top-level folder holding the project file.
pub const SCRATCH_FOLDER: &str = "scratch";
/// Top-level folder holding the generated files.
pub const LEOPARD_FOLDER: &str = "leopard";

/// A file stored directly under a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedFile {
    pub name: String,
    pub data: Bytes,
}

/// A generated file: `dir` is relative to the leopard folder and empty for
/// files at its root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LeopardFile {
    pub dir: String,
    pub name: String,
    pub data: Bytes,
}

impl LeopardFile {
    /// Split a bundle path such as `./Cat/costumes/cat.svg`.
    pub fn from_path(path: &str, data: Bytes) -> Result<Self> {
        let parsed = VirtualPath::parse(path).map_err(|_| invalid(path))?;
        let name = parsed.file_name().ok_or_else(|| invalid(path))?.to_string();
        let dir: Vec<&str> = parsed
            .iter()
            .take(parsed.len() - 1)
            .map(String::as_str)
            .collect();
        Ok(Self {
            dir: dir.join("/"),
            name,
            data,
        })
    }

    /// The path relative to the leopard folder.
    pub fn relative_path(&self) -> String {
        if self.dir.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.dir, self.name)
        }
    }
}

/// One saved project: the `.sb3` plus the files generated from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSet {
    pub scratch: NamedFile,
    leopard: Vec<LeopardFile>,
}

impl AssetSet {
    pub fn new(scratch: NamedFile, mut leopard: Vec<LeopardFile>) -> Self {
        leopard.sort();
        Self { scratch, leopard }
    }

    /// Build from a project and a generated bundle keyed by relative path.
    pub fn from_files(scratch: NamedFile, files: BTreeMap<String, Bytes>) -> Result<Self> {
        let leopard = files
            .into_iter()
            .map(|(path, data)| LeopardFile::from_path(&path, data))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(scratch, leopard))
    }

    /// Generated files ordered by directory, then name.
    pub fn leopard(&self) -> &[LeopardFile] {
        &self.leopard
    }
}

/// A stored file as the load endpoint reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub file: String,
    /// Base64 of the file's bytes.
    pub content: String,
}

impl StoredFile {
    pub fn encode(file: impl Into<String>, data: &[u8]) -> Self {
        Self {
            file: file.into(),
            content: STANDARD.encode(data),
        }
    }

    pub fn decode(&self) -> std::result::Result<Bytes, base64::DecodeError> {
        STANDARD.decode(&self.content).map(Bytes::from)
    }
}

/// Body of `GET /api/load`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesMap {
    #[serde(rename = "filesMap")]
    pub files_map: BTreeMap<String, StoredFile>,
}

impl FilesMap {
    /// Rebuild the asset set. Stored paths may carry a server-side prefix;
    /// everything before the first `scratch` or `leopard` component is
    /// ignored.
    pub fn to_assets(&self) -> Result<AssetSet> {
        let mut scratch = Vec::new();
        let mut leopard = Vec::new();

        for (stored, entry) in &self.files_map {
            let components: Vec<&str> = stored
                .split(['/', '\\'])
                .filter(|c| !c.is_empty() && *c != ".")
                .collect();
            let Some(at) = components
                .iter()
                .position(|c| *c == SCRATCH_FOLDER || *c == LEOPARD_FOLDER)
            else {
                tracing::debug!(path = %stored, "ignoring file outside the slot folders");
                continue;
            };
            let data = entry.decode().map_err(|source| StorageError::Content {
                path: stored.clone(),
                source,
            })?;
            let rest = &components[at + 1..];
            let Some((_, dir)) = rest.split_last() else {
                return Err(invalid(stored));
            };

            if components[at] == SCRATCH_FOLDER {
                scratch.push(NamedFile {
                    name: entry.file.clone(),
                    data,
                });
            } else {
                leopard.push(LeopardFile {
                    dir: dir.join("/"),
                    name: entry.file.clone(),
                    data,
                });
            }
        }

        if scratch.len() != 1 {
            return Err(StorageError::Incomplete {
                found: scratch.len(),
            });
        }
        let scratch = scratch.remove(0);
        Ok(AssetSet::new(scratch, leopard))
    }
}

fn invalid(name: &str) -> StorageError {
    StorageError::InvalidName {
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_paths_split_into_dir_and_name() {
        let f = LeopardFile::from_path("./Cat/costumes/cat.svg", Bytes::new()).unwrap();
        assert_eq!(f.dir, "Cat/costumes");
        assert_eq!(f.name, "cat.svg");
        assert_eq!(f.relative_path(), "Cat/costumes/cat.svg");

        let root = LeopardFile::from_path("./index.html", Bytes::new()).unwrap();
        assert_eq!(root.dir, "");
        assert_eq!(root.relative_path(), "index.html");

        assert!(LeopardFile::from_path("../escape.js", Bytes::new()).is_err());
        assert!(LeopardFile::from_path("./", Bytes::new()).is_err());
    }

    #[test]
    fn files_map_uses_wire_field_names() {
        let mut map = FilesMap::default();
        map.files_map
            .insert("scratch/game.sb3".into(), StoredFile::encode("game.sb3", b"hi"));
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "filesMap": { "scratch/game.sb3": { "file": "game.sb3", "content": "aGk=" } }
            })
        );
    }

    #[test]
    fn server_prefixes_are_skipped() {
        let mut map = FilesMap::default();
        map.files_map.insert(
            "storage-server/data/scratch/game.sb3".into(),
            StoredFile::encode("game.sb3", b"sb3"),
        );
        map.files_map.insert(
            "storage-server\\data\\leopard\\Cat\\Cat.js".into(),
            StoredFile::encode("Cat.js", b"js"),
        );
        let assets = map.to_assets().unwrap();
        assert_eq!(assets.scratch.name, "game.sb3");
        assert_eq!(assets.leopard()[0].dir, "Cat");
        assert_eq!(assets.leopard()[0].data, Bytes::from_static(b"js"));
    }

    #[test]
    fn missing_project_is_incomplete() {
        let mut map = FilesMap::default();
        map.files_map
            .insert("leopard/index.html".into(), StoredFile::encode("index.html", b""));
        assert!(matches!(
            map.to_assets(),
            Err(StorageError::Incomplete { found: 0 })
        ));
    }

    #[test]
    fn bad_base64_is_reported() {
        let mut map = FilesMap::default();
        map.files_map.insert(
            "scratch/game.sb3".into(),
            StoredFile {
                file: "game.sb3".into(),
                content: "not base64!".into(),
            },
        );
        assert!(matches!(map.to_assets(), Err(StorageError::Content { .. })));
    }
}
