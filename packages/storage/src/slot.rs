//! The single global storage slot on disk.

use std::fs;
use std::path::{Path, PathBuf};

use stagefs_core::{fs_tree, VirtualPath};
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::files::{AssetSet, FilesMap, LeopardFile, NamedFile, StoredFile};
use crate::files::{LEOPARD_FOLDER, SCRATCH_FOLDER};

/// A directory holding at most one saved project.
///
/// Layout: `scratch/<name>` for the project and `leopard/<dir>/<name>` for
/// each generated file. Every save replaces the whole slot.
#[derive(Debug, Clone)]
pub struct StorageSlot {
    root: PathBuf,
}

impl StorageSlot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Clear the slot, then write the project and the generated files.
    pub fn save(&self, scratch: &NamedFile, leopard: &[LeopardFile]) -> Result<()> {
        fs_tree::clear_dir(&self.root).map_err(StorageError::io(&self.root))?;
        fs::create_dir_all(&self.root).map_err(StorageError::io(&self.root))?;

        self.write(&format!("{}/{}", SCRATCH_FOLDER, scratch.name), &scratch.data)?;
        for file in leopard {
            let stored = format!("{}/{}", LEOPARD_FOLDER, file.relative_path());
            self.write(&stored, &file.data)?;
        }
        info!(
            root = %self.root.display(),
            files = leopard.len() + 1,
            "storage slot saved"
        );
        Ok(())
    }

    pub fn save_assets(&self, assets: &AssetSet) -> Result<()> {
        self.save(&assets.scratch, assets.leopard())
    }

    /// Everything in the slot, keyed by path relative to the slot root.
    /// A slot that was never written is empty.
    pub fn load(&self) -> Result<FilesMap> {
        let mut map = FilesMap::default();
        let files = fs_tree::walk_files(&self.root).map_err(StorageError::io(&self.root))?;
        for relative in files {
            let full = self.root.join(&relative);
            let data = fs::read(&full).map_err(StorageError::io(&full))?;
            let file = relative
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let key = relative
                .iter()
                .map(|c| c.to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            debug!(path = %key, bytes = data.len(), "loaded stored file");
            map.files_map.insert(key, StoredFile::encode(file, &data));
        }
        Ok(map)
    }

    pub fn load_assets(&self) -> Result<AssetSet> {
        self.load()?.to_assets()
    }

    fn write(&self, stored: &str, data: &[u8]) -> Result<()> {
        let path = VirtualPath::parse(stored)
            .ok()
            .filter(|p| p.len() > 1)
            .ok_or_else(|| StorageError::InvalidName {
                name: stored.to_string(),
            })?;
        fs_tree::write_under(&self.root, &path, data)
            .map_err(StorageError::io(fs_tree::resolve_under(&self.root, &path)))?;
        Ok(())
    }
}
