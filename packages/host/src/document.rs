use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{HostError, Result};

/// Folder, next to the project file, that receives generated output.
pub const LEOPARD_FOLDER: &str = "leopard";

/// A project file opened in the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchDocument {
    path: PathBuf,
    data: Bytes,
    dirty: bool,
}

impl ScratchDocument {
    /// Read `path`. A file that does not exist yet opens as an empty
    /// document.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = read_or_empty(&path)?;
        Ok(Self {
            path,
            data,
            dirty: false,
        })
    }

    /// Restore from a backup written by [`EditorHost::backup`](crate::EditorHost::backup),
    /// keeping `path` as the document's home.
    pub fn open_backup(path: impl Into<PathBuf>, backup: &Path) -> Result<Self> {
        let data = fs::read(backup).map_err(HostError::io(backup))?;
        Ok(Self {
            path: path.into(),
            data: Bytes::from(data),
            dirty: true,
        })
    }

    /// An in-memory document that has never been saved.
    pub fn untitled(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: Bytes::new(),
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Folder containing the document; files are served relative to it.
    pub fn folder(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn leopard_folder(&self) -> PathBuf {
        self.folder().join(LEOPARD_FOLDER)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Record bytes written to `path`. Saving to the document's own path
    /// makes it clean.
    pub(crate) fn saved(&mut self, path: &Path, data: Bytes) {
        if path == self.path {
            self.data = data;
            self.dirty = false;
        }
    }

    /// Reload from disk, discarding unsaved state.
    pub(crate) fn revert(&mut self) -> Result<()> {
        self.data = read_or_empty(&self.path)?;
        self.dirty = false;
        Ok(())
    }
}

fn read_or_empty(path: &Path) -> Result<Bytes> {
    match fs::read(path) {
        Ok(data) => Ok(Bytes::from(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Bytes::new()),
        Err(e) => Err(HostError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
