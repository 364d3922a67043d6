//! Single-slot storage for a project and its generated files.
//!
//! [`StorageSlot`] keeps the slot on local disk and [`StorageClient`] talks
//! to a storage server over `POST /api/save` and `GET /api/load`. Both use
//! the same layout and the same [`FilesMap`] load format, where file
//! contents travel as base64.

pub mod client;
pub mod error;
pub mod files;
pub mod slot;

pub use client::StorageClient;
pub use error::{Result, StorageError};
pub use files::{AssetSet, FilesMap, LeopardFile, NamedFile, StoredFile};
pub use files::{LEOPARD_FOLDER, SCRATCH_FOLDER};
pub use slot::StorageSlot;
