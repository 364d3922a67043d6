//! # stagefs-host
//!
//! The editor host owns the project file on disk. Over a message link it
//! hands the project to the presentation frame, serves files from the
//! project folder, and stores generated output in a `leopard` folder next
//! to the project.

mod document;
mod error;
mod host;

pub use document::{ScratchDocument, LEOPARD_FOLDER};
pub use error::{HostError, Result};
pub use host::{Backup, EditorHost};
