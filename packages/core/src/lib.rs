//! # stagefs-core
//!
//! Shared vocabulary for the preview pipeline:
//! - `VirtualPath`: a normalized path inside the served namespace
//! - `ContentType`: MIME types derived from file extensions
//! - `Content`: a resolved response (status, type, body)
//! - `FrameId`: identity of a presentation or consumer frame
//! - `fs_tree`: worklist-based directory walking for hosts and storage
//!
//! # Example
//!
//! ```rust
//! use stagefs_core::{Content, VirtualPath};
//!
//! let path = VirtualPath::parse("/leopard/index.js").unwrap();
//! let content = Content::ok("export default 1;", path.content_type().unwrap());
//! assert!(content.is_ok());
//! ```

pub use bytes::Bytes;
pub use http::StatusCode;

mod content;
mod content_type;
mod frame;
mod path;

pub mod fs_tree;

pub use content::Content;
pub use content_type::ContentType;
pub use frame::{FrameId, SessionId};
pub use path::{PathError, VirtualPath};
