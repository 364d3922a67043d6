//! # stagefs-preview
//!
//! The presentation frame of the preview pipeline. It loads the project from
//! the editor host, generates Leopard bundles into the host's `leopard`
//! folder, and serves the relay's file requests from that folder.
//!
//! ```text
//! consumer frame --request--> AssetRelay --getFile--> PresentationFrame
//!                                                        |  getFile
//!                                                        v
//!                                                    EditorHost (disk)
//! ```

mod error;
mod frame;

pub use error::{PreviewError, Result};
pub use frame::PresentationFrame;
