//! # stagefs-relay
//!
//! The asset relay sits in the network path of consumer frames. Requests
//! whose path contains a namespace marker (`leopard/`, `leopard_ext/`) are
//! virtual: they resolve against a per-session cache, attach to an identical
//! in-flight fetch, or are relayed as a correlated `getFile` call to the
//! presentation frame that owns the session. Everything else is fetched
//! normally.
//!
//! Requesting a session's top-level document clears that session's cache,
//! so every reload of a consumer frame sees the current generation of files.

mod cache;
mod config;
mod error;
mod passthrough;
mod pending;
mod registry;
mod relay;
mod session;
mod source;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use passthrough::{Passthrough, ReqwestPassthrough};
pub use registry::{FrameKind, FrameRecord, FrameRegistry};
pub use relay::AssetRelay;
pub use session::SessionStats;
pub use source::{BundleSource, ChannelSource, FileSource};
