//! # stagefs-channel
//!
//! Message passing between the editor host, presentation frame and asset
//! relay. Contexts share no memory: every message is serialized into an
//! [`Envelope`] stamped with the sender's origin and checked against the
//! receiver's [`OriginPolicy`] before anything else happens.
//!
//! Request/response pairs are correlated by a per-endpoint request id:
//!
//! ```rust,ignore
//! let (host, frame) = Link::pair("host://editor", "frame://preview", &ChannelConfig::default());
//!
//! // Frame side: make a call.
//! let reply = frame.endpoint
//!     .call(|request_id| Message::LoadScratchFile { request_id })
//!     .await?;
//!
//! // Host side: answer whatever arrives.
//! while let Some(msg) = host.inbox.next_message(&host.endpoint).await {
//!     // ...
//! }
//! ```

mod config;
mod correlation;
mod endpoint;
mod error;
mod message;
mod origin;

pub use config::ChannelConfig;
pub use correlation::CorrelationTable;
pub use endpoint::{Connection, Endpoint, Inbox, Link};
pub use error::{ChannelError, Result};
pub use message::{Envelope, Message, RequestId};
pub use origin::OriginPolicy;
