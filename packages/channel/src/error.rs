use std::time::Duration;

use crate::message::RequestId;

/// Errors raised by channel endpoints.
///
/// Errors are `Clone` so that a single failed upstream call can be observed
/// by every request attached to it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The other side of the link is gone.
    #[error("channel closed")]
    Closed,

    /// No reply arrived within the configured limit.
    #[error("call {request_id} timed out after {after:?}")]
    Timeout { request_id: RequestId, after: Duration },

    /// A reply arrived but was not the kind the caller expected.
    #[error("unexpected reply to call {request_id}: {kind}")]
    UnexpectedReply {
        request_id: RequestId,
        kind: &'static str,
    },

    /// The other side answered a call with an error.
    #[error("remote call failed: {message}")]
    Remote { message: String },

    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(String),

    /// An envelope payload was not a well-formed message.
    #[error("failed to decode message: {0}")]
    Decode(String),

    /// Envelope origin failed the allow-list check.
    ///
    /// Only produced by [`Endpoint::check_origin`](crate::Endpoint::check_origin);
    /// ingress drops such envelopes without surfacing this to callers.
    #[error("untrusted origin: {origin}")]
    UntrustedOrigin { origin: String },

    /// An allow-list pattern did not compile.
    #[error("invalid origin pattern: {0}")]
    InvalidPattern(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
