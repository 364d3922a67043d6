use stagefs_channel::ChannelError;
use stagefs_core::PathError;

/// Errors produced while resolving a single intercepted request.
///
/// A failure is scoped to the request that produced it (and any requests
/// attached to the same in-flight fetch). It never poisons the session.
#[derive(thiserror::Error, Debug, Clone)]
pub enum RelayError {
    #[error("malformed virtual path in {url}: {source}")]
    MalformedPath {
        url: String,
        #[source]
        source: PathError,
    },

    #[error("no presentation frame owns {url}")]
    NoOwner { url: String },

    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("upstream call failed: {0}")]
    Upstream(#[from] ChannelError),

    #[error("passthrough fetch of {url} failed: {message}")]
    Passthrough { url: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl RelayError {
    pub fn malformed(url: impl Into<String>, source: PathError) -> Self {
        RelayError::MalformedPath {
            url: url.into(),
            source,
        }
    }

    pub fn no_owner(url: impl Into<String>) -> Self {
        RelayError::NoOwner { url: url.into() }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
