use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid stored name {name:?}")]
    InvalidName { name: String },

    #[error("stored file {path} is not valid base64: {source}")]
    Content {
        path: String,
        #[source]
        source: base64::DecodeError,
    },

    /// The slot holds no `scratch/` project, or more than one.
    #[error("storage slot has {found} project files, expected one")]
    Incomplete { found: usize },

    #[error("invalid storage url: {0}")]
    Url(#[from] url::ParseError),

    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage server answered {status}")]
    Status { status: StatusCode },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| StorageError::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
