use std::io;
use std::path::PathBuf;

use stagefs_channel::ChannelError;

#[derive(thiserror::Error, Debug)]
pub enum HostError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The presentation frame answered `getScratchFile` without a body.
    #[error("presentation frame returned no project data")]
    EmptyProject,
}

impl HostError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| HostError::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
