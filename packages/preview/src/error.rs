use stagefs_channel::ChannelError;
use stagefs_transcode::TranscodeError;

#[derive(thiserror::Error, Debug)]
pub enum PreviewError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    /// No project has been loaded yet.
    #[error("no project loaded")]
    NoProject,
}

pub type Result<T> = std::result::Result<T, PreviewError>;
