/// Errors from loading or transcoding a project.
///
/// Any error aborts the whole transcode; no partial bundle is produced.
#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    /// The project is unparseable or fails validation.
    #[error("invalid project: {0}")]
    ProjectFormat(String),

    /// Reading or writing the archive container failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Options or other auxiliary JSON failed to parse.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A generated module imports something that is not in the bundle.
    #[error("cannot merge {module}: {message}")]
    Merge { module: String, message: String },
}

impl TranscodeError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        TranscodeError::ProjectFormat(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TranscodeError>;
