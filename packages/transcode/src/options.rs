use serde::{Deserialize, Serialize};

use crate::error::TranscodeError;

/// Knobs for [`transcode`](crate::transcode).
///
/// Two transcodes of the same project with equal options produce
/// byte-identical bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeOptions {
    /// Add a green-flag button to the document.
    pub include_green_flag: bool,

    /// Start the project as soon as the document loads.
    pub autoplay: bool,

    /// Module URL of the runtime library.
    pub library_url: String,

    /// Stylesheet shipped with the runtime library.
    pub stylesheet_url: String,

    /// Frames per second passed to the runtime.
    pub frame_rate: u32,

    /// Spaces per indentation level in generated code.
    pub indent_width: usize,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            include_green_flag: false,
            autoplay: true,
            library_url: "https://unpkg.com/leopard@^1/dist/index.esm.js".to_string(),
            stylesheet_url: "https://unpkg.com/leopard@^1/dist/index.min.css".to_string(),
            frame_rate: 30,
            indent_width: 2,
        }
    }
}

impl TranscodeOptions {
    pub fn from_json(text: &str) -> Result<Self, TranscodeError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = TranscodeOptions::default();
        assert!(!options.include_green_flag);
        assert!(options.autoplay);
        assert_eq!(options.frame_rate, 30);
        assert_eq!(options.indent_width, 2);
        assert!(options.library_url.contains("leopard@^1"));
    }

    #[test]
    fn partial_json() {
        let options = TranscodeOptions::from_json(r#"{"include_green_flag": true}"#).unwrap();
        assert!(options.include_green_flag);
        assert!(options.autoplay);
    }

    #[test]
    fn bad_json() {
        assert!(matches!(
            TranscodeOptions::from_json("{"),
            Err(TranscodeError::Json(_))
        ));
    }
}
