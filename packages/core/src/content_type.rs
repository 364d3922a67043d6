//! MIME types for served content.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A MIME type attached to served or inlined content.
///
/// The virtual namespace uses a fixed extension table; anything outside the
/// table is served as opaque bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentType(pub Cow<'static, str>);

impl ContentType {
    pub const HTML: ContentType = ContentType(Cow::Borrowed("text/html"));
    pub const CSS: ContentType = ContentType(Cow::Borrowed("text/css"));
    pub const JAVASCRIPT: ContentType = ContentType(Cow::Borrowed("application/javascript"));
    pub const PNG: ContentType = ContentType(Cow::Borrowed("image/png"));
    pub const JPEG: ContentType = ContentType(Cow::Borrowed("image/jpeg"));
    pub const GIF: ContentType = ContentType(Cow::Borrowed("image/gif"));
    pub const SVG: ContentType = ContentType(Cow::Borrowed("image/svg+xml"));
    pub const MPEG: ContentType = ContentType(Cow::Borrowed("audio/mpeg"));
    pub const WAV: ContentType = ContentType(Cow::Borrowed("audio/wav"));
    pub const PLAIN_TEXT: ContentType = ContentType(Cow::Borrowed("text/plain"));
    pub const OCTET_STREAM: ContentType = ContentType(Cow::Borrowed("application/octet-stream"));

    /// Create a content type from a static string.
    pub const fn from_static(s: &'static str) -> Self {
        ContentType(Cow::Borrowed(s))
    }

    /// Create a content type from an owned string.
    pub fn new(s: impl Into<String>) -> Self {
        ContentType(Cow::Owned(s.into()))
    }

    /// Look up the extension table. Matching is case-insensitive and the
    /// extension is given without its dot.
    pub fn from_extension(ext: &str) -> Option<ContentType> {
        let ct = match ext.to_ascii_lowercase().as_str() {
            "html" => Self::HTML,
            "css" => Self::CSS,
            "js" => Self::JAVASCRIPT,
            "png" => Self::PNG,
            "jpg" | "jpeg" => Self::JPEG,
            "gif" => Self::GIF,
            "svg" => Self::SVG,
            "mp3" => Self::MPEG,
            "wav" => Self::WAV,
            _ => return None,
        };
        Some(ct)
    }

    /// Like [`from_extension`](Self::from_extension), falling back to
    /// `application/octet-stream`.
    pub fn for_extension(ext: &str) -> ContentType {
        Self::from_extension(ext).unwrap_or(Self::OCTET_STREAM)
    }

    /// Get the MIME string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Vector images need special handling when inlined.
    pub fn is_svg(&self) -> bool {
        self == &Self::SVG
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&'static str> for ContentType {
    fn from(s: &'static str) -> Self {
        ContentType(Cow::Borrowed(s))
    }
}

impl AsRef<str> for ContentType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_table() {
        assert_eq!(ContentType::from_extension("html"), Some(ContentType::HTML));
        assert_eq!(ContentType::from_extension("js"), Some(ContentType::JAVASCRIPT));
        assert_eq!(ContentType::from_extension("jpg"), Some(ContentType::JPEG));
        assert_eq!(ContentType::from_extension("jpeg"), Some(ContentType::JPEG));
        assert_eq!(ContentType::from_extension("mp3"), Some(ContentType::MPEG));
        assert_eq!(ContentType::from_extension("wav"), Some(ContentType::WAV));
        assert_eq!(ContentType::from_extension("SVG"), Some(ContentType::SVG));
        assert_eq!(ContentType::from_extension("json"), None);
    }

    #[test]
    fn unknown_extension_falls_back() {
        assert_eq!(ContentType::for_extension("bin"), ContentType::OCTET_STREAM);
    }

    #[test]
    fn svg_detection() {
        assert!(ContentType::SVG.is_svg());
        assert!(!ContentType::PNG.is_svg());
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&ContentType::CSS).unwrap();
        assert_eq!(json, "\"text/css\"");
        let back: ContentType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ContentType::CSS);
    }
}
