//! The Content type - what a resource request resolves to.

use bytes::Bytes;
use http::StatusCode;

use crate::ContentType;

/// A resolved response body with its status and MIME type.
///
/// Content is cheap to clone (the body is a shared `Bytes`), so cached
/// entries are handed out as clones and never mutated in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Content {
    pub status: StatusCode,
    pub content_type: ContentType,
    pub body: Bytes,
}

impl Content {
    /// A `200 OK` response.
    pub fn ok(body: impl Into<Bytes>, content_type: ContentType) -> Self {
        Content {
            status: StatusCode::OK,
            content_type,
            body: body.into(),
        }
    }

    /// The `404 Not Found` response served for missing files.
    pub fn not_found(request_url: &str) -> Self {
        Content {
            status: StatusCode::NOT_FOUND,
            content_type: ContentType::PLAIN_TEXT,
            body: Bytes::from(format!("File not found: {} ", request_url)),
        }
    }

    /// Check if this is a successful response.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Check if this is a not-found response.
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    /// Length of the body in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response() {
        let content = Content::ok("body", ContentType::JAVASCRIPT);
        assert!(content.is_ok());
        assert!(!content.is_not_found());
        assert_eq!(content.len(), 4);
        assert_eq!(content.content_type, ContentType::JAVASCRIPT);
    }

    #[test]
    fn not_found_response() {
        let content = Content::not_found("http://localhost:8601/leopard/missing.png");
        assert!(content.is_not_found());
        assert!(!content.is_ok());
        assert_eq!(content.content_type, ContentType::PLAIN_TEXT);
        assert_eq!(
            &content.body[..],
            b"File not found: http://localhost:8601/leopard/missing.png "
        );
    }

    #[test]
    fn empty_body() {
        let content = Content::ok(Bytes::new(), ContentType::PNG);
        assert!(content.is_empty());
        assert!(content.is_ok());
    }

    #[test]
    fn clones_share_body() {
        let content = Content::ok(vec![1u8, 2, 3], ContentType::PNG);
        let clone = content.clone();
        assert_eq!(content, clone);
        assert_eq!(content.body.as_ptr(), clone.body.as_ptr());
    }
}
