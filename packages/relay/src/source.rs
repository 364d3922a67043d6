//! Where a session's files come from.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use stagefs_channel::{ChannelError, Endpoint, Message};
use stagefs_core::VirtualPath;
use tracing::trace;

use crate::error::RelayError;

/// Backing store for one session's virtual files.
///
/// `Ok(None)` means the file does not exist; the relay turns that into a
/// cached 404. `Err` is a transport failure and is not cached.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn fetch(&self, path: &VirtualPath) -> Result<Option<Bytes>, RelayError>;
}

/// Fetches files with correlated `getFile` calls to a presentation frame,
/// which forwards them to the editor host.
pub struct ChannelSource {
    endpoint: Endpoint,
}

impl ChannelSource {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl FileSource for ChannelSource {
    async fn fetch(&self, path: &VirtualPath) -> Result<Option<Bytes>, RelayError> {
        trace!(%path, "relaying getFile");
        let reply = self
            .endpoint
            .call(|request_id| Message::GetFile {
                request_id,
                path: path.to_string(),
            })
            .await?;

        match reply {
            Message::GetFileResponse { file_content, .. } => Ok(file_content),
            Message::Response { body, .. } => Ok(body),
            Message::ErrorResponse { message, .. } => {
                Err(ChannelError::Remote { message }.into())
            }
            other => Err(ChannelError::UnexpectedReply {
                request_id: other.reply_to().unwrap_or_default(),
                kind: other.kind(),
            }
            .into()),
        }
    }
}

/// Serves an in-memory file set mounted under a namespace root.
///
/// Keys are bundle-relative paths such as `./Sprite1/Sprite1.js`; with root
/// `leopard` that file answers `/leopard/Sprite1/Sprite1.js`.
#[derive(Debug, Clone, Default)]
pub struct BundleSource {
    files: BTreeMap<VirtualPath, Bytes>,
}

impl BundleSource {
    pub fn new<I, K>(root: &str, files: I) -> Result<Self, RelayError>
    where
        I: IntoIterator<Item = (K, Bytes)>,
        K: AsRef<str>,
    {
        let root = VirtualPath::parse(root).map_err(|e| RelayError::malformed(root, e))?;
        let files = files
            .into_iter()
            .map(|(key, bytes)| {
                let key = key.as_ref();
                let path = VirtualPath::parse(key).map_err(|e| RelayError::malformed(key, e))?;
                Ok((root.join(&path), bytes))
            })
            .collect::<Result<_, RelayError>>()?;
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl FileSource for BundleSource {
    async fn fetch(&self, path: &VirtualPath) -> Result<Option<Bytes>, RelayError> {
        Ok(self.files.get(path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagefs_channel::{ChannelConfig, Link};

    #[tokio::test]
    async fn bundle_source_mounts_under_root() {
        let source = BundleSource::new(
            "leopard",
            [
                ("./index.html", Bytes::from_static(b"<html>")),
                ("./Sprite1/Sprite1.js", Bytes::from_static(b"js")),
            ],
        )
        .unwrap();
        assert_eq!(source.len(), 2);

        let hit = VirtualPath::parse("/leopard/Sprite1/Sprite1.js").unwrap();
        assert_eq!(source.fetch(&hit).await.unwrap(), Some(Bytes::from_static(b"js")));

        let miss = VirtualPath::parse("/Sprite1/Sprite1.js").unwrap();
        assert_eq!(source.fetch(&miss).await.unwrap(), None);
    }

    #[test]
    fn bundle_source_rejects_escaping_keys() {
        let err = BundleSource::new("leopard", [("../secret.txt", Bytes::new())]).unwrap_err();
        assert!(matches!(err, RelayError::MalformedPath { .. }));
    }

    #[tokio::test]
    async fn channel_source_maps_replies() {
        let (relay, frame) = Link::pair("relay://sw", "frame://preview", &ChannelConfig::default());
        let source = ChannelSource::new(relay.endpoint.clone());

        let frame_ep = frame.endpoint;
        let mut frame_inbox = frame.inbox;
        tokio::spawn(async move {
            while let Some(msg) = frame_inbox.next_message(&frame_ep).await {
                if let Message::GetFile { request_id, path } = msg {
                    let file_content = (path == "/leopard/a.js").then(|| Bytes::from_static(b"a"));
                    frame_ep
                        .send(Message::GetFileResponse {
                            request_id,
                            file_content,
                        })
                        .await
                        .unwrap();
                }
            }
        });

        let relay_ep = relay.endpoint;
        let mut relay_inbox = relay.inbox;
        tokio::spawn(async move { while relay_inbox.next_message(&relay_ep).await.is_some() {} });

        let found = VirtualPath::parse("/leopard/a.js").unwrap();
        let missing = VirtualPath::parse("/leopard/b.js").unwrap();
        assert_eq!(source.fetch(&found).await.unwrap(), Some(Bytes::from_static(b"a")));
        assert_eq!(source.fetch(&missing).await.unwrap(), None);
    }
}
