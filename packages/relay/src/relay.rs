//! The asset relay.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use stagefs_channel::{Connection, Message};
use stagefs_core::{Content, FrameId, SessionId, VirtualPath};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::passthrough::{Passthrough, ReqwestPassthrough};
use crate::registry::{FrameKind, FrameRecord, FrameRegistry};
use crate::session::{Session, SessionStats};
use crate::source::{ChannelSource, FileSource};

/// Intercepts resource requests from consumer frames and serves virtual
/// files from per-session caches, relaying misses to the owning
/// presentation frame.
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct AssetRelay {
    inner: Arc<Inner>,
}

struct Inner {
    config: RelayConfig,
    passthrough: Arc<dyn Passthrough>,
    frames: Mutex<FrameRegistry>,
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
}

impl AssetRelay {
    pub fn new(config: RelayConfig, passthrough: Arc<dyn Passthrough>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                passthrough,
                frames: Mutex::new(FrameRegistry::default()),
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Build a relay that passes non-virtual requests to the network.
    pub fn with_config(config: RelayConfig) -> Result<Self, RelayError> {
        config.validate()?;
        let passthrough = ReqwestPassthrough::new(config.passthrough_timeout())?;
        Ok(Self::new(config, Arc::new(passthrough)))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Whether `url` addresses the virtual namespace.
    pub fn is_virtual(&self, url: &Url) -> bool {
        let path = url.path();
        self.inner
            .config
            .namespace_markers
            .iter()
            .any(|marker| !marker.is_empty() && path.contains(marker.as_str()))
    }

    fn is_document(&self, path: &VirtualPath) -> bool {
        path.file_name() == Some(self.inner.config.document_name.as_str())
    }

    /// Resolve one intercepted request.
    ///
    /// Non-virtual URLs go straight to the passthrough fetcher. Virtual URLs
    /// are resolved against the owning session's cache, an identical
    /// in-flight fetch, or a relayed `getFile` call, in that order.
    pub async fn handle_request(
        &self,
        request_url: &str,
        requesting_frame: FrameId,
    ) -> Result<Content, RelayError> {
        let url = Url::parse(request_url).map_err(|e| RelayError::InvalidUrl {
            url: request_url.to_string(),
            message: e.to_string(),
        })?;

        if !self.is_virtual(&url) {
            debug!(url = %url, "passthrough");
            return self.inner.passthrough.fetch(&url).await;
        }

        let path =
            VirtualPath::parse(url.path()).map_err(|e| RelayError::malformed(request_url, e))?;
        let content_type = path
            .content_type()
            .map_err(|e| RelayError::malformed(request_url, e))?;

        let is_document = self.is_document(&path);
        let session_id = self.owning_session(&url, is_document, requesting_frame)?;
        let session = self
            .session(session_id)
            .ok_or_else(|| RelayError::no_owner(request_url))?;

        if is_document {
            self.inner.frames.lock().insert(FrameRecord {
                id: requesting_frame,
                kind: FrameKind::Consumer,
                url: url.clone(),
            });
            session.reset();
        }

        session.resolve(path, request_url, content_type).await
    }

    /// Interception entry point: like [`handle_request`](Self::handle_request)
    /// but failures become a 404 so the consumer frame always gets a response.
    pub async fn respond(&self, request_url: &str, requesting_frame: FrameId) -> Content {
        match self.handle_request(request_url, requesting_frame).await {
            Ok(content) => content,
            Err(e) => {
                warn!(url = request_url, error = %e, "request failed");
                Content::not_found(request_url)
            }
        }
    }

    /// Find the session that owns a virtual request.
    ///
    /// The owner is named by the session parameter of the requesting
    /// document's URL. For the document itself that is the request URL;
    /// otherwise it is the URL the requesting frame registered with, which
    /// must name the top-level document on the request's origin.
    fn owning_session(
        &self,
        url: &Url,
        is_document: bool,
        requesting_frame: FrameId,
    ) -> Result<SessionId, RelayError> {
        let config = &self.inner.config;
        let frames = self.inner.frames.lock();

        let document_url = if is_document {
            Some(url.clone())
        } else {
            frames
                .get(requesting_frame)
                .filter(|frame| {
                    frame
                        .url
                        .path_segments()
                        .and_then(|mut segments| segments.next_back())
                        == Some(config.document_name.as_str())
                        && frame.url.origin() == url.origin()
                })
                .map(|frame| frame.url.clone())
        };
        let document_url = document_url.ok_or_else(|| RelayError::no_owner(url.as_str()))?;

        let session_id = document_url
            .query_pairs()
            .find(|(key, _)| key == config.session_param.as_str())
            .and_then(|(_, value)| value.parse::<SessionId>().ok())
            .ok_or_else(|| RelayError::no_owner(url.as_str()))?;

        if frames.presentation(session_id).is_none() {
            return Err(RelayError::no_owner(url.as_str()));
        }
        Ok(session_id)
    }

    fn session(&self, id: SessionId) -> Option<Arc<Session>> {
        self.inner.sessions.lock().get(&id).cloned()
    }

    /// Register a presentation frame served by `source`, replacing any
    /// previous registration (and session) under the same id.
    pub fn register_presentation(
        &self,
        frame_id: FrameId,
        url: &str,
        source: Arc<dyn FileSource>,
    ) -> Result<SessionId, RelayError> {
        let url = parse_url(url)?;
        self.inner.frames.lock().insert(FrameRecord {
            id: frame_id,
            kind: FrameKind::Presentation,
            url,
        });
        self.inner
            .sessions
            .lock()
            .insert(frame_id, Session::new(frame_id, source));
        info!(session = %frame_id, "presentation frame registered");
        Ok(frame_id)
    }

    /// Register a consumer frame and the document URL it loaded.
    pub fn register_consumer(&self, frame_id: FrameId, url: &str) -> Result<(), RelayError> {
        let url = parse_url(url)?;
        self.inner.frames.lock().insert(FrameRecord {
            id: frame_id,
            kind: FrameKind::Consumer,
            url,
        });
        Ok(())
    }

    /// Forget a frame. Unregistering a presentation frame drops its session.
    pub fn unregister(&self, frame_id: FrameId) {
        let removed = self.inner.frames.lock().remove(frame_id);
        if let Some(FrameRecord {
            kind: FrameKind::Presentation,
            ..
        }) = removed
        {
            self.inner.sessions.lock().remove(&frame_id);
            info!(session = %frame_id, "session closed");
        }
    }

    /// Reset a session's cache as if its document had been re-requested.
    /// Returns false if the session does not exist.
    pub fn invalidate(&self, session: SessionId) -> bool {
        match self.session(session) {
            Some(s) => {
                s.reset();
                true
            }
            None => false,
        }
    }

    pub fn session_stats(&self, session: SessionId) -> Option<SessionStats> {
        self.session(session).map(|s| s.stats())
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// Attach a presentation frame over a channel link.
    ///
    /// The frame gets a session whose files are fetched with `getFile` calls
    /// over `connection`. A pump task settles replies and answers
    /// `getClientId`; when the link closes the frame is unregistered.
    pub fn attach(
        &self,
        frame_id: FrameId,
        url: &str,
        connection: Connection,
    ) -> Result<JoinHandle<()>, RelayError> {
        let Connection {
            endpoint,
            mut inbox,
        } = connection;
        let source = Arc::new(ChannelSource::new(endpoint.clone()));
        self.register_presentation(frame_id, url, source)?;

        let relay = self.clone();
        Ok(tokio::spawn(async move {
            while let Some(message) = inbox.next_message(&endpoint).await {
                match message {
                    Message::GetClientId { request_id } => {
                        let reply = Message::GetClientIdResponse {
                            request_id,
                            client_id: frame_id,
                        };
                        if let Err(e) = endpoint.send(reply).await {
                            warn!(frame = %frame_id, error = %e, "failed to answer getClientId");
                        }
                    }
                    Message::LoadScratchFile { .. }
                    | Message::GetFile { .. }
                    | Message::SaveLeopardFiles { .. }
                    | Message::ScratchContentChanged
                    | Message::GetScratchFile { .. }
                    | Message::LoadScratchFileResponse { .. }
                    | Message::GetFileResponse { .. }
                    | Message::SaveLeopardFilesResponse { .. }
                    | Message::GetClientIdResponse { .. }
                    | Message::Response { .. }
                    | Message::ErrorResponse { .. }
                    | Message::Unknown => {
                        debug!(frame = %frame_id, kind = message.kind(), "relay ignoring message");
                    }
                }
            }
            relay.unregister(frame_id);
        }))
    }
}

fn parse_url(url: &str) -> Result<Url, RelayError> {
    Url::parse(url).map_err(|e| RelayError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Refuse;

    #[async_trait]
    impl Passthrough for Refuse {
        async fn fetch(&self, url: &Url) -> Result<Content, RelayError> {
            Err(RelayError::Passthrough {
                url: url.to_string(),
                message: "offline".into(),
            })
        }
    }

    fn relay() -> AssetRelay {
        AssetRelay::new(RelayConfig::default(), Arc::new(Refuse))
    }

    #[test]
    fn classification_uses_markers() {
        let relay = relay();
        let virtual_url = Url::parse("http://localhost:8601/leopard/index.js").unwrap();
        let ext_url = Url::parse("http://localhost:8601/leopard_ext/a.js").unwrap();
        let cdn = Url::parse("https://unpkg.com/leopard@^1/dist/index.esm.js").unwrap();
        assert!(relay.is_virtual(&virtual_url));
        assert!(relay.is_virtual(&ext_url));
        assert!(!relay.is_virtual(&cdn));
    }

    #[tokio::test]
    async fn passthrough_errors_surface() {
        let relay = relay();
        let err = relay
            .handle_request("https://unpkg.com/leopard@^1/dist/index.esm.js", FrameId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Passthrough { .. }));
    }

    #[tokio::test]
    async fn missing_extension_is_malformed() {
        let relay = relay();
        let err = relay
            .handle_request("http://localhost:8601/leopard/config", FrameId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::MalformedPath { .. }));
    }

    #[tokio::test]
    async fn unknown_frame_has_no_owner() {
        let relay = relay();
        let err = relay
            .handle_request("http://localhost:8601/leopard/index.js", FrameId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::NoOwner { .. }));
    }

    #[tokio::test]
    async fn respond_maps_failures_to_not_found() {
        let relay = relay();
        let url = "http://localhost:8601/leopard/index.js";
        let content = relay.respond(url, FrameId::new()).await;
        assert!(content.is_not_found());
    }

    #[test]
    fn unregister_presentation_drops_session() {
        let relay = relay();
        let id = FrameId::new();
        relay
            .register_presentation(
                id,
                "http://localhost:3000/editor",
                Arc::new(crate::BundleSource::default()),
            )
            .unwrap();
        assert_eq!(relay.session_count(), 1);
        assert!(relay.invalidate(id));
        relay.unregister(id);
        assert_eq!(relay.session_count(), 0);
        assert!(!relay.invalidate(id));
    }
}
