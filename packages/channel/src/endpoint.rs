//! Endpoints: the send side, correlated calls and origin-checked ingress.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::ChannelConfig;
use crate::correlation::CorrelationTable;
use crate::error::ChannelError;
use crate::message::{Envelope, Message, RequestId};
use crate::origin::OriginPolicy;

/// One side of a link.
///
/// Cloning an endpoint shares its correlation table, so a reply accepted
/// through any clone settles calls made through any other.
#[derive(Debug, Clone)]
pub struct Endpoint {
    origin: Arc<str>,
    tx: mpsc::Sender<Envelope>,
    table: Arc<CorrelationTable>,
    policy: Arc<OriginPolicy>,
    call_timeout: Option<Duration>,
}

/// Envelopes addressed to an endpoint.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::Receiver<Envelope>,
}

/// An endpoint together with its inbox.
#[derive(Debug)]
pub struct Connection {
    pub endpoint: Endpoint,
    pub inbox: Inbox,
}

/// Factory for connected endpoint pairs.
pub struct Link;

impl Link {
    /// Create two connected endpoints.
    ///
    /// Each endpoint stamps its own origin on what it sends and, until a
    /// different policy is installed, trusts only its peer's origin.
    pub fn pair(a_origin: &str, b_origin: &str, config: &ChannelConfig) -> (Connection, Connection) {
        let (a_tx, b_rx) = mpsc::channel(config.capacity.max(1));
        let (b_tx, a_rx) = mpsc::channel(config.capacity.max(1));

        let a = Connection {
            endpoint: Endpoint::new(a_origin, a_tx, OriginPolicy::exact(b_origin), config),
            inbox: Inbox { rx: a_rx },
        };
        let b = Connection {
            endpoint: Endpoint::new(b_origin, b_tx, OriginPolicy::exact(a_origin), config),
            inbox: Inbox { rx: b_rx },
        };
        (a, b)
    }
}

impl Endpoint {
    fn new(
        origin: &str,
        tx: mpsc::Sender<Envelope>,
        policy: OriginPolicy,
        config: &ChannelConfig,
    ) -> Self {
        Self {
            origin: Arc::from(origin),
            tx,
            table: Arc::new(CorrelationTable::new()),
            policy: Arc::new(policy),
            call_timeout: config.call_timeout(),
        }
    }

    /// Replace the ingress allow-list.
    pub fn with_policy(mut self, policy: OriginPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// The origin stamped on outgoing envelopes.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Number of calls still awaiting a reply.
    pub fn pending_calls(&self) -> usize {
        self.table.len()
    }

    /// Whether the peer's inbox is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Fire-and-forget send.
    pub async fn send(&self, message: Message) -> Result<(), ChannelError> {
        let envelope = Envelope {
            origin: self.origin.to_string(),
            data: message.to_value()?,
        };
        trace!(origin = %self.origin, kind = message.kind(), "send");
        self.tx.send(envelope).await.map_err(|_| ChannelError::Closed)
    }

    /// Send a request built for a fresh id and wait for the matching reply.
    ///
    /// The resolver is removed on every exit path: reply, timeout, send
    /// failure, or the returned future being dropped.
    pub async fn call<F>(&self, build: F) -> Result<Message, ChannelError>
    where
        F: FnOnce(RequestId) -> Message,
    {
        let (request_id, rx) = self.table.register();
        let _guard = PendingGuard {
            table: &self.table,
            request_id,
        };

        self.send(build(request_id)).await?;

        let reply = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| {
                    debug!(request_id, ?limit, "call timed out");
                    ChannelError::Timeout {
                        request_id,
                        after: limit,
                    }
                })?,
            None => rx.await,
        };
        reply.map_err(|_| ChannelError::Closed)
    }

    /// Check an envelope origin against this endpoint's allow-list.
    pub fn check_origin(&self, origin: &str) -> Result<(), ChannelError> {
        if self.policy.allows(origin) {
            Ok(())
        } else {
            Err(ChannelError::UntrustedOrigin {
                origin: origin.to_string(),
            })
        }
    }

    /// Process one inbound envelope.
    ///
    /// Untrusted, undecodable and unknown messages are dropped. Replies settle
    /// the matching pending call. Anything else is returned for the caller to
    /// handle.
    pub fn accept(&self, envelope: Envelope) -> Option<Message> {
        if let Err(e) = self.check_origin(&envelope.origin) {
            debug!(endpoint = %self.origin, error = %e, "dropping envelope");
            return None;
        }

        let message = match Message::from_value(envelope.data) {
            Ok(message) => message,
            Err(e) => {
                debug!(endpoint = %self.origin, error = %e, "dropping envelope");
                return None;
            }
        };

        if message == Message::Unknown {
            trace!(endpoint = %self.origin, "ignoring unknown message kind");
            return None;
        }

        if let Some(request_id) = message.reply_to() {
            if !self.table.resolve(request_id, message) {
                debug!(endpoint = %self.origin, request_id, "reply with no pending call");
            }
            return None;
        }

        Some(message)
    }
}

impl Inbox {
    /// Next raw envelope, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Next message that needs handling, settling replies along the way.
    pub async fn next_message(&mut self, endpoint: &Endpoint) -> Option<Message> {
        while let Some(envelope) = self.rx.recv().await {
            if let Some(message) = endpoint.accept(envelope) {
                return Some(message);
            }
        }
        None
    }
}

struct PendingGuard<'a> {
    table: &'a CorrelationTable,
    request_id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.remove(self.request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    fn link() -> (Connection, Connection) {
        Link::pair("host://editor", "frame://preview", &ChannelConfig::default())
    }

    #[tokio::test]
    async fn call_settles_on_matching_reply() {
        let (host, frame) = link();
        let Connection {
            endpoint: frame_ep,
            inbox: mut frame_inbox,
        } = frame;
        let Connection {
            endpoint: host_ep,
            inbox: mut host_inbox,
        } = host;

        let server = tokio::spawn(async move {
            match host_inbox.next_message(&host_ep).await {
                Some(Message::GetFile { request_id, path }) => {
                    assert_eq!(path, "leopard/index.js");
                    host_ep
                        .send(Message::GetFileResponse {
                            request_id,
                            file_content: Some(Bytes::from_static(b"js")),
                        })
                        .await
                        .unwrap();
                }
                other => panic!("unexpected {other:?}"),
            }
        });

        let caller = frame_ep.clone();
        let call = tokio::spawn(async move {
            caller
                .call(|request_id| Message::GetFile {
                    request_id,
                    path: "leopard/index.js".into(),
                })
                .await
        });

        // Settle replies arriving at the frame.
        let pump_ep = frame_ep.clone();
        tokio::spawn(async move { while frame_inbox.next_message(&pump_ep).await.is_some() {} });

        let reply = call.await.unwrap().unwrap();
        server.await.unwrap();
        assert_eq!(
            reply,
            Message::GetFileResponse {
                request_id: 1,
                file_content: Some(Bytes::from_static(b"js"))
            }
        );
        assert_eq!(frame_ep.pending_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_removes_resolver() {
        let config = ChannelConfig::default().with_call_timeout(Some(Duration::from_millis(50)));
        let (a, _b) = Link::pair("a://x", "b://y", &config);

        let err = a
            .endpoint
            .call(|request_id| Message::GetScratchFile { request_id })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ChannelError::Timeout {
                request_id: 1,
                after: Duration::from_millis(50)
            }
        );
        assert_eq!(a.endpoint.pending_calls(), 0);
    }

    #[tokio::test]
    async fn send_to_dropped_peer_fails_and_cleans_up() {
        let (a, b) = link();
        drop(b);
        let err = a
            .endpoint
            .call(|request_id| Message::LoadScratchFile { request_id })
            .await
            .unwrap_err();
        assert_eq!(err, ChannelError::Closed);
        assert_eq!(a.endpoint.pending_calls(), 0);
    }

    #[tokio::test]
    async fn untrusted_origin_is_dropped_before_dispatch() {
        let (a, _b) = link();
        let (id, _rx) = a.endpoint.table.register();
        let forged = Envelope {
            origin: "http://evil.com".into(),
            data: json!({"type": "response", "requestId": id}),
        };
        assert_eq!(a.endpoint.accept(forged), None);
        // The forged reply did not settle the call.
        assert_eq!(a.endpoint.pending_calls(), 1);
    }

    #[test]
    fn trusted_requests_are_returned() {
        let (a, _b) = link();
        let envelope = Envelope {
            origin: "frame://preview".into(),
            data: json!({"type": "scratchContentChanged"}),
        };
        assert_eq!(a.endpoint.accept(envelope), Some(Message::ScratchContentChanged));
    }

    #[test]
    fn unknown_and_malformed_are_ignored() {
        let (a, _b) = link();
        for data in [json!({"type": "mystery"}), json!({"type": "getFile"}), json!(42)] {
            let envelope = Envelope {
                origin: "frame://preview".into(),
                data,
            };
            assert_eq!(a.endpoint.accept(envelope), None);
        }
    }

    #[test]
    fn policy_can_be_replaced() {
        let (a, _b) = link();
        let endpoint = a.endpoint.with_policy(OriginPolicy::editor_hosts());
        assert!(endpoint.check_origin("vscode-webview://abc").is_ok());
        assert!(endpoint.check_origin("frame://preview").is_err());
    }
}
