//! The presentation frame.
//!
//! Sits between the editor host and the asset relay. It owns the project
//! bytes, turns them into a bundle on demand, and answers the relay's file
//! requests by asking the host.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use stagefs_channel::{ChannelError, Endpoint, Inbox, Message, RequestId};
use stagefs_core::FrameId;
use stagefs_relay::RelayConfig;
use stagefs_transcode::{transcode, ProjectBundle, TranscodeOptions};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::{PreviewError, Result};

#[derive(Debug, Default)]
struct State {
    project: Option<Bytes>,
    client_id: Option<FrameId>,
    files_version: u64,
}

struct Inner {
    host: Endpoint,
    relay: Endpoint,
    relay_config: RelayConfig,
    options: TranscodeOptions,
    state: Mutex<State>,
}

/// Cheap to clone; clones share state and endpoints.
#[derive(Clone)]
pub struct PresentationFrame {
    inner: Arc<Inner>,
}

impl PresentationFrame {
    pub fn new(
        host: Endpoint,
        relay: Endpoint,
        relay_config: RelayConfig,
        options: TranscodeOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                relay,
                relay_config,
                options,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Pump both inboxes on a background task.
    pub fn spawn(&self, host_inbox: Inbox, relay_inbox: Inbox) -> JoinHandle<()> {
        tokio::spawn(self.clone().serve(host_inbox, relay_inbox))
    }

    /// Pump both inboxes until both peers are gone.
    pub async fn serve(self, mut host_inbox: Inbox, mut relay_inbox: Inbox) {
        let mut host_open = true;
        let mut relay_open = true;
        while host_open || relay_open {
            tokio::select! {
                message = host_inbox.next_message(&self.inner.host), if host_open => {
                    match message {
                        Some(message) => self.on_host_message(message).await,
                        None => {
                            debug!("editor host disconnected");
                            host_open = false;
                        }
                    }
                }
                message = relay_inbox.next_message(&self.inner.relay), if relay_open => {
                    match message {
                        Some(message) => self.on_relay_message(message),
                        None => {
                            debug!("relay disconnected");
                            relay_open = false;
                        }
                    }
                }
            }
        }
    }

    async fn on_host_message(&self, message: Message) {
        match message {
            Message::GetScratchFile { request_id } => {
                let body = self.inner.state.lock().project.clone();
                let reply = Message::Response { request_id, body };
                if let Err(e) = self.inner.host.send(reply).await {
                    warn!(error = %e, "failed to answer getScratchFile");
                }
            }
            Message::LoadScratchFile { .. }
            | Message::GetFile { .. }
            | Message::SaveLeopardFiles { .. }
            | Message::ScratchContentChanged
            | Message::GetClientId { .. }
            | Message::LoadScratchFileResponse { .. }
            | Message::GetFileResponse { .. }
            | Message::SaveLeopardFilesResponse { .. }
            | Message::GetClientIdResponse { .. }
            | Message::Response { .. }
            | Message::ErrorResponse { .. }
            | Message::Unknown => {
                trace!(kind = message.kind(), "ignoring host message");
            }
        }
    }

    fn on_relay_message(&self, message: Message) {
        match message {
            Message::GetFile { request_id, path } => {
                // The host's reply comes back through the serve loop, so the
                // forward must not block it.
                let host = self.inner.host.clone();
                let relay = self.inner.relay.clone();
                tokio::spawn(forward_get_file(host, relay, request_id, path));
            }
            Message::LoadScratchFile { .. }
            | Message::SaveLeopardFiles { .. }
            | Message::ScratchContentChanged
            | Message::GetScratchFile { .. }
            | Message::GetClientId { .. }
            | Message::LoadScratchFileResponse { .. }
            | Message::GetFileResponse { .. }
            | Message::SaveLeopardFilesResponse { .. }
            | Message::GetClientIdResponse { .. }
            | Message::Response { .. }
            | Message::ErrorResponse { .. }
            | Message::Unknown => {
                trace!(kind = message.kind(), "ignoring relay message");
            }
        }
    }

    /// Learn the relay's id for this frame, then load the project from the
    /// host. A host without a project gets the blank project announced back
    /// as a content change.
    ///
    /// Requires [`spawn`](Self::spawn) or [`serve`](Self::serve) to be
    /// running so replies are delivered.
    pub async fn start(&self) -> Result<FrameId> {
        let client_id = match self
            .inner
            .relay
            .call(|request_id| Message::GetClientId { request_id })
            .await?
        {
            Message::GetClientIdResponse { client_id, .. } => client_id,
            other => return Err(unexpected(other).into()),
        };
        self.inner.state.lock().client_id = Some(client_id);

        let body = match self
            .inner
            .host
            .call(|request_id| Message::LoadScratchFile { request_id })
            .await?
        {
            Message::LoadScratchFileResponse { body, .. } => body,
            other => return Err(unexpected(other).into()),
        };

        if body.is_empty() {
            let blank = Bytes::from(ProjectBundle::blank().to_sb3()?);
            self.inner.state.lock().project = Some(blank);
            self.inner.host.send(Message::ScratchContentChanged).await?;
            info!(%client_id, "started with a blank project");
        } else {
            info!(%client_id, bytes = body.len(), "project loaded");
            self.inner.state.lock().project = Some(body);
        }
        Ok(client_id)
    }

    /// Replace the project and tell the host it changed.
    pub async fn set_project(&self, sb3: Bytes) -> Result<()> {
        ProjectBundle::from_sb3(&sb3)?;
        self.inner.state.lock().project = Some(sb3);
        self.inner.host.send(Message::ScratchContentChanged).await?;
        Ok(())
    }

    /// Transcode the current project and hand the bundle to the host.
    /// Returns the new files version.
    pub async fn generate(&self) -> Result<u64> {
        let sb3 = self
            .inner
            .state
            .lock()
            .project
            .clone()
            .ok_or(PreviewError::NoProject)?;
        let project = ProjectBundle::from_sb3(&sb3)?;
        let files = transcode(&project, &self.inner.options)?.into_files();
        let count = files.len();

        match self
            .inner
            .host
            .call(|request_id| Message::SaveLeopardFiles {
                request_id,
                body: files,
            })
            .await?
        {
            Message::SaveLeopardFilesResponse { .. } => {}
            other => return Err(unexpected(other).into()),
        }

        let mut state = self.inner.state.lock();
        state.files_version += 1;
        info!(files = count, version = state.files_version, "bundle generated");
        Ok(state.files_version)
    }

    /// Where a consumer frame should load the generated document, once
    /// [`start`](Self::start) has learned this frame's id.
    pub fn consumer_url(&self) -> Option<String> {
        let client_id = self.inner.state.lock().client_id?;
        Some(self.inner.relay_config.consumer_url(client_id))
    }

    pub fn client_id(&self) -> Option<FrameId> {
        self.inner.state.lock().client_id
    }

    pub fn project(&self) -> Option<Bytes> {
        self.inner.state.lock().project.clone()
    }

    /// Bumped after every successful [`generate`](Self::generate).
    pub fn files_version(&self) -> u64 {
        self.inner.state.lock().files_version
    }
}

fn unexpected(reply: Message) -> ChannelError {
    ChannelError::UnexpectedReply {
        request_id: reply.reply_to().unwrap_or_default(),
        kind: reply.kind(),
    }
}

/// Answer the relay's `request_id` with the host's copy of `path`.
///
/// Only a host answer becomes a `getFileResponse`; a failed call is passed
/// on as an `errorResponse` so the relay does not mistake it for a missing
/// file.
async fn forward_get_file(host: Endpoint, relay: Endpoint, request_id: RequestId, path: String) {
    let answer = match host
        .call(|id| Message::GetFile {
            request_id: id,
            path: path.clone(),
        })
        .await
    {
        Ok(Message::GetFileResponse { file_content, .. }) => Ok(file_content),
        Ok(Message::Response { body, .. }) => Ok(body),
        Ok(other) => Err(unexpected(other)),
        Err(e) => Err(e),
    };

    let reply = match answer {
        Ok(file_content) => {
            trace!(%path, found = file_content.is_some(), "forwarded getFile");
            Message::GetFileResponse {
                request_id,
                file_content,
            }
        }
        Err(e) => {
            warn!(%path, error = %e, "host did not answer getFile");
            Message::ErrorResponse {
                request_id,
                message: e.to_string(),
            }
        }
    };
    if let Err(e) = relay.send(reply).await {
        warn!(%path, error = %e, "failed to answer relay");
    }
}
