//! The editor side of the preview protocol.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use stagefs_channel::{Endpoint, Inbox, Message};
use stagefs_core::{fs_tree, VirtualPath};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::document::ScratchDocument;
use crate::error::{HostError, Result};

/// Owns a [`ScratchDocument`] and answers the presentation frame.
///
/// Cheap to clone; clones share the document and the endpoint.
#[derive(Clone)]
pub struct EditorHost {
    inner: Arc<Inner>,
}

struct Inner {
    document: Mutex<ScratchDocument>,
    endpoint: Endpoint,
}

/// A backup written by [`EditorHost::backup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
}

impl Backup {
    /// Remove the backup file. Failures are ignored.
    pub fn delete(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            trace!(path = %self.path.display(), error = %e, "backup already gone");
        }
    }
}

impl EditorHost {
    pub fn new(document: ScratchDocument, endpoint: Endpoint) -> Self {
        Self {
            inner: Arc::new(Inner {
                document: Mutex::new(document),
                endpoint,
            }),
        }
    }

    /// Open `path` and serve it over `endpoint`.
    pub fn open(path: impl Into<PathBuf>, endpoint: Endpoint) -> Result<Self> {
        Ok(Self::new(ScratchDocument::open(path)?, endpoint))
    }

    /// Snapshot of the current document.
    pub fn document(&self) -> ScratchDocument {
        self.inner.document.lock().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.document.lock().is_dirty()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Serve messages from `inbox` on a background task until the peer
    /// goes away.
    pub fn spawn(&self, inbox: Inbox) -> JoinHandle<()> {
        let host = self.clone();
        tokio::spawn(host.serve(inbox))
    }

    /// Serve messages until the peer goes away. Replies to this host's own
    /// calls are settled along the way.
    pub async fn serve(self, mut inbox: Inbox) {
        while let Some(message) = inbox.next_message(&self.inner.endpoint).await {
            let kind = message.kind();
            if let Err(e) = self.handle(message).await {
                warn!(kind, error = %e, "failed to handle message");
            }
        }
        debug!("presentation frame disconnected");
    }

    /// Handle one request or notification.
    pub async fn handle(&self, message: Message) -> Result<()> {
        let endpoint = &self.inner.endpoint;
        match message {
            Message::LoadScratchFile { request_id } => {
                let body = self.inner.document.lock().data().clone();
                endpoint
                    .send(Message::LoadScratchFileResponse { request_id, body })
                    .await?;
            }
            Message::GetFile { request_id, path } => {
                let file_content = self.read_file(&path);
                endpoint
                    .send(Message::GetFileResponse {
                        request_id,
                        file_content,
                    })
                    .await?;
            }
            Message::SaveLeopardFiles { request_id, body } => {
                self.write_leopard_files(body)?;
                endpoint
                    .send(Message::SaveLeopardFilesResponse { request_id })
                    .await?;
            }
            Message::ScratchContentChanged => {
                self.inner.document.lock().mark_dirty();
                trace!("document marked dirty");
            }
            Message::GetScratchFile { .. } | Message::GetClientId { .. } => {
                debug!(kind = message.kind(), "request not served by the host");
            }
            Message::LoadScratchFileResponse { .. }
            | Message::GetFileResponse { .. }
            | Message::SaveLeopardFilesResponse { .. }
            | Message::GetClientIdResponse { .. }
            | Message::Response { .. }
            | Message::ErrorResponse { .. }
            | Message::Unknown => {
                trace!(kind = message.kind(), "ignored");
            }
        }
        Ok(())
    }

    /// Read a file relative to the document's folder. Paths that would
    /// leave the folder read as absent.
    fn read_file(&self, path: &str) -> Option<Bytes> {
        let relative = match VirtualPath::parse(path) {
            Ok(p) if !p.is_empty() => p,
            Ok(_) => return None,
            Err(e) => {
                debug!(path, error = %e, "rejecting file request");
                return None;
            }
        };
        let folder = self.inner.document.lock().folder();
        let full = fs_tree::resolve_under(&folder, &relative);
        match fs::read(&full) {
            Ok(data) => Some(Bytes::from(data)),
            Err(e) => {
                debug!(path = %full.display(), error = %e, "file not found");
                None
            }
        }
    }

    /// Replace the generated-output folder with `files`.
    fn write_leopard_files(&self, files: BTreeMap<String, Bytes>) -> Result<()> {
        let folder = self.inner.document.lock().leopard_folder();
        fs_tree::clear_dir(&folder).map_err(HostError::io(&folder))?;
        fs::create_dir_all(&folder).map_err(HostError::io(&folder))?;

        for (name, content) in &files {
            let relative = match VirtualPath::parse(name) {
                Ok(p) if !p.is_empty() => p,
                _ => {
                    warn!(name = %name, "skipping unsafe output path");
                    continue;
                }
            };
            fs_tree::write_under(&folder, &relative, content)
                .map_err(HostError::io(fs_tree::resolve_under(&folder, &relative)))?;
        }
        info!(folder = %folder.display(), files = files.len(), "saved generated files");
        Ok(())
    }

    /// Ask the presentation frame for the current project bytes.
    async fn fetch_project(&self) -> Result<Bytes> {
        let reply = self
            .inner
            .endpoint
            .call(|request_id| Message::GetScratchFile { request_id })
            .await?;
        match reply {
            Message::Response {
                body: Some(body), ..
            } => Ok(body),
            Message::Response { body: None, .. } => Err(HostError::EmptyProject),
            other => Err(stagefs_channel::ChannelError::UnexpectedReply {
                request_id: other.reply_to().unwrap_or_default(),
                kind: other.kind(),
            }
            .into()),
        }
    }

    /// Write the presentation frame's current project to the document path.
    pub async fn save(&self) -> Result<()> {
        let path = self.inner.document.lock().path().to_path_buf();
        self.save_as(&path).await
    }

    /// Write the presentation frame's current project to `path`.
    pub async fn save_as(&self, path: &Path) -> Result<()> {
        let data = self.fetch_project().await?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(HostError::io(parent))?;
        }
        fs::write(path, &data).map_err(HostError::io(path))?;
        self.inner.document.lock().saved(path, data);
        info!(path = %path.display(), "project saved");
        Ok(())
    }

    /// Discard unsaved changes by re-reading the document from disk.
    pub fn revert(&self) -> Result<()> {
        self.inner.document.lock().revert()
    }

    /// Save the current project to `destination` for later restore.
    pub async fn backup(&self, destination: &Path) -> Result<Backup> {
        self.save_as(destination).await?;
        Ok(Backup {
            path: destination.to_path_buf(),
        })
    }
}
