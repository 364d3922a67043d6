//! Per-session cache and in-flight fetch bookkeeping.

use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::Mutex;
use stagefs_core::{Content, ContentType, SessionId, VirtualPath};
use tracing::{debug, trace};

use crate::cache::SessionCache;
use crate::error::RelayError;
use crate::pending::{PendingTable, SharedFetch};
use crate::source::FileSource;

/// Counters describing a session, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub generation: u64,
    pub cached: usize,
    pub pending: usize,
}

pub(crate) struct Session {
    id: SessionId,
    source: Arc<dyn FileSource>,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    /// Bumped on every reset. Fetches started under an older generation
    /// never write into the cache.
    generation: u64,
    cache: SessionCache,
    pending: PendingTable,
}

enum Plan {
    Cached(Content),
    Attach(SharedFetch),
    Lead(SharedFetch),
}

impl Session {
    pub fn new(id: SessionId, source: Arc<dyn FileSource>) -> Arc<Self> {
        Arc::new(Self {
            id,
            source,
            state: Mutex::new(SessionState::default()),
        })
    }

    /// Drop every cached entry and forget in-flight fetches.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.cache.clear();
        state.pending.clear();
        debug!(session = %self.id, generation = state.generation, "session reset");
    }

    pub fn stats(&self) -> SessionStats {
        let state = self.state.lock();
        SessionStats {
            generation: state.generation,
            cached: state.cache.len(),
            pending: state.pending.len(),
        }
    }

    /// Resolve `path` from the cache, an in-flight fetch, or the source.
    pub async fn resolve(
        self: &Arc<Self>,
        path: VirtualPath,
        request_url: &str,
        content_type: ContentType,
    ) -> Result<Content, RelayError> {
        let plan = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if let Some(content) = state.cache.get(&path) {
                Plan::Cached(content.clone())
            } else if let Some(fetch) = state.pending.get(&path) {
                Plan::Attach(fetch.clone())
            } else {
                let fetch = self.start_fetch(
                    path.clone(),
                    request_url.to_string(),
                    content_type,
                    state.generation,
                );
                state.pending.insert(path.clone(), fetch.clone());
                Plan::Lead(fetch)
            }
        };

        match plan {
            Plan::Cached(content) => {
                trace!(session = %self.id, %path, "cache hit");
                Ok(content)
            }
            Plan::Lead(fetch) => fetch.await,
            Plan::Attach(fetch) => {
                trace!(session = %self.id, %path, "attaching to in-flight fetch");
                let shared = fetch.await;
                // Prefer the cached entry; the shared result only matters if
                // the cache was reset while we waited.
                match self.state.lock().cache.get(&path) {
                    Some(content) => Ok(content.clone()),
                    None => shared,
                }
            }
        }
    }

    fn start_fetch(
        self: &Arc<Self>,
        path: VirtualPath,
        request_url: String,
        content_type: ContentType,
        generation: u64,
    ) -> SharedFetch {
        let session: Weak<Session> = Arc::downgrade(self);
        let source = Arc::clone(&self.source);

        async move {
            let result = source.fetch(&path).await.map(|body| match body {
                Some(body) => Content::ok(body, content_type),
                None => Content::not_found(&request_url),
            });
            if let Some(session) = session.upgrade() {
                session.settle(&path, generation, &result);
            }
            result
        }
        .boxed()
        .shared()
    }

    fn settle(&self, path: &VirtualPath, generation: u64, result: &Result<Content, RelayError>) {
        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(session = %self.id, %path, "discarding fetch from a previous generation");
            return;
        }
        state.pending.remove(path);
        if let Ok(content) = result {
            state.cache.insert(path.clone(), content.clone());
        }
    }
}
