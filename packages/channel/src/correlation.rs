//! Request id allocation and pending-call bookkeeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

use crate::message::{Message, RequestId};

/// Maps outstanding request ids to the continuation awaiting the reply.
///
/// Every resolver fires at most once: `resolve` and `remove` both take the
/// entry out of the table.
#[derive(Debug)]
pub struct CorrelationTable {
    next_id: AtomicU64,
    pending: Mutex<HashMap<RequestId, oneshot::Sender<Message>>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a fresh id and store its resolver.
    pub fn register(&self) -> (RequestId, oneshot::Receiver<Message>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        trace!(request_id = id, "registered call");
        (id, rx)
    }

    /// Deliver a reply. Returns false if nothing was waiting for `id`.
    pub fn resolve(&self, id: RequestId, reply: Message) -> bool {
        let Some(tx) = self.pending.lock().remove(&id) else {
            return false;
        };
        // The caller may have given up between lookup and send.
        tx.send(reply).is_ok()
    }

    /// Drop the resolver for `id` without settling it.
    pub fn remove(&self, id: RequestId) -> bool {
        self.pending.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}
