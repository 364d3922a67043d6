use std::collections::HashMap;

use futures::future::{BoxFuture, Shared};
use stagefs_core::{Content, VirtualPath};

use crate::error::RelayError;

/// An in-flight fetch that any number of requests can await.
pub type SharedFetch = Shared<BoxFuture<'static, Result<Content, RelayError>>>;

/// At most one in-flight fetch per virtual path.
#[derive(Default)]
pub struct PendingTable {
    fetches: HashMap<VirtualPath, SharedFetch>,
}

impl PendingTable {
    pub fn get(&self, path: &VirtualPath) -> Option<&SharedFetch> {
        self.fetches.get(path)
    }

    pub fn insert(&mut self, path: VirtualPath, fetch: SharedFetch) {
        self.fetches.insert(path, fetch);
    }

    pub fn remove(&mut self, path: &VirtualPath) -> Option<SharedFetch> {
        self.fetches.remove(path)
    }

    pub fn clear(&mut self) {
        self.fetches.clear();
    }

    pub fn len(&self) -> usize {
        self.fetches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetches.is_empty()
    }
}
