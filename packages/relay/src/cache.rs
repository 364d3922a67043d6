use std::collections::HashMap;

use stagefs_core::{Content, VirtualPath};

/// Resolved content for one session, keyed by virtual path.
///
/// Entries are write-once: a second insert for the same path keeps the
/// first value. The only way to change an entry is to clear the cache.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: HashMap<VirtualPath, Content>,
}

impl SessionCache {
    pub fn get(&self, path: &VirtualPath) -> Option<&Content> {
        self.entries.get(path)
    }

    pub fn insert(&mut self, path: VirtualPath, content: Content) {
        self.entries.entry(path).or_insert(content);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagefs_core::ContentType;

    #[test]
    fn first_write_wins() {
        let mut cache = SessionCache::default();
        let path = VirtualPath::parse("/leopard/index.js").unwrap();
        cache.insert(path.clone(), Content::ok("a", ContentType::JAVASCRIPT));
        cache.insert(path.clone(), Content::ok("b", ContentType::JAVASCRIPT));
        assert_eq!(&cache.get(&path).unwrap().body[..], b"a");
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
