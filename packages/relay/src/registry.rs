//! Frames known to the relay.

use std::collections::HashMap;

use stagefs_core::FrameId;
use url::Url;

/// What role a registered frame plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Owns a project and a session; answers `getFile` calls.
    Presentation,
    /// Renders a bundle; its requests are intercepted.
    Consumer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub id: FrameId,
    pub kind: FrameKind,
    pub url: Url,
}

/// Registered frames, keyed by id.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    frames: HashMap<FrameId, FrameRecord>,
}

impl FrameRegistry {
    /// Insert or replace a frame, returning the previous record.
    pub fn insert(&mut self, record: FrameRecord) -> Option<FrameRecord> {
        self.frames.insert(record.id, record)
    }

    pub fn remove(&mut self, id: FrameId) -> Option<FrameRecord> {
        self.frames.remove(&id)
    }

    pub fn get(&self, id: FrameId) -> Option<&FrameRecord> {
        self.frames.get(&id)
    }

    /// The presentation frame registered under `id`, if any.
    pub fn presentation(&self, id: FrameId) -> Option<&FrameRecord> {
        self.get(id).filter(|f| f.kind == FrameKind::Presentation)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: FrameKind) -> FrameRecord {
        FrameRecord {
            id: FrameId::new(),
            kind,
            url: Url::parse("http://localhost:8601/leopard/index.html").unwrap(),
        }
    }

    #[test]
    fn presentation_lookup_filters_kind() {
        let mut registry = FrameRegistry::default();
        let presentation = record(FrameKind::Presentation);
        let consumer = record(FrameKind::Consumer);
        registry.insert(presentation.clone());
        registry.insert(consumer.clone());

        assert_eq!(registry.presentation(presentation.id), Some(&presentation));
        assert_eq!(registry.presentation(consumer.id), None);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.remove(consumer.id), Some(consumer));
        assert_eq!(registry.len(), 1);
    }
}
