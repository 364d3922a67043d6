use std::collections::BTreeMap;

use bytes::Bytes;
use stagefs_core::ContentType;

/// Role of a file in a [`Bundle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// The self-contained top-level document.
    Document,
    /// A generated script module, relative URLs intact.
    Module,
    /// A costume or sound.
    Asset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub kind: EntryKind,
    pub content_type: ContentType,
    pub bytes: Bytes,
}

/// The transcoder's output, keyed by relative path (`./index.html`,
/// `./Cat/Cat.js`, `./Cat/costumes/costume1.svg`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    entries: BTreeMap<String, BundleEntry>,
}

impl Bundle {
    pub(crate) fn insert(
        &mut self,
        path: impl Into<String>,
        kind: EntryKind,
        content_type: ContentType,
        bytes: impl Into<Bytes>,
    ) {
        self.entries.insert(
            path.into(),
            BundleEntry {
                kind,
                content_type,
                bytes: bytes.into(),
            },
        );
    }

    pub fn get(&self, path: &str) -> Option<&BundleEntry> {
        self.entries.get(path)
    }

    /// The top-level document.
    pub fn document(&self) -> Option<&BundleEntry> {
        self.entries.values().find(|e| e.kind == EntryKind::Document)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BundleEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn modules(&self) -> impl Iterator<Item = (&str, &BundleEntry)> {
        self.iter().filter(|(_, e)| e.kind == EntryKind::Module)
    }

    pub fn assets(&self) -> impl Iterator<Item = (&str, &BundleEntry)> {
        self.iter().filter(|(_, e)| e.kind == EntryKind::Asset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten to path -> bytes, the shape stored by the editor host.
    pub fn into_files(self) -> BTreeMap<String, Bytes> {
        self.entries
            .into_iter()
            .map(|(path, entry)| (path, entry.bytes))
            .collect()
    }
}
