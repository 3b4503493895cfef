//! Codec registry: type name -> already-available codec halves.
//!
//! Entries are created once and never replaced within a session, so every
//! later lookup of the same type sees the same codec. The one exception is a
//! derivation that fails: everything it registered is rolled back.
use std::collections::HashMap;

use crate::codec::base::{self, BASE_TYPES};
use crate::codec::{Format, Reader, Writer};

#[derive(Debug, Clone, Default)]
pub struct Entry {
    pub reader: Option<Reader>,
    pub writer: Option<Writer>,
}

#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    entries: HashMap<String, Entry>,
    /// Names passed to `register`, in insertion order.
    journal: Vec<String>,
}

impl Entry {
    pub fn from_format(f: Format) -> Self {
        Self {
            reader: Some(f.reader),
            writer: Some(f.writer),
        }
    }
}

impl CodecRegistry {
    /// Empty registry. Most callers want `with_base_codecs`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with the primitive codecs and all their aliases.
    pub fn with_base_codecs() -> Self {
        let mut reg = Self::new();
        for (name, aliases) in BASE_TYPES {
            let Some(format) = base::base_format(name) else { continue };
            for n in std::iter::once(name).chain(aliases.iter()) {
                reg.entries.insert((*n).to_owned(), Entry::from_format(format.clone()));
            }
        }
        reg
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert a codec. Returns `false` (and keeps the old entry) if the name
    /// is already taken.
    pub fn register(&mut self, name: impl Into<String>, entry: Entry) -> bool {
        match self.entries.entry(name.into()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                self.journal.push(slot.key().clone());
                slot.insert(entry);
                true
            }
        }
    }

    pub fn register_format(&mut self, name: impl Into<String>, format: Format) -> bool {
        self.register(name, Entry::from_format(format))
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.journal.len()
    }

    /// Drop every entry registered after `checkpoint`.
    pub(crate) fn rollback(&mut self, checkpoint: usize) {
        for name in self.journal.drain(checkpoint..) {
            self.entries.remove(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seeded_with_primitives() {
        let reg = CodecRegistry::with_base_codecs();
        for n in ["text", "string", "int", "float", "bool"] {
            assert!(reg.contains(n), "{n}");
        }
    }

    #[test]
    fn entries_are_never_replaced() {
        let mut reg = CodecRegistry::with_base_codecs();
        assert!(!reg.register_format("int", base::text()));
        let reader = reg.get("int").and_then(|e| e.reader.clone()).unwrap();
        assert!(reader.read(&json!(5)).is_ok());
    }

    #[test]
    fn rollback_keeps_earlier_entries() {
        let mut reg = CodecRegistry::with_base_codecs();
        reg.register_format("Uuid", base::text());
        let mark = reg.checkpoint();
        reg.register_format("A", base::int());
        reg.register_format("B", base::int());
        reg.rollback(mark);
        assert!(reg.contains("Uuid") && reg.contains("int"));
        assert!(!reg.contains("A") && !reg.contains("B"));
        assert!(reg.register_format("A", base::text()));
    }
}
