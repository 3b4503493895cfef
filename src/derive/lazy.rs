//! Write-once slot standing in for a codec that is still being built.
//!
//! Self-references resolve against the slot instead of re-entering
//! derivation. The slot is filled once, after the enclosing type's codec is
//! complete; reads before that report `Unresolved` rather than panicking.
//!
//! A recursive codec holds its own slot through the lazy references inside
//! it, so it is never freed. Derived codecs live for the program anyway.
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::warn;

use crate::codec::{Reader, Writer};
use crate::error::{DecodeError, DecodeErrors, DecodeReason, EncodeError, EncodeReason};
use crate::registry::Entry;

pub(crate) struct LazySlot {
    type_name: String,
    reader: OnceCell<Reader>,
    writer: OnceCell<Writer>,
}

impl LazySlot {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            reader: OnceCell::new(),
            writer: OnceCell::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn reader(self: &Arc<Self>) -> Reader {
        let slot = Arc::clone(self);
        Reader::new(move |json| match slot.reader.get() {
            Some(reader) => reader.read(json),
            None => Err(DecodeErrors::single(DecodeError::new(DecodeReason::Unresolved(
                slot.type_name.clone(),
            )))),
        })
    }

    pub fn writer(self: &Arc<Self>) -> Writer {
        let slot = Arc::clone(self);
        Writer::new(move |value| match slot.writer.get() {
            Some(writer) => writer.write(value),
            None => Err(EncodeError::new(EncodeReason::Unresolved(slot.type_name.clone()))),
        })
    }

    /// Publish the finished codec. Only the first call has any effect.
    pub fn fill(&self, entry: &Entry) {
        if let Some(reader) = &entry.reader {
            if self.reader.set(reader.clone()).is_err() {
                warn!(type_name = %self.type_name, "lazy reader slot filled twice");
            }
        }
        if let Some(writer) = &entry.writer {
            if self.writer.set(writer.clone()).is_err() {
                warn!(type_name = %self.type_name, "lazy writer slot filled twice");
            }
        }
    }
}
