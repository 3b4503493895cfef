//! Readers, writers and their pairing.
//!
//! Every codec is a pure value: an `Arc`'d closure that can be cloned into
//! other codecs and shared across threads.
pub mod base;
pub mod containers;

use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::error::{DecodeErrors, EncodeError};
use crate::value::Value;

pub type ReadResult = Result<Value, DecodeErrors>;
pub type WriteResult = Result<Json, EncodeError>;

/// Decode half.
#[derive(Clone)]
pub struct Reader(Arc<dyn Fn(&Json) -> ReadResult + Send + Sync>);

/// Encode half.
#[derive(Clone)]
pub struct Writer(Arc<dyn Fn(&Value) -> WriteResult + Send + Sync>);

/// Both halves.
#[derive(Clone)]
pub struct Format {
    pub reader: Reader,
    pub writer: Writer,
}

/// What `derive` hands back, shaped by the requested `Direction`.
#[derive(Clone)]
pub enum Codec {
    Reader(Reader),
    Writer(Writer),
    Format(Format),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
    ReadWrite,
}

impl Reader {
    pub fn new(f: impl Fn(&Json) -> ReadResult + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn read(&self, json: &Json) -> ReadResult {
        (self.0)(json)
    }
}

impl Writer {
    pub fn new(f: impl Fn(&Value) -> WriteResult + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn write(&self, value: &Value) -> WriteResult {
        (self.0)(value)
    }
}

impl Format {
    pub fn new(reader: Reader, writer: Writer) -> Self {
        Self { reader, writer }
    }

    pub fn read(&self, json: &Json) -> ReadResult {
        self.reader.read(json)
    }

    pub fn write(&self, value: &Value) -> WriteResult {
        self.writer.write(value)
    }

    /// Parse JSON text, then decode it.
    pub fn read_str(&self, src: &str) -> Result<Value, ReadStrError> {
        let json: Json = serde_json::from_str(src)?;
        Ok(self.read(&json)?)
    }

    /// Encode, then print compact JSON text.
    pub fn write_string(&self, value: &Value) -> Result<String, EncodeError> {
        Ok(self.write(value)?.to_string())
    }
}

/// Failure of `Format::read_str`: either the text or its structure.
#[derive(Debug, thiserror::Error)]
pub enum ReadStrError {
    #[error("malformed JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error(transparent)]
    Decode(#[from] DecodeErrors),
}

impl Codec {
    pub fn direction(&self) -> Direction {
        match self {
            Self::Reader(_) => Direction::Read,
            Self::Writer(_) => Direction::Write,
            Self::Format(_) => Direction::ReadWrite,
        }
    }

    pub fn reader(&self) -> Option<&Reader> {
        match self {
            Self::Reader(r) => Some(r),
            Self::Format(f) => Some(&f.reader),
            Self::Writer(_) => None,
        }
    }

    pub fn writer(&self) -> Option<&Writer> {
        match self {
            Self::Writer(w) => Some(w),
            Self::Format(f) => Some(&f.writer),
            Self::Reader(_) => None,
        }
    }

    pub fn into_format(self) -> Option<Format> {
        match self {
            Self::Format(f) => Some(f),
            _ => None,
        }
    }

    /// Assemble from whichever halves exist. `None` when neither does.
    pub(crate) fn from_halves(reader: Option<Reader>, writer: Option<Writer>) -> Option<Self> {
        match (reader, writer) {
            (Some(reader), Some(writer)) => Some(Self::Format(Format { reader, writer })),
            (Some(reader), None) => Some(Self::Reader(reader)),
            (None, Some(writer)) => Some(Self::Writer(writer)),
            (None, None) => None,
        }
    }
}

impl Direction {
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn writes(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reader(..)")
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Writer(..)")
    }
}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Format(..)")
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Codec::{:?}", self.direction())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "read-write",
        })
    }
}
