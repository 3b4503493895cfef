//! Error taxonomy.
//!
//! Derivation errors are fatal and abort `derive`. Decode errors are data:
//! every failure inside one object is collected, tagged with its JSON path,
//! and handed back together.
use std::fmt;

use thiserror::Error;

use crate::descriptor::TypeRef;

// ————————————————————————————————————————————————————————————————————————————
// DERIVATION
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    #[error("type `{0}` has no usable constructor")]
    NoConstructorFound(String),
    #[error("type `{0}` has no usable deconstructor")]
    NoDeconstructorFound(String),
    #[error("constructor and deconstructor of `{type_name}` disagree: {detail}")]
    StructuralMismatch { type_name: String, detail: String },
    #[error("sum type `{type_name}` has variant `{variant}` which is not a product type")]
    NotAllVariantsProduct { type_name: String, variant: String },
    #[error("sum type `{0}` has no variants")]
    EmptyHierarchy(String),
    #[error("no codec for {} field(s) of `{type_name}`: {}", missing.len(), list_missing(missing))]
    MissingCodec {
        type_name: String,
        missing: Vec<MissingField>,
    },
    #[error("type `{0}` is neither a product, a closed sum, nor a leaf")]
    UnsupportedShape(String),
    #[error("sum type `{0}` has no discriminator, so it cannot be read")]
    NoDiscriminator(String),
    /// A field of `owner` (a variant, or the sum itself for shared
    /// members) uses the tag key as its name.
    #[error("tag key `{key}` of sum type `{type_name}` is also a field of `{owner}`")]
    TagCollision {
        type_name: String,
        owner: String,
        key: String,
    },
    #[error("no descriptor or codec is known for type `{0}`")]
    UnknownType(String),
}

/// One field whose type has neither a registered nor a derivable codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    pub field: String,
    pub ty: TypeRef,
}

fn list_missing(missing: &[MissingField]) -> String {
    missing
        .iter()
        .map(|m| format!("`{}: {}`", m.field, m.ty))
        .collect::<Vec<_>>()
        .join(", ")
}

impl DerivationError {
    /// Field names reported by a `MissingCodec` error, empty otherwise.
    pub fn missing_fields(&self) -> Vec<&str> {
        match self {
            Self::MissingCodec { missing, .. } => missing.iter().map(|m| m.field.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// JSON PATHS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location inside a JSON document, rendered as `$.a.b[3]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath(Vec<PathSegment>);

impl JsonPath {
    pub fn root() -> Self {
        Self::default()
    }

    fn prepend(&mut self, seg: PathSegment) {
        self.0.insert(0, seg);
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for seg in &self.0 {
            match seg {
                PathSegment::Key(k) => write!(f, ".{k}")?,
                PathSegment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DECODING
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeReason {
    #[error("required field is missing")]
    FieldMissing,
    #[error("expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("no variant of `{0}` matched")]
    NoVariantMatched(String),
    #[error("value matches more than one variant: {}", .0.join(", "))]
    AmbiguousVariant(Vec<String>),
    #[error("unknown variant tag `{0}`")]
    UnknownVariant(String),
    #[error("missing variant tag `{0}`")]
    MissingTag(String),
    #[error("recursive reference to `{0}` was never resolved")]
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at {path}: {reason}")]
pub struct DecodeError {
    pub path: JsonPath,
    pub reason: DecodeReason,
}

/// Every failure found while decoding one value. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeErrors(Vec<DecodeError>);

impl DecodeError {
    pub fn new(reason: DecodeReason) -> Self {
        Self {
            path: JsonPath::root(),
            reason,
        }
    }

    pub fn mismatch(expected: impl Into<String>, actual: &serde_json::Value) -> Self {
        Self::new(DecodeReason::TypeMismatch {
            expected: expected.into(),
            actual: json_kind(actual).to_owned(),
        })
    }
}

impl DecodeErrors {
    pub fn single(err: DecodeError) -> Self {
        Self(vec![err])
    }

    pub fn mismatch(expected: impl Into<String>, actual: &serde_json::Value) -> Self {
        Self::single(DecodeError::mismatch(expected, actual))
    }

    /// Merge a batch of collected failures; `None` when nothing failed.
    pub fn collect(batches: impl IntoIterator<Item = DecodeErrors>) -> Option<Self> {
        let all: Vec<DecodeError> = batches.into_iter().flat_map(|b| b.0).collect();
        if all.is_empty() { None } else { Some(Self(all)) }
    }

    /// Prefix every error's path with an object key.
    pub fn at_key(mut self, key: &str) -> Self {
        for e in &mut self.0 {
            e.path.prepend(PathSegment::Key(key.to_owned()));
        }
        self
    }

    /// Prefix every error's path with an array index.
    pub fn at_index(mut self, ix: usize) -> Self {
        for e in &mut self.0 {
            e.path.prepend(PathSegment::Index(ix));
        }
        self
    }

    /// Append `other`'s errors after this one's.
    pub fn merge(mut self, other: DecodeErrors) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn errors(&self) -> &[DecodeError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecodeError> {
        self.0.iter()
    }

    /// `(path, reason)` pairs, the shape consumers usually report.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|e| (e.path.to_string(), e.reason.to_string()))
            .collect()
    }
}

impl IntoIterator for DecodeErrors {
    type Item = DecodeError;
    type IntoIter = std::vec::IntoIter<DecodeError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for DecodeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeErrors {}

// ————————————————————————————————————————————————————————————————————————————
// ENCODING
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeReason {
    #[error("expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("`{found}` is not a variant of `{sum}`")]
    UnknownVariant { sum: String, found: String },
    #[error("record `{type_name}` has no member `{member}`")]
    MissingMember { type_name: String, member: String },
    #[error("recursive reference to `{0}` was never resolved")]
    Unresolved(String),
}

/// Writing stops at the first value that does not fit its type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at {path}: {reason}")]
pub struct EncodeError {
    pub path: JsonPath,
    pub reason: EncodeReason,
}

impl EncodeError {
    pub fn new(reason: EncodeReason) -> Self {
        Self {
            path: JsonPath::root(),
            reason,
        }
    }

    pub fn mismatch(expected: impl Into<String>, actual: &crate::value::Value) -> Self {
        Self::new(EncodeReason::TypeMismatch {
            expected: expected.into(),
            actual: actual.kind().to_owned(),
        })
    }

    pub fn at_key(mut self, key: &str) -> Self {
        self.path.prepend(PathSegment::Key(key.to_owned()));
        self
    }

    pub fn at_index(mut self, ix: usize) -> Self {
        self.path.prepend(PathSegment::Index(ix));
        self
    }
}

pub(crate) fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
