//! Binding ordinary Rust types to derived codecs.
//!
//! Rust has no runtime reflection, so a type opts in by describing itself
//! (`Reflect::descriptor`) and converting to and from the dynamic `Value`
//! model. `TypedFormat<T>` then derives the codec once and speaks `T`.
use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde_json::Value as Json;
use thiserror::Error;

use crate::codec::{Direction, Format};
use crate::derive::Session;
use crate::descriptor::{DescriptorSet, TypeDescriptor};
use crate::error::{DecodeErrors, DerivationError, EncodeError};
use crate::registry::CodecRegistry;
use crate::value::{Record, Value};

// ————————————————————————————————————————————————————————————————————————————
// TRAITS
// ————————————————————————————————————————————————————————————————————————————

/// Conversion out of the dynamic model.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ReflectError>;
}

/// Conversion into the dynamic model.
pub trait IntoValue {
    fn to_value(&self) -> Value;
}

/// A Rust type that can describe its own structure.
pub trait Reflect: FromValue + IntoValue {
    fn descriptor() -> TypeDescriptor;

    /// Descriptors of the named types this one refers to, transitively.
    /// Base types need not be listed.
    fn dependencies() -> Vec<TypeDescriptor> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReflectError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: &'static str },
    #[error("record `{type_name}` has no field `{field}`")]
    MissingField { type_name: String, field: String },
    #[error("`{variant}` is not a variant of `{type_name}`")]
    UnknownVariant { type_name: String, variant: String },
    #[error("{value} does not fit in {target}")]
    OutOfRange { value: i64, target: &'static str },
}

/// Failure of `TypedFormat::from_json` / `from_str`.
#[derive(Debug, Error)]
pub enum TypedError {
    #[error("malformed JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error(transparent)]
    Decode(#[from] DecodeErrors),
    #[error(transparent)]
    Convert(#[from] ReflectError),
}

/// A read-write codec for `T`, derived once.
pub struct TypedFormat<T> {
    format: Format,
    _marker: PhantomData<fn() -> T>,
}

// ————————————————————————————————————————————————————————————————————————————
// TYPED FORMAT
// ————————————————————————————————————————————————————————————————————————————

impl<T: Reflect> TypedFormat<T> {
    pub fn new() -> Result<Self, DerivationError> {
        Self::with_registry(CodecRegistry::with_base_codecs())
    }

    /// Derive against a registry that may carry extra leaf codecs.
    pub fn with_registry(registry: CodecRegistry) -> Result<Self, DerivationError> {
        let root = T::descriptor();
        let mut types = DescriptorSet::new();
        for dep in T::dependencies() {
            types.insert(dep);
        }
        types.insert(root.clone());
        let format = Session::with_registry(&types, Direction::ReadWrite, registry)
            .derive(&root)?
            .into_format()
            .ok_or_else(|| DerivationError::UnknownType(root.name.clone()))?;
        Ok(Self {
            format,
            _marker: PhantomData,
        })
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    pub fn to_json(&self, value: &T) -> Result<Json, EncodeError> {
        self.format.write(&value.to_value())
    }

    pub fn from_json(&self, json: &Json) -> Result<T, TypedError> {
        let value = self.format.read(json)?;
        Ok(T::from_value(&value)?)
    }

    pub fn from_str(&self, src: &str) -> Result<T, TypedError> {
        let json: Json = serde_json::from_str(src)?;
        self.from_json(&json)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RECORD HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// The record inside `value`, whatever its type name.
pub fn expect_record(value: &Value) -> Result<&Record, ReflectError> {
    value.as_record().ok_or_else(|| mismatch("record", value))
}

/// Convert one named field of `record`.
pub fn field<T: FromValue>(record: &Record, name: &str) -> Result<T, ReflectError> {
    match record.get(name) {
        Some(v) => T::from_value(v),
        None => Err(ReflectError::MissingField {
            type_name: record.type_name.clone(),
            field: name.to_owned(),
        }),
    }
}

/// Like `field`, but a missing field reads as `None`.
pub fn optional_field<T: FromValue>(record: &Record, name: &str) -> Result<Option<T>, ReflectError> {
    match record.get(name) {
        Some(v) => Option::<T>::from_value(v),
        None => Ok(None),
    }
}

fn mismatch(expected: &str, value: &Value) -> ReflectError {
    ReflectError::TypeMismatch {
        expected: expected.to_owned(),
        found: value.kind(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// STANDARD IMPLS
// ————————————————————————————————————————————————————————————————————————————

macro_rules! impl_scalar {
    ($ty:ty, $name:expr, $get:ident) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, ReflectError> {
                value.$get().ok_or_else(|| mismatch($name, value))
            }
        }

        impl IntoValue for $ty {
            fn to_value(&self) -> Value {
                Value::from(*self)
            }
        }
    };
}

impl_scalar!(bool, "bool", as_bool);
impl_scalar!(i64, "int", as_int);
impl_scalar!(f64, "float", as_float);

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, ReflectError> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| ReflectError::OutOfRange {
            value: wide,
            target: "i32",
        })
    }
}

impl IntoValue for i32 {
    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ReflectError> {
        value
            .as_text()
            .map(str::to_owned)
            .ok_or_else(|| mismatch("text", value))
    }
}

impl IntoValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ReflectError> {
        match value.as_optional() {
            Some(None) => Ok(None),
            Some(Some(inner)) => T::from_value(inner).map(Some),
            None => Err(mismatch("optional", value)),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn to_value(&self) -> Value {
        Value::Optional(self.as_ref().map(|v| Box::new(v.to_value())))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, ReflectError> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => Err(mismatch("list", other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(IntoValue::to_value).collect())
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: &Value) -> Result<Self, ReflectError> {
        let Value::Map(entries) = value else {
            return Err(mismatch("map", value));
        };
        entries
            .iter()
            .map(|(k, v)| Ok((String::from_value(k)?, T::from_value(v)?)))
            .collect()
    }
}

impl<T: IntoValue> IntoValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (Value::Text(k.clone()), v.to_value()))
                .collect(),
        )
    }
}
