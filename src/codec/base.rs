//! Primitive codecs the registry is seeded with.
use serde_json::{Number, Value as Json};

use super::{Format, Reader, Writer};
use crate::error::{DecodeErrors, EncodeError};
use crate::value::Value;

/// `(canonical name, aliases)` for each primitive.
pub const BASE_TYPES: &[(&str, &[&str])] = &[
    ("text", &["string", "str"]),
    ("int", &["integer", "i64", "long"]),
    ("float", &["number", "f64", "double"]),
    ("bool", &["boolean"]),
];

/// Names that mean plain text keys in `map<K, V>`.
pub fn is_text(name: &str) -> bool {
    BASE_TYPES[0].0 == name || BASE_TYPES[0].1.contains(&name)
}

/// The primitive codec registered under `name`, aliases included.
pub fn base_format(name: &str) -> Option<Format> {
    let canonical = BASE_TYPES
        .iter()
        .find(|(c, aliases)| *c == name || aliases.contains(&name))
        .map(|(c, _)| *c)?;
    Some(match canonical {
        "text" => text(),
        "int" => int(),
        "float" => float(),
        _ => boolean(),
    })
}

pub fn text() -> Format {
    Format::new(
        Reader::new(|json| match json {
            Json::String(s) => Ok(Value::Text(s.clone())),
            other => Err(DecodeErrors::mismatch("string", other)),
        }),
        Writer::new(|value| match value {
            Value::Text(s) => Ok(Json::String(s.clone())),
            other => Err(EncodeError::mismatch("text", other)),
        }),
    )
}

pub fn int() -> Format {
    Format::new(
        Reader::new(|json| match json {
            Json::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Int(i)),
                None => Err(DecodeErrors::mismatch("integer", json)),
            },
            other => Err(DecodeErrors::mismatch("integer", other)),
        }),
        Writer::new(|value| match value {
            Value::Int(i) => Ok(Json::from(*i)),
            other => Err(EncodeError::mismatch("int", other)),
        }),
    )
}

pub fn float() -> Format {
    Format::new(
        Reader::new(|json| match json.as_f64() {
            Some(f) => Ok(Value::float(f)),
            None => Err(DecodeErrors::mismatch("number", json)),
        }),
        Writer::new(|value| {
            let f = match value {
                Value::Float(f) => f.0,
                other => return Err(EncodeError::mismatch("float", other)),
            };
            // JSON has no NaN or infinity
            Number::from_f64(f)
                .map(Json::Number)
                .ok_or_else(|| EncodeError::mismatch("finite float", value))
        }),
    )
}

pub fn boolean() -> Format {
    Format::new(
        Reader::new(|json| match json {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(DecodeErrors::mismatch("bool", other)),
        }),
        Writer::new(|value| match value {
            Value::Bool(b) => Ok(Json::Bool(*b)),
            other => Err(EncodeError::mismatch("bool", other)),
        }),
    )
}
