//! Container combinators: wrap an element codec into a codec for the
//! optional, list, set or map around it.
//!
//! Element failures never short-circuit; every bad element is reported with
//! its index (or key) in the path.
use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value as Json};

use super::{Format, Reader, Writer};
use crate::error::{DecodeErrors, EncodeError};
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// OPTIONAL
// ————————————————————————————————————————————————————————————————————————————

/// `null` reads as an empty optional.
pub fn optional_reader(inner: Reader) -> Reader {
    Reader::new(move |json| match json {
        Json::Null => Ok(Value::Optional(None)),
        other => inner.read(other).map(Value::some),
    })
}

/// An empty optional writes `null`. Field-level omission is the
/// composer's business, not this codec's.
pub fn optional_writer(inner: Writer) -> Writer {
    Writer::new(move |value| match value {
        Value::Optional(None) => Ok(Json::Null),
        Value::Optional(Some(v)) => inner.write(v),
        other => Err(EncodeError::mismatch("optional", other)),
    })
}

// ————————————————————————————————————————————————————————————————————————————
// LIST / SET
// ————————————————————————————————————————————————————————————————————————————

fn read_elements(inner: &Reader, json: &Json) -> Result<Vec<Value>, DecodeErrors> {
    let Json::Array(xs) = json else {
        return Err(DecodeErrors::mismatch("array", json));
    };
    let mut out = Vec::with_capacity(xs.len());
    let mut failures = Vec::new();
    for (ix, x) in xs.iter().enumerate() {
        match inner.read(x) {
            Ok(v) => out.push(v),
            Err(e) => failures.push(e.at_index(ix)),
        }
    }
    match DecodeErrors::collect(failures) {
        Some(errs) => Err(errs),
        None => Ok(out),
    }
}

fn write_elements<'a>(
    inner: &Writer,
    xs: impl Iterator<Item = &'a Value>,
) -> Result<Json, EncodeError> {
    xs.enumerate()
        .map(|(ix, x)| inner.write(x).map_err(|e| e.at_index(ix)))
        .collect::<Result<Vec<_>, _>>()
        .map(Json::Array)
}

pub fn list_reader(inner: Reader) -> Reader {
    Reader::new(move |json| read_elements(&inner, json).map(Value::List))
}

pub fn list_writer(inner: Writer) -> Writer {
    Writer::new(move |value| match value {
        Value::List(xs) => write_elements(&inner, xs.iter()),
        other => Err(EncodeError::mismatch("list", other)),
    })
}

/// Duplicates collapse.
pub fn set_reader(inner: Reader) -> Reader {
    Reader::new(move |json| {
        read_elements(&inner, json).map(|xs| Value::Set(xs.into_iter().collect::<BTreeSet<_>>()))
    })
}

pub fn set_writer(inner: Writer) -> Writer {
    Writer::new(move |value| match value {
        Value::Set(xs) => write_elements(&inner, xs.iter()),
        other => Err(EncodeError::mismatch("set", other)),
    })
}

// ————————————————————————————————————————————————————————————————————————————
// MAP
// ————————————————————————————————————————————————————————————————————————————

/// Text-keyed maps are JSON objects. With a key codec, entries are written as
/// an array of `[key, value]` pairs instead.
pub fn map_reader(key: Option<Reader>, value: Reader) -> Reader {
    Reader::new(move |json| {
        let mut out = BTreeMap::new();
        let mut failures = Vec::new();
        match (&key, json) {
            (None, Json::Object(obj)) => {
                for (k, v) in obj {
                    match value.read(v) {
                        Ok(v) => { out.insert(Value::Text(k.clone()), v); }
                        Err(e) => failures.push(e.at_key(k)),
                    }
                }
            }
            (Some(key), Json::Array(entries)) => {
                for (ix, entry) in entries.iter().enumerate() {
                    match read_entry(key, &value, entry) {
                        Ok((k, v)) => { out.insert(k, v); }
                        Err(e) => failures.push(e.at_index(ix)),
                    }
                }
            }
            (None, other) => return Err(DecodeErrors::mismatch("object", other)),
            (Some(_), other) => return Err(DecodeErrors::mismatch("array of [key, value] pairs", other)),
        }
        match DecodeErrors::collect(failures) {
            Some(errs) => Err(errs),
            None => Ok(Value::Map(out)),
        }
    })
}

fn read_entry(key: &Reader, value: &Reader, entry: &Json) -> Result<(Value, Value), DecodeErrors> {
    let pair = match entry {
        Json::Array(pair) if pair.len() == 2 => pair,
        other => return Err(DecodeErrors::mismatch("[key, value] pair", other)),
    };
    let k = key.read(&pair[0]).map_err(|e| e.at_index(0));
    let v = value.read(&pair[1]).map_err(|e| e.at_index(1));
    match (k, v) {
        (Ok(k), Ok(v)) => Ok((k, v)),
        (k, v) => Err(DecodeErrors::collect(k.err().into_iter().chain(v.err()))
            .unwrap_or_else(|| DecodeErrors::mismatch("[key, value] pair", entry))),
    }
}

pub fn map_writer(key: Option<Writer>, value: Writer) -> Writer {
    Writer::new(move |v| {
        let Value::Map(entries) = v else {
            return Err(EncodeError::mismatch("map", v));
        };
        match &key {
            None => {
                let mut obj = Map::new();
                for (k, x) in entries {
                    let Value::Text(k) = k else {
                        return Err(EncodeError::mismatch("text key", k));
                    };
                    obj.insert(k.clone(), value.write(x).map_err(|e| e.at_key(k))?);
                }
                Ok(Json::Object(obj))
            }
            Some(key) => entries
                .iter()
                .enumerate()
                .map(|(ix, (k, x))| {
                    let k = key.write(k).map_err(|e| e.at_index(0).at_index(ix))?;
                    let x = value.write(x).map_err(|e| e.at_index(1).at_index(ix))?;
                    Ok::<_, EncodeError>(Json::Array(vec![k, x]))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
        }
    })
}

// ————————————————————————————————————————————————————————————————————————————
// FORMAT CONVENIENCE
// ————————————————————————————————————————————————————————————————————————————

pub fn optional(inner: Format) -> Format {
    Format::new(optional_reader(inner.reader), optional_writer(inner.writer))
}

pub fn list(inner: Format) -> Format {
    Format::new(list_reader(inner.reader), list_writer(inner.writer))
}

pub fn set(inner: Format) -> Format {
    Format::new(set_reader(inner.reader), set_writer(inner.writer))
}

pub fn map(key: Option<Format>, value: Format) -> Format {
    let (kr, kw) = match key {
        Some(k) => (Some(k.reader), Some(k.writer)),
        None => (None, None),
    };
    Format::new(map_reader(kr, value.reader), map_writer(kw, value.writer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::base;
    use serde_json::json;

    #[test]
    fn list_reports_every_bad_element() {
        let codec = list(base::int());
        let errs = codec.read(&json!([1, "two", 3, false])).unwrap_err();
        let paths: Vec<_> = errs.pairs().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["$[1]", "$[3]"]);
    }

    #[test]
    fn list_preserves_order() {
        let codec = list(base::text());
        let v = codec.read(&json!(["b", "a", "c"])).unwrap();
        assert_eq!(codec.write(&v).unwrap(), json!(["b", "a", "c"]));
    }

    #[test]
    fn set_collapses_duplicates() {
        let codec = set(base::int());
        let v = codec.read(&json!([3, 1, 3])).unwrap();
        let Value::Set(xs) = &v else { panic!("expected set") };
        assert_eq!(xs.len(), 2);
    }

    #[test]
    fn optional_null_is_none() {
        let codec = optional(base::boolean());
        assert_eq!(codec.read(&json!(null)).unwrap(), Value::none());
        assert_eq!(codec.write(&Value::none()).unwrap(), json!(null));
        assert_eq!(codec.write(&Value::some(true)).unwrap(), json!(true));
    }

    #[test]
    fn text_keyed_map_is_an_object() {
        let codec = map(None, base::int());
        let v = codec.read(&json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(codec.write(&v).unwrap(), json!({"a": 1, "b": 2}));
        let errs = codec.read(&json!({"a": "x"})).unwrap_err();
        assert_eq!(errs.pairs()[0].0, "$.a");
    }

    #[test]
    fn keyed_map_is_an_array_of_pairs() {
        let codec = map(Some(base::int()), base::text());
        let json = json!([[1, "one"], [2, "two"]]);
        let v = codec.read(&json).unwrap();
        assert_eq!(codec.write(&v).unwrap(), json);
        let errs = codec.read(&json!([[1, 2], ["x"]])).unwrap_err();
        let paths: Vec<_> = errs.pairs().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["$[0][1]", "$[1]"]);
    }
}
