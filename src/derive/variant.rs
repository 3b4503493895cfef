//! Variant dispatch over a closed sum.
//!
//! Writing picks the variant by the record's type name, writes it, then
//! unions in the shared fields (variant keys win). Reading needs an explicit
//! discriminator: a tag key, or a structural "exactly one variant decodes".
//! The tag key never names a field; derivation rejects that.
use serde_json::{Map, Value as Json};

use super::product::{as_object, as_record, read_fields, write_fields};
use super::resolve::{FieldReader, FieldWriter};
use crate::codec::{Reader, Writer};
use crate::descriptor::Discriminator;
use crate::error::{DecodeError, DecodeErrors, DecodeReason, EncodeError, EncodeReason};
use crate::value::Value;

pub(crate) fn dispatch_writer(
    sum_name: &str,
    variants: Vec<(String, Writer)>,
    shared: Vec<FieldWriter>,
    discriminator: Option<Discriminator>,
) -> Writer {
    let sum_name = sum_name.to_owned();
    let tag_key = match discriminator {
        Some(Discriminator::Tag { key }) => Some(key),
        _ => None,
    };
    Writer::new(move |value| {
        let record = as_record(value)?;
        let Some((variant, writer)) = variants.iter().find(|(n, _)| *n == record.type_name) else {
            return Err(EncodeError::new(EncodeReason::UnknownVariant {
                sum: sum_name.clone(),
                found: record.type_name.clone(),
            }));
        };
        let own = match writer.write(value)? {
            Json::Object(obj) => obj,
            other if shared.is_empty() && tag_key.is_none() => return Ok(other),
            _ => return Err(EncodeError::mismatch("record", value)),
        };
        let shared_obj = write_fields(&record.type_name, &shared, record)?;

        let mut out = Map::new();
        if let Some(key) = &tag_key {
            out.insert(key.clone(), Json::String(variant.clone()));
        }
        // union: the variant's own keys win over shared ones
        for (k, v) in own {
            out.insert(k, v);
        }
        for (k, v) in shared_obj {
            if !out.contains_key(&k) {
                out.insert(k, v);
            }
        }
        Ok(Json::Object(out))
    })
}

pub(crate) fn dispatch_reader(
    sum_name: &str,
    variants: Vec<(String, Reader)>,
    shared: Vec<FieldReader>,
    discriminator: Discriminator,
) -> Reader {
    let sum_name = sum_name.to_owned();
    Reader::new(move |json| {
        let obj = as_object(json)?;
        let variant = match &discriminator {
            Discriminator::Tag { key } => read_tagged(key, &variants, json, obj),
            Discriminator::Structural => read_structural(&sum_name, &variants, json),
        };
        // shared fields are read even when the variant failed
        match (variant, read_fields(&shared, obj)) {
            (Ok(value), Ok(fields)) => Ok(with_shared(value, fields)),
            (Err(errs), Ok(_)) | (Ok(_), Err(errs)) => Err(errs),
            (Err(own), Err(shared)) => Err(own.merge(shared)),
        }
    })
}

fn read_tagged(
    key: &str,
    variants: &[(String, Reader)],
    json: &Json,
    obj: &Map<String, Json>,
) -> Result<Value, DecodeErrors> {
    let tag = match obj.get(key) {
        Some(Json::String(tag)) => tag,
        Some(other) => return Err(DecodeErrors::mismatch("variant name", other).at_key(key)),
        None => {
            return Err(DecodeErrors::single(DecodeError::new(DecodeReason::MissingTag(
                key.to_owned(),
            ))));
        }
    };
    match variants.iter().find(|(n, _)| n == tag) {
        Some((_, reader)) => reader.read(json),
        None => Err(DecodeErrors::single(DecodeError::new(DecodeReason::UnknownVariant(
            tag.clone(),
        )))
        .at_key(key)),
    }
}

fn read_structural(
    sum_name: &str,
    variants: &[(String, Reader)],
    json: &Json,
) -> Result<Value, DecodeErrors> {
    let mut hits: Vec<(&str, Value)> = variants
        .iter()
        .filter_map(|(name, reader)| reader.read(json).ok().map(|v| (name.as_str(), v)))
        .collect();
    match hits.len() {
        1 => Ok(hits.remove(0).1),
        0 => Err(DecodeErrors::single(DecodeError::new(DecodeReason::NoVariantMatched(
            sum_name.to_owned(),
        )))),
        _ => Err(DecodeErrors::single(DecodeError::new(DecodeReason::AmbiguousVariant(
            hits.into_iter().map(|(n, _)| n.to_owned()).collect(),
        )))),
    }
}

/// Append shared fields the variant did not already read.
fn with_shared(value: Value, shared: Vec<(String, Value)>) -> Value {
    let Value::Record(mut record) = value else {
        return value;
    };
    for (name, v) in shared {
        if !record.contains(&name) {
            record.fields.push((name, v));
        }
    }
    Value::Record(record)
}
