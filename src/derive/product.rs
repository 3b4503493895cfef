//! Product composition: field units -> one whole-type codec.
//!
//! Reads never stop at the first bad field. Writes emit keys in declaration
//! order and leave out empty omittable fields.
use serde_json::{Map, Value as Json};

use super::resolve::{FieldReader, FieldWriter};
use crate::codec::{Reader, Writer};
use crate::error::{DecodeErrors, EncodeError};
use crate::value::{Record, Value};

pub(crate) fn compose_reader(type_name: &str, fields: Vec<FieldReader>) -> Reader {
    let type_name = type_name.to_owned();
    if let [only] = fields.as_slice() {
        return single_reader(type_name, only.clone());
    }
    Reader::new(move |json| {
        let obj = as_object(json)?;
        let fields = read_fields(&fields, obj)?;
        Ok(Value::Record(Record { type_name: type_name.clone(), fields }))
    })
}

pub(crate) fn compose_writer(type_name: &str, fields: Vec<FieldWriter>) -> Writer {
    let type_name = type_name.to_owned();
    if let [only] = fields.as_slice() {
        return single_writer(type_name, only.clone());
    }
    Writer::new(move |value| {
        let record = as_record(value)?;
        write_fields(&type_name, &fields, record).map(Json::Object)
    })
}

/// Parse each field from `obj`, in order, keeping every failure.
pub(crate) fn read_fields(
    fields: &[FieldReader],
    obj: &Map<String, Json>,
) -> Result<Vec<(String, Value)>, DecodeErrors> {
    let mut out = Vec::with_capacity(fields.len());
    let mut failures = Vec::new();
    for field in fields {
        match field.read(obj) {
            Ok(v) => out.push((field.name.clone(), v)),
            Err(e) => failures.push(e),
        }
    }
    match DecodeErrors::collect(failures) {
        Some(errs) => Err(errs),
        None => Ok(out),
    }
}

/// Deconstruct `record` through each field's accessor and write the object.
pub(crate) fn write_fields(
    type_name: &str,
    fields: &[FieldWriter],
    record: &Record,
) -> Result<Map<String, Json>, EncodeError> {
    let mut obj = Map::new();
    for field in fields {
        if let Some(json) = field.write(type_name, record.get(&field.member))? {
            obj.insert(field.name.clone(), json);
        }
    }
    Ok(obj)
}

pub(crate) fn as_object(json: &Json) -> Result<&Map<String, Json>, DecodeErrors> {
    match json {
        Json::Object(obj) => Ok(obj),
        other => Err(DecodeErrors::mismatch("object", other)),
    }
}

pub(crate) fn as_record(value: &Value) -> Result<&Record, EncodeError> {
    value.as_record().ok_or_else(|| EncodeError::mismatch("record", value))
}

// ————————————————————————————————————————————————————————————————————————————
// SINGLE FIELD
// ————————————————————————————————————————————————————————————————————————————

// One field maps straight through its unit; the JSON shape is the same
// `{"name": value}` the general path produces.

fn single_reader(type_name: String, field: FieldReader) -> Reader {
    Reader::new(move |json| {
        let value = field.read(as_object(json)?)?;
        Ok(Value::Record(Record {
            type_name: type_name.clone(),
            fields: vec![(field.name.clone(), value)],
        }))
    })
}

fn single_writer(type_name: String, field: FieldWriter) -> Writer {
    Writer::new(move |value| {
        let record = as_record(value)?;
        let mut obj = Map::new();
        if let Some(json) = field.write(&type_name, record.get(&field.member))? {
            obj.insert(field.name.clone(), json);
        }
        Ok(Json::Object(obj))
    })
}
