//! Field codec resolution.
//!
//! Wrappers are peeled outside-in: a field-level `option` first, then
//! value-level optionals and containers, and at the centre a named type that
//! is either in progress (lazy), registered (direct) or derivable (derived).
use serde_json::{Map, Value as Json};
use tracing::trace;

use super::Session;
use super::plan::{FieldPlan, Resolution};
use crate::codec::base;
use crate::codec::containers;
use crate::codec::{Reader, Writer};
use crate::descriptor::{ContainerKind, Param, Shape, TypeProvider, TypeRef};
use crate::error::{
    DecodeError, DecodeErrors, DecodeReason, DerivationError, EncodeError, EncodeReason,
    MissingField,
};
use crate::registry::Entry;
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Compiled codec for one field, bound to the JSON key equal to its name.
#[derive(Debug, Clone)]
pub(crate) struct FieldUnit {
    pub name: String,
    pub ty: TypeRef,
    pub omittable: bool,
    pub resolution: Resolution,
    reader: Option<Reader>,
    writer: Option<Writer>,
}

/// Read half of a field unit.
#[derive(Debug, Clone)]
pub(crate) struct FieldReader {
    pub name: String,
    omittable: bool,
    reader: Reader,
}

/// Write half of a field unit. `member` is the accessor it reads from.
#[derive(Debug, Clone)]
pub(crate) struct FieldWriter {
    pub name: String,
    pub member: String,
    omittable: bool,
    writer: Writer,
}

struct Resolved {
    reader: Option<Reader>,
    writer: Option<Writer>,
    resolution: Resolution,
}

enum Unresolvable {
    Missing,
    Fatal(DerivationError),
}

// ————————————————————————————————————————————————————————————————————————————
// RESOLUTION
// ————————————————————————————————————————————————————————————————————————————

impl<P: TypeProvider> Session<P> {
    /// Resolve every field before failing, so all missing codecs are
    /// reported together.
    pub(super) fn resolve_fields(
        &mut self,
        owner: &str,
        params: &[Param],
    ) -> Result<Vec<FieldUnit>, DerivationError> {
        let mut units = Vec::with_capacity(params.len());
        let mut missing = Vec::new();
        for param in params {
            match self.resolve_field(param) {
                Ok(unit) => units.push(unit),
                Err(Unresolvable::Missing) => missing.push(MissingField {
                    field: param.name.clone(),
                    ty: param.ty.clone(),
                }),
                Err(Unresolvable::Fatal(e)) => return Err(e),
            }
        }
        if !missing.is_empty() {
            return Err(DerivationError::MissingCodec {
                type_name: owner.to_owned(),
                missing,
            });
        }
        Ok(units)
    }

    fn resolve_field(&mut self, param: &Param) -> Result<FieldUnit, Unresolvable> {
        let (omittable, inner) = match &param.ty {
            TypeRef::Optional(inner) => (true, inner.as_ref()),
            ty => (false, ty),
        };
        let resolved = self.resolve_ref(inner)?;
        trace!(field = %param.name, ty = %param.ty, resolution = %resolved.resolution, "resolved field");
        Ok(FieldUnit {
            name: param.name.clone(),
            ty: param.ty.clone(),
            omittable,
            resolution: resolved.resolution,
            reader: resolved.reader,
            writer: resolved.writer,
        })
    }

    fn resolve_ref(&mut self, ty: &TypeRef) -> Result<Resolved, Unresolvable> {
        match ty {
            TypeRef::Plain(name) => self.resolve_named(name),
            TypeRef::Optional(inner) => {
                let r = self.resolve_ref(inner)?;
                Ok(Resolved {
                    reader: r.reader.map(containers::optional_reader),
                    writer: r.writer.map(containers::optional_writer),
                    resolution: Resolution::Optional(Box::new(r.resolution)),
                })
            }
            TypeRef::List(inner) => {
                let r = self.resolve_ref(inner)?;
                Ok(Resolved {
                    reader: r.reader.map(containers::list_reader),
                    writer: r.writer.map(containers::list_writer),
                    resolution: Resolution::Container(ContainerKind::List, Box::new(r.resolution)),
                })
            }
            TypeRef::Set(inner) => {
                let r = self.resolve_ref(inner)?;
                Ok(Resolved {
                    reader: r.reader.map(containers::set_reader),
                    writer: r.writer.map(containers::set_writer),
                    resolution: Resolution::Container(ContainerKind::Set, Box::new(r.resolution)),
                })
            }
            TypeRef::Map { key, value } => {
                let v = self.resolve_ref(value)?;
                let k = match key.as_deref() {
                    Some(TypeRef::Plain(name)) if base::is_text(name) => None,
                    Some(key) => Some(self.resolve_ref(key)?),
                    None => None,
                };
                let (kr, kw) = match k {
                    Some(k) => (k.reader, k.writer),
                    None => (None, None),
                };
                Ok(Resolved {
                    reader: v.reader.map(|vr| containers::map_reader(kr, vr)),
                    writer: v.writer.map(|vw| containers::map_writer(kw, vw)),
                    resolution: Resolution::Container(ContainerKind::Map, Box::new(v.resolution)),
                })
            }
        }
    }

    fn resolve_named(&mut self, name: &str) -> Result<Resolved, Unresolvable> {
        let direction = self.direction;

        if let Some(slot) = self.in_progress.iter().find(|s| s.type_name() == name).cloned() {
            return Ok(Resolved {
                reader: direction.reads().then(|| slot.reader()),
                writer: direction.writes().then(|| slot.writer()),
                resolution: Resolution::Lazy(name.to_owned()),
            });
        }

        if let Some(entry) = self.registry.get(name) {
            if !self.covers(entry) {
                return Err(Unresolvable::Missing);
            }
            return Ok(Resolved::from_entry(entry.clone(), Resolution::Direct(name.to_owned())));
        }

        let Some(desc) = self.provider.describe(name) else {
            return Err(Unresolvable::Missing);
        };
        if matches!(desc.shape, Shape::Leaf) {
            // a leaf with no registered codec
            return Err(Unresolvable::Missing);
        }
        let entry = self.derive_entry(&desc).map_err(Unresolvable::Fatal)?;
        Ok(Resolved::from_entry(entry, Resolution::Derived(name.to_owned())))
    }

    /// Whether an entry has every half this session needs.
    pub(super) fn covers(&self, entry: &Entry) -> bool {
        (!self.direction.reads() || entry.reader.is_some())
            && (!self.direction.writes() || entry.writer.is_some())
    }
}

impl Resolved {
    fn from_entry(entry: Entry, resolution: Resolution) -> Self {
        Self {
            reader: entry.reader,
            writer: entry.writer,
            resolution,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FIELD UNITS
// ————————————————————————————————————————————————————————————————————————————

impl FieldUnit {
    /// Bound to a lazy slot somewhere inside its wrappers.
    pub fn is_recursive(&self) -> bool {
        self.resolution.is_recursive()
    }

    pub fn read_half(&self) -> Option<FieldReader> {
        Some(FieldReader {
            name: self.name.clone(),
            omittable: self.omittable,
            reader: self.reader.clone()?,
        })
    }

    pub fn write_half(&self, member: &str) -> Option<FieldWriter> {
        Some(FieldWriter {
            name: self.name.clone(),
            member: member.to_owned(),
            omittable: self.omittable,
            writer: self.writer.clone()?,
        })
    }

    pub fn plan(&self) -> FieldPlan {
        FieldPlan {
            name: self.name.clone(),
            ty: self.ty.clone(),
            omittable: self.omittable,
            resolution: self.resolution.clone(),
        }
    }
}

impl FieldReader {
    /// Absent and `null` both read as none for an omittable field.
    pub fn read(&self, obj: &Map<String, Json>) -> Result<Value, DecodeErrors> {
        let read = match (obj.get(&self.name), self.omittable) {
            (None | Some(Json::Null), true) => return Ok(Value::none()),
            (Some(json), true) => self.reader.read(json).map(Value::some),
            (Some(json), false) => self.reader.read(json),
            (None, false) => Err(DecodeErrors::single(DecodeError::new(DecodeReason::FieldMissing))),
        };
        read.map_err(|e| e.at_key(&self.name))
    }
}

impl FieldWriter {
    /// `Ok(None)` means the key is left out of the object.
    pub fn write(&self, owner: &str, value: Option<&Value>) -> Result<Option<Json>, EncodeError> {
        let written = match (value, self.omittable) {
            (None | Some(Value::Optional(None)), true) => return Ok(None),
            (Some(Value::Optional(Some(v))), true) => self.writer.write(v),
            (Some(other), true) => Err(EncodeError::mismatch("optional", other)),
            (Some(v), false) => self.writer.write(v),
            (None, false) => Err(EncodeError::new(EncodeReason::MissingMember {
                type_name: owner.to_owned(),
                member: self.member.clone(),
            })),
        };
        written.map(Some).map_err(|e| e.at_key(&self.name))
    }
}
