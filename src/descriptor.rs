//! Structural type descriptors: the input to derivation.
//!
//! A descriptor says what shape a type has (product, closed sum, or leaf)
//! and names the types of its fields. How it was obtained (hand-written,
//! loaded from a schema file, produced by a `Reflect` impl) does not matter
//! to the engine; it only talks to a `TypeProvider`.
pub mod type_ref;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use type_ref::{ContainerKind, TypeRef, TypeRefParseError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Product(ProductShape),
    Sum(SumShape),
    /// A base codec already exists under this name.
    Leaf,
    /// A hierarchy that is not closed. Never derivable.
    Open,
}

/// A constructor parameter, deconstructor slot, or readable member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductShape {
    /// Builds the value from its fields, in declared order.
    pub constructor: Option<Vec<Param>>,
    /// Extracts the fields back out, in the same order.
    pub deconstructor: Option<Vec<Param>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SumShape {
    pub variants: Vec<TypeDescriptor>,
    /// Publicly readable members declared on the sum type itself.
    pub members: Vec<Param>,
    pub discriminator: Option<Discriminator>,
}

/// How a sum type's JSON identifies its concrete variant on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discriminator {
    /// A reserved key holding the variant name, written first.
    Tag { key: String },
    /// Try every variant; exactly one must decode.
    Structural,
}

/// The reflection boundary: maps a type name to its structure.
pub trait TypeProvider {
    fn describe(&self, name: &str) -> Option<TypeDescriptor>;
}

/// A plain in-memory provider.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    types: HashMap<String, TypeDescriptor>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self { name: name.into(), shape }
    }

    /// A product whose constructor and deconstructor are the same field list.
    pub fn record(name: impl Into<String>, fields: Vec<Param>) -> Self {
        Self::new(name, Shape::Product(ProductShape::record(fields)))
    }

    pub fn sum(name: impl Into<String>, variants: Vec<TypeDescriptor>) -> Self {
        Self::new(name, Shape::Sum(SumShape {
            variants,
            members: Vec::new(),
            discriminator: None,
        }))
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Leaf)
    }

    /// Add readable members to a sum descriptor; no-op for other shapes.
    pub fn with_members(mut self, members: Vec<Param>) -> Self {
        if let Shape::Sum(sum) = &mut self.shape {
            sum.members = members;
        }
        self
    }

    /// Set the read strategy of a sum descriptor; no-op for other shapes.
    pub fn with_discriminator(mut self, d: Discriminator) -> Self {
        if let Shape::Sum(sum) = &mut self.shape {
            sum.discriminator = Some(d);
        }
        self
    }
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self { name: name.into(), ty }
    }

    /// Shorthand taking the textual type syntax. Panics on a malformed type,
    /// so keep it to literals.
    pub fn parse(name: impl Into<String>, ty: &str) -> Self {
        match ty.parse() {
            Ok(ty) => Self::new(name, ty),
            Err(e) => panic!("{e}"),
        }
    }
}

impl ProductShape {
    pub fn record(fields: Vec<Param>) -> Self {
        Self {
            constructor: Some(fields.clone()),
            deconstructor: Some(fields),
        }
    }
}

impl SumShape {
    /// Members declared on the sum minus every name any variant's
    /// constructor already takes.
    pub fn shared_fields(&self) -> Vec<Param> {
        let taken: std::collections::HashSet<&str> = self
            .variants
            .iter()
            .filter_map(|v| match &v.shape {
                Shape::Product(p) => p.constructor.as_ref(),
                _ => None,
            })
            .flatten()
            .map(|p| p.name.as_str())
            .collect();
        self.members
            .iter()
            .filter(|m| !taken.contains(m.name.as_str()))
            .cloned()
            .collect()
    }
}

impl Discriminator {
    pub fn tag(key: impl Into<String>) -> Self {
        Self::Tag { key: key.into() }
    }
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, desc: TypeDescriptor) -> &mut Self {
        self.types.insert(desc.name.clone(), desc);
        self
    }

    pub fn with(mut self, desc: TypeDescriptor) -> Self {
        self.insert(desc);
        self
    }
}

impl TypeProvider for DescriptorSet {
    fn describe(&self, name: &str) -> Option<TypeDescriptor> {
        self.types.get(name).cloned()
    }
}

impl<P: TypeProvider + ?Sized> TypeProvider for &P {
    fn describe(&self, name: &str) -> Option<TypeDescriptor> {
        (**self).describe(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> TypeDescriptor {
        TypeDescriptor::sum("Shape", vec![
            TypeDescriptor::record("Circle", vec![Param::parse("radius", "float")]),
            TypeDescriptor::record("Square", vec![
                Param::parse("side", "float"),
                Param::parse("color", "string"),
            ]),
        ])
        .with_members(vec![Param::parse("color", "string"), Param::parse("area", "float")])
    }

    #[test]
    fn shared_fields_exclude_constructor_params() {
        let Shape::Sum(sum) = shape().shape else { unreachable!() };
        let names: Vec<_> = sum.shared_fields().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["area"]);
    }

    #[test]
    fn discriminator_config_roundtrips() {
        let d: Discriminator = serde_json::from_str(r#"{"tag":{"key":"type"}}"#).unwrap();
        assert_eq!(d, Discriminator::tag("type"));
        let s: Discriminator = serde_json::from_str(r#""structural""#).unwrap();
        assert_eq!(s, Discriminator::Structural);
    }
}
