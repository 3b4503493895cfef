//! Data-first type definitions.
//!
//! A schema file names every type up front:
//!
//! ```json
//! {
//!   "types": {
//!     "Shape":  {"kind": "sum", "variants": ["Circle", "Square"],
//!                "members": [{"name": "color", "type": "string"}],
//!                "discriminator": {"tag": "type"}},
//!     "Circle": {"kind": "product", "fields": [{"name": "radius", "type": "float"}]},
//!     "Square": {"kind": "product", "fields": [{"name": "side", "type": "float"}]}
//!   }
//! }
//! ```
//!
//! Field types use the `TypeRef` syntax. Names that are neither defined
//! here nor registered as codecs surface later as `MissingCodec`.
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::descriptor::{
    Discriminator, Param, ProductShape, Shape, SumShape, TypeDescriptor, TypeProvider,
};
use crate::path_de::{PathDeError, from_slice_with_path, from_str_with_path};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Deserialize)]
pub struct Schema {
    types: IndexMap<String, TypeDef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDef {
    Product {
        fields: Vec<Param>,
        /// Defaults to `fields`.
        #[serde(default)]
        deconstructor: Option<Vec<Param>>,
    },
    Sum {
        variants: Vec<String>,
        #[serde(default)]
        members: Vec<Param>,
        #[serde(default)]
        discriminator: Option<DiscriminatorDef>,
    },
    Leaf,
    Open,
}

/// `{"tag": "type"}` or `"structural"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscriminatorDef {
    Tag(String),
    Structural,
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed schema: {0}")]
    Parse(#[from] PathDeError),
    #[error("sum type `{sum}` lists undefined variant `{variant}`")]
    UnknownVariant { sum: String, variant: String },
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

impl Schema {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let schema: Self = from_slice_with_path(&bytes)?;
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for (name, def) in &self.types {
            let TypeDef::Sum { variants, .. } = def else { continue };
            if let Some(missing) = variants.iter().find(|v| !self.types.contains_key(*v)) {
                return Err(SchemaError::UnknownVariant {
                    sum: name.clone(),
                    variant: missing.clone(),
                });
            }
        }
        Ok(())
    }

    /// Type names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// A variant's own descriptor. Nested sums are not expanded; they fail
    /// variant validation as they are.
    fn describe_variant(&self, name: &str) -> Option<TypeDescriptor> {
        match self.types.get(name)? {
            TypeDef::Sum { .. } => Some(TypeDescriptor::sum(name, Vec::new())),
            _ => self.describe(name),
        }
    }
}

impl FromStr for Schema {
    type Err = SchemaError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let schema: Self = from_str_with_path(src)?;
        schema.validate()?;
        Ok(schema)
    }
}

impl TypeProvider for Schema {
    fn describe(&self, name: &str) -> Option<TypeDescriptor> {
        let shape = match self.types.get(name)? {
            TypeDef::Product { fields, deconstructor } => Shape::Product(ProductShape {
                constructor: Some(fields.clone()),
                deconstructor: Some(deconstructor.clone().unwrap_or_else(|| fields.clone())),
            }),
            TypeDef::Sum { variants, members, discriminator } => Shape::Sum(SumShape {
                variants: variants
                    .iter()
                    .filter_map(|v| self.describe_variant(v))
                    .collect(),
                members: members.clone(),
                discriminator: discriminator.clone().map(Discriminator::from),
            }),
            TypeDef::Leaf => Shape::Leaf,
            TypeDef::Open => Shape::Open,
        };
        Some(TypeDescriptor::new(name, shape))
    }
}

impl From<DiscriminatorDef> for Discriminator {
    fn from(def: DiscriminatorDef) -> Self {
        match def {
            DiscriminatorDef::Tag(key) => Discriminator::Tag { key },
            DiscriminatorDef::Structural => Discriminator::Structural,
        }
    }
}
