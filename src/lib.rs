//! Derive JSON readers and writers from the structure of a type.
//!
//! Describe a type (by hand, from a schema file, or through `Reflect`), hand
//! the descriptor to a derivation `Session`, and get back a `Codec` that maps
//! between `serde_json::Value` and the dynamic `Value` model. Products become
//! JSON objects keyed by field name; closed sums dispatch on the concrete
//! variant and merge in fields shared by every variant.
pub mod codec;
pub mod derive;
pub mod descriptor;
pub mod error;
pub mod reflect;
pub mod registry;
pub mod schema;
pub mod value;

pub mod cli;
pub mod jq_exec;
pub mod path_de;

pub use codec::{Codec, Direction, Format, Reader, Writer};
pub use derive::{Session, TypePlan, derive};
pub use descriptor::{
    DescriptorSet, Discriminator, Param, ProductShape, Shape, SumShape, TypeDescriptor,
    TypeProvider, TypeRef,
};
pub use error::{DecodeError, DecodeErrors, DerivationError, EncodeError, JsonPath};
pub use reflect::{Reflect, TypedFormat};
pub use registry::CodecRegistry;
pub use schema::Schema;
pub use value::{Record, Value};
