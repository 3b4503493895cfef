//! Human-readable record of how each derived type's fields were resolved.
use std::fmt;

use crate::descriptor::{ContainerKind, Discriminator, TypeRef};

/// Which path the resolver took for one (possibly wrapped) field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Found in the registry.
    Direct(String),
    /// Derived on demand, then registered.
    Derived(String),
    /// Points back at a type still being derived.
    Lazy(String),
    /// Value-level optional (`null` ⇄ none).
    Optional(Box<Resolution>),
    Container(ContainerKind, Box<Resolution>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPlan {
    pub name: String,
    pub ty: TypeRef,
    /// Declared optional: absent/null reads as none, none is omitted on write.
    ///
    /// For `option<option<T>>` the inner none is written as `null`, which
    /// reads back as the outer none. The two levels collapse.
    pub omittable: bool,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanKind {
    Product,
    Sum {
        variants: Vec<String>,
        discriminator: Option<Discriminator>,
    },
}

/// For a sum, `fields` are the shared fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePlan {
    pub name: String,
    pub kind: PlanKind,
    pub fields: Vec<FieldPlan>,
}

impl Resolution {
    pub fn is_recursive(&self) -> bool {
        match self {
            Self::Lazy(_) => true,
            Self::Direct(_) | Self::Derived(_) => false,
            Self::Optional(inner) | Self::Container(_, inner) => inner.is_recursive(),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(name) => write!(f, "{name}"),
            Self::Derived(name) => write!(f, "derived {name}"),
            Self::Lazy(name) => write!(f, "lazy {name}"),
            Self::Optional(inner) => write!(f, "option<{inner}>"),
            Self::Container(kind, inner) => write!(f, "{kind}<{inner}>"),
        }
    }
}

impl fmt::Display for TypePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PlanKind::Product => writeln!(f, "{} (product)", self.name)?,
            PlanKind::Sum { variants, discriminator } => {
                let read = match discriminator {
                    None => "write-only".to_owned(),
                    Some(Discriminator::Structural) => "structural".to_owned(),
                    Some(Discriminator::Tag { key }) => format!("tag `{key}`"),
                };
                writeln!(f, "{} (sum of {}; {read})", self.name, variants.join(" | "))?;
            }
        }
        for field in &self.fields {
            let omit = if field.omittable { " [omittable]" } else { "" };
            writeln!(f, "  {}: {} => {}{omit}", field.name, field.ty, field.resolution)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_inside_containers_is_recursive() {
        let r = Resolution::Container(
            ContainerKind::List,
            Box::new(Resolution::Optional(Box::new(Resolution::Lazy("Node".into())))),
        );
        assert!(r.is_recursive());
        assert_eq!(r.to_string(), "list<option<lazy Node>>");
        assert!(!Resolution::Derived("Leaf".into()).is_recursive());
    }
}
