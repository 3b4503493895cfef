//! Derivation driver.
//!
//! A `Session` owns one registry and one direction. Each `derive` call
//! inspects a descriptor, resolves a codec for every field (deriving nested
//! types on demand and memoizing them), then composes the product or builds
//! the variant dispatcher. Nothing is returned unless the whole type
//! derived.
//!
//! Recursive types never re-enter derivation: while a type is being built it
//! sits on the in-progress stack with a `LazySlot`, and every reference to it
//! binds to that slot, which is filled once the codec is complete.
pub mod plan;

mod lazy;
mod product;
mod resolve;
mod variant;

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::codec::{Codec, Direction};
use crate::descriptor::{Discriminator, ProductShape, Shape, SumShape, TypeDescriptor, TypeProvider};
use crate::error::DerivationError;
use crate::registry::{CodecRegistry, Entry};

use lazy::LazySlot;
pub use plan::{FieldPlan, PlanKind, Resolution, TypePlan};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub struct Session<P> {
    provider: P,
    direction: Direction,
    registry: CodecRegistry,
    in_progress: Vec<Arc<LazySlot>>,
    plans: IndexMap<String, TypePlan>,
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

/// Derive one codec in a fresh session seeded with the base codecs.
pub fn derive<P: TypeProvider>(
    provider: P,
    descriptor: &TypeDescriptor,
    direction: Direction,
) -> Result<Codec, DerivationError> {
    Session::new(provider, direction).derive(descriptor)
}

impl<P: TypeProvider> Session<P> {
    pub fn new(provider: P, direction: Direction) -> Self {
        Self::with_registry(provider, direction, CodecRegistry::with_base_codecs())
    }

    /// Start from a caller-supplied registry, e.g. one with extra leaf codecs.
    pub fn with_registry(provider: P, direction: Direction, registry: CodecRegistry) -> Self {
        Self {
            provider,
            direction,
            registry,
            in_progress: Vec::new(),
            plans: IndexMap::new(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// Resolution plans of every type derived so far, in completion order.
    pub fn plans(&self) -> &IndexMap<String, TypePlan> {
        &self.plans
    }

    pub fn plan(&self, name: &str) -> Option<&TypePlan> {
        self.plans.get(name)
    }

    pub fn derive(&mut self, descriptor: &TypeDescriptor) -> Result<Codec, DerivationError> {
        let entry = self.derive_entry(descriptor)?;
        self.to_codec(&descriptor.name, entry)
    }

    /// Look the type up through the provider (or the registry) first.
    pub fn derive_named(&mut self, name: &str) -> Result<Codec, DerivationError> {
        if let Some(entry) = self.registry.get(name) {
            return self.to_codec(name, entry.clone());
        }
        let descriptor = self
            .provider
            .describe(name)
            .ok_or_else(|| DerivationError::UnknownType(name.to_owned()))?;
        self.derive(&descriptor)
    }

    fn to_codec(&self, name: &str, entry: Entry) -> Result<Codec, DerivationError> {
        let reader = entry.reader.filter(|_| self.direction.reads());
        let writer = entry.writer.filter(|_| self.direction.writes());
        if (reader.is_none() && self.direction.reads()) || (writer.is_none() && self.direction.writes()) {
            return Err(DerivationError::UnknownType(name.to_owned()));
        }
        Codec::from_halves(reader, writer).ok_or_else(|| DerivationError::UnknownType(name.to_owned()))
    }

    // ————————————————————————————————————————————————————————————————————————
    // DRIVER
    // ————————————————————————————————————————————————————————————————————————

    pub(crate) fn derive_entry(&mut self, desc: &TypeDescriptor) -> Result<Entry, DerivationError> {
        if let Some(entry) = self.registry.get(&desc.name) {
            if self.covers(entry) {
                return Ok(entry.clone());
            }
        }
        match &desc.shape {
            Shape::Leaf => Err(DerivationError::UnknownType(desc.name.clone())),
            Shape::Open => Err(DerivationError::UnsupportedShape(desc.name.clone())),
            Shape::Product(product) => {
                validate_product(&desc.name, product)?;
                self.in_scope(&desc.name, |s| s.build_product(&desc.name, product))
            }
            Shape::Sum(sum) => {
                validate_sum(&desc.name, sum, self.direction)?;
                self.in_scope(&desc.name, |s| s.build_sum(&desc.name, sum))
            }
        }
    }

    /// Run `build` with `name` marked in progress, then publish the result
    /// to the lazy slot and the registry.
    ///
    /// On failure every codec and plan registered inside the scope is
    /// dropped: some of them may hold this type's slot, which will never
    /// be filled.
    fn in_scope(
        &mut self,
        name: &str,
        build: impl FnOnce(&mut Self) -> Result<Entry, DerivationError>,
    ) -> Result<Entry, DerivationError> {
        let slot = Arc::new(LazySlot::new(name));
        let registered = self.registry.checkpoint();
        let planned = self.plans.len();
        self.in_progress.push(Arc::clone(&slot));
        let built = build(self);
        self.in_progress.pop();

        let entry = match built {
            Ok(entry) => entry,
            Err(e) => {
                self.registry.rollback(registered);
                self.plans.truncate(planned);
                debug!(type_name = %name, error = %e, "derivation failed, scope rolled back");
                return Err(e);
            }
        };
        slot.fill(&entry);
        self.registry.register(name, entry.clone());
        Ok(entry)
    }

    fn build_product(&mut self, name: &str, product: &ProductShape) -> Result<Entry, DerivationError> {
        let (Some(ctor), Some(dtor)) = (&product.constructor, &product.deconstructor) else {
            return Err(DerivationError::NoConstructorFound(name.to_owned()));
        };
        let units = self.resolve_fields(name, ctor)?;
        debug!(
            type_name = %name,
            fields = units.len(),
            recursive = units.iter().filter(|u| u.is_recursive()).count(),
            direction = %self.direction,
            "derived product"
        );

        let reader = self.direction.reads().then(|| {
            product::compose_reader(name, units.iter().filter_map(|u| u.read_half()).collect())
        });
        let writer = self.direction.writes().then(|| {
            let halves = units
                .iter()
                .zip(dtor)
                .filter_map(|(u, d)| u.write_half(&d.name))
                .collect();
            product::compose_writer(name, halves)
        });

        self.plans.insert(name.to_owned(), TypePlan {
            name: name.to_owned(),
            kind: PlanKind::Product,
            fields: units.iter().map(|u| u.plan()).collect(),
        });
        Ok(Entry { reader, writer })
    }

    fn build_sum(&mut self, name: &str, sum: &SumShape) -> Result<Entry, DerivationError> {
        let shared = sum.shared_fields();

        let mut variants = Vec::with_capacity(sum.variants.len());
        for v in &sum.variants {
            variants.push((v.name.clone(), self.derive_entry(v)?));
        }
        let shared_units = self.resolve_fields(name, &shared)?;
        debug!(
            type_name = %name,
            variants = variants.len(),
            shared = shared_units.len(),
            direction = %self.direction,
            "derived sum"
        );

        let reader = match (self.direction.reads(), &sum.discriminator) {
            (false, _) => None,
            (true, None) => return Err(DerivationError::NoDiscriminator(name.to_owned())),
            (true, Some(d)) => {
                let readers = variants
                    .iter()
                    .map(|(n, e)| e.reader.clone().map(|r| (n.clone(), r)))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| DerivationError::UnknownType(name.to_owned()))?;
                let shared = shared_units.iter().filter_map(|u| u.read_half()).collect();
                Some(variant::dispatch_reader(name, readers, shared, d.clone()))
            }
        };
        let writer = if self.direction.writes() {
            let writers = variants
                .iter()
                .map(|(n, e)| e.writer.clone().map(|w| (n.clone(), w)))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| DerivationError::UnknownType(name.to_owned()))?;
            let shared = shared_units
                .iter()
                .filter_map(|u| u.write_half(&u.name))
                .collect();
            Some(variant::dispatch_writer(name, writers, shared, sum.discriminator.clone()))
        } else {
            None
        };

        self.plans.insert(name.to_owned(), TypePlan {
            name: name.to_owned(),
            kind: PlanKind::Sum {
                variants: variants.iter().map(|(n, _)| n.clone()).collect(),
                discriminator: sum.discriminator.clone(),
            },
            fields: shared_units.iter().map(|u| u.plan()).collect(),
        });
        Ok(Entry { reader, writer })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATION
// ————————————————————————————————————————————————————————————————————————————

/// Constructor and deconstructor must both exist and agree on arity and
/// types, position by position.
fn validate_product(name: &str, product: &ProductShape) -> Result<(), DerivationError> {
    let Some(ctor) = &product.constructor else {
        return Err(DerivationError::NoConstructorFound(name.to_owned()));
    };
    let Some(dtor) = &product.deconstructor else {
        return Err(DerivationError::NoDeconstructorFound(name.to_owned()));
    };
    if ctor.len() != dtor.len() {
        return Err(DerivationError::StructuralMismatch {
            type_name: name.to_owned(),
            detail: format!("constructor takes {} values, deconstructor yields {}", ctor.len(), dtor.len()),
        });
    }
    if let Some((ix, (c, d))) = ctor.iter().zip(dtor).enumerate().find(|(_, (c, d))| c.ty != d.ty) {
        return Err(DerivationError::StructuralMismatch {
            type_name: name.to_owned(),
            detail: format!("position {ix}: `{}: {}` vs `{}: {}`", c.name, c.ty, d.name, d.ty),
        });
    }
    Ok(())
}

fn validate_sum(name: &str, sum: &SumShape, direction: Direction) -> Result<(), DerivationError> {
    if sum.variants.is_empty() {
        return Err(DerivationError::EmptyHierarchy(name.to_owned()));
    }
    for v in &sum.variants {
        let well_formed = match &v.shape {
            Shape::Product(p) => validate_product(&v.name, p).is_ok(),
            _ => false,
        };
        if !well_formed {
            return Err(DerivationError::NotAllVariantsProduct {
                type_name: name.to_owned(),
                variant: v.name.clone(),
            });
        }
    }
    if direction.reads() && sum.discriminator.is_none() {
        return Err(DerivationError::NoDiscriminator(name.to_owned()));
    }
    if let Some(Discriminator::Tag { key }) = &sum.discriminator {
        check_tag_key(name, sum, key)?;
    }
    Ok(())
}

/// The tag must not share its key with any field written next to it.
fn check_tag_key(name: &str, sum: &SumShape, key: &str) -> Result<(), DerivationError> {
    let collision = |owner: &str| DerivationError::TagCollision {
        type_name: name.to_owned(),
        owner: owner.to_owned(),
        key: key.to_owned(),
    };
    for v in &sum.variants {
        if let Shape::Product(ProductShape { constructor: Some(ctor), .. }) = &v.shape {
            if ctor.iter().any(|p| p.name == key) {
                return Err(collision(&v.name));
            }
        }
    }
    if sum.shared_fields().iter().any(|p| p.name == key) {
        return Err(collision(name));
    }
    Ok(())
}
