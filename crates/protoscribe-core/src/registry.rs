//! Reachable type collection.
//!
//! [`collect`] walks the descriptor graph depth-first from the roots and
//! records every message and enum it meets, keyed by qualified name. A type
//! already in the registry is never walked again, which is what terminates
//! self-referential and mutually-referential graphs.

use crate::classify::{classify_descriptor, sealed_variants, Category};
use crate::descriptor::{DescriptorArena, DescriptorId};
use crate::error::Result;
use indexmap::IndexMap;
use tracing::trace;

/// Ordered, deduplicated set of the custom types reachable from a set of roots
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, DescriptorId>,
}

impl TypeRegistry {
    /// Returns the number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if nothing was registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns true if a type with this qualified name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Returns the descriptor registered under `name`
    pub fn get(&self, name: &str) -> Option<DescriptorId> {
        self.types.get(name).copied()
    }

    /// Iterates in first-discovery order
    pub fn iter(&self) -> impl Iterator<Item = (&str, DescriptorId)> {
        self.types.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Returns the registered qualified names in first-discovery order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Registers `id` under `name`; returns false if the name was taken
    fn register(&mut self, name: &str, id: DescriptorId) -> bool {
        if self.types.contains_key(name) {
            return false;
        }
        trace!("Registering type {}", name);
        self.types.insert(name.to_string(), id);
        true
    }
}

/// Collects every message and enum reachable from `roots`
pub fn collect(arena: &DescriptorArena, roots: &[DescriptorId]) -> Result<TypeRegistry> {
    let mut registry = TypeRegistry::default();
    for root in roots {
        visit(arena, *root, &mut registry)?;
    }
    Ok(registry)
}

fn visit(arena: &DescriptorArena, id: DescriptorId, registry: &mut TypeRegistry) -> Result<()> {
    let descriptor = arena.get(id)?;
    match classify_descriptor(arena, descriptor)? {
        Category::Scalar | Category::ContextualMessage => {}
        Category::Message => {
            if registry.register(descriptor.name(), id) {
                for field in descriptor.elements() {
                    visit(arena, field.descriptor(), registry)?;
                }
            }
        }
        Category::Enum | Category::OpenMessage => {
            registry.register(descriptor.name(), id);
        }
        Category::Repeated => {
            // Shape checked by classification
            visit(arena, descriptor.elements()[0].descriptor(), registry)?;
        }
        Category::Map => {
            // Keys are scalars; validated when the field is emitted
            visit(arena, descriptor.elements()[1].descriptor(), registry)?;
        }
        Category::SealedMessage => {
            if registry.register(descriptor.name(), id) {
                for variant in sealed_variants(arena, descriptor)? {
                    visit(arena, variant, registry)?;
                }
            }
        }
    }
    Ok(())
}
