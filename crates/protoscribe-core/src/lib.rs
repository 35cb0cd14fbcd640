//! # protoscribe-core
//!
//! A library for generating Protocol Buffer schemas from reflective type descriptors.
//!
//! Given the types a program serializes, described as a graph of
//! [`TypeDescriptor`]s, this crate produces a proto2 `.proto` document whose
//! messages and enums match the in-memory representation.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`descriptor`]: The descriptor arena supplied by the caller
//! - [`classify`]: Mapping descriptors onto schema categories
//! - [`registry`]: Cycle-safe collection of reachable types
//! - [`schema`]: Schema text emission
//! - [`naming`]: Identifier sanitising and scalar type mapping
//! - [`manifest`]: Building descriptors from JSON manifests
//! - [`reflect`]: Building descriptors from prost-reflect pools
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use protoscribe_core::{DescriptorArena, Element, PrimitiveKind, SchemaGenerator};
//!
//! let mut arena = DescriptorArena::new();
//! let int = arena.primitive(PrimitiveKind::Int);
//! let point = arena.record("pkg.Point", [Element::new("x", int), Element::new("y", int)])?;
//!
//! let schema = SchemaGenerator::new(&arena).generate(&[point])?;
//! assert!(schema.text().contains("message Point {"));
//! assert!(schema.text().contains("required int32 x = 1;"));
//! # Ok::<(), protoscribe_core::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod classify;
pub mod descriptor;
pub mod error;
pub mod manifest;
pub mod naming;
pub mod reflect;
pub mod registry;
pub mod schema;

// Re-export primary types for convenience
pub use classify::{classify, Category};
pub use descriptor::{
    Annotation, DescriptorArena, DescriptorId, DescriptorKind, Element, IntegerEncoding,
    PrimitiveKind, TypeDescriptor,
};
pub use error::{Error, Result};
pub use manifest::{LoadedManifest, Manifest};
pub use registry::{collect, TypeRegistry};
pub use schema::{generate_schema, Diagnostic, GeneratorConfig, Schema, SchemaGenerator};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
