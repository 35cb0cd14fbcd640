//! JSON descriptor manifests.
//!
//! A manifest names the root types and defines every custom type by its
//! qualified name:
//!
//! ```json
//! {
//!   "roots": ["geo.Route"],
//!   "types": {
//!     "geo.Route": {
//!       "kind": "class",
//!       "fields": [
//!         { "name": "stops", "type": { "list": "geo.Point" } },
//!         { "name": "tags", "type": { "map": ["string", "int"] }, "optional": true },
//!         { "name": "id", "type": "long", "number": 7, "encoding": "fixed" }
//!       ]
//!     },
//!     "geo.Point": { "kind": "class", "fields": [{ "name": "x", "type": "double" }] }
//!   }
//! }
//! ```
//!
//! Type references are primitive names (`bool`, `byte`, `char`, `short`,
//! `int`, `long`, `float`, `double`, `string`), `bytes` for a byte blob, the
//! qualified name of a defined type, `{"list": ref}`, `{"map": [key, value]}`
//! or `{"contextual": "name"}`. Definitions may reference each other in any
//! order, including cyclically.

use crate::descriptor::{
    DescriptorArena, DescriptorId, DescriptorKind, Element, IntegerEncoding, PrimitiveKind,
};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Parsed manifest document
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Qualified names of the root types
    pub roots: Vec<String>,
    /// Type definitions by qualified name
    #[serde(default)]
    pub types: IndexMap<String, TypeDefinition>,
}

/// Definition of one custom type
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum TypeDefinition {
    /// A record
    Class {
        /// Fields in declaration order
        #[serde(default)]
        fields: Vec<FieldDefinition>,
    },
    /// A singleton record
    Object {
        /// Fields in declaration order
        #[serde(default)]
        fields: Vec<FieldDefinition>,
    },
    /// An enumeration
    Enum {
        /// Constant names in declaration order
        values: Vec<String>,
    },
    /// A closed polymorphic type
    Sealed {
        /// Qualified names of the concrete variants
        variants: Vec<String>,
    },
    /// An open polymorphic type
    Open,
    /// A runtime-supplied type
    Contextual,
}

/// Definition of one record field
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    /// Field name
    pub name: String,
    /// Field type
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Whether the field has a default value
    #[serde(default)]
    pub optional: bool,
    /// Explicit field number
    #[serde(default)]
    pub number: Option<u32>,
    /// Integer encoding hint
    #[serde(default)]
    pub encoding: Option<IntegerEncoding>,
}

/// Reference to a type from a field or collection
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeRef {
    /// Primitive, `bytes`, or qualified name of a defined type
    Name(String),
    /// A list
    List {
        /// Element type
        list: Box<TypeRef>,
    },
    /// A map
    Map {
        /// Key and value types
        map: Box<(TypeRef, TypeRef)>,
    },
    /// A contextual type not defined in the manifest
    Contextual {
        /// Qualified name
        contextual: String,
    },
}

/// Descriptors built from a manifest
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    /// Arena holding every descriptor
    pub arena: DescriptorArena,
    /// Root descriptors in manifest order
    pub roots: Vec<DescriptorId>,
}

impl Manifest {
    /// Parses a manifest from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a manifest file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_json(&json)
    }

    /// Builds the descriptor arena and resolves the roots
    pub fn load(&self) -> Result<LoadedManifest> {
        let mut arena = DescriptorArena::new();
        let mut ids: IndexMap<&str, DescriptorId> = IndexMap::new();

        // Declare first so references resolve regardless of order
        for (name, definition) in &self.types {
            let id = match definition {
                TypeDefinition::Class { .. } => arena.class(name.as_str()),
                TypeDefinition::Object { .. } => arena.object(name.as_str()),
                TypeDefinition::Enum { values } => arena.enumeration(name.as_str(), values),
                TypeDefinition::Sealed { .. } => {
                    arena.declare(name.as_str(), DescriptorKind::Sealed)
                }
                TypeDefinition::Open => arena.open(name.as_str()),
                TypeDefinition::Contextual => arena.contextual(name.as_str()),
            };
            ids.insert(name.as_str(), id);
        }

        for (name, definition) in &self.types {
            let id = ids[name.as_str()];
            match definition {
                TypeDefinition::Class { fields } | TypeDefinition::Object { fields } => {
                    for field in fields {
                        let ty = resolve(&mut arena, &ids, &field.ty, name)?;
                        let mut element =
                            Element::new(field.name.as_str(), ty).optional(field.optional);
                        if let Some(number) = field.number {
                            element = element.number(number);
                        }
                        if let Some(encoding) = field.encoding {
                            element = element.encoding(encoding);
                        }
                        arena.push_element(id, element)?;
                    }
                }
                TypeDefinition::Sealed { variants } => {
                    let variants = variants
                        .iter()
                        .map(|variant| lookup(&ids, variant, name))
                        .collect::<Result<Vec<_>>>()?;
                    arena.seal(id, &variants)?;
                }
                TypeDefinition::Enum { .. }
                | TypeDefinition::Open
                | TypeDefinition::Contextual => {}
            }
        }

        let roots = self
            .roots
            .iter()
            .map(|root| {
                ids.get(root.as_str())
                    .copied()
                    .ok_or_else(|| Error::UnknownRoot { name: root.clone() })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Loaded manifest with {} type(s) and {} root(s)",
            self.types.len(),
            roots.len()
        );
        Ok(LoadedManifest { arena, roots })
    }
}

fn resolve(
    arena: &mut DescriptorArena,
    ids: &IndexMap<&str, DescriptorId>,
    ty: &TypeRef,
    owner: &str,
) -> Result<DescriptorId> {
    match ty {
        TypeRef::Name(name) if name == "bytes" => Ok(arena.byte_array()),
        TypeRef::Name(name) => match PrimitiveKind::from_name(name) {
            Some(kind) => Ok(arena.primitive(kind)),
            None => lookup(ids, name, owner),
        },
        TypeRef::List { list } => {
            let element = resolve(arena, ids, list, owner)?;
            Ok(arena.list(element))
        }
        TypeRef::Map { map } => {
            let (key, value) = map.as_ref();
            let key = resolve(arena, ids, key, owner)?;
            let value = resolve(arena, ids, value, owner)?;
            Ok(arena.map(key, value))
        }
        TypeRef::Contextual { contextual } => Ok(arena.contextual(contextual.as_str())),
    }
}

fn lookup(ids: &IndexMap<&str, DescriptorId>, name: &str, owner: &str) -> Result<DescriptorId> {
    ids.get(name)
        .copied()
        .ok_or_else(|| Error::UnknownTypeReference {
            name: name.to_string(),
            referenced_by: owner.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, Category};

    const ROUTE: &str = r#"{
        "roots": ["geo.Route"],
        "types": {
            "geo.Route": {
                "kind": "class",
                "fields": [
                    { "name": "stops", "type": { "list": "geo.Point" } },
                    { "name": "tags", "type": { "map": ["string", "int"] }, "optional": true },
                    { "name": "id", "type": "long", "number": 7, "encoding": "fixed" },
                    { "name": "raw", "type": "bytes" },
                    { "name": "next", "type": "geo.Route" }
                ]
            },
            "geo.Point": { "kind": "class", "fields": [{ "name": "x", "type": "double" }] }
        }
    }"#;

    #[test]
    fn test_load_resolves_references() {
        let manifest = Manifest::from_json(ROUTE).unwrap();
        let loaded = manifest.load().unwrap();
        let arena = &loaded.arena;

        assert_eq!(loaded.roots.len(), 1);
        let route = arena.get(loaded.roots[0]).unwrap();
        assert_eq!(route.name(), "geo.Route");
        assert_eq!(route.elements().len(), 5);

        let stops = &route.elements()[0];
        assert_eq!(classify(arena, stops.descriptor()).unwrap(), Category::Repeated);

        let tags = &route.elements()[1];
        assert!(tags.is_optional());
        assert_eq!(classify(arena, tags.descriptor()).unwrap(), Category::Map);

        let id = &route.elements()[2];
        assert_eq!(id.number_override(), Some(7));
        assert_eq!(id.encoding_hint(), IntegerEncoding::Fixed);

        let raw = &route.elements()[3];
        assert_eq!(classify(arena, raw.descriptor()).unwrap(), Category::Scalar);

        assert_eq!(route.elements()[4].descriptor(), loaded.roots[0]);
    }

    #[test]
    fn test_sealed_and_enum_definitions() {
        let json = r#"{
            "roots": ["ui.Shape"],
            "types": {
                "ui.Shape": { "kind": "sealed", "variants": ["ui.Circle", "ui.Blank"] },
                "ui.Circle": { "kind": "class", "fields": [{ "name": "fill", "type": "ui.Color" }] },
                "ui.Blank": { "kind": "object" },
                "ui.Color": { "kind": "enum", "values": ["RED", "GREEN"] },
                "ui.Any": { "kind": "open" },
                "ui.Clock": { "kind": "contextual" }
            }
        }"#;
        let loaded = Manifest::from_json(json).unwrap().load().unwrap();
        let arena = &loaded.arena;

        assert_eq!(
            classify(arena, loaded.roots[0]).unwrap(),
            Category::SealedMessage
        );
        let color = arena
            .iter()
            .find(|(_, d)| d.name() == "ui.Color")
            .map(|(id, _)| id)
            .unwrap();
        assert_eq!(arena.get(color).unwrap().elements().len(), 2);
    }

    #[test]
    fn test_unknown_reference() {
        let json = r#"{
            "roots": ["a.B"],
            "types": { "a.B": { "kind": "class", "fields": [{ "name": "c", "type": "a.C" }] } }
        }"#;
        let err = Manifest::from_json(json).unwrap().load().unwrap_err();
        match err {
            Error::UnknownTypeReference { name, referenced_by } => {
                assert_eq!(name, "a.C");
                assert_eq!(referenced_by, "a.B");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_root() {
        let json = r#"{ "roots": ["missing.Type"], "types": {} }"#;
        let err = Manifest::from_json(json).unwrap().load().unwrap_err();
        assert!(matches!(err, Error::UnknownRoot { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = Manifest::from_json(r#"{ "roots": 3 }"#).unwrap_err();
        assert!(matches!(err, Error::ManifestParse(_)));
    }

    #[test]
    fn test_misspelled_definition_key() {
        let json = r#"{
            "roots": ["a.B"],
            "types": {
                "a.B": { "kind": "class", "feilds": [{ "name": "x", "type": "int" }] }
            }
        }"#;
        let err = Manifest::from_json(json).unwrap_err();
        assert!(matches!(err, Error::ManifestParse(_)));
    }

    #[test]
    fn test_contextual_reference() {
        let json = r#"{
            "roots": ["a.Event"],
            "types": {
                "a.Event": { "kind": "class", "fields": [{ "name": "at", "type": { "contextual": "time.Instant" } }] }
            }
        }"#;
        let loaded = Manifest::from_json(json).unwrap().load().unwrap();
        let event = loaded.arena.get(loaded.roots[0]).unwrap();
        assert_eq!(
            classify(&loaded.arena, event.elements()[0].descriptor()).unwrap(),
            Category::ContextualMessage
        );
    }
}
