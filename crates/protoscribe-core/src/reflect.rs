//! Descriptor import from prost-reflect.
//!
//! Converts messages and enums of a [`DescriptorPool`] into a
//! [`DescriptorArena`], so schemas can be regenerated from compiled
//! `FileDescriptorSet`s (for example the output of `protoc
//! --descriptor_set_out`).
//!
//! | protobuf | descriptor |
//! |---|---|
//! | message | class |
//! | enum | enum |
//! | repeated | list |
//! | map | map |
//! | `bytes` | byte blob |
//! | `int32`/`uint32` | int |
//! | `int64`/`uint64` | long |
//! | `sint32`/`sint64` | int/long, signed hint |
//! | `fixed*`/`sfixed*` | int/long, fixed hint |
//!
//! Field numbers become number annotations. Singular fields that are not
//! `required` decode to a default when absent and are marked optional.
//!
//! Generated enums are numbered by position, so an enum is only imported when
//! its values are exactly `0..N-1` in declaration order. A map field carries a
//! single encoding hint for key and value, so integer keys and values with
//! different encodings are rejected.

use crate::descriptor::{DescriptorArena, DescriptorId, Element, IntegerEncoding, PrimitiveKind};
use crate::error::{Error, Result};
use prost::Message;
use prost_reflect::{
    Cardinality, DescriptorPool, EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor,
};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Decodes a serialized `FileDescriptorSet` into a descriptor pool
pub fn load_descriptor_set(data: &[u8]) -> Result<DescriptorPool> {
    let set = prost_types::FileDescriptorSet::decode(data)?;
    DescriptorPool::from_file_descriptor_set(set)
        .map_err(|e| Error::descriptor_build(e.to_string()))
}

/// Imports the named messages or enums of `pool` as roots
pub fn import_types<S: AsRef<str>>(
    pool: &DescriptorPool,
    names: &[S],
) -> Result<(DescriptorArena, Vec<DescriptorId>)> {
    let mut importer = ReflectImporter::new();
    let mut roots = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        let root = if let Some(message) = pool.get_message_by_name(name) {
            importer.import_message(&message)?
        } else if let Some(enum_type) = pool.get_enum_by_name(name) {
            importer.import_enum(&enum_type)?
        } else {
            return Err(Error::UnknownRoot {
                name: name.to_string(),
            });
        };
        roots.push(root);
    }
    debug!("Imported {} root(s) from descriptor pool", roots.len());
    Ok((importer.finish(), roots))
}

/// Incremental converter from prost-reflect descriptors
#[derive(Debug, Default)]
pub struct ReflectImporter {
    arena: DescriptorArena,
    seen: HashMap<String, DescriptorId>,
}

impl ReflectImporter {
    /// Creates an importer with an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports a message and everything its fields reference
    pub fn import_message(&mut self, message: &MessageDescriptor) -> Result<DescriptorId> {
        if let Some(id) = self.seen.get(message.full_name()) {
            return Ok(*id);
        }
        trace!("Importing message {}", message.full_name());
        let id = self.arena.class(message.full_name());
        self.seen.insert(message.full_name().to_string(), id);

        for field in message.fields() {
            let element = self.import_field(&field)?;
            self.arena.push_element(id, element)?;
        }
        Ok(id)
    }

    /// Imports an enum whose values are numbered `0..N-1` in order
    pub fn import_enum(&mut self, enum_type: &EnumDescriptor) -> Result<DescriptorId> {
        if let Some(id) = self.seen.get(enum_type.full_name()) {
            return Ok(*id);
        }
        let mut constants = Vec::new();
        for (position, value) in enum_type.values().enumerate() {
            if i64::from(value.number()) != position as i64 {
                return Err(Error::descriptor_build(format!(
                    "enum '{}' value '{}' is numbered {}, expected {}",
                    enum_type.full_name(),
                    value.name(),
                    value.number(),
                    position
                )));
            }
            constants.push(value.name().to_string());
        }
        let id = self.arena.enumeration(enum_type.full_name(), constants);
        self.seen.insert(enum_type.full_name().to_string(), id);
        Ok(id)
    }

    /// Returns the populated arena
    pub fn finish(self) -> DescriptorArena {
        self.arena
    }

    fn import_field(&mut self, field: &FieldDescriptor) -> Result<Element> {
        let (descriptor, encoding) = if field.is_map() {
            let Kind::Message(entry) = field.kind() else {
                return Err(Error::internal(format!(
                    "map field '{}' has no entry message",
                    field.full_name()
                )));
            };
            let key_kind = entry.map_entry_key_field().kind();
            let value_kind = entry.map_entry_value_field().kind();
            let encoding = match (integer_encoding(&key_kind), integer_encoding(&value_kind)) {
                (Some(key), Some(value)) if key != value => {
                    return Err(Error::descriptor_build(format!(
                        "map field '{}' mixes {:?} keys with {:?} values",
                        field.full_name(),
                        key,
                        value
                    )));
                }
                (key, value) => key.or(value),
            };
            let key = self.import_kind(key_kind)?;
            let value = self.import_kind(value_kind)?;
            (self.arena.map(key, value), encoding)
        } else {
            let kind = field.kind();
            let encoding = integer_encoding(&kind);
            let element = self.import_kind(kind)?;
            if field.is_list() {
                (self.arena.list(element), encoding)
            } else {
                (element, encoding)
            }
        };

        let optional = !field.is_list()
            && !field.is_map()
            && !matches!(field.cardinality(), Cardinality::Required);
        let mut element = Element::new(field.name(), descriptor)
            .optional(optional)
            .number(field.number());
        if let Some(encoding) = encoding.filter(|e| *e != IntegerEncoding::Default) {
            element = element.encoding(encoding);
        }
        Ok(element)
    }

    fn import_kind(&mut self, kind: Kind) -> Result<DescriptorId> {
        let primitive = match kind {
            Kind::Message(message) => return self.import_message(&message),
            Kind::Enum(enum_type) => return self.import_enum(&enum_type),
            Kind::Bytes => return Ok(self.arena.byte_array()),
            Kind::Double => PrimitiveKind::Double,
            Kind::Float => PrimitiveKind::Float,
            Kind::Bool => PrimitiveKind::Bool,
            Kind::String => PrimitiveKind::String,
            // Unsignedness has no descriptor counterpart
            Kind::Int32 | Kind::Uint32 | Kind::Sint32 | Kind::Fixed32 | Kind::Sfixed32 => {
                PrimitiveKind::Int
            }
            Kind::Int64 | Kind::Uint64 | Kind::Sint64 | Kind::Fixed64 | Kind::Sfixed64 => {
                PrimitiveKind::Long
            }
        };
        Ok(self.arena.primitive(primitive))
    }
}

/// Wire encoding of an integer kind, `None` for every other kind
fn integer_encoding(kind: &Kind) -> Option<IntegerEncoding> {
    match kind {
        Kind::Int32 | Kind::Uint32 | Kind::Int64 | Kind::Uint64 => Some(IntegerEncoding::Default),
        Kind::Sint32 | Kind::Sint64 => Some(IntegerEncoding::Signed),
        Kind::Fixed32 | Kind::Sfixed32 | Kind::Fixed64 | Kind::Sfixed64 => {
            Some(IntegerEncoding::Fixed)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaGenerator;
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::{
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        FileDescriptorProto, FileDescriptorSet, MessageOptions,
    };

    fn field(
        name: &str,
        number: i32,
        label: Label,
        ty: Type,
        type_name: Option<&str>,
    ) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(label as i32),
            r#type: Some(ty as i32),
            type_name: type_name.map(str::to_string),
            ..Default::default()
        }
    }

    fn enum_value(name: &str, number: i32) -> EnumValueDescriptorProto {
        EnumValueDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            ..Default::default()
        }
    }

    fn file_set(
        messages: Vec<DescriptorProto>,
        enums: Vec<EnumDescriptorProto>,
    ) -> FileDescriptorSet {
        FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("inventory.proto".to_string()),
                package: Some("inventory".to_string()),
                syntax: Some("proto2".to_string()),
                message_type: messages,
                enum_type: enums,
                ..Default::default()
            }],
        }
    }

    fn tally(key: Type, value: Type) -> DescriptorProto {
        let entry = DescriptorProto {
            name: Some("CountsEntry".to_string()),
            field: vec![
                field("key", 1, Label::Optional, key, None),
                field("value", 2, Label::Optional, value, None),
            ],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        DescriptorProto {
            name: Some("Tally".to_string()),
            field: vec![field(
                "counts",
                1,
                Label::Repeated,
                Type::Message,
                Some(".inventory.Tally.CountsEntry"),
            )],
            nested_type: vec![entry],
            ..Default::default()
        }
    }

    fn descriptor_set() -> FileDescriptorSet {
        let status = EnumDescriptorProto {
            name: Some("Status".to_string()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("ACTIVE".to_string()),
                    number: Some(0),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("RETIRED".to_string()),
                    number: Some(1),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let node = DescriptorProto {
            name: Some("Node".to_string()),
            field: vec![
                field("id", 1, Label::Required, Type::Fixed64, None),
                field("delta", 4, Label::Optional, Type::Sint32, None),
                field("labels", 5, Label::Repeated, Type::String, None),
                field("parent", 6, Label::Optional, Type::Message, Some(".inventory.Node")),
                field("status", 7, Label::Required, Type::Enum, Some(".inventory.Status")),
                field("blob", 8, Label::Required, Type::Bytes, None),
            ],
            ..Default::default()
        };
        FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("inventory.proto".to_string()),
                package: Some("inventory".to_string()),
                syntax: Some("proto2".to_string()),
                message_type: vec![node],
                enum_type: vec![status],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_import_and_generate() {
        let pool = load_descriptor_set(&descriptor_set().encode_to_vec()).unwrap();
        let (arena, roots) = import_types(&pool, &["inventory.Node"]).unwrap();
        let schema = SchemaGenerator::new(&arena).generate(&roots).unwrap();
        let text = schema.text();

        assert!(text.contains("// serial name: inventory.Node\nmessage Node {\n"));
        assert!(text.contains("  required fixed64 id = 1;\n"));
        assert!(text.contains("  optional sint32 delta = 4;\n"));
        assert!(text.contains("  repeated string labels = 5;\n"));
        assert!(text.contains("  optional Node parent = 6;\n"));
        assert!(text.contains("  required Status status = 7;\n"));
        assert!(text.contains("  required bytes blob = 8;\n"));
        assert!(text.contains("enum Status {\n  ACTIVE = 0;\n  RETIRED = 1;\n}\n"));
        assert_eq!(schema.diagnostics().len(), 2);
    }

    #[test]
    fn test_import_enum_root() {
        let pool = load_descriptor_set(&descriptor_set().encode_to_vec()).unwrap();
        let (arena, roots) = import_types(&pool, &["inventory.Status"]).unwrap();
        assert_eq!(arena.get(roots[0]).unwrap().elements().len(), 2);
    }

    #[test]
    fn test_unknown_type() {
        let pool = load_descriptor_set(&descriptor_set().encode_to_vec()).unwrap();
        let err = import_types(&pool, &["inventory.Missing"]).unwrap_err();
        assert!(matches!(err, Error::UnknownRoot { .. }));
    }

    #[test]
    fn test_map_with_shared_encoding() {
        let set = file_set(vec![tally(Type::Sint32, Type::Sint64)], vec![]);
        let pool = load_descriptor_set(&set.encode_to_vec()).unwrap();
        let (arena, roots) = import_types(&pool, &["inventory.Tally"]).unwrap();
        let schema = SchemaGenerator::new(&arena).generate(&roots).unwrap();
        assert!(schema.text().contains("  map<sint32, sint64> counts = 1;\n"));

        let set = file_set(vec![tally(Type::String, Type::Fixed64)], vec![]);
        let pool = load_descriptor_set(&set.encode_to_vec()).unwrap();
        let (arena, roots) = import_types(&pool, &["inventory.Tally"]).unwrap();
        let schema = SchemaGenerator::new(&arena).generate(&roots).unwrap();
        assert!(schema.text().contains("  map<string, fixed64> counts = 1;\n"));
    }

    #[test]
    fn test_map_with_mixed_encodings() {
        let set = file_set(vec![tally(Type::Int32, Type::Sint64)], vec![]);
        let pool = load_descriptor_set(&set.encode_to_vec()).unwrap();
        let err = import_types(&pool, &["inventory.Tally"]).unwrap_err();
        assert!(matches!(err, Error::DescriptorBuild(_)));
    }

    #[test]
    fn test_enum_with_gaps_is_rejected() {
        let sparse = EnumDescriptorProto {
            name: Some("Sparse".to_string()),
            value: vec![enum_value("A", 0), enum_value("B", 5)],
            ..Default::default()
        };
        let pool = load_descriptor_set(&file_set(vec![], vec![sparse]).encode_to_vec()).unwrap();
        let err = import_types(&pool, &["inventory.Sparse"]).unwrap_err();
        assert!(matches!(err, Error::DescriptorBuild(msg) if msg.contains("'B'")));
    }

    #[test]
    fn test_garbage_input() {
        assert!(load_descriptor_set(&[0xff, 0xff, 0xff]).is_err());
    }
}
