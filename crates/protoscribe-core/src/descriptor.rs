//! Reflective type descriptors.
//!
//! A [`TypeDescriptor`] describes the serialized shape of one type: its
//! qualified name, its [`DescriptorKind`] and an ordered list of child
//! [`Element`]s. Descriptors are stored in a [`DescriptorArena`] and refer to
//! their children by [`DescriptorId`], which lets a record reference itself or
//! a type that references it back.
//!
//! ## Shapes
//!
//! | kind | children |
//! |---|---|
//! | primitive | none |
//! | list | the element type |
//! | map | key, value |
//! | class / object | one per field |
//! | enum | one per constant |
//! | sealed | discriminator, variant wrapper (one child per variant) |
//! | open / contextual | none, or a synthetic discriminator/value pair |
//!
//! The arena constructors ([`DescriptorArena::list`], [`DescriptorArena::sealed`]
//! and friends) always produce these shapes; [`DescriptorArena::declare`] is the
//! escape hatch for building anything else.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Primitive scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// Boolean
    Bool,
    /// 8-bit integer
    Byte,
    /// UTF-16 code unit
    Char,
    /// 16-bit integer
    Short,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// UTF-8 string
    String,
}

impl PrimitiveKind {
    /// Every primitive kind, in declaration order
    pub const ALL: [PrimitiveKind; 9] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::String,
    ];

    /// Returns the serial name used for the interned descriptor of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::String => "string",
        }
    }

    /// Looks up a primitive kind by its serial name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Returns true for `float` and `double`
    pub fn is_floating_point(&self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a [`TypeDescriptor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// A primitive scalar
    Primitive(PrimitiveKind),
    /// An ordered collection
    List,
    /// A key/value collection
    Map,
    /// A record with named fields
    Class,
    /// A singleton record
    Object,
    /// An enumeration
    Enum,
    /// A closed set of concrete variants
    Sealed,
    /// An open set of runtime subtypes
    Open,
    /// A type whose serializer is supplied at runtime
    Contextual,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorKind::Primitive(kind) => write!(f, "primitive {}", kind),
            DescriptorKind::List => f.write_str("list"),
            DescriptorKind::Map => f.write_str("map"),
            DescriptorKind::Class => f.write_str("class"),
            DescriptorKind::Object => f.write_str("object"),
            DescriptorKind::Enum => f.write_str("enum"),
            DescriptorKind::Sealed => f.write_str("sealed"),
            DescriptorKind::Open => f.write_str("open"),
            DescriptorKind::Contextual => f.write_str("contextual"),
        }
    }
}

/// Handle to a descriptor stored in a [`DescriptorArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(usize);

impl DescriptorId {
    /// Returns the arena index of this descriptor
    pub fn index(self) -> usize {
        self.0
    }
}

/// Integer encoding hint attached to a field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegerEncoding {
    /// Plain varint (`int32`/`int64`)
    #[default]
    Default,
    /// ZigZag varint (`sint32`/`sint64`)
    Signed,
    /// Fixed width (`fixed32`/`fixed64`)
    Fixed,
}

/// Annotation attached to an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Annotation {
    /// Explicit field number
    Number(u32),
    /// Integer encoding hint
    Encoding(IntegerEncoding),
}

/// A child of a descriptor: a record field, an enum constant, a collection
/// element or a sealed variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    descriptor: DescriptorId,
    optional: bool,
    annotations: Vec<Annotation>,
}

impl Element {
    /// Creates a required element without annotations
    pub fn new(name: impl Into<String>, descriptor: DescriptorId) -> Self {
        Self {
            name: name.into(),
            descriptor,
            optional: false,
            annotations: Vec::new(),
        }
    }

    /// Marks the element as having a default value
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Adds a field number annotation
    pub fn number(self, number: u32) -> Self {
        self.annotation(Annotation::Number(number))
    }

    /// Adds an integer encoding annotation
    pub fn encoding(self, encoding: IntegerEncoding) -> Self {
        self.annotation(Annotation::Encoding(encoding))
    }

    /// Adds an arbitrary annotation
    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Returns the element name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the descriptor of the element's type
    pub fn descriptor(&self) -> DescriptorId {
        self.descriptor
    }

    /// Returns true if the element has a default value
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Returns the element annotations in attachment order
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Returns the explicit field number, if exactly one is attached
    ///
    /// Several number annotations cancel each other out and the caller falls
    /// back to positional numbering.
    pub fn number_override(&self) -> Option<u32> {
        single(self.annotations.iter().filter_map(|a| match a {
            Annotation::Number(n) => Some(*n),
            _ => None,
        }))
    }

    /// Returns the integer encoding hint, if exactly one is attached
    pub fn encoding_hint(&self) -> IntegerEncoding {
        single(self.annotations.iter().filter_map(|a| match a {
            Annotation::Encoding(e) => Some(*e),
            _ => None,
        }))
        .unwrap_or_default()
    }
}

fn single<T>(mut iter: impl Iterator<Item = T>) -> Option<T> {
    let first = iter.next()?;
    match iter.next() {
        Some(_) => None,
        None => Some(first),
    }
}

/// Read-only description of a serializable type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: String,
    kind: DescriptorKind,
    elements: Vec<Element>,
}

impl TypeDescriptor {
    /// Returns the qualified (dot-separated) name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the descriptor kind
    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    /// Returns the child elements in declaration order
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Returns the child element at `index`
    pub fn element(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }
}

/// Owner of every descriptor in a type graph
#[derive(Debug, Clone, Default)]
pub struct DescriptorArena {
    descriptors: Vec<TypeDescriptor>,
    primitives: HashMap<PrimitiveKind, DescriptorId>,
    byte_array: Option<DescriptorId>,
}

impl DescriptorArena {
    /// Creates an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of descriptors in the arena
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if the arena holds no descriptors
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns the descriptor behind `id`
    pub fn get(&self, id: DescriptorId) -> Result<&TypeDescriptor> {
        self.descriptors
            .get(id.0)
            .ok_or(Error::UnknownDescriptor { index: id.0 })
    }

    /// Iterates over all descriptors in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (DescriptorId, &TypeDescriptor)> {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (DescriptorId(i), d))
    }

    /// Adds a descriptor without children
    ///
    /// Children are attached afterwards with [`push_element`](Self::push_element).
    pub fn declare(&mut self, name: impl Into<String>, kind: DescriptorKind) -> DescriptorId {
        let id = DescriptorId(self.descriptors.len());
        self.descriptors.push(TypeDescriptor {
            name: name.into(),
            kind,
            elements: Vec::new(),
        });
        id
    }

    /// Appends a child element to `owner`
    pub fn push_element(&mut self, owner: DescriptorId, element: Element) -> Result<()> {
        if element.descriptor.0 >= self.descriptors.len() {
            return Err(Error::UnknownDescriptor {
                index: element.descriptor.0,
            });
        }
        let descriptor = self
            .descriptors
            .get_mut(owner.0)
            .ok_or(Error::UnknownDescriptor { index: owner.0 })?;
        descriptor.elements.push(element);
        Ok(())
    }

    /// Returns the interned descriptor for a primitive kind
    pub fn primitive(&mut self, kind: PrimitiveKind) -> DescriptorId {
        if let Some(id) = self.primitives.get(&kind) {
            return *id;
        }
        let id = self.declare(kind.as_str(), DescriptorKind::Primitive(kind));
        self.primitives.insert(kind, id);
        id
    }

    /// Returns the interned list-of-byte descriptor
    pub fn byte_array(&mut self) -> DescriptorId {
        if let Some(id) = self.byte_array {
            return id;
        }
        let byte = self.primitive(PrimitiveKind::Byte);
        let id = self.list(byte);
        self.byte_array = Some(id);
        id
    }

    /// Adds a list of `element`
    pub fn list(&mut self, element: DescriptorId) -> DescriptorId {
        let name = format!("list<{}>", self.name_of(element));
        let id = self.declare(name, DescriptorKind::List);
        self.descriptors[id.0]
            .elements
            .push(Element::new("element", element));
        id
    }

    /// Adds a map from `key` to `value`
    pub fn map(&mut self, key: DescriptorId, value: DescriptorId) -> DescriptorId {
        let name = format!("map<{}, {}>", self.name_of(key), self.name_of(value));
        let id = self.declare(name, DescriptorKind::Map);
        let elements = &mut self.descriptors[id.0].elements;
        elements.push(Element::new("key", key));
        elements.push(Element::new("value", value));
        id
    }

    /// Adds an empty record; fields are pushed with [`push_element`](Self::push_element)
    pub fn class(&mut self, name: impl Into<String>) -> DescriptorId {
        self.declare(name, DescriptorKind::Class)
    }

    /// Adds a record with the given fields
    pub fn record(
        &mut self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = Element>,
    ) -> Result<DescriptorId> {
        let id = self.class(name);
        for field in fields {
            self.push_element(id, field)?;
        }
        Ok(id)
    }

    /// Adds a singleton record
    pub fn object(&mut self, name: impl Into<String>) -> DescriptorId {
        self.declare(name, DescriptorKind::Object)
    }

    /// Adds an enum with the given constants
    pub fn enumeration<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        constants: impl IntoIterator<Item = S>,
    ) -> DescriptorId {
        let name = name.into();
        let id = self.declare(name.clone(), DescriptorKind::Enum);
        for constant in constants {
            let constant = constant.into();
            let entry = self.declare(format!("{}.{}", name, constant), DescriptorKind::Object);
            self.descriptors[id.0]
                .elements
                .push(Element::new(constant, entry));
        }
        id
    }

    /// Adds a contextual type
    pub fn contextual(&mut self, name: impl Into<String>) -> DescriptorId {
        self.declare(name, DescriptorKind::Contextual)
    }

    /// Adds an open polymorphic type
    ///
    /// The descriptor gets a `type` string discriminator and an opaque
    /// contextual `value`.
    pub fn open(&mut self, name: impl Into<String>) -> DescriptorId {
        let name = name.into();
        let string = self.primitive(PrimitiveKind::String);
        let value = self.contextual(format!("polymorphic<{}>", name));
        let id = self.declare(name, DescriptorKind::Open);
        let elements = &mut self.descriptors[id.0].elements;
        elements.push(Element::new("type", string));
        elements.push(Element::new("value", value));
        id
    }

    /// Adds a sealed polymorphic type over `variants`
    pub fn sealed(
        &mut self,
        name: impl Into<String>,
        variants: &[DescriptorId],
    ) -> Result<DescriptorId> {
        let id = self.declare(name, DescriptorKind::Sealed);
        self.seal(id, variants)?;
        Ok(id)
    }

    /// Attaches the discriminator and variant wrapper to a declared sealed type
    ///
    /// Used when variants refer back to the sealed type itself, so the sealed
    /// descriptor has to exist before its variants.
    pub fn seal(&mut self, id: DescriptorId, variants: &[DescriptorId]) -> Result<()> {
        let name = self.get(id)?.name.clone();
        if self.get(id)?.kind != DescriptorKind::Sealed {
            return Err(Error::unrecognized_kind(
                name,
                "only sealed descriptors can be given variants",
            ));
        }
        let string = self.primitive(PrimitiveKind::String);
        let wrapper = self.contextual(format!("sealed<{}>", name));
        for variant in variants {
            let variant_name = self.get(*variant)?.name.clone();
            self.push_element(wrapper, Element::new(variant_name, *variant))?;
        }
        self.push_element(id, Element::new("type", string))?;
        self.push_element(id, Element::new("value", wrapper))?;
        Ok(())
    }

    fn name_of(&self, id: DescriptorId) -> &str {
        self.descriptors
            .get(id.0)
            .map(|d| d.name.as_str())
            .unwrap_or("?")
    }
}
