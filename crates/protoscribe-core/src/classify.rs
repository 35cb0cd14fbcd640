//! Descriptor classification.
//!
//! Maps a descriptor's kind and shape to the [`Category`] that decides how it
//! is collected and rendered.

use crate::descriptor::{
    DescriptorArena, DescriptorId, DescriptorKind, Element, PrimitiveKind, TypeDescriptor,
};
use crate::error::{Error, Result};

/// Schema category of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Primitive or byte blob
    Scalar,
    /// Class or object
    Message,
    /// Enumeration
    Enum,
    /// List of anything but bytes
    Repeated,
    /// Key/value collection
    Map,
    /// Closed polymorphic type
    SealedMessage,
    /// Open polymorphic type
    OpenMessage,
    /// Runtime-supplied type
    ContextualMessage,
}

impl Category {
    /// Returns true if the category can be written directly as a field type
    pub fn is_named_type(self) -> bool {
        !self.is_collection()
    }

    /// Returns true for repeated and map categories
    pub fn is_collection(self) -> bool {
        matches!(self, Category::Repeated | Category::Map)
    }

    /// Returns true if the category is rendered as a `message` block
    pub fn is_message(self) -> bool {
        matches!(
            self,
            Category::Message | Category::SealedMessage | Category::OpenMessage
        )
    }
}

/// Scalar payload of a descriptor classified as [`Category::Scalar`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    /// A primitive kind
    Primitive(PrimitiveKind),
    /// A list of bytes
    Bytes,
}

/// Classifies the descriptor behind `id`
pub fn classify(arena: &DescriptorArena, id: DescriptorId) -> Result<Category> {
    classify_descriptor(arena, arena.get(id)?)
}

/// Classifies a descriptor
pub fn classify_descriptor(
    arena: &DescriptorArena,
    descriptor: &TypeDescriptor,
) -> Result<Category> {
    match descriptor.kind() {
        DescriptorKind::Primitive(_) => Ok(Category::Scalar),
        // A list of bytes is a blob, checked before the repeated case
        DescriptorKind::List => {
            let element = expect_elements(descriptor, 1)?;
            if is_byte(arena, element[0].descriptor())? {
                Ok(Category::Scalar)
            } else {
                Ok(Category::Repeated)
            }
        }
        DescriptorKind::Class | DescriptorKind::Object => Ok(Category::Message),
        DescriptorKind::Enum => Ok(Category::Enum),
        DescriptorKind::Map => {
            expect_elements(descriptor, 2)?;
            Ok(Category::Map)
        }
        DescriptorKind::Sealed => {
            let elements = expect_elements(descriptor, 2)?;
            let wrapper = arena.get(elements[1].descriptor())?;
            if wrapper.kind() != DescriptorKind::Contextual {
                return Err(Error::unrecognized_kind(
                    descriptor.name(),
                    format!("sealed variant wrapper is a {} descriptor", wrapper.kind()),
                ));
            }
            Ok(Category::SealedMessage)
        }
        DescriptorKind::Open => Ok(Category::OpenMessage),
        DescriptorKind::Contextual => Ok(Category::ContextualMessage),
    }
}

/// Returns the scalar payload of a descriptor, or `None` if it is not a scalar
pub fn scalar_of(
    arena: &DescriptorArena,
    descriptor: &TypeDescriptor,
) -> Result<Option<Scalar>> {
    match descriptor.kind() {
        DescriptorKind::Primitive(kind) => Ok(Some(Scalar::Primitive(kind))),
        DescriptorKind::List if classify_descriptor(arena, descriptor)? == Category::Scalar => {
            Ok(Some(Scalar::Bytes))
        }
        _ => Ok(None),
    }
}

/// Returns the variant descriptors of a sealed type, in declaration order
pub fn sealed_variants(
    arena: &DescriptorArena,
    descriptor: &TypeDescriptor,
) -> Result<Vec<DescriptorId>> {
    let elements = expect_elements(descriptor, 2)?;
    let wrapper = arena.get(elements[1].descriptor())?;
    Ok(wrapper.elements().iter().map(|e| e.descriptor()).collect())
}

fn is_byte(arena: &DescriptorArena, id: DescriptorId) -> Result<bool> {
    Ok(arena.get(id)?.kind() == DescriptorKind::Primitive(PrimitiveKind::Byte))
}

fn expect_elements(descriptor: &TypeDescriptor, count: usize) -> Result<&[Element]> {
    let elements = descriptor.elements();
    if elements.len() != count {
        return Err(Error::unrecognized_kind(
            descriptor.name(),
            format!(
                "{} descriptor has {} children, expected {}",
                descriptor.kind(),
                elements.len(),
                count
            ),
        ));
    }
    Ok(elements)
}
