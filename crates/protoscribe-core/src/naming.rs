//! Identifier sanitising and scalar type mapping.

use crate::classify::{classify_descriptor, scalar_of, Category, Scalar};
use crate::descriptor::{DescriptorArena, DescriptorId, IntegerEncoding, PrimitiveKind};
use crate::error::{Error, Result};

/// Returns the last dot-separated segment of `qualified`, with every character
/// outside `[A-Za-z0-9_]` replaced by `_`
pub fn short_name(qualified: &str) -> String {
    let last = match qualified.rfind('.') {
        Some(idx) => &qualified[idx + 1..],
        None => qualified,
    };
    last.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Returns the IDL primitive for a scalar under the given encoding hint
pub fn scalar_type_name(scalar: Scalar, encoding: IntegerEncoding) -> &'static str {
    let Scalar::Primitive(kind) = scalar else {
        return "bytes";
    };
    match kind {
        PrimitiveKind::Bool => "bool",
        PrimitiveKind::Byte | PrimitiveKind::Char | PrimitiveKind::Short | PrimitiveKind::Int => {
            match encoding {
                IntegerEncoding::Default => "int32",
                IntegerEncoding::Signed => "sint32",
                IntegerEncoding::Fixed => "fixed32",
            }
        }
        PrimitiveKind::Long => match encoding {
            IntegerEncoding::Default => "int64",
            IntegerEncoding::Signed => "sint64",
            IntegerEncoding::Fixed => "fixed64",
        },
        PrimitiveKind::Float => "float",
        PrimitiveKind::Double => "double",
        PrimitiveKind::String => "string",
    }
}

/// Returns the type text of a descriptor used directly as a field type
pub fn named_type_name(
    arena: &DescriptorArena,
    id: DescriptorId,
    encoding: IntegerEncoding,
) -> Result<String> {
    let descriptor = arena.get(id)?;
    let category = classify_descriptor(arena, descriptor)?;
    match category {
        Category::Scalar => {
            let scalar = scalar_of(arena, descriptor)?.ok_or_else(|| {
                Error::internal(format!("'{}' is not a scalar", descriptor.name()))
            })?;
            Ok(scalar_type_name(scalar, encoding).to_string())
        }
        Category::ContextualMessage => Ok("bytes".to_string()),
        Category::Message | Category::Enum | Category::SealedMessage | Category::OpenMessage => {
            Ok(short_name(descriptor.name()))
        }
        Category::Repeated | Category::Map => Err(Error::internal(format!(
            "'{}' is a collection and has no type name",
            descriptor.name()
        ))),
    }
}

/// Checks that `key` is a scalar other than `float` or `double`
///
/// Byte blobs classify as scalars and pass.
pub fn validate_map_key(arena: &DescriptorArena, key: DescriptorId) -> Result<()> {
    let descriptor = arena.get(key)?;
    let legal = match scalar_of(arena, descriptor)? {
        Some(Scalar::Primitive(kind)) => !kind.is_floating_point(),
        Some(Scalar::Bytes) => true,
        None => false,
    };
    if legal {
        Ok(())
    } else {
        Err(Error::IllegalMapKey {
            name: descriptor.name().to_string(),
        })
    }
}

/// Checks that a map value is not itself a collection
pub fn validate_map_value(arena: &DescriptorArena, value: DescriptorId) -> Result<()> {
    let descriptor = arena.get(value)?;
    if classify_descriptor(arena, descriptor)?.is_collection() {
        return Err(Error::IllegalMapValue {
            name: descriptor.name().to_string(),
        });
    }
    Ok(())
}

/// Checks that a list element is not itself a collection
pub fn validate_list_element(arena: &DescriptorArena, element: DescriptorId) -> Result<()> {
    let descriptor = arena.get(element)?;
    if classify_descriptor(arena, descriptor)?.is_collection() {
        return Err(Error::IllegalListElement {
            name: descriptor.name().to_string(),
        });
    }
    Ok(())
}

/// Returns true if `name` is a dot-separated sequence of identifiers
pub fn is_valid_package_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Flattens line breaks so the text fits in a `//` comment
pub(crate) fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("pkg.Point"), "Point");
        assert_eq!(short_name("Point"), "Point");
        assert_eq!(short_name("a.b.Outer$Inner"), "Outer_Inner");
        assert_eq!(short_name("pkg.List<Int>"), "List_Int_");
        assert_eq!(short_name("pkg."), "");
    }

    #[test]
    fn test_short_name_is_deterministic() {
        let name = "com.example.Ünïcode-Name";
        assert_eq!(short_name(name), short_name(name));
        assert_eq!(short_name(name), "_n_code_Name");
    }

    #[test]
    fn test_scalar_table() {
        use IntegerEncoding::*;
        let int = Scalar::Primitive(PrimitiveKind::Int);
        let long = Scalar::Primitive(PrimitiveKind::Long);
        let short = Scalar::Primitive(PrimitiveKind::Short);

        assert_eq!(scalar_type_name(int, Default), "int32");
        assert_eq!(scalar_type_name(int, Signed), "sint32");
        assert_eq!(scalar_type_name(int, Fixed), "fixed32");
        assert_eq!(scalar_type_name(short, Signed), "sint32");
        assert_eq!(scalar_type_name(long, Default), "int64");
        assert_eq!(scalar_type_name(long, Signed), "sint64");
        assert_eq!(scalar_type_name(long, Fixed), "fixed64");
        assert_eq!(
            scalar_type_name(Scalar::Primitive(PrimitiveKind::Double), Fixed),
            "double"
        );
        assert_eq!(
            scalar_type_name(Scalar::Primitive(PrimitiveKind::Bool), Signed),
            "bool"
        );
        assert_eq!(scalar_type_name(Scalar::Bytes, Fixed), "bytes");
    }

    #[test]
    fn test_named_type_name() {
        let mut arena = DescriptorArena::new();
        let ctx = arena.contextual("pkg.Dynamic");
        let record = arena.class("pkg.Point");
        let char_ = arena.primitive(PrimitiveKind::Char);
        let ints = arena.list(char_);

        assert_eq!(
            named_type_name(&arena, ctx, IntegerEncoding::Default).unwrap(),
            "bytes"
        );
        assert_eq!(
            named_type_name(&arena, record, IntegerEncoding::Default).unwrap(),
            "Point"
        );
        assert_eq!(
            named_type_name(&arena, char_, IntegerEncoding::Fixed).unwrap(),
            "fixed32"
        );
        assert!(matches!(
            named_type_name(&arena, ints, IntegerEncoding::Default),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn test_map_key_validation() {
        let mut arena = DescriptorArena::new();
        let string = arena.primitive(PrimitiveKind::String);
        let float = arena.primitive(PrimitiveKind::Float);
        let double = arena.primitive(PrimitiveKind::Double);
        let blob = arena.byte_array();
        let record = arena.class("pkg.Key");
        let list = arena.list(string);

        assert!(validate_map_key(&arena, string).is_ok());
        assert!(validate_map_key(&arena, blob).is_ok());
        for bad in [float, double, record, list] {
            assert!(matches!(
                validate_map_key(&arena, bad),
                Err(Error::IllegalMapKey { .. })
            ));
        }
    }

    #[test]
    fn test_collection_validation() {
        let mut arena = DescriptorArena::new();
        let int = arena.primitive(PrimitiveKind::Int);
        let list = arena.list(int);
        let map = arena.map(int, int);
        let record = arena.class("pkg.Value");

        assert!(validate_map_value(&arena, record).is_ok());
        assert!(validate_map_value(&arena, int).is_ok());
        assert!(matches!(
            validate_map_value(&arena, list),
            Err(Error::IllegalMapValue { .. })
        ));
        assert!(matches!(
            validate_list_element(&arena, map),
            Err(Error::IllegalListElement { .. })
        ));
        assert!(validate_list_element(&arena, record).is_ok());
    }

    #[test]
    fn test_package_names() {
        assert!(is_valid_package_name("com.example.api"));
        assert!(is_valid_package_name("_private"));
        assert!(!is_valid_package_name(""));
        assert!(!is_valid_package_name("com..example"));
        assert!(!is_valid_package_name("1st.pkg"));
        assert!(!is_valid_package_name("my-pkg"));
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("a\nb\r\nc"), "a b c");
    }
}
