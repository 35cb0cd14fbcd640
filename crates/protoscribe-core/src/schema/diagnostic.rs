//! Non-fatal findings reported alongside a generated schema.

use std::fmt;

/// A warning raised while generating a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A field has a default value, which proto2 output cannot carry
    DefaultValue {
        /// Emitted message name
        message: String,
        /// Qualified name of the message
        serial_name: String,
        /// Emitted field name
        field: String,
    },

    /// Two registered types sanitise to the same emitted name
    NameCollision {
        /// The shared emitted name
        name: String,
        /// Qualified name of the type emitted first
        first: String,
        /// Qualified name of the later type
        second: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DefaultValue {
                message,
                serial_name,
                field,
            } => write!(
                f,
                "field '{}' of message '{}' (serial name '{}') has a default value; \
                 it is decoded when the value is missing but cannot be written to the schema",
                field, message, serial_name
            ),
            Diagnostic::NameCollision {
                name,
                first,
                second,
            } => write!(
                f,
                "'{}' and '{}' are both emitted as message or enum '{}'",
                first, second, name
            ),
        }
    }
}
