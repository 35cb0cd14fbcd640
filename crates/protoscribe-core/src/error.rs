//! Error types for the protoscribe-core library.
//!
//! Every fatal condition of a generation call is a variant of [`Error`].
//! Failures inside a message field are wrapped in [`Error::Field`], which keeps
//! the original error as its source.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for protoscribe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all protoscribe operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Descriptor kind or shape that matches no known category
    #[error("unrecognized descriptor kind for '{name}': {details}")]
    UnrecognizedKind {
        /// Qualified name of the descriptor
        name: String,
        /// What did not match
        details: String,
    },

    /// Map key that is not a non-floating-point scalar
    #[error("illegal map key type '{name}': map keys must be non-floating-point scalars")]
    IllegalMapKey {
        /// Qualified name of the key type
        name: String,
    },

    /// Map value that is itself a collection
    #[error("illegal map value type '{name}': map values cannot be lists or maps")]
    IllegalMapValue {
        /// Qualified name of the value type
        name: String,
    },

    /// List element that is itself a collection
    #[error("illegal list element type '{name}': list elements cannot be lists or maps")]
    IllegalListElement {
        /// Qualified name of the element type
        name: String,
    },

    /// A field of a message could not be generated
    #[error("failed to generate field '{field}' of message '{message}' (serial name '{serial_name}'): {source}")]
    Field {
        /// Emitted field name
        field: String,
        /// Emitted message name
        message: String,
        /// Qualified name of the message
        serial_name: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// Package name that is not a dotted sequence of identifiers
    #[error("invalid package name '{name}'")]
    InvalidPackageName {
        /// The rejected package name
        name: String,
    },

    /// Descriptor id that does not belong to the arena
    #[error("unknown descriptor id {index}")]
    UnknownDescriptor {
        /// Arena index of the missing descriptor
        index: usize,
    },

    /// Manifest type reference that names no defined type
    #[error("unknown type '{name}' referenced by '{referenced_by}'")]
    UnknownTypeReference {
        /// The unresolved name
        name: String,
        /// The type that referenced it
        referenced_by: String,
    },

    /// Root name that names no defined type
    #[error("unknown root type '{name}'")]
    UnknownRoot {
        /// The unresolved root name
        name: String,
    },

    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON manifest
    #[error("failed to parse manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),

    /// Failed to parse FileDescriptorSet
    #[error("failed to parse FileDescriptorSet: {0}")]
    DescriptorParse(#[from] prost::DecodeError),

    /// Failed to build descriptor pool with prost-reflect
    #[error("failed to build descriptor pool: {0}")]
    DescriptorBuild(String),

    /// Writing to the output buffer failed
    #[error("failed to format schema output")]
    Format(#[from] std::fmt::Error),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new unrecognized kind error
    pub fn unrecognized_kind(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::UnrecognizedKind {
            name: name.into(),
            details: details.into(),
        }
    }

    /// Wraps `source` with the field and message it occurred in
    pub fn field(
        field: impl Into<String>,
        message: impl Into<String>,
        serial_name: impl Into<String>,
        source: Error,
    ) -> Self {
        Self::Field {
            field: field.into(),
            message: message.into(),
            serial_name: serial_name.into(),
            source: Box::new(source),
        }
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new descriptor build error
    pub fn descriptor_build(msg: impl Into<String>) -> Self {
        Self::DescriptorBuild(msg.into())
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the innermost error, looking through field context
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::IllegalMapKey {
            name: "double".to_string(),
        };
        assert!(err.to_string().contains("illegal map key"));
        assert!(err.to_string().contains("double"));
    }

    #[test]
    fn test_field_context() {
        let inner = Error::IllegalListElement {
            name: "list<int>".to_string(),
        };
        let err = Error::field("matrix", "Grid", "geo.Grid", inner);
        let text = err.to_string();
        assert!(text.contains("'matrix'"));
        assert!(text.contains("'Grid'"));
        assert!(text.contains("geo.Grid"));
        assert!(matches!(err.root_cause(), Error::IllegalListElement { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }
}
