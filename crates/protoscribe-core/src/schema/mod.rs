//! Schema emission module.
//!
//! This module renders the types reachable from a set of root descriptors as a
//! proto2 schema document.
//!
//! ## Architecture
//!
//! Generation is handled by [`SchemaGenerator`], which:
//!
//! 1. Validates the configured package name
//! 2. Collects the reachable messages and enums into a [`TypeRegistry`]
//! 3. Writes the header and one block per registered type
//!
//! Schemas cannot express default values, so every field with a default is
//! reported as a [`Diagnostic`] next to the schema text.

mod diagnostic;

use crate::classify::{classify_descriptor, sealed_variants, Category};
use crate::descriptor::{DescriptorArena, DescriptorId, Element, TypeDescriptor};
use crate::error::{Error, Result};
use crate::naming::{
    is_valid_package_name, named_type_name, short_name, single_line, validate_list_element,
    validate_map_key, validate_map_value,
};
use crate::registry::{collect, TypeRegistry};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt::{self, Write as FmtWrite};
use tracing::debug;

pub use diagnostic::Diagnostic;

/// Configuration for schema generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Package statement, omitted when `None`
    pub package_name: Option<String>,
    /// File options, written in insertion order
    pub options: IndexMap<String, String>,
    /// Indentation string (default: 2 spaces)
    pub indent_str: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            package_name: None,
            options: IndexMap::new(),
            indent_str: "  ".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the package name
    pub fn package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = Some(name.into());
        self
    }

    /// Adds a file option
    ///
    /// The value is written between quotes as given, without escaping.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Replaces all file options
    pub fn options(mut self, options: IndexMap<String, String>) -> Self {
        self.options = options;
        self
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }
}

/// A generated schema document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    text: String,
    diagnostics: Vec<Diagnostic>,
}

impl Schema {
    /// Returns the schema text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the warnings raised while generating
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consumes the schema, returning its text
    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Generates proto2 schemas from descriptors in an arena
#[derive(Debug)]
pub struct SchemaGenerator<'a> {
    arena: &'a DescriptorArena,
    config: GeneratorConfig,
}

impl<'a> SchemaGenerator<'a> {
    /// Creates a generator with the default config
    pub fn new(arena: &'a DescriptorArena) -> Self {
        Self {
            arena,
            config: GeneratorConfig::default(),
        }
    }

    /// Creates a new generator with custom config
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active config
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates the schema for everything reachable from `roots`
    pub fn generate(&self, roots: &[DescriptorId]) -> Result<Schema> {
        if let Some(package) = &self.config.package_name {
            if !is_valid_package_name(package) {
                return Err(Error::InvalidPackageName {
                    name: package.clone(),
                });
            }
        }

        let registry = collect(self.arena, roots)?;
        debug!(
            "Collected {} type(s) from {} root(s)",
            registry.len(),
            roots.len()
        );

        let mut writer = SchemaWriter::new(self.arena, &self.config);
        writer.write_schema(&registry)?;
        Ok(writer.finish())
    }
}

/// Generates a schema with the given package name and file options
pub fn generate_schema(
    arena: &DescriptorArena,
    roots: &[DescriptorId],
    package_name: Option<&str>,
    options: &IndexMap<String, String>,
) -> Result<Schema> {
    let mut config = GeneratorConfig::new().options(options.clone());
    if let Some(package) = package_name {
        config = config.package_name(package);
    }
    SchemaGenerator::new(arena).with_config(config).generate(roots)
}

/// Accumulates schema text for one generation call
struct SchemaWriter<'a> {
    arena: &'a DescriptorArena,
    config: &'a GeneratorConfig,
    output: String,
    indent_level: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> SchemaWriter<'a> {
    fn new(arena: &'a DescriptorArena, config: &'a GeneratorConfig) -> Self {
        Self {
            arena,
            config,
            output: String::new(),
            indent_level: 0,
            diagnostics: Vec::new(),
        }
    }

    fn finish(self) -> Schema {
        Schema {
            text: self.output,
            diagnostics: self.diagnostics,
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) -> fmt::Result {
        for _ in 0..self.indent_level {
            self.output.write_str(&self.config.indent_str)?;
        }
        Ok(())
    }

    fn writeln(&mut self, s: &str) -> fmt::Result {
        self.write_indent()?;
        writeln!(self.output, "{}", s)
    }

    fn write_schema(&mut self, registry: &TypeRegistry) -> Result<()> {
        let arena = self.arena;
        self.write_header()?;

        let mut emitted: HashMap<String, &str> = HashMap::new();
        for (serial_name, id) in registry.iter() {
            let descriptor = arena.get(id)?;
            let name = short_name(serial_name);
            if let Some(first) = emitted.get(&name) {
                debug!(
                    "Types '{}' and '{}' are both emitted as '{}'",
                    first, serial_name, name
                );
                self.diagnostics.push(Diagnostic::NameCollision {
                    name: name.clone(),
                    first: first.to_string(),
                    second: serial_name.to_string(),
                });
            } else {
                emitted.insert(name.clone(), serial_name);
            }

            writeln!(self.output)?;
            writeln!(self.output, "// serial name: {}", single_line(serial_name))?;
            match classify_descriptor(arena, descriptor)? {
                Category::Enum => self.write_enum(&name, descriptor)?,
                category if category.is_message() => {
                    self.write_message(&name, serial_name, descriptor, category)?
                }
                other => {
                    return Err(Error::internal(format!(
                        "registered type '{}' has category {:?}",
                        serial_name, other
                    )))
                }
            }
        }
        Ok(())
    }

    fn write_header(&mut self) -> fmt::Result {
        writeln!(self.output, "syntax = \"proto2\";")?;
        writeln!(self.output)?;

        if let Some(package) = &self.config.package_name {
            writeln!(self.output, "package {};", package)?;
        }

        for (name, value) in &self.config.options {
            writeln!(self.output, "option {} = \"{}\";", name, value)?;
        }
        Ok(())
    }

    fn write_enum(&mut self, name: &str, descriptor: &TypeDescriptor) -> fmt::Result {
        writeln!(self.output, "enum {} {{", name)?;
        self.indent();

        for (number, constant) in descriptor.elements().iter().enumerate() {
            self.write_indent()?;
            writeln!(self.output, "{} = {};", short_name(constant.name()), number)?;
        }

        self.dedent();
        self.writeln("}")
    }

    fn write_message(
        &mut self,
        name: &str,
        serial_name: &str,
        descriptor: &TypeDescriptor,
        category: Category,
    ) -> Result<()> {
        writeln!(self.output, "message {} {{", name)?;
        self.indent();

        let sealed = category == Category::SealedMessage;
        for (index, field) in descriptor.elements().iter().enumerate() {
            self.write_field(name, serial_name, descriptor, sealed, index, field)
                .map_err(|e| Error::field(short_name(field.name()), name, serial_name, e))?;
        }

        self.dedent();
        self.writeln("}")?;
        Ok(())
    }

    fn write_field(
        &mut self,
        message: &str,
        serial_name: &str,
        owner: &TypeDescriptor,
        sealed: bool,
        index: usize,
        field: &Element,
    ) -> Result<()> {
        let arena = self.arena;
        let field_name = short_name(field.name());
        let field_descriptor = arena.get(field.descriptor())?;
        let category = classify_descriptor(arena, field_descriptor)?;
        let number = field.number_override().unwrap_or(index as u32 + 1);
        let encoding = field.encoding_hint();

        if field.is_optional() {
            debug!(
                "Field '{}' of '{}' has a default value that the schema cannot express",
                field_name, serial_name
            );
            self.diagnostics.push(Diagnostic::DefaultValue {
                message: message.to_string(),
                serial_name: serial_name.to_string(),
                field: field_name.clone(),
            });
            self.writeln("// WARNING: a default value decoded when value is missing")?;
        }

        if category == Category::ContextualMessage {
            if sealed {
                self.writeln("// decoded as message with one of these types:")?;
                for variant in sealed_variants(arena, owner)? {
                    let variant = arena.get(variant)?;
                    self.writeln(&format!(
                        "//   message {}, serial name '{}'",
                        short_name(variant.name()),
                        single_line(variant.name())
                    ))?;
                }
            } else {
                self.writeln("// contextual message type")?;
            }
        }

        self.write_indent()?;
        match category {
            Category::Map => {
                let key = field_descriptor.elements()[0].descriptor();
                let value = field_descriptor.elements()[1].descriptor();
                validate_map_key(arena, key)?;
                validate_map_value(arena, value)?;
                writeln!(
                    self.output,
                    "map<{}, {}> {} = {};",
                    named_type_name(arena, key, encoding)?,
                    named_type_name(arena, value, encoding)?,
                    field_name,
                    number
                )?;
            }
            Category::Repeated => {
                let element = field_descriptor.elements()[0].descriptor();
                validate_list_element(arena, element)?;
                writeln!(
                    self.output,
                    "repeated {} {} = {};",
                    named_type_name(arena, element, encoding)?,
                    field_name,
                    number
                )?;
            }
            category if category.is_named_type() => {
                let label = if field.is_optional() {
                    "optional"
                } else {
                    "required"
                };
                writeln!(
                    self.output,
                    "{} {} {} = {};",
                    label,
                    named_type_name(arena, field.descriptor(), encoding)?,
                    field_name,
                    number
                )?;
            }
            other => {
                return Err(Error::internal(format!(
                    "field '{}' has unsupported category {:?}",
                    field_name, other
                )))
            }
        }
        Ok(())
    }
}
