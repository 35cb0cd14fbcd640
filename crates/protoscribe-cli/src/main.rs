//! protoscribe - Generate Protocol Buffer schemas from type descriptors
//!
//! This tool reads type descriptors from a JSON manifest or a compiled
//! `FileDescriptorSet` and writes the proto2 schema for every type reachable
//! from the chosen roots.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use indexmap::IndexMap;
use protoscribe_core::{
    reflect, DescriptorArena, DescriptorId, GeneratorConfig, Manifest, SchemaGenerator,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Generate Protocol Buffer schemas from type descriptors
#[derive(Parser, Debug)]
#[command(name = "protoscribe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Fully-qualified message or enum to use as a root (descriptor sets only)
    #[arg(short, long = "message", value_name = "NAME")]
    messages: Vec<String>,

    /// Package statement for the generated schema
    #[arg(short, long, env = "PROTOSCRIBE_PACKAGE")]
    package: Option<String>,

    /// File option as KEY=VALUE (repeatable, written in order)
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    options: Vec<(String, String)>,

    /// Indentation used inside message and enum blocks
    #[arg(long, default_value = "  ")]
    indent: String,

    /// Output file for the generated schema (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    force: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a JSON descriptor manifest
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Path to a serialized FileDescriptorSet (protoc --descriptor_set_out)
    #[arg(short, long)]
    descriptor_set: Option<PathBuf>,
}

/// Parse a KEY=VALUE option
fn parse_option(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("option name is empty in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (arena, roots) = load_descriptors(&cli)?;
    if roots.is_empty() {
        bail!("No root types to generate a schema for");
    }

    let schema = SchemaGenerator::new(&arena)
        .with_config(generator_config(&cli))
        .generate(&roots)
        .context("Failed to generate schema")?;

    for diagnostic in schema.diagnostics() {
        warn!("{}", diagnostic);
    }

    match &cli.output {
        Some(path) => {
            write_schema_file(path, schema.text(), cli.force)?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(schema.text().as_bytes())
                .context("Failed to write schema to stdout")?;
        }
    }

    Ok(())
}

/// Build the descriptor arena and roots from the selected input
fn load_descriptors(cli: &Cli) -> Result<(DescriptorArena, Vec<DescriptorId>)> {
    if let Some(path) = &cli.input.manifest {
        if !cli.messages.is_empty() {
            bail!("--message is only valid with --descriptor-set; manifests list their own roots");
        }
        debug!("Reading manifest {}", path.display());
        let manifest = Manifest::from_path(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let loaded = manifest
            .load()
            .with_context(|| format!("Invalid manifest: {}", path.display()))?;
        Ok((loaded.arena, loaded.roots))
    } else if let Some(path) = &cli.input.descriptor_set {
        if cli.messages.is_empty() {
            bail!("--descriptor-set requires at least one --message root");
        }
        debug!("Reading descriptor set {}", path.display());
        let data = fs::read(path)
            .with_context(|| format!("Failed to read descriptor set: {}", path.display()))?;
        let pool = reflect::load_descriptor_set(&data)
            .with_context(|| format!("Invalid descriptor set: {}", path.display()))?;
        Ok(reflect::import_types(&pool, &cli.messages)?)
    } else {
        bail!("Either --manifest or --descriptor-set must be specified")
    }
}

fn generator_config(cli: &Cli) -> GeneratorConfig {
    let options: IndexMap<String, String> = cli.options.iter().cloned().collect();
    let mut config = GeneratorConfig::new()
        .options(options)
        .indent_str(cli.indent.as_str());
    if let Some(package) = &cli.package {
        config = config.package_name(package.as_str());
    }
    config
}

/// Write the schema to disk, refusing to clobber unless forced
fn write_schema_file(output_path: &Path, content: &str, force: bool) -> Result<()> {
    // Create parent directories
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    if output_path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            output_path.display()
        );
    }

    let mut file = fs::File::create(output_path)
        .with_context(|| format!("Failed to create file: {}", output_path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", output_path.display()))?;

    Ok(())
}
