use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use json2pb::{emit, pipeline, CompilerKind, Config, ConvertOptions, JsonSource, TypeLookup};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "json2pb")]
#[command(about = "Generate PB data from Json")]
#[command(version)]
struct Cli {
    /// Protofiles directory
    #[arg(short = 'p', long = "proto_dir")]
    proto_dir: PathBuf,

    /// Output directory for generated descriptor modules
    #[arg(short = 'o', long = "output_dir")]
    output_dir: PathBuf,

    /// Name of message to create and populate with json
    #[arg(short = 't', long = "type", required_unless_present = "list_types")]
    type_name: Option<String>,

    /// Json file (or pass text through pipe operator)
    #[arg(short = 'j', long = "json")]
    json: Option<PathBuf>,

    /// How the message type is matched against generated modules
    #[arg(long, value_enum, default_value_t = Lookup::Exact)]
    lookup: Lookup,

    /// Schema compiler backend
    #[arg(long, value_enum, default_value_t = Backend::Protox)]
    compiler: Backend,

    /// protoc binary used by the protoc backend
    #[arg(long, env = "PROTOC", default_value = "protoc")]
    protoc: PathBuf,

    /// Skip JSON keys that do not name a field of the message
    #[arg(long = "ignore_unknown_fields")]
    ignore_unknown_fields: bool,

    /// Print the message types found in the generated modules and exit
    #[arg(long = "list_types")]
    list_types: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Lookup {
    /// Fully qualified or unambiguous short message name
    Exact,
    /// First generated module whose file name starts with the type name
    Prefix,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// Built-in compiler
    Protox,
    /// External protoc binary
    Protoc,
}

impl Cli {
    fn into_config(self) -> Config {
        let json = match self.json {
            Some(path) => JsonSource::File(path),
            None => JsonSource::Stdin,
        };
        let mut config = Config::new(
            self.proto_dir,
            self.output_dir,
            self.type_name.unwrap_or_default(),
            json,
        );
        config.lookup = match self.lookup {
            Lookup::Exact => TypeLookup::Exact,
            Lookup::Prefix => TypeLookup::Prefix,
        };
        config.compiler = match self.compiler {
            Backend::Protox => CompilerKind::Protox,
            Backend::Protoc => CompilerKind::Protoc {
                binary: self.protoc,
            },
        };
        config.convert = ConvertOptions {
            ignore_unknown_fields: self.ignore_unknown_fields,
        };
        config
    }
}

fn main() -> Result<()> {
    // stdout carries the encoded message, so diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let list_types = cli.list_types;
    let config = cli.into_config();

    if list_types {
        let registry = pipeline::build_registry(&config)?;
        let mut stdout = std::io::stdout().lock();
        for name in registry.message_names() {
            writeln!(stdout, "{name}").context("failed to write type list")?;
        }
        return Ok(());
    }

    let message = pipeline::run(&config).inspect_err(|err| {
        if err.is_lookup_error() {
            tracing::warn!("run with --list_types to see the registered message names");
        }
    })?;
    emit::emit_to(&message, std::io::stdout().lock())?;
    Ok(())
}
