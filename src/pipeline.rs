//! Sequential compile → load → convert pipeline.

use crate::compiler::{generate_modules, ProtocCompiler, ProtoxCompiler, SchemaCompiler};
use crate::convert::{json_to_message, ConvertOptions};
use crate::error::{Json2PbError, Result};
use crate::registry::{ModuleRegistry, TypeLookup};
use prost_reflect::DynamicMessage;
use std::io::Read;
use std::path::PathBuf;

/// Where the JSON document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonSource {
    File(PathBuf),
    Stdin,
}

impl JsonSource {
    pub fn read(&self) -> Result<String> {
        match self {
            JsonSource::File(path) => {
                std::fs::read_to_string(path).map_err(|e| Json2PbError::io(path, e))
            }
            JsonSource::Stdin => {
                let mut json = String::new();
                std::io::stdin()
                    .read_to_string(&mut json)
                    .map_err(|e| Json2PbError::io("<stdin>", e))?;
                Ok(json)
            }
        }
    }
}

/// Schema compiler backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompilerKind {
    #[default]
    Protox,
    Protoc { binary: PathBuf },
}

impl CompilerKind {
    fn build(&self) -> Box<dyn SchemaCompiler> {
        match self {
            CompilerKind::Protox => Box::new(ProtoxCompiler),
            CompilerKind::Protoc { binary } => Box::new(ProtocCompiler::new(binary)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub proto_dir: PathBuf,
    pub output_dir: PathBuf,
    pub type_name: String,
    pub json: JsonSource,
    pub lookup: TypeLookup,
    pub compiler: CompilerKind,
    pub convert: ConvertOptions,
}

impl Config {
    pub fn new(
        proto_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        type_name: impl Into<String>,
        json: JsonSource,
    ) -> Self {
        Self {
            proto_dir: proto_dir.into(),
            output_dir: output_dir.into(),
            type_name: type_name.into(),
            json,
            lookup: TypeLookup::default(),
            compiler: CompilerKind::default(),
            convert: ConvertOptions::default(),
        }
    }
}

/// Compile the schema tree and load the resulting modules.
pub fn build_registry(config: &Config) -> Result<ModuleRegistry> {
    let compiler = config.compiler.build();
    let compiled = generate_modules(compiler.as_ref(), &config.proto_dir, &config.output_dir)?;
    ModuleRegistry::load(&compiled)
}

/// Run every stage in order and return the populated message.
///
/// Empty input is rejected before the type is looked up, so a missing
/// payload is reported even when the type name is also wrong.
pub fn run(config: &Config) -> Result<DynamicMessage> {
    let registry = build_registry(config)?;
    let json = config.json.read()?;
    if json.trim().is_empty() {
        return Err(Json2PbError::EmptyJson);
    }
    let descriptor = registry.resolve(&config.type_name, config.lookup)?;
    let message = json_to_message(descriptor, &json, config.convert)?;
    tracing::info!(type_name = %config.type_name, "JSON converted");
    Ok(message)
}
