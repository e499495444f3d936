//! Convert JSON documents into binary protobuf messages.
//!
//! This crate provides:
//! - Per-file compilation of a `.proto` tree into descriptor modules (`compiler`)
//! - A typed registry resolving message names to descriptors (`registry`)
//! - JSON to message conversion with the protobuf JSON mapping (`convert`)
//! - Binary encoding and output (`emit`)
//! - The end-to-end pipeline used by the `json2pb` binary (`pipeline`)
//!
//! # Usage
//!
//! ```no_run
//! use json2pb::{emit, pipeline, Config, JsonSource};
//!
//! let config = Config::new("protos", "generated", "Person", JsonSource::Stdin);
//! let message = pipeline::run(&config)?;
//! emit::emit_to(&message, std::io::stdout().lock())?;
//! # Ok::<(), json2pb::Json2PbError>(())
//! ```

pub mod compiler;
pub mod convert;
pub mod emit;
pub mod error;
pub mod pipeline;
pub mod registry;

// Re-export commonly used types
pub use compiler::{CompiledModule, CompiledModules, ProtocCompiler, ProtoxCompiler, SchemaCompiler};
pub use convert::{json_to_message, ConvertOptions};
pub use error::{Json2PbError, Result};
pub use pipeline::{CompilerKind, Config, JsonSource};
pub use registry::{ModuleRegistry, TypeLookup};
