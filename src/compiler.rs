//! Compiles a tree of `.proto` sources into per-file descriptor modules.
//!
//! Every `.proto` file found under the source root is compiled on its own into
//! a binary `FileDescriptorSet` that also carries the file's imports, so each
//! generated module can be loaded without the others. Modules are written under
//! the output directory, re-rooted relative to the parent of the source root:
//!
//! ```text
//! proto_dir  = /work/protos
//! source     = /work/protos/acme/user.proto
//! module     = <output_dir>/protos/acme/user_pb2.binpb
//! ```
//!
//! A file that fails to compile is logged and skipped; the rest of the batch
//! still compiles.

use crate::error::{Json2PbError, Result};
use protox::Compiler;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Suffix appended to a schema file stem to name its generated module.
pub const MODULE_SUFFIX: &str = "_pb2.binpb";

/// One successfully compiled schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    /// Absolute path of the `.proto` source.
    pub source: PathBuf,
    /// File name of the source inside the descriptor set (`protos/acme/user.proto`).
    pub proto_name: String,
    /// Path of the generated module on disk.
    pub path: PathBuf,
}

impl CompiledModule {
    /// File name of the generated module, e.g. `user_pb2.binpb`.
    pub fn module_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// Result of compiling a source tree, in compile order.
#[derive(Debug, Clone, Default)]
pub struct CompiledModules {
    pub modules: Vec<CompiledModule>,
}

impl CompiledModules {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }
}

/// A backend able to turn one `.proto` file into a descriptor module.
pub trait SchemaCompiler {
    /// Compile `relative` (a path under `import_root`) and write the encoded
    /// `FileDescriptorSet`, imports included, to `module_path`.
    fn compile_file(&self, import_root: &Path, relative: &Path, module_path: &Path) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// In-process compiler backed by `protox`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtoxCompiler;

impl SchemaCompiler for ProtoxCompiler {
    fn compile_file(&self, import_root: &Path, relative: &Path, module_path: &Path) -> Result<()> {
        let source = import_root.join(relative);
        let compile_error = |message: String| Json2PbError::Compile {
            file: source.clone(),
            message,
        };

        let mut compiler =
            Compiler::new([import_root]).map_err(|e| compile_error(e.to_string()))?;
        compiler
            .include_imports(true)
            .include_source_info(false)
            .open_file(&source)
            .map_err(|e| compile_error(e.to_string()))?;
        let encoded = compiler.encode_file_descriptor_set();

        fs::write(module_path, encoded).map_err(|e| Json2PbError::io(module_path, e))
    }

    fn name(&self) -> &'static str {
        "protox"
    }
}

/// Out-of-process compiler that shells out to a `protoc` binary.
#[derive(Debug, Clone)]
pub struct ProtocCompiler {
    binary: PathBuf,
}

impl ProtocCompiler {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl SchemaCompiler for ProtocCompiler {
    fn compile_file(&self, import_root: &Path, relative: &Path, module_path: &Path) -> Result<()> {
        let source = import_root.join(relative);
        let mut descriptor_out = std::ffi::OsString::from("--descriptor_set_out=");
        descriptor_out.push(module_path);
        let mut include = std::ffi::OsString::from("-I");
        include.push(import_root);

        let output = Command::new(&self.binary)
            .arg("--include_imports")
            .arg(descriptor_out)
            .arg(include)
            .arg(&source)
            .arg("--experimental_allow_proto3_optional")
            .output()
            .map_err(|e| Json2PbError::Compile {
                file: source.clone(),
                message: format!("failed to run {}: {e}", self.binary.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Json2PbError::Compile {
                file: source,
                message: format!("{} ({})", stderr.trim(), output.status),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "protoc"
    }
}

/// Compile every `.proto` file under `proto_dir` into `output_dir`.
///
/// A missing `proto_dir` is reported and yields an empty set; the caller
/// decides whether that is fatal. The generated subtree for this source root
/// is removed before compiling so no stale module survives a run.
pub fn generate_modules(
    compiler: &dyn SchemaCompiler,
    proto_dir: &Path,
    output_dir: &Path,
) -> Result<CompiledModules> {
    if !proto_dir.is_dir() {
        tracing::error!(proto_dir = %proto_dir.display(), "no proto directory");
        return Ok(CompiledModules::default());
    }

    let proto_dir = fs::canonicalize(proto_dir).map_err(|e| Json2PbError::io(proto_dir, e))?;
    let import_root = proto_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| proto_dir.clone());

    prepare_output_dir(&proto_dir, &import_root, output_dir)?;

    let sources = find_proto_files(&proto_dir);
    tracing::debug!(
        count = sources.len(),
        compiler = compiler.name(),
        "compiling proto sources"
    );

    let mut modules = Vec::with_capacity(sources.len());
    for source in sources {
        let Ok(relative) = source.strip_prefix(&import_root) else {
            continue;
        };
        let proto_name = proto_file_name(relative);
        let module_path = module_path_for(output_dir, relative);
        if let Some(parent) = module_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Json2PbError::io(parent, e))?;
        }

        match compiler.compile_file(&import_root, relative, &module_path) {
            Ok(()) => {
                tracing::debug!(
                    source = %source.display(),
                    module = %module_path.display(),
                    "generated module"
                );
                modules.push(CompiledModule {
                    source,
                    proto_name,
                    path: module_path,
                });
            }
            Err(err) => {
                tracing::warn!(source = %source.display(), error = %err, "skipping proto file");
            }
        }
    }

    tracing::info!(
        generated = modules.len(),
        output_dir = %output_dir.display(),
        "proto generation finished"
    );
    Ok(CompiledModules { modules })
}

/// Create `output_dir` if needed and clear the subtree this source root writes into.
///
/// Cleanup is skipped when that subtree and `proto_dir` overlap.
fn prepare_output_dir(proto_dir: &Path, import_root: &Path, output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        return fs::create_dir_all(output_dir).map_err(|e| Json2PbError::io(output_dir, e));
    }

    let Ok(subtree) = proto_dir.strip_prefix(import_root) else {
        return Ok(());
    };
    if subtree.as_os_str().is_empty() {
        return Ok(());
    }
    let output_dir = fs::canonicalize(output_dir).map_err(|e| Json2PbError::io(output_dir, e))?;
    let stale = output_dir.join(subtree);
    if proto_dir.starts_with(&stale) || stale.starts_with(proto_dir) {
        tracing::warn!(
            path = %stale.display(),
            "output subtree overlaps proto directory, skipping cleanup"
        );
        return Ok(());
    }
    if stale.is_dir() {
        tracing::debug!(path = %stale.display(), "removing previously generated modules");
        fs::remove_dir_all(&stale).map_err(|e| Json2PbError::io(&stale, e))?;
    }
    Ok(())
}

/// Map a source path relative to the import root onto its module path.
pub fn module_path_for(output_dir: &Path, relative: &Path) -> PathBuf {
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir
        .join(relative)
        .with_file_name(format!("{stem}{MODULE_SUFFIX}"))
}

/// Descriptor file names always use `/`, whatever the host separator.
fn proto_file_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Recursively collect `.proto` files, sorted by path.
fn find_proto_files(dir: &Path) -> Vec<PathBuf> {
    let mut results = Vec::new();
    walk_proto_files(dir, &mut results);
    results.sort();
    results
}

fn walk_proto_files(dir: &Path, acc: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to read directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            walk_proto_files(&path, acc);
        } else if file_type.is_symlink() && path.is_dir() {
            // linked directories may loop back into the tree
            tracing::debug!(path = %path.display(), "not following directory symlink");
        } else if path.extension().is_some_and(|ext| ext == "proto") {
            acc.push(path);
        }
    }
}
