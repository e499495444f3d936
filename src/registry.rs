//! Typed registry over the generated descriptor modules.
//!
//! The registry is built once from the compiled module set and resolves a
//! runtime type name to a `MessageDescriptor`. Two strategies exist:
//!
//! - [`TypeLookup::Exact`] matches fully qualified names first, then short
//!   names, and refuses to guess between packages.
//! - [`TypeLookup::Prefix`] picks the first module whose file name starts with
//!   the requested name and looks the message up among that module's
//!   top-level messages. `User` therefore also matches `UserProfile_pb2.binpb`
//!   and whichever module comes first in compile order wins.

use crate::compiler::{CompiledModule, CompiledModules};
use crate::error::{Json2PbError, Result};
use prost_reflect::{DescriptorPool, MessageDescriptor};
use std::collections::BTreeMap;

/// How a requested type name is bound to a message descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeLookup {
    #[default]
    Exact,
    Prefix,
}

/// A generated module decoded into its own descriptor pool.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    module: CompiledModule,
    pool: DescriptorPool,
}

impl LoadedModule {
    fn load(module: &CompiledModule) -> Result<Self> {
        let bytes = std::fs::read(&module.path).map_err(|e| Json2PbError::io(&module.path, e))?;
        let pool =
            DescriptorPool::decode(bytes.as_slice()).map_err(|source| Json2PbError::Descriptor {
                module: module.path.clone(),
                source,
            })?;
        Ok(Self {
            module: module.clone(),
            pool,
        })
    }

    /// File name of the generated module, e.g. `Person_pb2.binpb`.
    pub fn name(&self) -> &str {
        self.module.module_name()
    }

    /// Top-level message defined by this module's own schema file.
    pub fn top_level_message(&self, name: &str) -> Option<MessageDescriptor> {
        self.pool
            .get_file_by_name(&self.module.proto_name)?
            .messages()
            .find(|message| message.name() == name)
    }
}

#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    modules: Vec<LoadedModule>,
}

impl ModuleRegistry {
    /// Decode every compiled module. An empty set is an error: nothing could
    /// ever resolve against it.
    pub fn load(compiled: &CompiledModules) -> Result<Self> {
        if compiled.is_empty() {
            return Err(Json2PbError::NoGeneratedFiles);
        }

        let modules = compiled
            .modules
            .iter()
            .map(LoadedModule::load)
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(modules = modules.len(), "loaded generated modules");
        Ok(Self { modules })
    }

    /// Fully qualified names of every message reachable from the modules,
    /// map entries excluded, sorted and deduplicated.
    pub fn message_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .modules
            .iter()
            .flat_map(|module| module.pool.all_messages())
            .filter(|message| !message.is_map_entry())
            .map(|message| message.full_name().to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn resolve(&self, type_name: &str, lookup: TypeLookup) -> Result<MessageDescriptor> {
        let descriptor = match lookup {
            TypeLookup::Exact => self.resolve_exact(type_name)?,
            TypeLookup::Prefix => self.resolve_prefix(type_name)?,
        };
        tracing::debug!(
            requested = type_name,
            resolved = descriptor.full_name(),
            ?lookup,
            "resolved message type"
        );
        Ok(descriptor)
    }

    fn resolve_exact(&self, type_name: &str) -> Result<MessageDescriptor> {
        let qualified = type_name.trim_start_matches('.');
        if let Some(message) = self
            .modules
            .iter()
            .find_map(|module| module.pool.get_message_by_name(qualified))
        {
            return Ok(message);
        }

        // The same file shows up in every module that imports it, so key by full name.
        let mut candidates: BTreeMap<String, MessageDescriptor> = BTreeMap::new();
        for message in self.modules.iter().flat_map(|m| m.pool.all_messages()) {
            if message.name() == type_name && !message.is_map_entry() {
                candidates
                    .entry(message.full_name().to_string())
                    .or_insert(message);
            }
        }

        if candidates.len() > 1 {
            return Err(Json2PbError::AmbiguousType {
                type_name: type_name.to_string(),
                candidates: candidates.into_keys().collect(),
            });
        }
        candidates
            .into_values()
            .next()
            .ok_or_else(|| Json2PbError::TypeNotFound {
                type_name: type_name.to_string(),
            })
    }

    fn resolve_prefix(&self, type_name: &str) -> Result<MessageDescriptor> {
        let module = self
            .modules
            .iter()
            .find(|module| module.name().starts_with(type_name))
            .ok_or_else(|| Json2PbError::TypeNotFound {
                type_name: type_name.to_string(),
            })?;

        module
            .top_level_message(type_name)
            .ok_or_else(|| Json2PbError::TypeNotInModule {
                type_name: type_name.to_string(),
                module: module.name().to_string(),
            })
    }
}
