use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Json2PbError>;

#[derive(Debug, Error)]
pub enum Json2PbError {
    #[error("no files were generated")]
    NoGeneratedFiles,

    #[error("error in {} generation: {message}", file.display())]
    Compile { file: PathBuf, message: String },

    #[error("unable to load generated module {}", module.display())]
    Descriptor {
        module: PathBuf,
        #[source]
        source: prost_reflect::DescriptorError,
    },

    #[error("can't find {type_name} in generated files")]
    TypeNotFound { type_name: String },

    #[error("type name {type_name} is ambiguous, candidates: {}", candidates.join(", "))]
    AmbiguousType {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("no {type_name} in {module} module")]
    TypeNotInModule { type_name: String, module: String },

    #[error("no JSON specified (or it is empty), abort")]
    EmptyJson,

    #[error("can't parse JSON input to {type_name} message")]
    JsonParse {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Json2PbError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Json2PbError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for lookup failures, i.e. the requested type could not be bound.
    pub fn is_lookup_error(&self) -> bool {
        matches!(
            self,
            Json2PbError::TypeNotFound { .. }
                | Json2PbError::AmbiguousType { .. }
                | Json2PbError::TypeNotInModule { .. }
        )
    }
}
