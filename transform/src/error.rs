//! Error taxonomy for the evaluation pipeline
//!
//! Every variant is fatal for the file being transformed; nothing is
//! swallowed or retried. Deterministic build output is preferred over
//! best-effort recovery.

use std::fmt;

use parser::error::ParseError;

#[derive(Debug)]
pub enum TransformError {
    /// Malformed source, no partial output
    Parse(ParseError),

    /// Resolver failure, with the specifier and importing file
    ModuleNotFound { specifier: String, importer: String },

    /// A surviving `import * as ns` whose concrete exports cannot be
    /// determined statically
    WildcardImportUnsupported { filename: String },

    /// A rewritten import carried more than one specifier; the shaker is
    /// expected to have split these
    UnsupportedSpecifierCount { filename: String },

    /// Uncaught exception while evaluating module code in the sandbox
    SandboxExecution { module: String, message: String },

    /// An asset marker survived into output with no matching import
    /// request; indicates a bug in the marker pipeline, not user error
    AssetNotResolved { marker: String },

    /// Filesystem failure outside the resolver
    Io { path: String, message: String },
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::Parse(error) => write!(f, "parse error: {}", error),
            TransformError::ModuleNotFound { specifier, importer } => {
                write!(f, "module not found: '{}' (imported from {})", specifier, importer)
            }
            TransformError::WildcardImportUnsupported { filename } => {
                write!(f, "wildcard imports are not supported (in {})", filename)
            }
            TransformError::UnsupportedSpecifierCount { filename } => {
                write!(
                    f,
                    "multiple specifiers on one rewritten import are not supported (in {})",
                    filename
                )
            }
            TransformError::SandboxExecution { module, message } => {
                write!(f, "evaluation of {} failed: {}", module, message)
            }
            TransformError::AssetNotResolved { marker } => {
                write!(f, "asset marker was not resolved to an import: {}", marker)
            }
            TransformError::Io { path, message } => {
                write!(f, "failed to read {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for TransformError {}

impl From<ParseError> for TransformError {
    fn from(error: ParseError) -> Self {
        TransformError::Parse(error)
    }
}
