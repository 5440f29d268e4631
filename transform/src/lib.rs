//! Build-time partial evaluation of macro calls in JS/TS modules
//!
//! The module evaluation engine: locate configured macro calls, build a
//! minimal, tree-shaken, import-resolved, sandbox-executable representation
//! of everything needed to compute their arguments (transitive module
//! dependencies included), execute it once in an isolated sandbox, and feed
//! the results back into call-site rewriting.
//!
//! Pipeline: [`transform`] parses the source and finds macro calls, builds a
//! synthetic evaluation module, and asks the [`ModuleService`] to shake,
//! resolve, rewrite and execute it (with its module scope) inside a
//! [`wd40_runtime::Sandbox`]; computed values flow back positionally to each
//! call's handler, which edits the source buffer and may emit auxiliary CSS.

pub mod assets;
pub mod constants;
pub mod error;
pub mod file_system;
pub mod logging;
pub mod module;
pub mod module_service;
pub mod parse_imports;
pub mod replace_exports_imports;
pub mod resolver;
pub mod shaker;
pub mod testing;
pub mod transform;

pub use assets::{absolute_path_to_relative, replace_assets_with_imports, strip_asset_markers};
pub use constants::{ASSET_PREFIX, ASSET_SUFFIX, EVALUATION_EXPORT, MODULE_WRAPPER_FN};
pub use error::TransformError;
pub use file_system::{FileSystemService, OsFileSystemService};
pub use module::{Module, ModuleSnapshot};
pub use module_service::{create_module_service, ModuleService};
pub use parse_imports::{parse_imports, ParsedImport, ParsedImports};
pub use replace_exports_imports::replace_exports_imports;
pub use resolver::{ModuleResolveResult, NodeResolverService, ResolverService};
pub use shaker::{ReachabilityShaker, Shaker};
pub use transform::{
    transform, HandlerInput, ModuleConfig, ModuleSpecifierHandler, TransformContext,
    TransformParams, TransformResult, TransformUtils,
};
