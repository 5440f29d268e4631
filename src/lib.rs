//! wd40: build-time partial evaluation for JavaScript/TypeScript modules
//!
//! Finds configured "macro" calls (e.g. a styling DSL's `makeStyles`),
//! evaluates their arguments at build time inside an isolated sandbox, and
//! rewrites each call site with the computed result. Bundler adapters
//! supply a module configuration and consume the transformed source; this
//! crate is the engine between the two.
//!
//! ```no_run
//! use wd40::{create_module_service, transform, TransformParams};
//!
//! # async fn example(module_config: &[wd40::ModuleConfig]) -> Result<(), wd40::TransformError> {
//! let module_service = create_module_service();
//! let result = transform(TransformParams {
//!     source_code: "import { makeStyles } from '@griffel/core'; …",
//!     filename: "/project/src/App.tsx",
//!     project_root: "/project",
//!     module_config,
//!     module_service: &module_service,
//! })
//! .await?;
//!
//! println!("{}", result.code);
//! # Ok(())
//! # }
//! ```

pub use ::transform::{
    create_module_service, transform, HandlerInput, Module, ModuleConfig, ModuleResolveResult,
    ModuleService, ModuleSnapshot, ModuleSpecifierHandler, NodeResolverService,
    ReachabilityShaker, ResolverService, Shaker, TransformContext, TransformError,
    TransformParams, TransformResult, TransformUtils, ASSET_PREFIX, ASSET_SUFFIX,
};

pub use ::transform::{strip_asset_markers, FileSystemService, OsFileSystemService};

pub use parser::{parse_program, program_to_code, ParseError};

pub use wd40_runtime::Sandbox;
