//! Wire-format constants shared across the evaluation pipeline

/// Opens an asset marker embedded in a string literal:
/// `@wd40-asset:<absolutePath>:@wd40-asset`
pub const ASSET_PREFIX: &str = "@wd40-asset:";

/// Closes an asset marker
pub const ASSET_SUFFIX: &str = ":@wd40-asset";

/// Suffix appended to a root module's path to form its synthetic identity
pub const ENTRYPOINT_SUFFIX: &str = "?entrypoint";

/// Export name used by the synthetic evaluation module built per source file
pub const EVALUATION_EXPORT: &str = "__module";

pub use parser::MODULE_WRAPPER_FN;
