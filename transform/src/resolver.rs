//! Node-style module resolution
//!
//! Maps a raw specifier plus the importing file to a concrete path, or flags
//! the target as a non-module asset. Resolution order: stub table, asset
//! short-circuit, verbatim path, extension probing, directory resolution via
//! `package.json` (`exports` preferring `import`/`default`, then `module`,
//! then `main`), `index.*` fallback, and `node_modules` walking for bare
//! specifiers.

use std::path::{Component, Path, PathBuf};

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use fxhash::FxHashMap;
use log::debug;

use crate::error::TransformError;

/// Extensions probed when a specifier does not name a file verbatim
pub const EXTENSIONS: &[&str] = &[
    ".js", ".jsx", ".ts", ".tsx", ".json", ".mjs", ".cjs", ".mts", ".cts",
];

/// Extensions that short-circuit to an asset resolution
pub const ASSET_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"];

/// Result of resolving one specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleResolveResult {
    pub path: String,
    pub is_asset: bool,
}

impl ModuleResolveResult {
    pub fn module(path: impl Into<String>) -> Self {
        Self { path: path.into(), is_asset: false }
    }

    pub fn asset(path: impl Into<String>) -> Self {
        Self { path: path.into(), is_asset: true }
    }
}

/// Specifier resolution used by the module registry
pub trait ResolverService {
    fn resolve_module<'a>(
        &'a self,
        module_id: &'a str,
        importer_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<ModuleResolveResult, TransformError>>;
}

/// Node-style resolver over the real filesystem
#[derive(Default)]
pub struct NodeResolverService {
    extra_asset_extensions: Vec<String>,
    stubs: FxHashMap<String, String>,
}

impl NodeResolverService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a replacement implementation for a reserved specifier
    /// (e.g. map `react` onto a bundled stub module)
    pub fn register_stub(&mut self, module_id: impl Into<String>, path: impl Into<String>) {
        self.stubs.insert(module_id.into(), path.into());
    }

    /// Extend the set of extensions treated as binary assets
    pub fn register_asset_extension(&mut self, extension: impl Into<String>) {
        self.extra_asset_extensions.push(extension.into());
    }

    fn is_asset_path(&self, path: &str) -> bool {
        ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
            || self.extra_asset_extensions.iter().any(|ext| path.ends_with(ext))
    }

    fn resolve_sync(
        &self,
        module_id: &str,
        importer_id: &str,
    ) -> Result<ModuleResolveResult, TransformError> {
        if let Some(stub) = self.stubs.get(module_id) {
            debug!("resolver: {} stubbed to {}", module_id, stub);
            return Ok(ModuleResolveResult::module(stub.clone()));
        }

        let not_found = || TransformError::ModuleNotFound {
            specifier: module_id.to_string(),
            importer: importer_id.to_string(),
        };

        // Query strings and fragments do not take part in resolution
        let clean = module_id
            .split(['?', '#'])
            .next()
            .unwrap_or(module_id);

        let importer_dir = Path::new(importer_id)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        // Assets skip module semantics entirely
        if self.is_asset_path(clean) {
            let path = if Path::new(clean).is_absolute() {
                normalize(Path::new(clean))
            } else if clean.starts_with('.') {
                normalize(&importer_dir.join(clean))
            } else {
                normalize(Path::new("/").join(clean).as_path())
            };
            return Ok(ModuleResolveResult::asset(path_to_string(&path)));
        }

        let resolved = if clean.starts_with('.') || Path::new(clean).is_absolute() {
            let base = if Path::new(clean).is_absolute() {
                PathBuf::from(clean)
            } else {
                importer_dir.join(clean)
            };
            self.resolve_file_or_dir(&normalize(&base))
        } else {
            self.resolve_bare(clean, &importer_dir)
        };

        match resolved {
            Some(path) => {
                let path = path_to_string(&path);
                debug!("resolver: {} (from {}) -> {}", module_id, importer_id, path);
                if self.is_asset_path(&path) {
                    Ok(ModuleResolveResult::asset(path))
                } else {
                    Ok(ModuleResolveResult::module(path))
                }
            }
            None => Err(not_found()),
        }
    }

    fn resolve_bare(&self, specifier: &str, importer_dir: &Path) -> Option<PathBuf> {
        let (package, subpath) = split_package_specifier(specifier);

        let mut dir = Some(importer_dir.to_path_buf());
        while let Some(current) = dir {
            let package_dir = current.join("node_modules").join(package);
            if package_dir.is_dir() {
                let resolved = if subpath.is_empty() {
                    self.resolve_package_entry(&package_dir)
                } else {
                    self.resolve_file_or_dir(&package_dir.join(subpath))
                };
                if resolved.is_some() {
                    return resolved;
                }
            }
            dir = current.parent().map(Path::to_path_buf);
        }
        None
    }

    fn resolve_file_or_dir(&self, base: &Path) -> Option<PathBuf> {
        if let Some(file) = try_file(base) {
            return Some(file);
        }
        if base.is_dir() {
            return self.resolve_package_entry(base);
        }
        None
    }

    fn resolve_package_entry(&self, package_dir: &Path) -> Option<PathBuf> {
        let manifest_path = package_dir.join("package.json");
        if let Ok(text) = std::fs::read_to_string(&manifest_path) {
            if let Ok(manifest) = text.parse::<serde_json::Value>() {
                if let Some(entry) = package_exports_entry(&manifest) {
                    if let Some(file) = try_file(&package_dir.join(entry.trim_start_matches("./"))) {
                        return Some(file);
                    }
                }
                for field in ["module", "main"] {
                    if let Some(entry) = manifest.get(field).and_then(|v| v.as_str()) {
                        if let Some(file) =
                            try_file(&package_dir.join(entry.trim_start_matches("./")))
                        {
                            return Some(file);
                        }
                    }
                }
            }
        }
        try_file(&package_dir.join("index"))
    }
}

impl ResolverService for NodeResolverService {
    fn resolve_module<'a>(
        &'a self,
        module_id: &'a str,
        importer_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<ModuleResolveResult, TransformError>> {
        let result = self.resolve_sync(module_id, importer_id);
        futures::future::ready(result).boxed_local()
    }
}

/// `exports` field entry, preferring `"."` then `import`/`default` keys
fn package_exports_entry(manifest: &serde_json::Value) -> Option<String> {
    let exports = manifest.get("exports")?;

    let entry = match exports {
        serde_json::Value::String(s) => return Some(s.clone()),
        serde_json::Value::Object(map) => map.get(".").unwrap_or(exports),
        _ => return None,
    };

    match entry {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => {
            for key in ["import", "default"] {
                if let Some(serde_json::Value::String(s)) = map.get(key) {
                    return Some(s.clone());
                }
            }
            None
        }
        _ => None,
    }
}

/// Try the path verbatim, then with each known extension appended
fn try_file(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(base.to_path_buf());
    }
    let base_str = base.to_string_lossy();
    for ext in EXTENSIONS {
        let candidate = PathBuf::from(format!("{}{}", base_str, ext));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Split a bare specifier into its package name (one segment, two for
/// `@scope/name`) and remaining subpath
fn split_package_specifier(specifier: &str) -> (&str, &str) {
    let mut segments = specifier.splitn(3, '/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(scope), Some(name), rest) if scope.starts_with('@') => {
            let package_len = scope.len() + 1 + name.len();
            (&specifier[..package_len], rest.unwrap_or(""))
        }
        (Some(name), _, _) => {
            let rest = specifier.get(name.len() + 1..).unwrap_or("");
            (name, rest)
        }
        _ => (specifier, ""),
    }
}

/// Lexically normalize a path, resolving `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                match parts.last() {
                    Some(Component::Normal(_)) => {
                        parts.pop();
                    }
                    _ => parts.push(component),
                }
            }
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_package_specifier() {
        assert_eq!(split_package_specifier("react"), ("react", ""));
        assert_eq!(split_package_specifier("react/jsx-runtime"), ("react", "jsx-runtime"));
        assert_eq!(split_package_specifier("@griffel/core"), ("@griffel/core", ""));
        assert_eq!(
            split_package_specifier("@griffel/core/lib/index"),
            ("@griffel/core", "lib/index")
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/./img.png")), PathBuf::from("/a/b/img.png"));
    }

    #[test]
    fn test_asset_short_circuit_needs_no_file() {
        let resolver = NodeResolverService::new();
        let result = resolver
            .resolve_sync("./missing.png", "/project/src/input.ts")
            .expect("assets resolve without existence checks");
        assert!(result.is_asset);
        assert_eq!(result.path, "/project/src/missing.png");
    }

    #[test]
    fn test_missing_module_reports_specifier_and_importer() {
        let resolver = NodeResolverService::new();
        let error = resolver
            .resolve_sync("./definitely-missing", "/project/src/input.ts")
            .unwrap_err();
        match error {
            TransformError::ModuleNotFound { specifier, importer } => {
                assert_eq!(specifier, "./definitely-missing");
                assert_eq!(importer, "/project/src/input.ts");
            }
            other => panic!("expected ModuleNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_stub_resolution() {
        let mut resolver = NodeResolverService::new();
        resolver.register_stub("react", "/stubs/react-mock.ts");
        let result = resolver.resolve_sync("react", "/project/src/input.ts").unwrap();
        assert_eq!(result.path, "/stubs/react-mock.ts");
        assert!(!result.is_asset);
    }
}
