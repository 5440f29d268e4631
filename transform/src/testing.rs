//! In-memory service implementations for tests
//!
//! Mirrors the real services over fixed maps so module-graph behavior can
//! be exercised without touching the filesystem.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use fxhash::FxHashMap;

use crate::error::TransformError;
use crate::file_system::FileSystemService;
use crate::resolver::{ModuleResolveResult, ResolverService};

/// Serves file contents from a fixed path → source map
#[derive(Default)]
pub struct MockFileSystemService {
    files: FxHashMap<String, String>,
}

impl MockFileSystemService {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, source)| (path.to_string(), source.to_string()))
                .collect(),
        }
    }
}

impl FileSystemService for MockFileSystemService {
    fn read_file<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Result<String, TransformError>> {
        let result = self.files.get(path).cloned().ok_or_else(|| TransformError::Io {
            path: path.to_string(),
            message: "file not found".to_string(),
        });
        futures::future::ready(result).boxed_local()
    }
}

/// Resolves specifiers from a fixed specifier → result map, ignoring the
/// importer
#[derive(Default)]
pub struct MockResolverService {
    modules: FxHashMap<String, ModuleResolveResult>,
}

impl MockResolverService {
    pub fn new(modules: &[(&str, ModuleResolveResult)]) -> Self {
        Self {
            modules: modules
                .iter()
                .map(|(specifier, result)| (specifier.to_string(), result.clone()))
                .collect(),
        }
    }
}

impl ResolverService for MockResolverService {
    fn resolve_module<'a>(
        &'a self,
        module_id: &'a str,
        importer_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<ModuleResolveResult, TransformError>> {
        let result = self.modules.get(module_id).cloned().ok_or_else(|| {
            TransformError::ModuleNotFound {
                specifier: module_id.to_string(),
                importer: importer_id.to_string(),
            }
        });
        futures::future::ready(result).boxed_local()
    }
}
