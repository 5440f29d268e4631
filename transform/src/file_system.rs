//! Filesystem access behind a service trait so tests can substitute an
//! in-memory implementation

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::error::TransformError;

/// Read-only file access used by the module registry
pub trait FileSystemService {
    fn read_file<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Result<String, TransformError>>;
}

/// Reads files from the real filesystem
#[derive(Default)]
pub struct OsFileSystemService;

impl OsFileSystemService {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystemService for OsFileSystemService {
    fn read_file<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Result<String, TransformError>> {
        let result = std::fs::read_to_string(path).map_err(|e| TransformError::Io {
            path: path.to_string(),
            message: e.to_string(),
        });
        futures::future::ready(result).boxed_local()
    }
}
