//! The unit of work: one source file plus its accumulating required exports
//!
//! A module owns a cached, lazily recomputed snapshot (shaken + rewritten
//! code with import metadata). The snapshot is valid only for the
//! `only_exports` set it was computed against; growing the set invalidates
//! it, and a request that is already a subset is a no-op.

use std::cell::RefCell;
use std::rc::Rc;

use fxhash::FxHashMap;
use indexmap::IndexMap;
use log::debug;
use parser::program_to_code;

use crate::error::TransformError;
use crate::parse_imports::{parse_imports, ParsedImports};
use crate::replace_exports_imports::replace_exports_imports;
use crate::resolver::{ModuleResolveResult, ResolverService};
use crate::shaker::Shaker;

/// A module's cached evaluation-ready form
#[derive(Debug, Clone)]
pub struct ModuleSnapshot {
    /// Wrapped, sandbox-loadable code
    pub code: String,
    /// Imports surviving the shake, by specifier
    pub alive_imports: ParsedImports,
    /// Resolution results for every surviving specifier
    pub resolved_imports: IndexMap<String, ModuleResolveResult>,
}

pub struct Module {
    code: String,
    filename: String,
    only_exports: RefCell<Vec<String>>,
    resolve_cache: RefCell<FxHashMap<String, ModuleResolveResult>>,
    snapshot: RefCell<Option<Rc<ModuleSnapshot>>>,
    snapshot_lock: futures::lock::Mutex<()>,
    shaker: Rc<dyn Shaker>,
    resolver: Rc<dyn ResolverService>,
}

impl Module {
    pub fn new(
        shaker: Rc<dyn Shaker>,
        resolver: Rc<dyn ResolverService>,
        code: String,
        filename: String,
        only_exports: &[String],
    ) -> Self {
        let mut only_exports: Vec<String> = only_exports.to_vec();
        only_exports.sort();
        only_exports.dedup();

        Self {
            code,
            filename,
            only_exports: RefCell::new(only_exports),
            resolve_cache: RefCell::new(FxHashMap::default()),
            snapshot: RefCell::new(None),
            snapshot_lock: futures::lock::Mutex::new(()),
            shaker,
            resolver,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn only_exports(&self) -> Vec<String> {
        self.only_exports.borrow().clone()
    }

    /// Merge additional required exports; invalidates the snapshot when the
    /// set grows. A subset request leaves everything untouched.
    pub fn add_required_exports(&self, names: &[String]) {
        let mut current = self.only_exports.borrow_mut();
        let mut changed = false;
        for name in names {
            if !current.contains(name) {
                current.push(name.clone());
                changed = true;
            }
        }
        if changed {
            current.sort();
            *self.snapshot.borrow_mut() = None;
        }
    }

    /// Compute (or return the cached) snapshot. Serialized per module; if
    /// the export set grows while a computation is in flight the result is
    /// discarded and recomputed.
    pub async fn get_snapshot(&self) -> Result<Rc<ModuleSnapshot>, TransformError> {
        let _guard = self.snapshot_lock.lock().await;

        loop {
            if let Some(snapshot) = self.snapshot.borrow().clone() {
                return Ok(snapshot);
            }

            let only_exports = self.only_exports.borrow().clone();
            let snapshot = self.make_snapshot(&only_exports).await?;

            if *self.only_exports.borrow() == only_exports {
                let snapshot = Rc::new(snapshot);
                *self.snapshot.borrow_mut() = Some(Rc::clone(&snapshot));
                return Ok(snapshot);
            }

            debug!(
                "module {}: exports grew during snapshot computation, retrying",
                self.filename
            );
        }
    }

    async fn make_snapshot(&self, only_exports: &[String]) -> Result<ModuleSnapshot, TransformError> {
        debug!("module {}: shaking for exports {:?}", self.filename, only_exports);

        let shaken = self.shaker.shake(&self.filename, &self.code, only_exports)?;
        let alive_imports = parse_imports(&shaken);

        // `export *` re-exports ({*, *}) are supported; `import * as ns`
        // is not, because its required exports cannot be named statically
        for imports in alive_imports.values() {
            for import in imports {
                if import.imported_name == "*" && import.local_name != "*" {
                    return Err(TransformError::WildcardImportUnsupported {
                        filename: self.filename.clone(),
                    });
                }
            }
        }

        let resolved_imports = self.resolve_parsed_imports(&alive_imports).await?;

        let rewritten = replace_exports_imports(&self.filename, shaken, &resolved_imports)?;
        let code = program_to_code(&rewritten);

        debug!("module {}: snapshot code:\n{}", self.filename, code);

        Ok(ModuleSnapshot { code, alive_imports, resolved_imports })
    }

    /// Resolve every surviving specifier, fanning out concurrently and
    /// caching per specifier (the cache is never evicted)
    async fn resolve_parsed_imports(
        &self,
        imports: &ParsedImports,
    ) -> Result<IndexMap<String, ModuleResolveResult>, TransformError> {
        let tasks = imports.keys().map(|specifier| async move {
            let cached = self.resolve_cache.borrow().get(specifier).cloned();
            if let Some(result) = cached {
                return Ok::<_, TransformError>((specifier.clone(), result));
            }

            let result = self.resolver.resolve_module(specifier, &self.filename).await?;
            self.resolve_cache
                .borrow_mut()
                .insert(specifier.clone(), result.clone());
            Ok((specifier.clone(), result))
        });

        let resolved = futures::future::try_join_all(tasks).await?;
        Ok(resolved.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaker::ReachabilityShaker;
    use crate::testing::MockResolverService;

    fn module_with(code: &str, only_exports: &[&str]) -> Module {
        let resolver = MockResolverService::new(&[
            ("./baz", ModuleResolveResult::module("/src/baz.ts")),
            ("./img.png", ModuleResolveResult::asset("/src/img.png")),
        ]);
        Module::new(
            Rc::new(ReachabilityShaker::new()),
            Rc::new(resolver),
            code.to_string(),
            "/src/input.ts".to_string(),
            &only_exports.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_snapshot_is_cached() {
        let module = module_with("export const foo = 'foo';", &["foo"]);

        futures::executor::block_on(async {
            let first = module.get_snapshot().await.unwrap();
            let second = module.get_snapshot().await.unwrap();
            assert!(Rc::ptr_eq(&first, &second));
        });
    }

    #[test]
    fn test_growing_exports_invalidates_snapshot() {
        let module = module_with("export const foo = 'f';\nexport const bar = 'b';", &["foo"]);

        futures::executor::block_on(async {
            let first = module.get_snapshot().await.unwrap();
            assert!(!first.code.contains("bar"));

            module.add_required_exports(&["bar".to_string()]);
            let second = module.get_snapshot().await.unwrap();
            assert!(!Rc::ptr_eq(&first, &second));
            assert!(second.code.contains("bar"));
        });
    }

    #[test]
    fn test_subset_request_is_a_noop() {
        let module = module_with("export const foo = 'f';\nexport const bar = 'b';", &["bar", "foo"]);

        futures::executor::block_on(async {
            let first = module.get_snapshot().await.unwrap();
            module.add_required_exports(&["foo".to_string()]);
            let second = module.get_snapshot().await.unwrap();
            assert!(Rc::ptr_eq(&first, &second));
        });
    }

    #[test]
    fn test_surviving_imports_are_resolved() {
        let module = module_with(
            "import { baz } from './baz';\nexport const foo = 'foo' + baz;",
            &["foo"],
        );

        futures::executor::block_on(async {
            let snapshot = module.get_snapshot().await.unwrap();
            assert_eq!(
                snapshot.resolved_imports.get("./baz").unwrap().path,
                "/src/baz.ts"
            );
            assert!(snapshot.code.contains("require(\"/src/baz.ts\")"));
        });
    }

    #[test]
    fn test_namespace_import_is_fatal() {
        let module = module_with(
            "import * as baz from './baz';\nexport const foo = baz.x;",
            &["foo"],
        );

        futures::executor::block_on(async {
            let error = module.get_snapshot().await.unwrap_err();
            assert!(matches!(error, TransformError::WildcardImportUnsupported { .. }));
        });
    }

    #[test]
    fn test_asset_import_becomes_marker_constant() {
        let module = module_with(
            "import img from './img.png';\nexport const foo = img;",
            &["foo"],
        );

        futures::executor::block_on(async {
            let snapshot = module.get_snapshot().await.unwrap();
            assert!(snapshot.code.contains("@wd40-asset:/src/img.png:@wd40-asset"));
            assert!(snapshot.resolved_imports.get("./img.png").unwrap().is_asset);
        });
    }
}
