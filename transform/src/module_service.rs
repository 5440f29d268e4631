//! Module registry and scope expansion
//!
//! Owns every [`Module`] for a build, expands a root module into the
//! minimal transitive module scope needed to evaluate it, concatenates the
//! scope's snapshots and executes them once in a fresh sandbox.
//!
//! The path → module map is shared, mutable state written by concurrent
//! expansion branches; loading is guarded by a per-path keyed mutex so two
//! branches racing on a not-yet-cached path cannot construct the module
//! twice (single-flight).

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use fxhash::FxHashMap;
use indexmap::IndexMap;
use log::debug;
use wd40_runtime::{Sandbox, Value};

use crate::constants::ENTRYPOINT_SUFFIX;
use crate::error::TransformError;
use crate::file_system::{FileSystemService, OsFileSystemService};
use crate::module::Module;
use crate::resolver::{NodeResolverService, ResolverService};
use crate::shaker::{ReachabilityShaker, Shaker};

type ModuleScope = RefCell<IndexMap<String, Rc<Module>>>;

pub struct ModuleService {
    modules: RefCell<FxHashMap<String, Rc<Module>>>,
    path_locks: RefCell<FxHashMap<String, Rc<futures::lock::Mutex<()>>>>,

    file_system: Rc<dyn FileSystemService>,
    resolver: Rc<dyn ResolverService>,
    shaker: Rc<dyn Shaker>,
}

impl ModuleService {
    pub fn new(
        file_system: Rc<dyn FileSystemService>,
        resolver: Rc<dyn ResolverService>,
        shaker: Rc<dyn Shaker>,
    ) -> Self {
        Self {
            modules: RefCell::new(FxHashMap::default()),
            path_locks: RefCell::new(FxHashMap::default()),
            file_system,
            resolver,
            shaker,
        }
    }

    /// Number of modules currently registered (excluding synthetic roots)
    pub fn module_count(&self) -> usize {
        self.modules.borrow().len()
    }

    fn path_lock(&self, filename: &str) -> Rc<futures::lock::Mutex<()>> {
        let mut locks = self.path_locks.borrow_mut();
        Rc::clone(
            locks
                .entry(filename.to_string())
                .or_insert_with(|| Rc::new(futures::lock::Mutex::new(()))),
        )
    }

    /// Load (or reuse) the module at `filename`, merging `only_exports`.
    /// Single-flight per path: the check-then-create sequence spans the
    /// file read, so it runs under the path's mutex.
    async fn load_module_by_path(
        &self,
        filename: &str,
        only_exports: &[String],
    ) -> Result<Rc<Module>, TransformError> {
        let lock = self.path_lock(filename);
        let _guard = lock.lock().await;

        let existing = self.modules.borrow().get(filename).cloned();
        if let Some(module) = existing {
            module.add_required_exports(only_exports);
            return Ok(module);
        }

        let source = self.file_system.read_file(filename).await?;
        let module = Rc::new(Module::new(
            Rc::clone(&self.shaker),
            Rc::clone(&self.resolver),
            source,
            filename.to_string(),
            only_exports,
        ));
        self.modules
            .borrow_mut()
            .insert(filename.to_string(), Rc::clone(&module));

        Ok(module)
    }

    /// Depth-first scope expansion with concurrent sibling fan-out.
    /// Scope membership is set-once: a module already in scope is not
    /// re-expanded (its export set may still grow via `load_module_by_path`
    /// before snapshots are collected).
    fn prepare_module<'a>(
        &'a self,
        scope: &'a ModuleScope,
        module: Rc<Module>,
    ) -> LocalBoxFuture<'a, Result<(), TransformError>> {
        async move {
            if scope.borrow().contains_key(module.filename()) {
                return Ok(());
            }
            scope
                .borrow_mut()
                .insert(module.filename().to_string(), Rc::clone(&module));

            let snapshot = module.get_snapshot().await?;

            let mut pending: Vec<(String, Vec<String>)> = Vec::new();
            for (specifier, resolve_result) in &snapshot.resolved_imports {
                if resolve_result.is_asset {
                    continue;
                }
                let only_exports: Vec<String> = snapshot
                    .alive_imports
                    .get(specifier)
                    .map(|imports| imports.iter().map(|i| i.imported_name.clone()).collect())
                    .unwrap_or_default();
                pending.push((resolve_result.path.clone(), only_exports));
            }

            let tasks = pending.into_iter().map(|(path, only_exports)| async move {
                let imported = self.load_module_by_path(&path, &only_exports).await?;
                self.prepare_module(scope, imported).await
            });
            futures::future::try_join_all(tasks).await?;

            Ok(())
        }
        .boxed_local()
    }

    /// Evaluate a synthetic root module and return its exports object
    pub async fn evaluate_root_module(
        &self,
        code: &str,
        path: &str,
        only_exports: &[String],
    ) -> Result<Value, TransformError> {
        let entrypoint_path = format!("{}{}", path, ENTRYPOINT_SUFFIX);
        debug!("evaluating root module {}", entrypoint_path);

        let module = Rc::new(Module::new(
            Rc::clone(&self.shaker),
            Rc::clone(&self.resolver),
            code.to_string(),
            entrypoint_path.clone(),
            only_exports,
        ));

        let scope: ModuleScope = RefCell::new(IndexMap::new());
        self.prepare_module(&scope, module).await?;

        // Collect final snapshots in first-visited order. Lazy `require`
        // makes the concatenation order immaterial; only presence matters.
        let members: Vec<Rc<Module>> = scope.borrow().values().cloned().collect();
        let mut sources = String::new();
        for member in &members {
            let snapshot = member.get_snapshot().await?;
            sources.push_str(&snapshot.code);
            sources.push('\n');
        }
        debug!("module scope holds {} modules", members.len());

        // One isolated sandbox per evaluation; its registry dies with it
        let mut sandbox = Sandbox::new();
        sandbox
            .execute(&sources)
            .map_err(|e| TransformError::SandboxExecution {
                module: entrypoint_path.clone(),
                message: e.message,
            })?;

        sandbox
            .require(&entrypoint_path)
            .map_err(|e| TransformError::SandboxExecution {
                module: entrypoint_path.clone(),
                message: e.message,
            })
    }
}

/// Wire up a module service over the real filesystem with the baseline
/// shaker and Node-style resolver
pub fn create_module_service() -> ModuleService {
    ModuleService::new(
        Rc::new(OsFileSystemService::new()),
        Rc::new(NodeResolverService::new()),
        Rc::new(ReachabilityShaker::new()),
    )
}
