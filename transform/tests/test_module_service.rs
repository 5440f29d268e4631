//! Module registry tests over mock services

use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::block_on;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use transform::testing::{MockFileSystemService, MockResolverService};
use transform::{
    FileSystemService, ModuleResolveResult, ModuleService, ReachabilityShaker, TransformError,
};
use wd40_runtime::Value;

fn service(files: &[(&str, &str)], resolutions: &[(&str, ModuleResolveResult)]) -> ModuleService {
    ModuleService::new(
        Rc::new(MockFileSystemService::new(files)),
        Rc::new(MockResolverService::new(resolutions)),
        Rc::new(ReachabilityShaker::new()),
    )
}

fn export_value(exports: &Value, name: &str) -> String {
    match exports {
        Value::Object(exports) => exports
            .borrow()
            .get(name)
            .map(|v| v.to_display_string())
            .unwrap_or_else(|| panic!("missing export {}", name)),
        other => panic!("expected exports object, got {:?}", other),
    }
}

fn has_export(exports: &Value, name: &str) -> bool {
    match exports {
        Value::Object(exports) => exports.borrow().get(name).is_some(),
        other => panic!("expected exports object, got {:?}", other),
    }
}

#[test]
fn test_evaluate_root_module() {
    let service = service(&[], &[]);
    let exports = block_on(service.evaluate_root_module(
        "export const foo = 'foo';\nexport const bar = 'bar';",
        "fixture.ts",
        &["foo".to_string()],
    ))
    .expect("evaluation should succeed");

    assert_eq!(export_value(&exports, "foo"), "foo");
    // Unrequested exports are shaken away
    assert!(!has_export(&exports, "bar"));
}

#[test]
fn test_evaluate_root_module_with_import() {
    let service = service(
        &[("/src/baz.ts", "export const baz = 'baz';")],
        &[("./baz", ModuleResolveResult::module("/src/baz.ts"))],
    );

    let exports = block_on(service.evaluate_root_module(
        "import { baz } from './baz';\n\nexport const foo = 'foo' + baz;",
        "./fixture.ts",
        &["foo".to_string()],
    ))
    .expect("evaluation should succeed");

    assert_eq!(export_value(&exports, "foo"), "foobaz");
}

#[test]
fn test_evaluate_root_module_with_bare_specifier() {
    let service = service(
        &[("/src/baz.ts", "export const baz = 'baz';")],
        &[("@baz/baz", ModuleResolveResult::module("/src/baz.ts"))],
    );

    let exports = block_on(service.evaluate_root_module(
        "import { baz } from '@baz/baz';\n\nexport const foo = 'foo' + baz;\nexport const bar = 'bar';",
        "./fixture.ts",
        &["foo".to_string()],
    ))
    .expect("evaluation should succeed");

    assert_eq!(export_value(&exports, "foo"), "foobaz");
    assert!(!has_export(&exports, "bar"));
}

#[test]
fn test_transitive_module_scope() {
    let service = service(
        &[
            ("/src/mixins.ts", "import { tokens } from './tokens';\nexport const mixin = { color: tokens.brand };"),
            ("/src/tokens.ts", "export const tokens = { brand: 'blue' };"),
        ],
        &[
            ("./mixins", ModuleResolveResult::module("/src/mixins.ts")),
            ("./tokens", ModuleResolveResult::module("/src/tokens.ts")),
        ],
    );

    let exports = block_on(service.evaluate_root_module(
        "import { mixin } from './mixins';\nexport const color = mixin.color;",
        "/src/entry.ts",
        &["color".to_string()],
    ))
    .expect("evaluation should succeed");

    assert_eq!(export_value(&exports, "color"), "blue");
    assert_eq!(service.module_count(), 2);
}

#[test]
fn test_export_star_reexports() {
    let service = service(
        &[
            ("/src/tokens.ts", "export * from './colors';"),
            ("/src/colors.ts", "export const brand = 'rebeccapurple';"),
        ],
        &[
            ("./tokens", ModuleResolveResult::module("/src/tokens.ts")),
            ("./colors", ModuleResolveResult::module("/src/colors.ts")),
        ],
    );

    let exports = block_on(service.evaluate_root_module(
        "import { brand } from './tokens';\nexport const color = brand;",
        "/src/entry.ts",
        &["color".to_string()],
    ))
    .expect("evaluation should succeed");

    assert_eq!(export_value(&exports, "color"), "rebeccapurple");
}

#[test]
fn test_asset_imports_are_not_loaded() {
    let service = service(
        &[],
        &[("./img.png", ModuleResolveResult::asset("/src/img.png"))],
    );

    let exports = block_on(service.evaluate_root_module(
        "import img from './img.png';\nexport const url = 'url(' + img + ')';",
        "/src/entry.ts",
        &["url".to_string()],
    ))
    .expect("assets must not be loaded as modules");

    assert_eq!(
        export_value(&exports, "url"),
        "url(@wd40-asset:/src/img.png:@wd40-asset)"
    );
    // The asset never became a module
    assert_eq!(service.module_count(), 0);
}

#[test]
fn test_module_not_found_propagates() {
    let service = service(&[], &[]);
    let error = block_on(service.evaluate_root_module(
        "import { x } from './missing';\nexport const foo = x;",
        "/src/entry.ts",
        &["foo".to_string()],
    ))
    .unwrap_err();

    match error {
        TransformError::ModuleNotFound { specifier, importer } => {
            assert_eq!(specifier, "./missing");
            assert!(importer.contains("entry.ts"));
        }
        other => panic!("expected ModuleNotFound, got {:?}", other),
    }
}

#[test]
fn test_sandbox_failure_propagates() {
    let service = service(&[], &[]);
    let error = block_on(service.evaluate_root_module(
        "export const foo = missingBinding;",
        "/src/entry.ts",
        &["foo".to_string()],
    ))
    .unwrap_err();

    match error {
        TransformError::SandboxExecution { module, message } => {
            assert!(module.contains("entry.ts?entrypoint"));
            assert!(message.contains("missingBinding"));
        }
        other => panic!("expected SandboxExecution, got {:?}", other),
    }
}

#[test]
fn test_modules_are_reused_across_evaluations() {
    let service = service(
        &[("/src/shared.ts", "export const shared = 'shared';")],
        &[("./shared", ModuleResolveResult::module("/src/shared.ts"))],
    );

    for _ in 0..2 {
        let exports = block_on(service.evaluate_root_module(
            "import { shared } from './shared';\nexport const foo = shared;",
            "/src/entry.ts",
            &["foo".to_string()],
        ))
        .expect("evaluation should succeed");
        assert_eq!(export_value(&exports, "foo"), "shared");
    }

    assert_eq!(service.module_count(), 1);
}

/// Counts reads per path, to observe the single-flight guard
struct CountingFileSystem {
    inner: MockFileSystemService,
    reads: RefCell<Vec<String>>,
}

impl FileSystemService for CountingFileSystem {
    fn read_file<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Result<String, TransformError>> {
        self.reads.borrow_mut().push(path.to_string());
        self.inner.read_file(path)
    }
}

#[test]
fn test_shared_module_is_read_once() {
    let reads = Rc::new(CountingFileSystem {
        inner: MockFileSystemService::new(&[
            ("/src/a.ts", "import { shared } from './shared';\nexport const a = shared + '-a';"),
            ("/src/b.ts", "import { shared } from './shared';\nexport const b = shared + '-b';"),
            ("/src/shared.ts", "export const shared = 'shared';"),
        ]),
        reads: RefCell::new(Vec::new()),
    });

    let service = ModuleService::new(
        Rc::clone(&reads) as Rc<dyn FileSystemService>,
        Rc::new(MockResolverService::new(&[
            ("./a", ModuleResolveResult::module("/src/a.ts")),
            ("./b", ModuleResolveResult::module("/src/b.ts")),
            ("./shared", ModuleResolveResult::module("/src/shared.ts")),
        ])),
        Rc::new(ReachabilityShaker::new()),
    );

    // Both imports of ./shared expand concurrently from the root's fan-out
    let exports = block_on(service.evaluate_root_module(
        "import { a } from './a';\nimport { b } from './b';\nexport const joined = a + ' ' + b;",
        "/src/entry.ts",
        &["joined".to_string()],
    ))
    .expect("evaluation should succeed");

    assert_eq!(export_value(&exports, "joined"), "shared-a shared-b");

    let shared_reads = reads
        .reads
        .borrow()
        .iter()
        .filter(|path| path.as_str() == "/src/shared.ts")
        .count();
    assert_eq!(shared_reads, 1, "single-flight guard must deduplicate the load");
}

#[test]
fn test_growing_exports_across_importers() {
    let service = service(
        &[
            ("/src/tokens.ts", "export const brand = 'blue';\nexport const accent = 'red';"),
            ("/src/a.ts", "import { brand } from './tokens';\nexport const a = brand;"),
            ("/src/b.ts", "import { accent } from './tokens';\nexport const b = accent;"),
        ],
        &[
            ("./tokens", ModuleResolveResult::module("/src/tokens.ts")),
            ("./a", ModuleResolveResult::module("/src/a.ts")),
            ("./b", ModuleResolveResult::module("/src/b.ts")),
        ],
    );

    // a requires { brand }, b requires { accent }; the tokens module's
    // export set grows across the two importers before snapshots finalize
    let exports = block_on(service.evaluate_root_module(
        "import { a } from './a';\nimport { b } from './b';\nexport const both = a + '/' + b;",
        "/src/entry.ts",
        &["both".to_string()],
    ))
    .expect("evaluation should succeed");

    assert_eq!(export_value(&exports, "both"), "blue/red");
}
