//! Sandbox loader and interpreter tests

use wd40_runtime::{Sandbox, Value};

fn exports_of(sandbox: &mut Sandbox, id: &str) -> wd40_runtime::ObjectRef {
    match sandbox.require(id).expect("require should succeed") {
        Value::Object(exports) => exports,
        other => panic!("expected exports object, got {:?}", other),
    }
}

#[test]
fn test_single_module_exports() {
    let mut sandbox = Sandbox::new();
    sandbox
        .execute(
            r#"
            __wd40_module("/src/a.ts", function (module, exports, require, export_star) {
                const foo = "foo";
                exports.foo = foo;
            });
            "#,
        )
        .expect("execute should succeed");

    let exports = exports_of(&mut sandbox, "/src/a.ts");
    let foo = exports.borrow().get("foo").expect("foo should be exported");
    assert_eq!(foo.to_display_string(), "foo");
}

#[test]
fn test_require_links_modules() {
    let mut sandbox = Sandbox::new();
    sandbox
        .execute(
            r#"
            __wd40_module("/src/b.ts", function (module, exports, require, export_star) {
                exports.baz = "baz";
            });
            __wd40_module("/src/a.ts", function (module, exports, require, export_star) {
                const { baz } = require("/src/b.ts");
                exports.foo = "foo" + baz;
            });
            "#,
        )
        .expect("execute should succeed");

    let exports = exports_of(&mut sandbox, "/src/a.ts");
    let foo = exports.borrow().get("foo").expect("foo should be exported");
    assert_eq!(foo.to_display_string(), "foobaz");
}

#[test]
fn test_module_instances_are_cached() {
    let mut sandbox = Sandbox::new();
    sandbox
        .execute(
            r#"
            __wd40_module("/src/counter.ts", function (module, exports, require, export_star) {
                exports.calls = 0;
                exports.calls += 1;
            });
            __wd40_module("/src/a.ts", function (module, exports, require, export_star) {
                const first = require("/src/counter.ts");
                const second = require("/src/counter.ts");
                exports.same = first === second;
                exports.calls = first.calls;
            });
            "#,
        )
        .expect("execute should succeed");

    let exports = exports_of(&mut sandbox, "/src/a.ts");
    assert!(exports.borrow().get("same").unwrap().is_truthy());
    assert_eq!(exports.borrow().get("calls").unwrap().to_number(), 1.0);
}

#[test]
fn test_circular_imports_observe_partial_exports() {
    let mut sandbox = Sandbox::new();
    sandbox
        .execute(
            r#"
            __wd40_module("/src/a.ts", function (module, exports, require, export_star) {
                exports.early = "a-early";
                const b = require("/src/b.ts");
                exports.fromB = b.value;
            });
            __wd40_module("/src/b.ts", function (module, exports, require, export_star) {
                const a = require("/src/a.ts");
                exports.sawEarly = a.early;
                exports.value = "b-value";
            });
            "#,
        )
        .expect("circular require should not deadlock");

    let a = exports_of(&mut sandbox, "/src/a.ts");
    assert_eq!(a.borrow().get("fromB").unwrap().to_display_string(), "b-value");

    let b = exports_of(&mut sandbox, "/src/b.ts");
    assert_eq!(b.borrow().get("sawEarly").unwrap().to_display_string(), "a-early");
}

#[test]
fn test_export_star_skips_default_and_existing() {
    let mut sandbox = Sandbox::new();
    sandbox
        .execute(
            r#"
            __wd40_module("/src/tokens.ts", function (module, exports, require, export_star) {
                exports.default = "token-default";
                exports.brand = "blue";
                exports.size = "large";
            });
            __wd40_module("/src/a.ts", function (module, exports, require, export_star) {
                exports.size = "own-size";
                export_star(require("/src/tokens.ts"), exports);
            });
            "#,
        )
        .expect("execute should succeed");

    let exports = exports_of(&mut sandbox, "/src/a.ts");
    let exports = exports.borrow();

    // Re-exported key
    assert_eq!(exports.get("brand").unwrap().to_display_string(), "blue");
    // `default` is never re-exported
    assert!(exports.get("default").is_none());
    // First writer wins
    assert_eq!(exports.get("size").unwrap().to_display_string(), "own-size");
}

#[test]
fn test_export_star_aliases_are_live() {
    let mut sandbox = Sandbox::new();
    sandbox
        .execute(
            r#"
            __wd40_module("/src/late.ts", function (module, exports, require, export_star) {
                exports.value = "before";
                exports.update = function (next) {
                    exports.value = next;
                };
            });
            __wd40_module("/src/a.ts", function (module, exports, require, export_star) {
                const late = require("/src/late.ts");
                export_star(late, exports);
                late.update("after");
            });
            "#,
        )
        .expect("execute should succeed");

    let exports = exports_of(&mut sandbox, "/src/a.ts");
    assert_eq!(exports.borrow().get("value").unwrap().to_display_string(), "after");
}

#[test]
fn test_missing_module_is_an_error() {
    let mut sandbox = Sandbox::new();
    let error = sandbox.require("/missing.ts").unwrap_err();
    assert!(error.message.contains("not registered"));
    assert!(error.message.contains("/missing.ts"));
}

#[test]
fn test_top_level_throw_is_an_error() {
    let mut sandbox = Sandbox::new();
    sandbox
        .execute(
            r#"
            __wd40_module("/src/bad.ts", function (module, exports, require, export_star) {
                throw new Error("boom at import time");
            });
            "#,
        )
        .expect("registration alone should succeed");

    let error = sandbox.require("/src/bad.ts").unwrap_err();
    assert!(error.message.contains("boom at import time"));
}

#[test]
fn test_evaluated_values_cover_the_expression_grammar() {
    let mut sandbox = Sandbox::new();
    sandbox
        .execute(
            r#"
            __wd40_module("/src/expr.ts", function (module, exports, require, export_star) {
                const base = { display: "block" };
                const createMixin = (rule) => ({ color: "red", ...rule });
                const styles = createMixin(base);

                exports.styles = styles;
                exports.template = `color: ${styles.color};`;
                exports.joined = ["a", "b"].map((s) => s.toUpperCase()).join("-");
                exports.math = Math.max(1, 2) + 40;
                exports.keys = Object.keys(styles);
                exports.ternary = styles.color === "red" ? "yes" : "no";
            });
            "#,
        )
        .expect("execute should succeed");

    let exports = exports_of(&mut sandbox, "/src/expr.ts");
    let exports = exports.borrow();

    assert_eq!(
        exports.get("template").unwrap().to_display_string(),
        "color: red;"
    );
    assert_eq!(exports.get("joined").unwrap().to_display_string(), "A-B");
    assert_eq!(exports.get("math").unwrap().to_number(), 42.0);
    assert_eq!(exports.get("ternary").unwrap().to_display_string(), "yes");

    match exports.get("styles").unwrap() {
        Value::Object(styles) => {
            let styles = styles.borrow();
            assert_eq!(styles.get("color").unwrap().to_display_string(), "red");
            assert_eq!(styles.get("display").unwrap().to_display_string(), "block");
            // Insertion order is preserved
            assert_eq!(styles.keys(), vec!["color".to_string(), "display".to_string()]);
        }
        other => panic!("expected object, got {:?}", other),
    }
}

#[test]
fn test_timers_are_inert() {
    let mut sandbox = Sandbox::new();
    sandbox
        .execute(
            r#"
            __wd40_module("/src/timers.ts", function (module, exports, require, export_star) {
                setTimeout(function () { exports.ran = true; }, 0);
                exports.ran = exports.ran || false;
            });
            "#,
        )
        .expect("execute should succeed");

    let exports = exports_of(&mut sandbox, "/src/timers.ts");
    assert!(!exports.borrow().get("ran").unwrap().is_truthy());
}

#[test]
fn test_json_roundtrip() {
    let mut sandbox = Sandbox::new();
    sandbox
        .execute(
            r#"
            __wd40_module("/src/json.ts", function (module, exports, require, export_star) {
                const parsed = JSON.parse('{"a": 1, "b": [true, null]}');
                exports.a = parsed.a;
                exports.text = JSON.stringify({ x: "y" });
            });
            "#,
        )
        .expect("execute should succeed");

    let exports = exports_of(&mut sandbox, "/src/json.ts");
    assert_eq!(exports.borrow().get("a").unwrap().to_number(), 1.0);
    assert_eq!(
        exports.borrow().get("text").unwrap().to_display_string(),
        "{\"x\":\"y\"}"
    );
}

#[test]
fn test_value_to_json_preserves_key_order() {
    let mut sandbox = Sandbox::new();
    sandbox
        .execute(
            r#"
            __wd40_module("/src/ordered.ts", function (module, exports, require, export_star) {
                exports.obj = { zebra: 1, apple: 2, mango: 3 };
            });
            "#,
        )
        .expect("execute should succeed");

    let exports = exports_of(&mut sandbox, "/src/ordered.ts");
    let json = exports.borrow().get("obj").unwrap().to_json();
    let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["zebra", "apple", "mango"]);
}
