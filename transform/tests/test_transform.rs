//! End-to-end transform tests over mock services

mod common;

use std::rc::Rc;

use futures::executor::block_on;
use ::transform::testing::{MockFileSystemService, MockResolverService};
use ::transform::{
    transform, ModuleResolveResult, ModuleService, ReachabilityShaker, TransformError,
    TransformParams, TransformResult,
};

use common::{class_name, make_styles_config, property_key};

const FILENAME: &str = "/project/src/input.ts";
const PROJECT_ROOT: &str = "/project";

fn service_with(
    files: &[(&str, &str)],
    resolutions: &[(&str, ModuleResolveResult)],
) -> ModuleService {
    ModuleService::new(
        Rc::new(MockFileSystemService::new(files)),
        Rc::new(MockResolverService::new(resolutions)),
        Rc::new(ReachabilityShaker::new()),
    )
}

fn run_transform(
    source: &str,
    files: &[(&str, &str)],
    resolutions: &[(&str, ModuleResolveResult)],
) -> Result<TransformResult, TransformError> {
    let service = service_with(files, resolutions);
    let config = make_styles_config();
    block_on(transform(TransformParams {
        source_code: source,
        filename: FILENAME,
        project_root: PROJECT_ROOT,
        module_config: &config,
        module_service: &service,
    }))
}

#[test]
fn test_files_without_configured_modules_pass_through() {
    let source = "export const answer = 42;\n";
    let result = run_transform(source, &[], &[]).expect("transform should succeed");

    assert_eq!(result.code, source);
    assert_eq!(result.css_text, "");
    assert!(result.map.is_none());
}

#[test]
fn test_unhandled_specifiers_pass_through() {
    let source = "import { shorthands } from '@griffel/core';\nexport const s = shorthands;\n";
    let result = run_transform(source, &[], &[]).expect("transform should succeed");

    assert_eq!(result.code, source);
    assert_eq!(result.css_text, "");
}

#[test]
fn test_single_call_is_replaced() {
    let source = "import { makeStyles } from '@griffel/core';\nexport const c = makeStyles({ root: { color: 'red' } });\n";
    let result = run_transform(source, &[], &[]).expect("transform should succeed");

    let class = class_name("color", "red");
    let key = property_key("color");

    // The call is replaced with the injected runtime helper
    assert!(result.code.contains("import { __styles as ___styles0 } from \"@griffel/core\";"));
    assert!(result.code.contains("___styles0("));
    assert!(!result.code.contains("makeStyles({ root:"));

    // First argument maps the slot to the deterministic class
    assert!(result.code.contains("root"));
    assert!(result.code.contains(&key));
    assert!(result.code.contains(&class));

    // The rule text is in both the second argument and the CSS accumulator
    let rule = format!(".{}{{color:red;}}", class);
    assert!(result.code.contains(&rule));
    assert!(result.css_text.contains(&rule));

    // A source map is produced for edited files
    assert!(result.map.is_some());
}

#[test]
fn test_transform_is_deterministic() {
    let source = "import { makeStyles } from '@griffel/core';\nexport const c = makeStyles({ root: { color: 'red' } });\n";

    let first = run_transform(source, &[], &[]).expect("transform should succeed");
    let second = run_transform(source, &[], &[]).expect("transform should succeed");

    assert_eq!(first.code, second.code);
    assert_eq!(first.css_text, second.css_text);
}

#[test]
fn test_multiple_calls_receive_their_own_values() {
    let source = "import { makeStyles } from '@griffel/core';\n\
                  const classesA = makeStyles({ root: { color: 'green' } });\n\
                  const classesB = makeStyles({ root: { color: 'blue' } });\n";
    let result = run_transform(source, &[], &[]).expect("transform should succeed");

    let green = class_name("color", "green");
    let blue = class_name("color", "blue");
    assert_ne!(green, blue);

    // Each call site got the values of its own arguments, in order
    let green_index = result.code.find(&green).expect("green class in output");
    let blue_index = result.code.find(&blue).expect("blue class in output");
    assert!(green_index < blue_index);

    let a_index = result.code.find("classesA").expect("classesA stays");
    let b_index = result.code.find("classesB").expect("classesB stays");
    assert!(a_index < green_index && green_index < b_index);
    assert!(b_index < blue_index);

    assert!(result.css_text.contains(&format!(".{}{{color:green;}}", green)));
    assert!(result.css_text.contains(&format!(".{}{{color:blue;}}", blue)));
}

#[test]
fn test_aliased_macro_import_is_matched() {
    let source = "import { makeStyles as ms } from '@griffel/core';\nexport const c = ms({ root: { color: 'red' } });\n";
    let result = run_transform(source, &[], &[]).expect("transform should succeed");

    assert!(result.code.contains("___styles0("));
    assert!(!result.code.contains("ms({ root"));
}

#[test]
fn test_arguments_computed_through_imported_mixins() {
    let source = "import { makeStyles } from '@griffel/core';\n\
                  import { createMixin } from './mixins';\n\
                  export const c = makeStyles({ avatar: createMixin({ display: 'block' }) });\n";

    let mixins = "import { tokens } from './tokens';\n\
                  export const createMixin = (rule) => ({ color: tokens.colorBrand, ...rule });\n";
    let tokens = "export const tokens = { colorBrand: 'hotpink' };\n";

    let result = run_transform(
        source,
        &[("/project/src/mixins.ts", mixins), ("/project/src/tokens.ts", tokens)],
        &[
            ("./mixins", ModuleResolveResult::module("/project/src/mixins.ts")),
            ("./tokens", ModuleResolveResult::module("/project/src/tokens.ts")),
        ],
    )
    .expect("transform should succeed");

    let color_class = class_name("color", "hotpink");
    let display_class = class_name("display", "block");

    assert!(result.code.contains(&color_class));
    assert!(result.code.contains(&display_class));
    assert!(result.css_text.contains(&format!(".{}{{color:hotpink;}}", color_class)));
}

#[test]
fn test_asset_roundtrip_creates_relative_import() {
    let source = "import { makeStyles } from '@griffel/core';\n\
                  import blank from './blank.jpg';\n\
                  export const c = makeStyles({ root: { backgroundImage: `url(${blank})` } });\n";

    let result = run_transform(
        source,
        &[],
        &[("./blank.jpg", ModuleResolveResult::asset("/project/src/blank.jpg"))],
    )
    .expect("transform should succeed");

    // Exactly one fresh default import with the correct relative path
    assert_eq!(
        result.code.matches("import _asset1 from \"./blank.jpg\";").count(),
        1
    );
    // The marker became a template literal interpolating the identifier
    assert!(result.code.contains("url(${_asset1})"));
    // No marker text survives in the output
    assert!(!result.code.contains("@wd40-asset"));
    assert!(!result.css_text.contains("@wd40-asset"));
}

#[test]
fn test_duplicate_asset_references_get_distinct_imports() {
    let source = "import { makeStyles } from '@griffel/core';\n\
                  import blank from './blank.jpg';\n\
                  import dup from './blank.jpg';\n\
                  export const c = makeStyles({\n\
                    rootA: { backgroundImage: `url(${blank})` },\n\
                    rootB: { backgroundImage: `url(${dup})` }\n\
                  });\n";

    let result = run_transform(
        source,
        &[],
        &[("./blank.jpg", ModuleResolveResult::asset("/project/src/blank.jpg"))],
    )
    .expect("transform should succeed");

    assert!(result.code.contains("import _asset1 from \"./blank.jpg\";"));
    assert!(result.code.contains("import _asset2 from \"./blank.jpg\";"));
}

#[test]
fn test_namespace_import_feeding_a_macro_is_fatal() {
    let source = "import { makeStyles } from '@griffel/core';\n\
                  import * as tokens from './tokens';\n\
                  export const c = makeStyles({ root: { color: tokens.blue } });\n";

    let error = run_transform(
        source,
        &[("/project/src/tokens.ts", "export const blue = 'blue';")],
        &[("./tokens", ModuleResolveResult::module("/project/src/tokens.ts"))],
    )
    .unwrap_err();

    assert!(matches!(error, TransformError::WildcardImportUnsupported { .. }));
}

#[test]
fn test_unresolvable_import_is_fatal() {
    let source = "import { makeStyles } from '@griffel/core';\n\
                  import { missing } from './missing';\n\
                  export const c = makeStyles({ root: { color: missing } });\n";

    let error = run_transform(source, &[], &[]).unwrap_err();
    match error {
        TransformError::ModuleNotFound { specifier, importer } => {
            assert_eq!(specifier, "./missing");
            assert!(importer.contains("input.ts"));
        }
        other => panic!("expected ModuleNotFound, got {:?}", other),
    }
}

#[test]
fn test_parse_error_is_fatal() {
    let source = "import { makeStyles } from '@griffel/core';\nconst broken = ;\n";
    let error = run_transform(source, &[], &[]).unwrap_err();
    assert!(matches!(error, TransformError::Parse(_)));
}

#[test]
fn test_side_effect_statements_do_not_reach_the_sandbox() {
    // Top-level DOM access would fail evaluation if it survived shaking
    let source = "import { makeStyles } from '@griffel/core';\n\
                  const el = document.createElement('div');\n\
                  document.body.appendChild(el);\n\
                  export const c = makeStyles({ root: { color: 'red' } });\n";

    let result = run_transform(source, &[], &[]).expect("side effects are shaken away");
    assert!(result.code.contains("___styles0("));
    // The original side-effect statements stay untouched in the output
    assert!(result.code.contains("document.createElement"));
}
