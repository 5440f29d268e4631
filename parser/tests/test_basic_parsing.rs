//! Basic parsing tests for the module subset

use parser::js_ast::*;
use parser::parse_program;

fn parse(source: &str) -> Program {
    parse_program("test.ts", source).expect("source should parse")
}

#[test]
fn test_parse_empty_module() {
    let program = parse("");
    assert!(program.body.is_empty());
}

#[test]
fn test_parse_const_declaration() {
    let program = parse("const a = 1;");
    assert_eq!(program.body.len(), 1);

    match &program.body[0] {
        Statement::Variable(decl) => {
            assert_eq!(decl.kind, VariableKind::Const);
            assert_eq!(decl.declarations.len(), 1);
            match &decl.declarations[0].id {
                Pattern::Identifier(id) => assert_eq!(id.name, "a"),
                other => panic!("expected identifier pattern, got {:?}", other),
            }
        }
        other => panic!("expected variable declaration, got {:?}", other),
    }
}

#[test]
fn test_parse_import_named() {
    let program = parse("import { makeStyles } from '@griffel/core';");

    match &program.body[0] {
        Statement::Import(import) => {
            assert_eq!(import.source.value, "@griffel/core");
            assert_eq!(import.specifiers.len(), 1);
            match &import.specifiers[0].kind {
                ImportSpecifierKind::Named { imported } => {
                    assert_eq!(imported.name, "makeStyles");
                }
                other => panic!("expected named specifier, got {:?}", other),
            }
            assert_eq!(import.specifiers[0].local.name, "makeStyles");
        }
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_parse_import_aliased_and_default() {
    let program = parse("import React, { useState as useLocalState } from 'react';");

    match &program.body[0] {
        Statement::Import(import) => {
            assert_eq!(import.specifiers.len(), 2);
            assert!(matches!(import.specifiers[0].kind, ImportSpecifierKind::Default));
            assert_eq!(import.specifiers[0].local.name, "React");
            match &import.specifiers[1].kind {
                ImportSpecifierKind::Named { imported } => assert_eq!(imported.name, "useState"),
                other => panic!("expected named specifier, got {:?}", other),
            }
            assert_eq!(import.specifiers[1].local.name, "useLocalState");
        }
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_parse_import_namespace() {
    let program = parse("import * as utils from './utils';");

    match &program.body[0] {
        Statement::Import(import) => {
            assert!(matches!(import.specifiers[0].kind, ImportSpecifierKind::Namespace));
            assert_eq!(import.specifiers[0].local.name, "utils");
        }
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_parse_side_effect_import() {
    let program = parse("import './polyfill';");

    match &program.body[0] {
        Statement::Import(import) => {
            assert!(import.specifiers.is_empty());
            assert_eq!(import.source.value, "./polyfill");
        }
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_parse_import_type_is_marked() {
    let program = parse("import type { GriffelStyle } from '@griffel/core';");

    match &program.body[0] {
        Statement::Import(import) => assert!(import.type_only),
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_parse_export_const() {
    let program = parse("export const classes = makeStyles({});");

    match &program.body[0] {
        Statement::ExportNamed(export) => {
            assert!(export.declaration.is_some());
            assert!(export.specifiers.is_empty());
        }
        other => panic!("expected export, got {:?}", other),
    }
}

#[test]
fn test_parse_export_specifiers() {
    let program = parse("export { a, b as c };");

    match &program.body[0] {
        Statement::ExportNamed(export) => {
            assert!(export.declaration.is_none());
            assert_eq!(export.specifiers.len(), 2);
            assert_eq!(export.specifiers[0].local.name, "a");
            assert_eq!(export.specifiers[0].exported.name, "a");
            assert_eq!(export.specifiers[1].local.name, "b");
            assert_eq!(export.specifiers[1].exported.name, "c");
        }
        other => panic!("expected export, got {:?}", other),
    }
}

#[test]
fn test_parse_export_as_default() {
    let program = parse("export { x as default };");

    match &program.body[0] {
        Statement::ExportNamed(export) => {
            assert_eq!(export.specifiers[0].exported.name, "default");
        }
        other => panic!("expected export, got {:?}", other),
    }
}

#[test]
fn test_parse_export_star() {
    let program = parse("export * from './tokens';");

    match &program.body[0] {
        Statement::ExportAll(export) => assert_eq!(export.source.value, "./tokens"),
        other => panic!("expected export *, got {:?}", other),
    }
}

#[test]
fn test_parse_call_with_object_argument() {
    let program = parse("const c = makeStyles({ root: { color: 'red' } });");

    let init = match &program.body[0] {
        Statement::Variable(decl) => decl.declarations[0].init.as_ref().unwrap(),
        other => panic!("expected variable declaration, got {:?}", other),
    };

    match init {
        Expression::Call(call) => {
            match call.callee.as_ref() {
                Expression::Identifier(id) => assert_eq!(id.name, "makeStyles"),
                other => panic!("expected identifier callee, got {:?}", other),
            }
            assert_eq!(call.arguments.len(), 1);
            assert!(matches!(call.arguments[0], Expression::Object(_)));
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn test_spans_point_into_source() {
    let source = "const c = makeStyles({ root: {} });";
    let program = parse(source);

    let init = match &program.body[0] {
        Statement::Variable(decl) => decl.declarations[0].init.as_ref().unwrap(),
        other => panic!("expected variable declaration, got {:?}", other),
    };

    let span = init.span();
    assert_eq!(&source[span.start..span.end], "makeStyles({ root: {} })");

    match init {
        Expression::Call(call) => {
            let arg_span = call.arguments[0].span();
            assert_eq!(&source[arg_span.start..arg_span.end], "{ root: {} }");
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_arrow_functions() {
    let program = parse("const f = (rule) => ({ color: tokens.brand, ...rule });");

    let init = match &program.body[0] {
        Statement::Variable(decl) => decl.declarations[0].init.as_ref().unwrap(),
        other => panic!("expected variable declaration, got {:?}", other),
    };

    match init {
        Expression::Arrow(arrow) => {
            assert_eq!(arrow.params.len(), 1);
            assert!(matches!(arrow.body, ArrowBody::Expression(_)));
        }
        other => panic!("expected arrow, got {:?}", other),
    }
}

#[test]
fn test_parse_single_param_arrow_without_parens() {
    let program = parse("const f = x => x + 1;");

    let init = match &program.body[0] {
        Statement::Variable(decl) => decl.declarations[0].init.as_ref().unwrap(),
        other => panic!("expected variable declaration, got {:?}", other),
    };

    assert!(matches!(init, Expression::Arrow(_)));
}

#[test]
fn test_parse_template_literal() {
    let program = parse("const s = `url(${asset}) no-repeat`;");

    let init = match &program.body[0] {
        Statement::Variable(decl) => decl.declarations[0].init.as_ref().unwrap(),
        other => panic!("expected variable declaration, got {:?}", other),
    };

    match init {
        Expression::Template(template) => {
            assert_eq!(template.quasis.len(), 2);
            assert_eq!(template.expressions.len(), 1);
            assert_eq!(template.quasis[0].cooked, "url(");
            assert_eq!(template.quasis[1].cooked, ") no-repeat");
        }
        other => panic!("expected template, got {:?}", other),
    }
}

#[test]
fn test_parse_object_destructuring() {
    let program = parse("const { default: styles, other } = require('./m');");

    match &program.body[0] {
        Statement::Variable(decl) => match &decl.declarations[0].id {
            Pattern::Object(object) => {
                assert_eq!(object.properties.len(), 2);
                assert!(!object.properties[0].shorthand);
                assert!(object.properties[1].shorthand);
            }
            other => panic!("expected object pattern, got {:?}", other),
        },
        other => panic!("expected variable declaration, got {:?}", other),
    }
}

#[test]
fn test_parse_typescript_annotations_are_discarded() {
    let program = parse("const x: Record<string, number> = { a: 1 };\nfunction f(a: string): string { return a; }");
    assert_eq!(program.body.len(), 2);
    assert!(matches!(program.body[0], Statement::Variable(_)));
    assert!(matches!(program.body[1], Statement::Function(_)));
}

#[test]
fn test_parse_type_alias_and_interface_are_droppable() {
    let program = parse("type A = { a: string };\ninterface B { b: number }\nconst x = 1;");
    assert!(matches!(program.body[0], Statement::TypeAlias(_)));
    assert!(matches!(program.body[1], Statement::Interface(_)));
    assert!(matches!(program.body[2], Statement::Variable(_)));
}

#[test]
fn test_parse_as_cast_is_discarded() {
    let program = parse("const x = value as Record<string, string>;");
    match &program.body[0] {
        Statement::Variable(decl) => {
            assert!(matches!(
                decl.declarations[0].init.as_ref().unwrap(),
                Expression::Identifier(_)
            ));
        }
        other => panic!("expected variable declaration, got {:?}", other),
    }
}

#[test]
fn test_parse_comments_are_skipped() {
    let program = parse("// leading\nconst a = 1; /* inline */ const b = 2;");
    assert_eq!(program.body.len(), 2);
}

#[test]
fn test_parse_semicolons_are_optional() {
    let program = parse("const a = 1\nconst b = 2\nexport { a, b }");
    assert_eq!(program.body.len(), 3);
}

#[test]
fn test_parse_control_flow() {
    let program = parse(
        "function pick(v) {\n  if (v) { return v; } else { return null; }\n}\nfor (const x of xs) { use(x); }\nwhile (cond) { step(); }",
    );
    assert!(matches!(program.body[0], Statement::Function(_)));
    assert!(matches!(program.body[1], Statement::ForOf(_)));
    assert!(matches!(program.body[2], Statement::While(_)));
}

#[test]
fn test_parse_error_reports_position() {
    let error = parse_program("bad.ts", "const a = ;").unwrap_err();
    assert_eq!(error.filename, "bad.ts");
    assert_eq!(error.line, 1);
    assert!(error.column > 1);
}

#[test]
fn test_parse_error_on_class() {
    assert!(parse_program("bad.ts", "class Foo {}").is_err());
}

#[test]
fn test_parse_export_default() {
    let program = parse("export default { a: 1 };");
    assert!(matches!(program.body[0], Statement::ExportDefault(_)));
}

#[test]
fn test_parse_spread_in_call_and_object() {
    let program = parse("const merged = assign({ ...base, extra: 1 }, ...rest);");
    match &program.body[0] {
        Statement::Variable(decl) => {
            let init = decl.declarations[0].init.as_ref().unwrap();
            match init {
                Expression::Call(call) => {
                    assert_eq!(call.arguments.len(), 2);
                    assert!(matches!(call.arguments[1], Expression::Spread(_)));
                }
                other => panic!("expected call, got {:?}", other),
            }
        }
        other => panic!("expected variable declaration, got {:?}", other),
    }
}

#[test]
fn test_parse_member_chains() {
    let program = parse("const v = tokens.colors['brand'].primary;");
    match &program.body[0] {
        Statement::Variable(decl) => {
            assert!(matches!(
                decl.declarations[0].init.as_ref().unwrap(),
                Expression::Member(_)
            ));
        }
        other => panic!("expected variable declaration, got {:?}", other),
    }
}

#[test]
fn test_parse_conditional_and_logical() {
    let program = parse("const v = a && b ? c || d : e ?? f;");
    match &program.body[0] {
        Statement::Variable(decl) => {
            assert!(matches!(
                decl.declarations[0].init.as_ref().unwrap(),
                Expression::Conditional(_)
            ));
        }
        other => panic!("expected variable declaration, got {:?}", other),
    }
}
