//! Export/import rewriting into the wrapped sandbox form
//!
//! Deterministic per-statement rules:
//!
//! | source construct | rewritten form |
//! |---|---|
//! | `import { a } from 'm'` | `const { a } = require("<path>");` |
//! | `import { a as b } from 'm'` | `const { a: b } = require("<path>");` |
//! | `import a from 'm'` | `const { default: a } = require("<path>");` |
//! | `import * as a from 'm'` | `const a = require("<path>");` |
//! | `import a from './img.png'` | `const a = "<marker>";` |
//! | `import 'm'` | `require("<path>");` |
//! | `export { a as b }` | `exports.b = a;` |
//! | `export default e` | `exports.default = e;` |
//! | `export * from 'm'` | `export_star(require("<path>"), exports);` |
//!
//! Everything is wrapped once per module:
//! `__wd40_module("<filename>", function (module, exports, require, export_star) { … });`
//!
//! A non-asset import with more than one specifier is an enforced invariant
//! violation; the shaker is expected to have split these.

use indexmap::IndexMap;
use parser::codegen::quote_string;
use parser::expression_to_code;
use parser::js_ast::*;

use crate::constants::{ASSET_PREFIX, ASSET_SUFFIX};
use crate::error::TransformError;
use crate::resolver::ModuleResolveResult;
use crate::shaker::declared_names;

/// Rewrite a shaken program into its wrapped sandbox-loadable form
pub fn replace_exports_imports(
    filename: &str,
    program: Program,
    resolved_imports: &IndexMap<String, ModuleResolveResult>,
) -> Result<Program, TransformError> {
    let resolved = |source: &StringLiteral| -> Result<&ModuleResolveResult, TransformError> {
        resolved_imports
            .get(&source.value)
            .ok_or_else(|| TransformError::ModuleNotFound {
                specifier: source.value.clone(),
                importer: filename.to_string(),
            })
    };

    let mut body = Vec::new();

    for node in program.body {
        match node {
            Statement::Import(import) => {
                if import.type_only {
                    continue;
                }
                let target = resolved(&import.source)?;

                if target.is_asset {
                    if let Some(specifier) = import.specifiers.first() {
                        body.push(raw(format!(
                            "const {} = \"{}{}{}\";",
                            specifier.local.name, ASSET_PREFIX, target.path, ASSET_SUFFIX
                        )));
                    }
                    continue;
                }

                if import.specifiers.len() > 1 {
                    return Err(TransformError::UnsupportedSpecifierCount {
                        filename: filename.to_string(),
                    });
                }

                match import.specifiers.first() {
                    None => body.push(raw(format!("require({});", quote_string(&target.path)))),
                    Some(specifier) => {
                        body.push(raw(create_module_import(specifier, &target.path)))
                    }
                }
            }
            Statement::ExportNamed(export) => match export.declaration {
                None => {
                    for specifier in export.specifiers {
                        body.push(raw(format!(
                            "exports.{} = {};",
                            specifier.exported.name, specifier.local.name
                        )));
                    }
                }
                Some(declaration) => {
                    let names = declared_names(&declaration);
                    body.push(*declaration);
                    for name in names {
                        body.push(raw(format!("exports.{} = {};", name, name)));
                    }
                }
            },
            Statement::ExportDefault(export) => {
                body.push(raw(format!(
                    "exports.default = {};",
                    expression_to_code(&export.expression)
                )));
            }
            Statement::ExportAll(export) => {
                let target = resolved(&export.source)?;
                body.push(raw(format!(
                    "export_star(require({}), exports);",
                    quote_string(&target.path)
                )));
            }
            other => body.push(other),
        }
    }

    let span = program.span;
    Ok(Program {
        body: vec![Statement::ModuleWrapper(ModuleWrapper {
            filename: filename.to_string(),
            body,
            span,
        })],
        span,
    })
}

fn create_module_import(specifier: &ImportSpecifier, path: &str) -> String {
    let local = &specifier.local.name;
    let require_call = format!("require({})", quote_string(path));

    match &specifier.kind {
        ImportSpecifierKind::Named { imported } if imported.name == *local => {
            format!("const {{ {} }} = {};", local, require_call)
        }
        ImportSpecifierKind::Named { imported } => {
            format!("const {{ {}: {} }} = {};", imported.name, local, require_call)
        }
        ImportSpecifierKind::Default => {
            format!("const {{ default: {} }} = {};", local, require_call)
        }
        ImportSpecifierKind::Namespace => format!("const {} = {};", local, require_call),
    }
}

fn raw(text: String) -> Statement {
    Statement::Raw(RawStatement::new(text))
}
