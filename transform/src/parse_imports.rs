//! Import/export analysis over a parsed program
//!
//! Extracts the module specifiers a program references and the exact
//! bindings imported from each. `export * from 'm'` contributes a
//! `{*, *}` entry; `import * as ns` contributes `{*, ns}`; default imports
//! contribute `{default, local}`. Type-only imports are erased.

use indexmap::IndexMap;
use parser::js_ast::{ImportSpecifierKind, Program, Statement};

/// One imported binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImport {
    pub imported_name: String,
    pub local_name: String,
}

/// specifier → bindings imported from it, in source order
pub type ParsedImports = IndexMap<String, Vec<ParsedImport>>;

/// Collect all import/export-all references of a program
pub fn parse_imports(program: &Program) -> ParsedImports {
    let mut imports = ParsedImports::new();

    for node in &program.body {
        match node {
            Statement::ExportAll(export) => {
                imports
                    .entry(export.source.value.clone())
                    .or_default()
                    .push(ParsedImport {
                        imported_name: "*".to_string(),
                        local_name: "*".to_string(),
                    });
            }
            Statement::Import(import) => {
                if import.type_only {
                    continue;
                }

                let entry = imports.entry(import.source.value.clone()).or_default();
                for specifier in &import.specifiers {
                    let parsed = match &specifier.kind {
                        ImportSpecifierKind::Default => ParsedImport {
                            imported_name: "default".to_string(),
                            local_name: specifier.local.name.clone(),
                        },
                        ImportSpecifierKind::Named { imported } => ParsedImport {
                            imported_name: imported.name.clone(),
                            local_name: specifier.local.name.clone(),
                        },
                        ImportSpecifierKind::Namespace => ParsedImport {
                            imported_name: "*".to_string(),
                            local_name: specifier.local.name.clone(),
                        },
                    };
                    entry.push(parsed);
                }
            }
            _ => {}
        }
    }

    imports
}
