//! Tree shaking behind a pluggable trait
//!
//! The production shaker is an external collaborator consumed as a pure
//! function: given source, filename and a list of required export names it
//! returns a minimally pruned program. [`ReachabilityShaker`] is the
//! baseline implementation shipped with the workspace:
//!
//! - requested export statements are kept (`*` keeps all exports)
//! - declarations transitively referenced from kept roots are kept
//! - imports are split into single-specifier declarations, keeping only
//!   referenced bindings (the rewriter requires the single-specifier form)
//! - `export const x = …` is normalised into a declaration plus an export
//!   specifier list so exports can be filtered independently
//! - top-level side-effect statements are dropped
//!
//! The pruning is per-statement: a multi-declarator statement is kept whole
//! if any of its bindings is needed.

use std::collections::HashSet;

use log::debug;
use parser::js_ast::*;
use parser::parse_program;
use parser::visit::{walk_expression, Visit};

use crate::error::TransformError;

/// Pure tree-shaking interface
pub trait Shaker {
    fn shake(
        &self,
        filename: &str,
        code: &str,
        only_exports: &[String],
    ) -> Result<Program, TransformError>;
}

/// Baseline reachability-based shaker
#[derive(Default)]
pub struct ReachabilityShaker;

impl ReachabilityShaker {
    pub fn new() -> Self {
        Self
    }
}

impl Shaker for ReachabilityShaker {
    fn shake(
        &self,
        filename: &str,
        code: &str,
        only_exports: &[String],
    ) -> Result<Program, TransformError> {
        let program = parse_program(filename, code)?;
        debug!("shaker: {} only_exports {:?}", filename, only_exports);

        let keep_all = only_exports.iter().any(|name| name == "*");
        let requested: HashSet<&str> = only_exports.iter().map(String::as_str).collect();

        // Names needed by kept code, seeded from the requested exports
        let mut needed: HashSet<String> = HashSet::new();
        // Statement indices kept as export roots
        let mut root_indices: HashSet<usize> = HashSet::new();

        for (index, statement) in program.body.iter().enumerate() {
            match statement {
                Statement::ExportNamed(export) => {
                    if let Some(declaration) = &export.declaration {
                        let declared = declared_names(declaration);
                        let wanted: Vec<&String> = declared
                            .iter()
                            .filter(|name| keep_all || requested.contains(name.as_str()))
                            .collect();
                        if !wanted.is_empty() {
                            root_indices.insert(index);
                            for name in declared {
                                needed.insert(name);
                            }
                            for name in free_identifiers_of_statement(declaration) {
                                needed.insert(name);
                            }
                        }
                    } else {
                        let kept: Vec<&ExportSpecifier> = export
                            .specifiers
                            .iter()
                            .filter(|s| keep_all || requested.contains(s.exported.name.as_str()))
                            .collect();
                        if !kept.is_empty() {
                            root_indices.insert(index);
                            if export.source.is_none() {
                                for specifier in kept {
                                    needed.insert(specifier.local.name.clone());
                                }
                            }
                        }
                    }
                }
                Statement::ExportDefault(export) => {
                    if keep_all || requested.contains("default") {
                        root_indices.insert(index);
                        let mut collector = IdentifierCollector::default();
                        collector.visit_expression(&export.expression);
                        needed.extend(collector.names);
                    }
                }
                Statement::ExportAll(_) => {
                    // Concrete re-exported names are unknown statically;
                    // keep the statement whenever any export is requested
                    if keep_all || !requested.is_empty() {
                        root_indices.insert(index);
                    }
                }
                _ => {}
            }
        }

        // Propagate reachability through top-level declarations
        loop {
            let mut changed = false;
            for statement in &program.body {
                let declared = declared_names(statement);
                if declared.is_empty() {
                    continue;
                }
                if declared.iter().any(|name| needed.contains(name)) {
                    for name in free_identifiers_of_statement(statement) {
                        if needed.insert(name) {
                            changed = true;
                        }
                    }
                    for name in declared {
                        if needed.insert(name) {
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        let mut body = Vec::new();
        for (index, statement) in program.body.into_iter().enumerate() {
            match statement {
                Statement::Import(import) => {
                    for specifier in split_import(import) {
                        let local = &specifier.specifiers[0].local.name;
                        if needed.contains(local) {
                            body.push(Statement::Import(specifier));
                        }
                    }
                }
                Statement::ExportNamed(export) => {
                    if let Some(declaration) = export.declaration {
                        let is_root = root_indices.contains(&index);
                        let declared = declared_names(&declaration);
                        let is_needed = declared.iter().any(|name| needed.contains(name));
                        if !is_root && !is_needed {
                            continue;
                        }

                        // Normalised form: plain declaration plus a filtered
                        // export specifier list
                        body.push(*declaration);
                        if is_root {
                            let specifiers: Vec<ExportSpecifier> = declared
                                .into_iter()
                                .filter(|name| keep_all || requested.contains(name.as_str()))
                                .map(|name| ExportSpecifier {
                                    local: Identifier::new(name.clone()),
                                    exported: Identifier::new(name),
                                    span: Span::default(),
                                })
                                .collect();
                            if !specifiers.is_empty() {
                                body.push(Statement::ExportNamed(ExportNamedDeclaration {
                                    declaration: None,
                                    specifiers,
                                    source: None,
                                    span: Span::default(),
                                }));
                            }
                        }
                    } else if root_indices.contains(&index) {
                        let specifiers: Vec<ExportSpecifier> = export
                            .specifiers
                            .into_iter()
                            .filter(|s| keep_all || requested.contains(s.exported.name.as_str()))
                            .collect();

                        match export.source {
                            // Re-export: normalise to import + export so the
                            // rewriter only sees the two simple forms
                            Some(source) => {
                                let mut exports = Vec::new();
                                for specifier in specifiers {
                                    body.push(Statement::Import(ImportDeclaration {
                                        specifiers: vec![ImportSpecifier {
                                            kind: ImportSpecifierKind::Named {
                                                imported: specifier.local.clone(),
                                            },
                                            local: specifier.local.clone(),
                                            span: Span::default(),
                                        }],
                                        source: source.clone(),
                                        type_only: false,
                                        span: Span::default(),
                                    }));
                                    exports.push(specifier);
                                }
                                body.push(Statement::ExportNamed(ExportNamedDeclaration {
                                    declaration: None,
                                    specifiers: exports,
                                    source: None,
                                    span: Span::default(),
                                }));
                            }
                            None => {
                                body.push(Statement::ExportNamed(ExportNamedDeclaration {
                                    declaration: None,
                                    specifiers,
                                    source: None,
                                    span: Span::default(),
                                }));
                            }
                        }
                    }
                }
                Statement::ExportDefault(export) => {
                    if root_indices.contains(&index) {
                        body.push(Statement::ExportDefault(export));
                    }
                }
                Statement::ExportAll(export) => {
                    if root_indices.contains(&index) {
                        body.push(Statement::ExportAll(export));
                    }
                }
                Statement::Variable(_) | Statement::Function(_) => {
                    let declared = declared_names(&statement);
                    if declared.iter().any(|name| needed.contains(name)) {
                        body.push(statement);
                    }
                }
                // Side-effect statements, top-level control flow and
                // TypeScript-only declarations produce no exports
                _ => {}
            }
        }

        let span = Span::new(0, code.len());
        Ok(Program { body, span })
    }
}

/// Split a multi-specifier import into one declaration per specifier
fn split_import(import: ImportDeclaration) -> Vec<ImportDeclaration> {
    if import.type_only {
        return Vec::new();
    }
    import
        .specifiers
        .into_iter()
        .map(|specifier| ImportDeclaration {
            specifiers: vec![specifier],
            source: import.source.clone(),
            type_only: false,
            span: import.span,
        })
        .collect()
}

/// Names bound at the top level by a statement
pub fn declared_names(statement: &Statement) -> Vec<String> {
    match statement {
        Statement::Variable(declaration) => declaration
            .declarations
            .iter()
            .flat_map(|declarator| pattern_names(&declarator.id))
            .collect(),
        Statement::Function(declaration) => declaration
            .function
            .name
            .iter()
            .map(|id| id.name.clone())
            .collect(),
        Statement::Import(import) => import
            .specifiers
            .iter()
            .map(|specifier| specifier.local.name.clone())
            .collect(),
        Statement::ExportNamed(export) => export
            .declaration
            .as_ref()
            .map(|declaration| declared_names(declaration))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Names bound by a pattern
pub fn pattern_names(pattern: &Pattern) -> Vec<String> {
    match pattern {
        Pattern::Identifier(id) => vec![id.name.clone()],
        Pattern::Object(object) => {
            let mut names: Vec<String> = object
                .properties
                .iter()
                .flat_map(|property| pattern_names(&property.value))
                .collect();
            if let Some(rest) = &object.rest {
                names.push(rest.name.clone());
            }
            names
        }
        Pattern::Array(array) => array
            .elements
            .iter()
            .flatten()
            .flat_map(pattern_names)
            .collect(),
    }
}

/// All identifier references appearing in a statement's expressions
fn free_identifiers_of_statement(statement: &Statement) -> Vec<String> {
    let mut collector = IdentifierCollector::default();
    collector.visit_statement(statement);
    collector.names
}

#[derive(Default)]
struct IdentifierCollector {
    names: Vec<String>,
}

impl Visit for IdentifierCollector {
    fn visit_expression(&mut self, expression: &Expression) {
        if let Expression::Identifier(id) = expression {
            self.names.push(id.name.clone());
        }
        walk_expression(self, expression);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::program_to_code;

    fn shake_to_code(source: &str, only_exports: &[&str]) -> String {
        let shaker = ReachabilityShaker::new();
        let only: Vec<String> = only_exports.iter().map(|s| s.to_string()).collect();
        let program = shaker.shake("test.ts", source, &only).expect("shake should succeed");
        program_to_code(&program)
    }

    #[test]
    fn test_unrequested_exports_are_dropped() {
        let code = shake_to_code(
            "export const foo = 'foo';\nexport const bar = 'bar';",
            &["foo"],
        );
        assert!(code.contains("foo"));
        assert!(!code.contains("bar"));
    }

    #[test]
    fn test_star_keeps_all_exports() {
        let code = shake_to_code(
            "export const foo = 'foo';\nexport const bar = 'bar';",
            &["*"],
        );
        assert!(code.contains("foo"));
        assert!(code.contains("bar"));
    }

    #[test]
    fn test_transitive_references_are_kept() {
        let code = shake_to_code(
            "const base = 'b';\nconst helper = () => base;\nconst unused = 'u';\nexport const foo = helper();",
            &["foo"],
        );
        assert!(code.contains("base"));
        assert!(code.contains("helper"));
        assert!(!code.contains("unused"));
    }

    #[test]
    fn test_unreferenced_imports_are_dropped() {
        let code = shake_to_code(
            "import { used } from './used';\nimport { unused } from './unused';\nexport const foo = used;",
            &["foo"],
        );
        assert!(code.contains("./used"));
        assert!(!code.contains("./unused"));
    }

    #[test]
    fn test_multi_specifier_imports_are_split() {
        let code = shake_to_code(
            "import { a, b } from './m';\nexport const foo = a + b;",
            &["foo"],
        );
        // Two separate single-specifier imports
        assert_eq!(code.matches("from \"./m\";").count(), 2);
    }

    #[test]
    fn test_side_effect_statements_are_dropped() {
        let code = shake_to_code(
            "import { run } from './utils';\nrun();\ndocument.title = 'x';\nexport const foo = 1;",
            &["foo"],
        );
        assert!(!code.contains("run"));
        assert!(!code.contains("document"));
    }

    #[test]
    fn test_export_with_declaration_is_normalised() {
        let code = shake_to_code("export const foo = 1;", &["foo"]);
        assert!(code.contains("const foo = 1;"));
        assert!(code.contains("export { foo };"));
    }

    #[test]
    fn test_reexport_is_normalised_to_import_plus_export() {
        let code = shake_to_code("export { a } from './m';", &["a"]);
        assert!(code.contains("import { a } from \"./m\";"));
        assert!(code.contains("export { a };"));
    }

    #[test]
    fn test_export_star_is_kept_when_exports_requested() {
        let code = shake_to_code("export * from './tokens';", &["anything"]);
        assert!(code.contains("export * from \"./tokens\";"));
    }

    #[test]
    fn test_type_only_statements_are_dropped() {
        let code = shake_to_code(
            "import type { T } from './types';\ntype Local = string;\nexport const foo = 1;",
            &["foo"],
        );
        assert!(!code.contains("./types"));
        assert!(!code.contains("Local"));
    }
}
