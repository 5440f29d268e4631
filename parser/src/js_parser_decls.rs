//! Import/export, variable and function declaration parsing
//!
//! TypeScript type annotations are consumed by a balanced scanner
//! ([`ts_type`]) and discarded; `type`/`interface` declarations parse into
//! droppable placeholder statements.

use crate::js_ast::*;
use crate::js_parser::{
    block_statement, committed, err, fail, identifier_node, keyword, make_span, peek_keyword,
    peek_text, position, semi, string_literal, symbol, word_node, ws, PResult,
};
use crate::js_parser_expr::{assignment_expr, expression};

// =============================================================================
// Imports
// =============================================================================

/// Parse `import …;` in all supported forms
pub fn import_declaration<'a>(full: &'a str, input: &'a str) -> PResult<'a, Statement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("import")(input)?;

    // `import 'mod';` is a side-effect import
    if let Ok((input, source)) = string_literal(full, input) {
        let (rest, _) = semi(input)?;
        return Ok((
            rest,
            Statement::Import(ImportDeclaration {
                specifiers: Vec::new(),
                source,
                type_only: false,
                span: make_span(full, start, rest),
            }),
        ));
    }

    // `import type { … } from 'mod';` is type-only, but `import type from 'mod'` binds
    // a default import named `type`
    let (input, type_only) = if peek_keyword(input, "type") && !peek_keyword(input_after_type(input), "from")
    {
        (keyword("type")(input)?.0, true)
    } else {
        (input, false)
    };

    let (input, specifiers) = committed(import_specifiers(full, input))?;
    let (input, _) = committed(keyword("from")(input))?;
    let (input, source) = committed(string_literal(full, input))?;
    let (rest, _) = semi(input)?;

    Ok((
        rest,
        Statement::Import(ImportDeclaration {
            specifiers,
            source,
            type_only,
            span: make_span(full, start, rest),
        }),
    ))
}

fn input_after_type(input: &str) -> &str {
    match ws(input) {
        Ok((rest, _)) => rest.strip_prefix("type").unwrap_or(rest),
        Err(_) => input,
    }
}

fn import_specifiers<'a>(full: &'a str, input: &'a str) -> PResult<'a, Vec<ImportSpecifier>> {
    let mut specifiers = Vec::new();

    // Default specifier
    let input = if !peek_text(input, "{") && !peek_text(input, "*") {
        let (input, _) = ws(input)?;
        let spec_start = position(full, input);
        let (input, local) = identifier_node(full, input)?;
        specifiers.push(ImportSpecifier {
            kind: ImportSpecifierKind::Default,
            local,
            span: make_span(full, spec_start, input),
        });

        match symbol(",")(input) {
            Ok((rest, _)) => rest,
            Err(_) => {
                return Ok((input, specifiers));
            }
        }
    } else {
        input
    };

    if peek_text(input, "*") {
        let (input, _) = ws(input)?;
        let spec_start = position(full, input);
        let (input, _) = symbol("*")(input)?;
        let (input, _) = committed(keyword("as")(input))?;
        let (input, local) = committed(identifier_node(full, input))?;
        specifiers.push(ImportSpecifier {
            kind: ImportSpecifierKind::Namespace,
            local,
            span: make_span(full, spec_start, input),
        });
        return Ok((input, specifiers));
    }

    let (mut rest, _) = symbol("{")(input)?;
    loop {
        if let Ok((after, _)) = symbol("}")(rest) {
            return Ok((after, specifiers));
        }

        let (input, _) = ws(rest)?;
        let spec_start = position(full, input);
        let (input, imported) = word_node(full, input)?;
        let (input, local) = if peek_keyword(input, "as") {
            let (input, _) = keyword("as")(input)?;
            committed(identifier_node(full, input))?
        } else {
            (input, imported.clone())
        };
        specifiers.push(ImportSpecifier {
            kind: ImportSpecifierKind::Named { imported },
            local,
            span: make_span(full, spec_start, input),
        });

        rest = match symbol(",")(input) {
            Ok((after, _)) => after,
            Err(_) => {
                let (after, _) = committed(symbol("}")(input))?;
                return Ok((after, specifiers));
            }
        };
    }
}

// =============================================================================
// Exports
// =============================================================================

/// Parse `export …;` in all supported forms
pub fn export_declaration<'a>(full: &'a str, input: &'a str) -> PResult<'a, Statement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("export")(input)?;

    // `export * from 'mod';`
    if peek_text(input, "*") {
        let (input, _) = symbol("*")(input)?;
        let (input, _) = committed(keyword("from")(input))?;
        let (input, source) = committed(string_literal(full, input))?;
        let (rest, _) = semi(input)?;
        return Ok((
            rest,
            Statement::ExportAll(ExportAllDeclaration {
                source,
                span: make_span(full, start, rest),
            }),
        ));
    }

    // `export default <expr>;`
    if peek_keyword(input, "default") {
        let (input, _) = keyword("default")(input)?;
        let (input, expr) = committed(expression(full, input))?;
        let (rest, _) = semi(input)?;
        return Ok((
            rest,
            Statement::ExportDefault(ExportDefaultDeclaration {
                expression: expr,
                span: make_span(full, start, rest),
            }),
        ));
    }

    // `export type …` (alias or re-export, both dropped)
    if peek_keyword(input, "type") {
        return type_alias_declaration(full, input, true);
    }
    if peek_keyword(input, "interface") {
        return interface_declaration(full, input, true);
    }

    // `export { a, b as c } [from 'mod'];`
    if peek_text(input, "{") {
        let (input, specifiers) = committed(export_specifiers(full, input))?;
        let (input, source) = if peek_keyword(input, "from") {
            let (input, _) = keyword("from")(input)?;
            let (input, source) = committed(string_literal(full, input))?;
            (input, Some(source))
        } else {
            (input, None)
        };
        let (rest, _) = semi(input)?;
        return Ok((
            rest,
            Statement::ExportNamed(ExportNamedDeclaration {
                declaration: None,
                specifiers,
                source,
                span: make_span(full, start, rest),
            }),
        ));
    }

    // `export const x = …;` / `export function f() { … }`
    if peek_keyword(input, "const") || peek_keyword(input, "let") || peek_keyword(input, "var") {
        let (rest, decl) = committed(variable_declaration(full, input))?;
        return Ok((
            rest,
            Statement::ExportNamed(ExportNamedDeclaration {
                declaration: Some(Box::new(Statement::Variable(decl))),
                specifiers: Vec::new(),
                source: None,
                span: make_span(full, start, rest),
            }),
        ));
    }
    if peek_keyword(input, "function") {
        let (rest, decl) = committed(function_declaration(full, input))?;
        return Ok((
            rest,
            Statement::ExportNamed(ExportNamedDeclaration {
                declaration: Some(Box::new(Statement::Function(decl))),
                specifiers: Vec::new(),
                source: None,
                span: make_span(full, start, rest),
            }),
        ));
    }

    fail(input, "unsupported export form")
}

fn export_specifiers<'a>(full: &'a str, input: &'a str) -> PResult<'a, Vec<ExportSpecifier>> {
    let (mut rest, _) = symbol("{")(input)?;
    let mut specifiers = Vec::new();

    loop {
        if let Ok((after, _)) = symbol("}")(rest) {
            return Ok((after, specifiers));
        }

        let (input, _) = ws(rest)?;
        let spec_start = position(full, input);
        let (input, local) = word_node(full, input)?;
        let (input, exported) = if peek_keyword(input, "as") {
            let (input, _) = keyword("as")(input)?;
            committed(word_node(full, input))?
        } else {
            (input, local.clone())
        };
        specifiers.push(ExportSpecifier {
            local,
            exported,
            span: make_span(full, spec_start, input),
        });

        rest = match symbol(",")(input) {
            Ok((after, _)) => after,
            Err(_) => {
                let (after, _) = committed(symbol("}")(input))?;
                return Ok((after, specifiers));
            }
        };
    }
}

// =============================================================================
// Variable declarations and patterns
// =============================================================================

/// Parse a variable declaration statement including its terminator
pub fn variable_declaration<'a>(full: &'a str, input: &'a str) -> PResult<'a, VariableDeclaration> {
    let (input, mut decl) = variable_declaration_body(full, input)?;
    let (rest, _) = semi(input)?;
    decl.span.end = position(full, rest);
    Ok((rest, decl))
}

/// Parse a variable declaration without consuming a terminator (for-loop heads)
pub fn variable_declaration_body<'a>(
    full: &'a str,
    input: &'a str,
) -> PResult<'a, VariableDeclaration> {
    let (input, _) = ws(input)?;
    let start = position(full, input);

    let (input, kind) = if let Ok((rest, _)) = keyword("const")(input) {
        (rest, VariableKind::Const)
    } else if let Ok((rest, _)) = keyword("let")(input) {
        (rest, VariableKind::Let)
    } else if let Ok((rest, _)) = keyword("var")(input) {
        (rest, VariableKind::Var)
    } else {
        return err(input, "expected 'const', 'let' or 'var'");
    };

    let mut declarations = Vec::new();
    let mut rest = input;

    loop {
        let (input, _) = ws(rest)?;
        let decl_start = position(full, input);
        let (input, id) = committed(pattern(full, input))?;

        // Optional TypeScript annotation
        let input = match symbol(":")(input) {
            Ok((after, _)) => committed(ts_type(full, after))?.0,
            Err(_) => input,
        };

        let (input, init) = match crate::js_parser::op("=", &['=', '>'])(input) {
            Ok((after, _)) => {
                let (after, expr) = committed(assignment_expr(full, after))?;
                (after, Some(expr))
            }
            Err(_) => (input, None),
        };

        declarations.push(VariableDeclarator {
            id,
            init,
            span: make_span(full, decl_start, input),
        });

        match symbol(",")(input) {
            Ok((after, _)) => rest = after,
            Err(_) => {
                let span = make_span(full, start, input);
                return Ok((input, VariableDeclaration { kind, declarations, span }));
            }
        }
    }
}

/// Parse a binding pattern
pub fn pattern<'a>(full: &'a str, input: &'a str) -> PResult<'a, Pattern> {
    let (input, _) = ws(input)?;

    if input.starts_with('{') {
        let (rest, object) = object_pattern(full, input)?;
        return Ok((rest, Pattern::Object(object)));
    }
    if input.starts_with('[') {
        let (rest, array) = array_pattern(full, input)?;
        return Ok((rest, Pattern::Array(array)));
    }

    let (rest, id) = identifier_node(full, input)?;
    Ok((rest, Pattern::Identifier(id)))
}

fn object_pattern<'a>(full: &'a str, input: &'a str) -> PResult<'a, ObjectPattern> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, _) = symbol("{")(input)?;

    let mut properties = Vec::new();
    let mut rest_binding = None;

    loop {
        if let Ok((after, _)) = symbol("}")(rest) {
            return Ok((
                after,
                ObjectPattern {
                    properties,
                    rest: rest_binding,
                    span: make_span(full, start, after),
                },
            ));
        }

        if let Ok((after, _)) = symbol("...")(rest) {
            let (after, id) = committed(identifier_node(full, after))?;
            rest_binding = Some(id);
            rest = after;
        } else {
            let (input, _) = ws(rest)?;
            let prop_start = position(full, input);
            let (input, key) = property_key(full, input)?;

            let (input, value, shorthand) = match symbol(":")(input) {
                Ok((after, _)) => {
                    let (after, value) = committed(pattern(full, after))?;
                    (after, value, false)
                }
                Err(_) => match &key {
                    PropertyKey::Identifier(id) => {
                        (input, Pattern::Identifier(id.clone()), true)
                    }
                    _ => return fail(input, "expected ':' after pattern key"),
                },
            };

            let (input, default) = match crate::js_parser::op("=", &['=', '>'])(input) {
                Ok((after, _)) => {
                    let (after, expr) = committed(assignment_expr(full, after))?;
                    (after, Some(expr))
                }
                Err(_) => (input, None),
            };

            properties.push(ObjectPatternProperty {
                key,
                value,
                shorthand,
                default,
                span: make_span(full, prop_start, input),
            });
            rest = input;
        }

        rest = match symbol(",")(rest) {
            Ok((after, _)) => after,
            Err(_) => {
                let (after, _) = committed(symbol("}")(rest))?;
                return Ok((
                    after,
                    ObjectPattern {
                        properties,
                        rest: rest_binding,
                        span: make_span(full, start, after),
                    },
                ));
            }
        };
    }
}

fn array_pattern<'a>(full: &'a str, input: &'a str) -> PResult<'a, ArrayPattern> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, _) = symbol("[")(input)?;

    let mut elements = Vec::new();

    loop {
        if let Ok((after, _)) = symbol("]")(rest) {
            return Ok((after, ArrayPattern { elements, span: make_span(full, start, after) }));
        }

        if let Ok((after, _)) = symbol(",")(rest) {
            elements.push(None);
            rest = after;
            continue;
        }

        let (after, element) = committed(pattern(full, rest))?;
        elements.push(Some(element));

        rest = match symbol(",")(after) {
            Ok((next, _)) => next,
            Err(_) => {
                let (next, _) = committed(symbol("]")(after))?;
                return Ok((next, ArrayPattern { elements, span: make_span(full, start, next) }));
            }
        };
    }
}

/// Parse a property key (identifier word, string, number, or computed)
pub fn property_key<'a>(full: &'a str, input: &'a str) -> PResult<'a, PropertyKey> {
    let (input, _) = ws(input)?;

    if input.starts_with('"') || input.starts_with('\'') {
        let (rest, value) = string_literal(full, input)?;
        return Ok((rest, PropertyKey::String(value)));
    }
    if input.starts_with('[') {
        let (input, _) = symbol("[")(input)?;
        let (input, expr) = committed(assignment_expr(full, input))?;
        let (rest, _) = committed(symbol("]")(input))?;
        return Ok((rest, PropertyKey::Computed(Box::new(expr))));
    }
    if input.chars().next().map(|c| c.is_ascii_digit() || c == '.').unwrap_or(false) {
        let (rest, value) = crate::js_parser::number_literal(full, input)?;
        return Ok((rest, PropertyKey::Number(value)));
    }

    let (rest, id) = word_node(full, input)?;
    Ok((rest, PropertyKey::Identifier(id)))
}

// =============================================================================
// Functions
// =============================================================================

/// Parse a `function name(params) { … }` declaration
pub fn function_declaration<'a>(full: &'a str, input: &'a str) -> PResult<'a, FunctionDeclaration> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, function) = function_shape(full, input, true)?;
    Ok((
        input,
        FunctionDeclaration { function, span: make_span(full, start, input) },
    ))
}

/// Shared shape for function declarations and function expressions
pub fn function_shape<'a>(
    full: &'a str,
    input: &'a str,
    require_name: bool,
) -> PResult<'a, Function> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("function")(input)?;

    let (input, name) = match identifier_node(full, input) {
        Ok((rest, id)) => (rest, Some(id)),
        Err(_) if !require_name => (input, None),
        Err(e) => return Err(e),
    };

    let (input, _) = committed(symbol("(")(input))?;
    let (input, params) = committed(function_params(full, input))?;
    let (input, _) = committed(symbol(")")(input))?;

    // Optional TypeScript return annotation
    let input = match symbol(":")(input) {
        Ok((after, _)) => committed(ts_type(full, after))?.0,
        Err(_) => input,
    };

    let (rest, body) = committed(block_statement(full, input))?;

    Ok((
        rest,
        Function { name, params, body, span: make_span(full, start, rest) },
    ))
}

/// Parse a comma-separated parameter list (without the parentheses)
pub fn function_params<'a>(full: &'a str, input: &'a str) -> PResult<'a, Vec<FunctionParam>> {
    let mut params = Vec::new();
    let mut rest = input;

    loop {
        if peek_text(rest, ")") {
            return Ok((rest, params));
        }

        let (input, _) = ws(rest)?;
        let param_start = position(full, input);

        let (input, is_rest) = match symbol("...")(input) {
            Ok((after, _)) => (after, true),
            Err(_) => (input, false),
        };

        let (input, pat) = pattern(full, input)?;

        // Optional TypeScript annotation (also `?: T` optional markers)
        let input = match symbol("?")(input) {
            Ok((after, _)) => after,
            Err(_) => input,
        };
        let input = match symbol(":")(input) {
            Ok((after, _)) => committed(ts_type(full, after))?.0,
            Err(_) => input,
        };

        let (input, default) = match crate::js_parser::op("=", &['=', '>'])(input) {
            Ok((after, _)) => {
                let (after, expr) = committed(assignment_expr(full, after))?;
                (after, Some(expr))
            }
            Err(_) => (input, None),
        };

        params.push(FunctionParam {
            pattern: pat,
            default,
            rest: is_rest,
            span: make_span(full, param_start, input),
        });

        rest = match symbol(",")(input) {
            Ok((after, _)) => after,
            Err(_) => return Ok((input, params)),
        };
    }
}

// =============================================================================
// TypeScript erasure
// =============================================================================

/// Consume a TypeScript type expression without building a tree.
///
/// Scans balanced `<> () [] {}` groups and string literals, stopping at a
/// depth-0 `,` `;` `)` `]` `}`, newline, or `=`. A depth-0 `{` only opens a
/// group when the type starts with it (object type), so a following function
/// body brace terminates the scan. `=>` is only consumed for function types
/// (types starting with `(`).
pub fn ts_type<'a>(full: &'a str, input: &'a str) -> PResult<'a, ()> {
    let (input, _) = ws(input)?;
    let _ = full;

    let first_char = input.trim_start().chars().next();
    let is_function_type = first_char == Some('(');

    let mut depth: i32 = 0;
    let mut consumed = 0;
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '{' => {
                if depth == 0 && !input[..i].trim().is_empty() {
                    break;
                }
                depth += 1;
            }
            '>' => {
                if depth > 0 {
                    depth -= 1;
                }
            }
            ')' | ']' | '}' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            ',' | ';' if depth == 0 => break,
            '=' => {
                if depth == 0 {
                    match chars.peek() {
                        Some((_, '>')) if is_function_type => {
                            chars.next();
                            consumed = i + 2;
                            continue;
                        }
                        _ => break,
                    }
                }
            }
            '"' | '\'' => {
                let quote = c;
                let mut closed = false;
                for (j, sc) in chars.by_ref() {
                    if sc == quote {
                        consumed = j + 1;
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return fail(input, "unterminated string in type annotation");
                }
                continue;
            }
            '\n' if depth == 0 => break,
            _ => {}
        }
        consumed = i + c.len_utf8();
    }

    if input[..consumed].trim().is_empty() {
        return err(input, "expected type annotation");
    }

    Ok((&input[consumed..], ()))
}

/// Parse `type X = …;` into a droppable placeholder.
/// `exported` records whether an `export` keyword was already consumed.
pub fn type_alias_declaration<'a>(
    full: &'a str,
    input: &'a str,
    exported: bool,
) -> PResult<'a, Statement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("type")(input)?;

    // `export type { X } from 'mod';` is a pure type re-export
    if peek_text(input, "{") {
        let (input, _) = export_specifiers(full, input)?;
        let (input, _) = match keyword("from")(input) {
            Ok((after, _)) => {
                let (after, _) = committed(string_literal(full, after))?;
                (after, ())
            }
            Err(_) => (input, ()),
        };
        let (rest, _) = semi(input)?;
        return Ok((
            rest,
            Statement::TypeAlias(TypeAliasDeclaration {
                name: Identifier::new(""),
                exported,
                span: make_span(full, start, rest),
            }),
        ));
    }

    let (input, name) = identifier_node(full, input)?;

    // Optional generic parameter list
    let input = if peek_text(input, "<") {
        let (after, _) = ts_type(full, input)?;
        after
    } else {
        input
    };

    let (input, _) = symbol("=")(input)?;
    let (input, _) = committed(ts_type(full, input))?;
    let (rest, _) = semi(input)?;

    Ok((
        rest,
        Statement::TypeAlias(TypeAliasDeclaration {
            name,
            exported,
            span: make_span(full, start, rest),
        }),
    ))
}

/// Parse `interface X { … }` into a droppable placeholder.
/// `exported` records whether an `export` keyword was already consumed.
pub fn interface_declaration<'a>(
    full: &'a str,
    input: &'a str,
    exported: bool,
) -> PResult<'a, Statement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("interface")(input)?;
    let (input, name) = identifier_node(full, input)?;

    // `extends` clause and generics are consumed by the balanced scanner
    let (input, _) = ws(input)?;
    let brace = match input.find('{') {
        Some(i) => i,
        None => return fail(input, "expected '{' in interface declaration"),
    };
    let mut depth = 0;
    let mut end = None;
    for (i, c) in input[brace..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(brace + i + 1);
                    break;
                }
            }
            _ => {}
        }
    }
    let end = match end {
        Some(e) => e,
        None => return fail(input, "expected '}' to close interface declaration"),
    };

    let rest = &input[end..];
    Ok((
        rest,
        Statement::Interface(InterfaceDeclaration {
            name,
            exported,
            span: make_span(full, start, rest),
        }),
    ))
}
