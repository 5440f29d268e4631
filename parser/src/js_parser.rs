//! JavaScript/TypeScript module parser
//!
//! Hand-rolled lexical primitives (whitespace, identifiers, literals) with
//! statement-level recursive descent. Expression parsing lives in
//! `js_parser_expr` / `js_parser_expr2`, import/export and declaration
//! parsing in `js_parser_decls`. Every parser takes `(full, input)` so byte
//! spans into the original source can be computed from the remaining input.
//!
//! The grammar is the module-evaluation subset: semicolons are optional
//! statement terminators, TypeScript annotations are parsed and discarded,
//! and constructs outside the subset (classes, regex literals, dynamic
//! `import()`) fail with a contextual parse error.

use nom::IResult;

use crate::custom_error::ContextualError;
use crate::error::ParseError;
use crate::js_ast::*;
use crate::js_parser_decls::{
    export_declaration, function_declaration, import_declaration, interface_declaration,
    type_alias_declaration, variable_declaration, variable_declaration_body,
};
use crate::js_parser_expr::expression;

/// Parser result type with contextual errors
pub type PResult<'a, T> = IResult<&'a str, T, ContextualError<&'a str>>;

/// Get current position in the original input
pub fn position(full: &str, current: &str) -> usize {
    full.len() - current.len()
}

/// Create span from start position to current position
pub fn make_span(full: &str, start_pos: usize, current: &str) -> Span {
    Span::new(start_pos, position(full, current))
}

/// Build a recoverable error at `input`
pub fn err<'a, T>(input: &'a str, context: &'static str) -> PResult<'a, T> {
    Err(nom::Err::Error(ContextualError::with_context(input, context)))
}

/// Build a committed (non-backtracking) error at `input`
pub fn fail<'a, T>(input: &'a str, context: &'static str) -> PResult<'a, T> {
    Err(nom::Err::Failure(ContextualError::with_context(input, context)))
}

/// Turn recoverable errors into committed ones once a statement form is known
pub fn committed<T>(result: PResult<'_, T>) -> PResult<'_, T> {
    result.map_err(|e| match e {
        nom::Err::Error(inner) => nom::Err::Failure(inner),
        other => other,
    })
}

/// Parse a complete module source file
pub fn parse_program(file_name: &str, input: &str) -> Result<Program, ParseError> {
    match program(input, input) {
        Ok((_, program)) => Ok(program),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(ParseError::from_contextual(file_name, input, &e))
        }
        Err(nom::Err::Incomplete(_)) => Err(ParseError::new(
            file_name,
            input,
            input.len(),
            "unexpected end of input",
        )),
    }
}

fn program<'a>(full: &'a str, input: &'a str) -> PResult<'a, Program> {
    let mut body = Vec::new();
    let mut rest = input;

    loop {
        let (after_ws, _) = ws(rest)?;
        if after_ws.is_empty() {
            let span = Span::new(0, position(full, after_ws));
            return Ok((after_ws, Program { body, span }));
        }

        let (after_stmt, stmt) = statement(full, after_ws)?;
        body.push(stmt);
        rest = after_stmt;
    }
}

// =============================================================================
// Whitespace and comments
// =============================================================================

/// Skip whitespace and comments
pub fn ws(input: &str) -> PResult<'_, ()> {
    let mut rest = input;
    loop {
        let trimmed = rest.trim_start();
        if let Some(after) = trimmed.strip_prefix("//") {
            rest = match after.find('\n') {
                Some(i) => &after[i + 1..],
                None => "",
            };
        } else if let Some(after) = trimmed.strip_prefix("/*") {
            match after.find("*/") {
                Some(i) => rest = &after[i + 2..],
                None => return fail(trimmed, "unterminated block comment"),
            }
        } else {
            return Ok((trimmed, ()));
        }
    }
}

// =============================================================================
// Basic elements
// =============================================================================

pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Words that cannot be used as plain identifier expressions or bindings.
/// `default`, `from`, `of`, `as` and `type` stay available as property and
/// specifier names via [`word`].
fn is_reserved(s: &str) -> bool {
    matches!(
        s,
        "break" | "case" | "catch" | "class" | "const" | "continue" | "delete" | "do"
            | "else" | "export" | "extends" | "false" | "finally" | "for" | "function"
            | "if" | "import" | "in" | "instanceof" | "let" | "new" | "null" | "return"
            | "super" | "switch" | "throw" | "true" | "try" | "typeof" | "var" | "void"
            | "while" | "yield"
    )
}

/// Parse any identifier-shaped word, including reserved words.
/// Used for property names and import/export specifier names.
pub fn word(input: &str) -> PResult<'_, String> {
    let (input, _) = ws(input)?;

    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return err(input, "expected identifier"),
    }

    let end = chars
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(input.len());

    Ok((&input[end..], input[..end].to_string()))
}

/// Parse an identifier (rejecting reserved words)
pub fn identifier(input: &str) -> PResult<'_, String> {
    let (rest, id) = word(input)?;
    if is_reserved(&id) {
        return err(input, "expected identifier");
    }
    Ok((rest, id))
}

/// Parse an identifier with its span
pub fn identifier_node<'a>(full: &'a str, input: &'a str) -> PResult<'a, Identifier> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (rest, name) = identifier(input)?;
    Ok((rest, Identifier { name, span: make_span(full, start, rest) }))
}

/// Parse a word with its span (property and specifier positions)
pub fn word_node<'a>(full: &'a str, input: &'a str) -> PResult<'a, Identifier> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (rest, name) = word(input)?;
    Ok((rest, Identifier { name, span: make_span(full, start, rest) }))
}

/// Parse a specific keyword, requiring a word boundary after it
pub fn keyword<'a>(kw: &'static str) -> impl Fn(&'a str) -> PResult<'a, &'a str> {
    move |input| {
        let (input, _) = ws(input)?;
        match input.strip_prefix(kw) {
            Some(rest) if !rest.chars().next().map(is_ident_char).unwrap_or(false) => {
                Ok((rest, kw))
            }
            _ => err(input, "expected keyword"),
        }
    }
}

/// Parse a symbol with leading whitespace
pub fn symbol<'a>(sym: &'static str) -> impl Fn(&'a str) -> PResult<'a, &'a str> {
    move |input| {
        let (input, _) = ws(input)?;
        match input.strip_prefix(sym) {
            Some(rest) => Ok((rest, sym)),
            None => err(input, "expected symbol"),
        }
    }
}

/// Parse a symbol that must not be followed by any of `not_next`
/// (distinguishes `=` from `==` and `=>`, `?` from `??` and `?.`, …)
pub fn op<'a>(sym: &'static str, not_next: &'static [char]) -> impl Fn(&'a str) -> PResult<'a, &'a str> {
    move |input| {
        let (input, _) = ws(input)?;
        match input.strip_prefix(sym) {
            Some(rest) => {
                if let Some(c) = rest.chars().next() {
                    if not_next.contains(&c) {
                        return err(input, "expected operator");
                    }
                }
                Ok((rest, sym))
            }
            None => err(input, "expected operator"),
        }
    }
}

/// Peek: does the input (after whitespace) start with this text?
pub fn peek_text(input: &str, text: &str) -> bool {
    match ws(input) {
        Ok((rest, _)) => rest.starts_with(text),
        Err(_) => false,
    }
}

/// Peek: does the input (after whitespace) start with this keyword?
pub fn peek_keyword(input: &str, kw: &str) -> bool {
    match ws(input) {
        Ok((rest, _)) => match rest.strip_prefix(kw) {
            Some(after) => !after.chars().next().map(is_ident_char).unwrap_or(false),
            None => false,
        },
        Err(_) => false,
    }
}

// =============================================================================
// Literals
// =============================================================================

/// Parse a single- or double-quoted string literal, decoding escapes
pub fn string_literal<'a>(full: &'a str, input: &'a str) -> PResult<'a, StringLiteral> {
    let (input, _) = ws(input)?;
    let start = position(full, input);

    let quote = match input.chars().next() {
        Some(c @ ('"' | '\'')) => c,
        _ => return err(input, "expected string literal"),
    };

    let mut value = String::new();
    let mut chars = input[1..].char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => {
                let rest = &input[1 + i + c.len_utf8()..];
                return Ok((rest, StringLiteral { value, span: make_span(full, start, rest) }));
            }
            '\\' => match chars.next() {
                Some((_, esc)) => value.push_str(&decode_escape(esc, &mut chars)),
                None => return fail(input, "unterminated string literal"),
            },
            '\n' => return fail(input, "unterminated string literal"),
            c => value.push(c),
        }
    }

    fail(input, "unterminated string literal")
}

/// Decode one escape sequence after a backslash
pub fn decode_escape(esc: char, chars: &mut std::str::CharIndices<'_>) -> String {
    match esc {
        'n' => "\n".to_string(),
        't' => "\t".to_string(),
        'r' => "\r".to_string(),
        'b' => "\u{8}".to_string(),
        'f' => "\u{c}".to_string(),
        'v' => "\u{b}".to_string(),
        '0' => "\0".to_string(),
        'x' => {
            let mut hex = String::new();
            for _ in 0..2 {
                if let Some((_, c)) = chars.next() {
                    hex.push(c);
                }
            }
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_default()
        }
        'u' => {
            let mut hex = String::new();
            for _ in 0..4 {
                if let Some((_, c)) = chars.next() {
                    hex.push(c);
                }
            }
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_default()
        }
        '\n' => String::new(),
        other => other.to_string(),
    }
}

/// Parse a numeric literal (decimal, float, exponent, hex)
pub fn number_literal<'a>(full: &'a str, input: &'a str) -> PResult<'a, NumberLiteral> {
    let (input, _) = ws(input)?;
    let start = position(full, input);

    if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        let end = hex
            .char_indices()
            .find(|(_, c)| !c.is_ascii_hexdigit())
            .map(|(i, _)| i)
            .unwrap_or(hex.len());
        if end == 0 {
            return err(input, "expected hex digits");
        }
        let value = match u64::from_str_radix(&hex[..end], 16) {
            Ok(v) => v as f64,
            Err(_) => return fail(input, "invalid hex literal"),
        };
        let rest = &hex[end..];
        return Ok((rest, NumberLiteral { value, span: make_span(full, start, rest) }));
    }

    let mut end = 0;
    let bytes = input.as_bytes();
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let int_digits = end;
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac = end + 1;
        while frac < bytes.len() && bytes[frac].is_ascii_digit() {
            frac += 1;
        }
        if frac > end + 1 || int_digits > 0 {
            end = frac;
        }
    }
    if end == 0 || (end == int_digits && int_digits == 0) {
        return err(input, "expected number");
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let digits_start = exp;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
        }
        if exp > digits_start {
            end = exp;
        }
    }

    let value = match input[..end].parse::<f64>() {
        Ok(v) => v,
        Err(_) => return fail(input, "invalid number literal"),
    };
    let rest = &input[end..];
    Ok((rest, NumberLiteral { value, span: make_span(full, start, rest) }))
}

// =============================================================================
// Statements
// =============================================================================

/// Optional statement terminator
pub fn semi(input: &str) -> PResult<'_, ()> {
    match symbol(";")(input) {
        Ok((rest, _)) => Ok((rest, ())),
        Err(_) => Ok((input, ())),
    }
}

/// Parse any statement
pub fn statement<'a>(full: &'a str, input: &'a str) -> PResult<'a, Statement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);

    if let Some(rest) = input.strip_prefix(';') {
        return Ok((rest, Statement::Empty(make_span(full, start, rest))));
    }
    if input.starts_with('{') {
        let (rest, block) = block_statement(full, input)?;
        return Ok((rest, Statement::Block(block)));
    }

    if peek_keyword(input, "import") && !peek_text(&input["import".len()..], "(") {
        return import_declaration(full, input);
    }
    if peek_keyword(input, "export") {
        return export_declaration(full, input);
    }
    if peek_keyword(input, "const") || peek_keyword(input, "let") || peek_keyword(input, "var") {
        let (rest, decl) = variable_declaration(full, input)?;
        return Ok((rest, Statement::Variable(decl)));
    }
    if peek_keyword(input, "function") {
        let (rest, decl) = function_declaration(full, input)?;
        return Ok((rest, Statement::Function(decl)));
    }
    if peek_keyword(input, "return") {
        return return_statement(full, input);
    }
    if peek_keyword(input, "if") {
        return if_statement(full, input);
    }
    if peek_keyword(input, "while") {
        return while_statement(full, input);
    }
    if peek_keyword(input, "for") {
        return for_statement(full, input);
    }
    if peek_keyword(input, "throw") {
        return throw_statement(full, input);
    }
    if peek_keyword(input, "break") {
        let (input, _) = keyword("break")(input)?;
        let (rest, _) = semi(input)?;
        return Ok((rest, Statement::Break(make_span(full, start, rest))));
    }
    if peek_keyword(input, "continue") {
        let (input, _) = keyword("continue")(input)?;
        let (rest, _) = semi(input)?;
        return Ok((rest, Statement::Continue(make_span(full, start, rest))));
    }
    if peek_keyword(input, "class") {
        return fail(input, "class declarations are not supported");
    }
    if peek_keyword(input, "type") {
        if let Ok(result) = type_alias_declaration(full, input, false) {
            return Ok(result);
        }
    }
    if peek_keyword(input, "interface") {
        if let Ok(result) = interface_declaration(full, input, false) {
            return Ok(result);
        }
    }

    expression_statement(full, input)
}

/// Parse a `{ … }` block
pub fn block_statement<'a>(full: &'a str, input: &'a str) -> PResult<'a, BlockStatement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, _) = symbol("{")(input)?;

    let mut body = Vec::new();
    loop {
        let (after_ws, _) = ws(rest)?;
        if let Some(after) = after_ws.strip_prefix('}') {
            return Ok((after, BlockStatement { body, span: make_span(full, start, after) }));
        }
        if after_ws.is_empty() {
            return fail(after_ws, "expected '}' to close block");
        }
        let (after_stmt, stmt) = committed(statement(full, after_ws))?;
        body.push(stmt);
        rest = after_stmt;
    }
}

fn expression_statement<'a>(full: &'a str, input: &'a str) -> PResult<'a, Statement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, expr) = expression(full, input)?;
    let (rest, _) = semi(input)?;
    Ok((
        rest,
        Statement::Expression(ExpressionStatement {
            expression: expr,
            span: make_span(full, start, rest),
        }),
    ))
}

fn return_statement<'a>(full: &'a str, input: &'a str) -> PResult<'a, Statement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("return")(input)?;

    // `return` with no argument: bare, before ';' or '}'
    let (peeked, _) = ws(input)?;
    if peeked.starts_with(';') || peeked.starts_with('}') || peeked.is_empty() {
        let (rest, _) = semi(input)?;
        return Ok((
            rest,
            Statement::Return(ReturnStatement { argument: None, span: make_span(full, start, rest) }),
        ));
    }

    let (input, expr) = committed(expression(full, input))?;
    let (rest, _) = semi(input)?;
    Ok((
        rest,
        Statement::Return(ReturnStatement {
            argument: Some(expr),
            span: make_span(full, start, rest),
        }),
    ))
}

fn throw_statement<'a>(full: &'a str, input: &'a str) -> PResult<'a, Statement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("throw")(input)?;
    let (input, expr) = committed(expression(full, input))?;
    let (rest, _) = semi(input)?;
    Ok((
        rest,
        Statement::Throw(ThrowStatement { argument: expr, span: make_span(full, start, rest) }),
    ))
}

fn if_statement<'a>(full: &'a str, input: &'a str) -> PResult<'a, Statement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("if")(input)?;
    let (input, _) = committed(symbol("(")(input))?;
    let (input, test) = committed(expression(full, input))?;
    let (input, _) = committed(symbol(")")(input))?;
    let (input, consequent) = committed(statement(full, input))?;

    let (rest, alternate) = if peek_keyword(input, "else") {
        let (input, _) = keyword("else")(input)?;
        let (input, alt) = committed(statement(full, input))?;
        (input, Some(Box::new(alt)))
    } else {
        (input, None)
    };

    Ok((
        rest,
        Statement::If(IfStatement {
            test,
            consequent: Box::new(consequent),
            alternate,
            span: make_span(full, start, rest),
        }),
    ))
}

fn while_statement<'a>(full: &'a str, input: &'a str) -> PResult<'a, Statement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("while")(input)?;
    let (input, _) = committed(symbol("(")(input))?;
    let (input, test) = committed(expression(full, input))?;
    let (input, _) = committed(symbol(")")(input))?;
    let (rest, body) = committed(statement(full, input))?;

    Ok((
        rest,
        Statement::While(WhileStatement {
            test,
            body: Box::new(body),
            span: make_span(full, start, rest),
        }),
    ))
}

fn for_statement<'a>(full: &'a str, input: &'a str) -> PResult<'a, Statement> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("for")(input)?;
    let (input, _) = committed(symbol("(")(input))?;

    // for-of: `for (const x of expr)`
    if let Ok((rest, stmt)) = for_of_tail(full, input, start) {
        return Ok((rest, stmt));
    }

    // classic C-style for
    let (input, init) = if peek_text(input, ";") {
        (input, None)
    } else if peek_keyword(input, "const") || peek_keyword(input, "let") || peek_keyword(input, "var")
    {
        let (input, decl) = variable_declaration_body(full, input)?;
        (input, Some(ForInit::Declaration(decl)))
    } else {
        let (input, expr) = committed(expression(full, input))?;
        (input, Some(ForInit::Expression(expr)))
    };
    let (input, _) = committed(symbol(";")(input))?;

    let (input, test) = if peek_text(input, ";") {
        (input, None)
    } else {
        let (input, expr) = committed(expression(full, input))?;
        (input, Some(expr))
    };
    let (input, _) = committed(symbol(";")(input))?;

    let (input, update) = if peek_text(input, ")") {
        (input, None)
    } else {
        let (input, expr) = committed(expression(full, input))?;
        (input, Some(expr))
    };
    let (input, _) = committed(symbol(")")(input))?;
    let (rest, body) = committed(statement(full, input))?;

    Ok((
        rest,
        Statement::For(ForStatement {
            init,
            test,
            update,
            body: Box::new(body),
            span: make_span(full, start, rest),
        }),
    ))
}

fn for_of_tail<'a>(full: &'a str, input: &'a str, start: usize) -> PResult<'a, Statement> {
    let (input, kind) = if let Ok((rest, _)) = keyword("const")(input) {
        (rest, VariableKind::Const)
    } else if let Ok((rest, _)) = keyword("let")(input) {
        (rest, VariableKind::Let)
    } else if let Ok((rest, _)) = keyword("var")(input) {
        (rest, VariableKind::Var)
    } else {
        return err(input, "expected declaration in for-of");
    };

    let (input, left) = crate::js_parser_decls::pattern(full, input)?;
    let (input, _) = keyword("of")(input)?;
    let (input, right) = committed(expression(full, input))?;
    let (input, _) = committed(symbol(")")(input))?;
    let (rest, body) = committed(statement(full, input))?;

    Ok((
        rest,
        Statement::ForOf(ForOfStatement {
            kind,
            left,
            right,
            body: Box::new(body),
            span: make_span(full, start, rest),
        }),
    ))
}
