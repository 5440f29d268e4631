//! Primary expression parsing: literals, templates, objects, arrays,
//! arrow and function expressions

use crate::js_ast::*;
use crate::js_parser::{
    committed, err, fail, identifier_node, keyword, make_span, number_literal, position,
    string_literal, symbol, ws, PResult,
};
use crate::js_parser_decls::{function_params, function_shape, property_key, ts_type};
use crate::js_parser_expr::{assignment_expr, expression};

/// Parse a primary expression
pub fn primary_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);

    let first = match input.chars().next() {
        Some(c) => c,
        None => return err(input, "expected expression"),
    };

    match first {
        '(' => {
            let (input, _) = symbol("(")(input)?;
            let (input, inner) = committed(expression(full, input))?;
            let (rest, _) = committed(symbol(")")(input))?;
            Ok((
                rest,
                Expression::Paren(ParenExpression {
                    expression: Box::new(inner),
                    span: make_span(full, start, rest),
                }),
            ))
        }
        '`' => template_literal(full, input),
        '"' | '\'' => {
            let (rest, lit) = string_literal(full, input)?;
            Ok((rest, Expression::String(lit)))
        }
        '[' => array_expr(full, input),
        '{' => object_expr(full, input),
        c if c.is_ascii_digit() => {
            let (rest, lit) = number_literal(full, input)?;
            Ok((rest, Expression::Number(lit)))
        }
        '.' if input[1..].chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) => {
            let (rest, lit) = number_literal(full, input)?;
            Ok((rest, Expression::Number(lit)))
        }
        _ => keyword_or_identifier_expr(full, input, start),
    }
}

fn keyword_or_identifier_expr<'a>(
    full: &'a str,
    input: &'a str,
    start: usize,
) -> PResult<'a, Expression> {
    if let Ok((rest, _)) = keyword("true")(input) {
        return Ok((
            rest,
            Expression::Boolean(BooleanLiteral { value: true, span: make_span(full, start, rest) }),
        ));
    }
    if let Ok((rest, _)) = keyword("false")(input) {
        return Ok((
            rest,
            Expression::Boolean(BooleanLiteral { value: false, span: make_span(full, start, rest) }),
        ));
    }
    if let Ok((rest, _)) = keyword("null")(input) {
        return Ok((rest, Expression::Null(make_span(full, start, rest))));
    }
    if let Ok((_, _)) = keyword("function")(input) {
        let (rest, function) = function_shape(full, input, false)?;
        return Ok((
            rest,
            Expression::Function(FunctionExpression {
                function,
                span: make_span(full, start, rest),
            }),
        ));
    }
    if let Ok((after, _)) = keyword("new")(input) {
        // Parse the constructor as a call chain, then reinterpret the
        // outermost call as the constructor invocation
        let (rest, target) = committed(crate::js_parser_expr::postfix_expr(full, after))?;
        let expr = match target {
            Expression::Call(call) => Expression::New(NewExpression {
                callee: call.callee,
                arguments: call.arguments,
                span: make_span(full, start, rest),
            }),
            other => Expression::New(NewExpression {
                callee: Box::new(other),
                arguments: Vec::new(),
                span: make_span(full, start, rest),
            }),
        };
        return Ok((rest, expr));
    }

    let (rest, id) = identifier_node(full, input)?;
    Ok((rest, Expression::Identifier(id)))
}

/// Attempt an arrow function; any failure backtracks the whole attempt
pub fn arrow_function<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);

    // `x => …`
    if let Ok((after_id, id)) = identifier_node(full, input) {
        if let Ok((after_arrow, _)) = symbol("=>")(after_id) {
            let (rest, body) = arrow_body(full, after_arrow)?;
            let param = FunctionParam {
                span: id.span,
                pattern: Pattern::Identifier(id),
                default: None,
                rest: false,
            };
            return Ok((
                rest,
                Expression::Arrow(ArrowFunctionExpression {
                    params: vec![param],
                    body,
                    span: make_span(full, start, rest),
                }),
            ));
        }
    }

    // `(a, b = 1, ...rest) => …`
    let (input, _) = symbol("(")(input)?;
    let (input, params) = function_params(full, input)?;
    let (input, _) = symbol(")")(input)?;

    // Optional TypeScript return annotation before the arrow
    let input = match symbol(":")(input) {
        Ok((after, _)) => ts_type(full, after)?.0,
        Err(_) => input,
    };

    let (input, _) = symbol("=>")(input)?;
    let (rest, body) = arrow_body(full, input)?;

    Ok((
        rest,
        Expression::Arrow(ArrowFunctionExpression {
            params,
            body,
            span: make_span(full, start, rest),
        }),
    ))
}

fn arrow_body<'a>(full: &'a str, input: &'a str) -> PResult<'a, ArrowBody> {
    let (input, _) = ws(input)?;

    if input.starts_with('{') {
        let (rest, block) = crate::js_parser::block_statement(full, input)?;
        return Ok((rest, ArrowBody::Block(block)));
    }

    let (rest, expr) = assignment_expr(full, input)?;
    Ok((rest, ArrowBody::Expression(Box::new(expr))))
}

/// Parse an object literal
pub fn object_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, _) = symbol("{")(input)?;

    let mut properties = Vec::new();

    loop {
        if let Ok((after, _)) = symbol("}")(rest) {
            return Ok((
                after,
                Expression::Object(ObjectExpression {
                    properties,
                    span: make_span(full, start, after),
                }),
            ));
        }

        let (input, _) = ws(rest)?;
        let member_start = position(full, input);

        if let Ok((input, _)) = symbol("...")(input) {
            let (input, argument) = committed(assignment_expr(full, input))?;
            properties.push(ObjectMember::Spread(SpreadElement {
                argument: Box::new(argument),
                span: make_span(full, member_start, input),
            }));
            rest = input;
        } else {
            let (input, key) = committed(property_key(full, input))?;

            let (input, value, shorthand) = match symbol(":")(input) {
                Ok((after, _)) => {
                    let (after, value) = committed(assignment_expr(full, after))?;
                    (after, value, false)
                }
                Err(_) => {
                    if input.trim_start().starts_with('(') {
                        return fail(input, "object methods are not supported");
                    }
                    match &key {
                        PropertyKey::Identifier(id) => {
                            (input, Expression::Identifier(id.clone()), true)
                        }
                        _ => return fail(input, "expected ':' after property key"),
                    }
                }
            };

            properties.push(ObjectMember::Property(Property {
                key,
                value,
                shorthand,
                span: make_span(full, member_start, input),
            }));
            rest = input;
        }

        rest = match symbol(",")(rest) {
            Ok((after, _)) => after,
            Err(_) => {
                let (after, _) = committed(symbol("}")(rest))?;
                return Ok((
                    after,
                    Expression::Object(ObjectExpression {
                        properties,
                        span: make_span(full, start, after),
                    }),
                ));
            }
        };
    }
}

/// Parse an array literal
fn array_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, _) = symbol("[")(input)?;

    let mut elements = Vec::new();

    loop {
        if let Ok((after, _)) = symbol("]")(rest) {
            return Ok((
                after,
                Expression::Array(ArrayExpression {
                    elements,
                    span: make_span(full, start, after),
                }),
            ));
        }

        let (input, _) = ws(rest)?;
        let element_start = position(full, input);

        let (input, element) = if let Ok((after, _)) = symbol("...")(input) {
            let (after, inner) = committed(assignment_expr(full, after))?;
            (
                after,
                Expression::Spread(SpreadElement {
                    argument: Box::new(inner),
                    span: make_span(full, element_start, after),
                }),
            )
        } else {
            committed(assignment_expr(full, input))?
        };

        elements.push(element);

        rest = match symbol(",")(input) {
            Ok((after, _)) => after,
            Err(_) => {
                let (after, _) = committed(symbol("]")(input))?;
                return Ok((
                    after,
                    Expression::Array(ArrayExpression {
                        elements,
                        span: make_span(full, start, after),
                    }),
                ));
            }
        };
    }
}

/// Parse a template literal with `${…}` interpolations
pub fn template_literal<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);

    let mut cur = match input.strip_prefix('`') {
        Some(rest) => rest,
        None => return err(input, "expected template literal"),
    };

    let mut quasis = Vec::new();
    let mut expressions = Vec::new();
    let mut raw = String::new();
    let mut cooked = String::new();
    let mut quasi_start = position(full, cur);

    loop {
        if let Some(rest) = cur.strip_prefix('`') {
            quasis.push(TemplateElement {
                raw,
                cooked,
                tail: true,
                span: Span::new(quasi_start, position(full, cur)),
            });
            return Ok((
                rest,
                Expression::Template(TemplateLiteral {
                    quasis,
                    expressions,
                    span: make_span(full, start, rest),
                }),
            ));
        }

        if let Some(rest) = cur.strip_prefix("${") {
            quasis.push(TemplateElement {
                raw: std::mem::take(&mut raw),
                cooked: std::mem::take(&mut cooked),
                tail: false,
                span: Span::new(quasi_start, position(full, cur)),
            });

            let (after_expr, expr) = committed(expression(full, rest))?;
            let (after, _) = committed(symbol("}")(after_expr))?;
            expressions.push(expr);
            cur = after;
            quasi_start = position(full, cur);
            continue;
        }

        if let Some(rest) = cur.strip_prefix('\\') {
            let c = match rest.chars().next() {
                Some(c) => c,
                None => return fail(cur, "unterminated template literal"),
            };
            raw.push('\\');
            raw.push(c);
            match c {
                'n' => cooked.push('\n'),
                't' => cooked.push('\t'),
                'r' => cooked.push('\r'),
                other => cooked.push(other),
            }
            cur = &rest[c.len_utf8()..];
            continue;
        }

        match cur.chars().next() {
            Some(c) => {
                raw.push(c);
                cooked.push(c);
                cur = &cur[c.len_utf8()..];
            }
            None => return fail(cur, "unterminated template literal"),
        }
    }
}
