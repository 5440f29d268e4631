//! Expression parsing with precedence climbing
//!
//! Precedence, low to high: assignment → conditional → nullish → logical
//! or/and → equality → relational → additive → multiplicative → unary →
//! call/member chains → primary. Primary expressions live in
//! `js_parser_expr2`.

use crate::js_ast::*;
use crate::js_parser::{
    committed, keyword, make_span, op, peek_keyword, position, symbol, word_node, ws, PResult,
};
use crate::js_parser_decls::ts_type;
use crate::js_parser_expr2::{arrow_function, primary_expr};

/// Parse any expression
pub fn expression<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    assignment_expr(full, input)
}

/// Parse assignment expression: `a = b`, `a += b`, arrows first
pub fn assignment_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    // Arrow functions bind tighter than assignment and need backtracking
    if let Ok(result) = arrow_function(full, input) {
        return Ok(result);
    }

    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, left) = conditional_expr(full, input)?;

    let (input, assign_op) = if let Ok((rest, _)) = op("+=", &[])(input) {
        (rest, Some(AssignOp::AddAssign))
    } else if let Ok((rest, _)) = op("=", &['=', '>'])(input) {
        (rest, Some(AssignOp::Assign))
    } else {
        (input, None)
    };

    match assign_op {
        Some(assign_op) => {
            let (rest, value) = committed(assignment_expr(full, input))?;
            Ok((
                rest,
                Expression::Assignment(AssignmentExpression {
                    op: assign_op,
                    target: Box::new(left),
                    value: Box::new(value),
                    span: make_span(full, start, rest),
                }),
            ))
        }
        None => Ok((input, left)),
    }
}

/// Parse ternary expression: `cond ? then : else`
fn conditional_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, test) = nullish_expr(full, input)?;

    if let Ok((input, _)) = op("?", &['?', '.'])(input) {
        let (input, consequent) = committed(assignment_expr(full, input))?;
        let (input, _) = committed(symbol(":")(input))?;
        let (rest, alternate) = committed(assignment_expr(full, input))?;

        return Ok((
            rest,
            Expression::Conditional(ConditionalExpression {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
                span: make_span(full, start, rest),
            }),
        ));
    }

    Ok((input, test))
}

fn nullish_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, mut left) = logical_or_expr(full, input)?;

    while let Ok((input, _)) = op("??", &['='])(rest) {
        let (input, right) = committed(logical_or_expr(full, input))?;
        left = Expression::Logical(LogicalExpression {
            op: LogicalOp::Nullish,
            left: Box::new(left),
            right: Box::new(right),
            span: make_span(full, start, input),
        });
        rest = input;
    }

    Ok((rest, left))
}

fn logical_or_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, mut left) = logical_and_expr(full, input)?;

    while let Ok((input, _)) = op("||", &['='])(rest) {
        let (input, right) = committed(logical_and_expr(full, input))?;
        left = Expression::Logical(LogicalExpression {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Box::new(right),
            span: make_span(full, start, input),
        });
        rest = input;
    }

    Ok((rest, left))
}

fn logical_and_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, mut left) = equality_expr(full, input)?;

    while let Ok((input, _)) = op("&&", &['='])(rest) {
        let (input, right) = committed(equality_expr(full, input))?;
        left = Expression::Logical(LogicalExpression {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
            span: make_span(full, start, input),
        });
        rest = input;
    }

    Ok((rest, left))
}

fn equality_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, mut left) = relational_expr(full, input)?;

    loop {
        let (input, binary_op) = if let Ok((r, _)) = symbol("===")(rest) {
            (r, BinaryOp::StrictEq)
        } else if let Ok((r, _)) = symbol("!==")(rest) {
            (r, BinaryOp::StrictNotEq)
        } else if let Ok((r, _)) = op("==", &['='])(rest) {
            (r, BinaryOp::Eq)
        } else if let Ok((r, _)) = op("!=", &['='])(rest) {
            (r, BinaryOp::NotEq)
        } else {
            return Ok((rest, left));
        };

        let (input, right) = committed(relational_expr(full, input))?;
        left = Expression::Binary(BinaryExpression {
            op: binary_op,
            left: Box::new(left),
            right: Box::new(right),
            span: make_span(full, start, input),
        });
        rest = input;
    }
}

fn relational_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, mut left) = additive_expr(full, input)?;

    loop {
        let (input, binary_op) = if let Ok((r, _)) = symbol("<=")(rest) {
            (r, BinaryOp::LtEq)
        } else if let Ok((r, _)) = symbol(">=")(rest) {
            (r, BinaryOp::GtEq)
        } else if let Ok((r, _)) = op("<", &['<'])(rest) {
            (r, BinaryOp::Lt)
        } else if let Ok((r, _)) = op(">", &['>'])(rest) {
            (r, BinaryOp::Gt)
        } else {
            return Ok((rest, left));
        };

        let (input, right) = committed(additive_expr(full, input))?;
        left = Expression::Binary(BinaryExpression {
            op: binary_op,
            left: Box::new(left),
            right: Box::new(right),
            span: make_span(full, start, input),
        });
        rest = input;
    }
}

fn additive_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, mut left) = multiplicative_expr(full, input)?;

    loop {
        let (input, binary_op) = if let Ok((r, _)) = op("+", &['+', '='])(rest) {
            (r, BinaryOp::Add)
        } else if let Ok((r, _)) = op("-", &['-', '='])(rest) {
            (r, BinaryOp::Sub)
        } else {
            return Ok((rest, left));
        };

        let (input, right) = committed(multiplicative_expr(full, input))?;
        left = Expression::Binary(BinaryExpression {
            op: binary_op,
            left: Box::new(left),
            right: Box::new(right),
            span: make_span(full, start, input),
        });
        rest = input;
    }
}

fn multiplicative_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, mut left) = unary_expr(full, input)?;

    loop {
        let (input, binary_op) = if let Ok((r, _)) = op("*", &['=', '*'])(rest) {
            (r, BinaryOp::Mul)
        } else if let Ok((r, _)) = op("/", &['=', '/', '*'])(rest) {
            (r, BinaryOp::Div)
        } else if let Ok((r, _)) = op("%", &['='])(rest) {
            (r, BinaryOp::Mod)
        } else {
            return Ok((rest, left));
        };

        let (input, right) = committed(unary_expr(full, input))?;
        left = Expression::Binary(BinaryExpression {
            op: binary_op,
            left: Box::new(left),
            right: Box::new(right),
            span: make_span(full, start, input),
        });
        rest = input;
    }
}

fn unary_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);

    let (input, unary_op) = if let Ok((r, _)) = op("!", &['='])(input) {
        (r, Some(UnaryOp::Not))
    } else if let Ok((r, _)) = op("-", &['-', '='])(input) {
        (r, Some(UnaryOp::Minus))
    } else if let Ok((r, _)) = op("+", &['+', '='])(input) {
        (r, Some(UnaryOp::Plus))
    } else if let Ok((r, _)) = keyword("typeof")(input) {
        (r, Some(UnaryOp::TypeOf))
    } else if let Ok((r, _)) = keyword("void")(input) {
        (r, Some(UnaryOp::Void))
    } else {
        (input, None)
    };

    match unary_op {
        Some(unary_op) => {
            let (rest, argument) = committed(unary_expr(full, input))?;
            Ok((
                rest,
                Expression::Unary(UnaryExpression {
                    op: unary_op,
                    argument: Box::new(argument),
                    span: make_span(full, start, rest),
                }),
            ))
        }
        None => postfix_expr(full, input),
    }
}

/// Parse call/member chains: `a.b`, `a?.b`, `a[b]`, `a(…)`, `x as T`
pub fn postfix_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expression> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut rest, mut expr) = primary_expr(full, input)?;

    loop {
        if let Ok((input, _)) = symbol("?.")(rest) {
            // `a?.(…)` optional call, `a?.[…]`, `a?.b`
            if input.trim_start().starts_with('(') {
                let (input, arguments) = call_arguments(full, input)?;
                expr = Expression::Call(CallExpression {
                    callee: Box::new(expr),
                    arguments,
                    optional: true,
                    span: make_span(full, start, input),
                });
                rest = input;
            } else if let Ok((input, _)) = symbol("[")(input) {
                let (input, property) = committed(expression(full, input))?;
                let (input, _) = committed(symbol("]")(input))?;
                expr = Expression::Member(MemberExpression {
                    object: Box::new(expr),
                    property: MemberProperty::Computed(Box::new(property)),
                    optional: true,
                    span: make_span(full, start, input),
                });
                rest = input;
            } else {
                let (input, name) = committed(word_node(full, input))?;
                expr = Expression::Member(MemberExpression {
                    object: Box::new(expr),
                    property: MemberProperty::Identifier(name),
                    optional: true,
                    span: make_span(full, start, input),
                });
                rest = input;
            }
            continue;
        }

        if let Ok((input, _)) = op(".", &['.'])(rest) {
            // Not a number like `.5`; member access only
            let (input, name) = committed(word_node(full, input))?;
            expr = Expression::Member(MemberExpression {
                object: Box::new(expr),
                property: MemberProperty::Identifier(name),
                optional: false,
                span: make_span(full, start, input),
            });
            rest = input;
            continue;
        }

        if let Ok((input, _)) = symbol("[")(rest) {
            let (input, property) = committed(expression(full, input))?;
            let (input, _) = committed(symbol("]")(input))?;
            expr = Expression::Member(MemberExpression {
                object: Box::new(expr),
                property: MemberProperty::Computed(Box::new(property)),
                optional: false,
                span: make_span(full, start, input),
            });
            rest = input;
            continue;
        }

        if rest.trim_start().starts_with('(') {
            let (input, arguments) = call_arguments(full, rest)?;
            expr = Expression::Call(CallExpression {
                callee: Box::new(expr),
                arguments,
                optional: false,
                span: make_span(full, start, input),
            });
            rest = input;
            continue;
        }

        // TypeScript `as` cast; the annotation is discarded
        if peek_keyword(rest, "as") {
            let (input, _) = keyword("as")(rest)?;
            let (input, _) = committed(ts_type(full, input))?;
            rest = input;
            continue;
        }

        return Ok((rest, expr));
    }
}

/// Parse a parenthesised argument list, allowing spreads and trailing commas
pub fn call_arguments<'a>(full: &'a str, input: &'a str) -> PResult<'a, Vec<Expression>> {
    let (input, _) = symbol("(")(input)?;
    let mut arguments = Vec::new();
    let mut rest = input;

    loop {
        if let Ok((after, _)) = symbol(")")(rest) {
            return Ok((after, arguments));
        }

        let (input, _) = ws(rest)?;
        let arg_start = position(full, input);

        let (input, argument) = if let Ok((after, _)) = symbol("...")(input) {
            let (after, inner) = committed(assignment_expr(full, after))?;
            (
                after,
                Expression::Spread(SpreadElement {
                    argument: Box::new(inner),
                    span: make_span(full, arg_start, after),
                }),
            )
        } else {
            committed(assignment_expr(full, input))?
        };

        arguments.push(argument);

        rest = match symbol(",")(input) {
            Ok((after, _)) => after,
            Err(_) => {
                let (after, _) = committed(symbol(")")(input))?;
                return Ok((after, arguments));
            }
        };
    }
}
