//! Shared test fixtures: a `makeStyles`-like module config whose handler
//! maps style objects to deterministic class names and CSS rules

use std::rc::Rc;

use parser::js_ast::*;
use transform::{strip_asset_markers, ModuleConfig, TransformError};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 output is ascii")
}

/// Deterministic class name for one declaration, e.g. `fka9v8`
pub fn class_name(property: &str, value: &str) -> String {
    let hash = fxhash::hash64(&format!("{}:{}", property, value));
    let mut name = base36(hash);
    name.truncate(6);
    format!("f{}", name)
}

/// Deterministic scrambled property key, e.g. `sj55zd`
pub fn property_key(property: &str) -> String {
    let hash = fxhash::hash64(property);
    let mut key = base36(hash);
    key.truncate(6);
    format!("s{}", key)
}

fn string_property(key: &str, value: &str) -> ObjectMember {
    ObjectMember::Property(Property {
        key: PropertyKey::Identifier(Identifier::new(key)),
        value: Expression::String(StringLiteral::new(value)),
        shorthand: false,
        span: Span::default(),
    })
}

/// Module config intercepting `makeStyles` from `@griffel/core`.
///
/// The handler resolves each slot's declarations into
/// `{ <slot>: { <property-key>: '<class>' } }`, replaces the call with
/// `__styles(mapping, { d: [rules…] })` via a named import, and appends the
/// rules (markers stripped) to the CSS accumulator.
pub fn make_styles_config() -> Vec<ModuleConfig> {
    let handler = Rc::new(|input: transform::HandlerInput<'_>| -> Result<(), TransformError> {
        let styles_by_slot = input.params.first().and_then(|v| v.as_object()).ok_or_else(|| {
            TransformError::SandboxExecution {
                module: input.context.filename.clone(),
                message: "makeStyles expects a style object".to_string(),
            }
        })?;

        let import_name = input.utils.add_named_import("@griffel/core", "__styles");

        let mut mapping = Vec::new();
        let mut rules = Vec::new();

        for (slot, declarations) in styles_by_slot {
            let declarations = declarations.as_object().ok_or_else(|| {
                TransformError::SandboxExecution {
                    module: input.context.filename.clone(),
                    message: format!("slot '{}' is not an object", slot),
                }
            })?;

            let mut slot_mapping = Vec::new();
            for (property, value) in declarations {
                let value = match value.as_str() {
                    Some(value) => value.to_string(),
                    None => value.to_string(),
                };
                let class = class_name(property, &value);

                slot_mapping.push(string_property(&property_key(property), &class));
                rules.push(format!(".{}{{{}:{};}}", class, property, value));
            }

            mapping.push(ObjectMember::Property(Property {
                key: PropertyKey::Identifier(Identifier::new(slot.clone())),
                value: Expression::Object(ObjectExpression {
                    properties: slot_mapping,
                    span: Span::default(),
                }),
                shorthand: false,
                span: Span::default(),
            }));
        }

        for rule in &rules {
            input.utils.append_css_text(&strip_asset_markers(rule));
        }

        let rules_array = Expression::Array(ArrayExpression {
            elements: rules
                .iter()
                .map(|rule| Expression::String(StringLiteral::new(rule.clone())))
                .collect(),
            span: Span::default(),
        });

        let second_argument = Expression::Object(ObjectExpression {
            properties: vec![ObjectMember::Property(Property {
                key: PropertyKey::Identifier(Identifier::new("d")),
                value: rules_array,
                shorthand: false,
                span: Span::default(),
            })],
            span: Span::default(),
        });

        input.utils.replace_with(Expression::Call(CallExpression {
            callee: Box::new(Expression::Identifier(Identifier::new(import_name))),
            arguments: vec![
                Expression::Object(ObjectExpression {
                    properties: mapping,
                    span: Span::default(),
                }),
                second_argument,
            ],
            optional: false,
            span: Span::default(),
        }));

        Ok(())
    });

    vec![ModuleConfig::new("@griffel/core").with_specifier("makeStyles", handler)]
}
