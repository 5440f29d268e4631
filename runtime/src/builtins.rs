//! Built-in globals and member methods for the sandbox
//!
//! The global scope is isolated: only the bindings installed here exist.
//! Timer and async intrinsics are inert stubs so module top-level code that
//! schedules work degrades to a no-op instead of failing, and `console`
//! routes to the `log` crate.

use std::rc::Rc;

use log::{debug, error, warn};

use crate::environment::{define, ScopeRef};
use crate::interpreter::{native, Interpreter, RuntimeError};
use crate::value::{format_number, JsObject, Value};

/// Install the isolated global scope
pub fn install_globals(scope: &ScopeRef) {
    define(scope, "undefined", Value::Undefined);
    define(scope, "NaN", Value::Number(f64::NAN));
    define(scope, "Infinity", Value::Number(f64::INFINITY));
    define(scope, "globalThis", Value::object(JsObject::new()));

    install_console(scope);
    install_timer_stubs(scope);
    install_object_namespace(scope);
    install_array_namespace(scope);
    install_json_namespace(scope);
    install_math_namespace(scope);
    install_error_constructors(scope);
    install_conversions(scope);
}

fn install_console(scope: &ScopeRef) {
    let mut console = JsObject::new();
    console.insert(
        "log".to_string(),
        native("log", |_, args| {
            debug!(target: "wd40_sandbox", "{}", join_args(args));
            Ok(Value::Undefined)
        }),
    );
    console.insert(
        "warn".to_string(),
        native("warn", |_, args| {
            warn!(target: "wd40_sandbox", "{}", join_args(args));
            Ok(Value::Undefined)
        }),
    );
    console.insert(
        "error".to_string(),
        native("error", |_, args| {
            error!(target: "wd40_sandbox", "{}", join_args(args));
            Ok(Value::Undefined)
        }),
    );
    define(scope, "console", Value::object(console));
}

fn join_args(args: &[Value]) -> String {
    args.iter().map(|v| v.to_display_string()).collect::<Vec<_>>().join(" ")
}

/// Timers and microtasks are non-functional inside the sandbox
fn install_timer_stubs(scope: &ScopeRef) {
    for name in ["setTimeout", "setInterval", "queueMicrotask", "requestAnimationFrame"] {
        define(scope, name, native(name, |_, _| Ok(Value::Number(0.0))));
    }
    for name in ["clearTimeout", "clearInterval", "cancelAnimationFrame"] {
        define(scope, name, native(name, |_, _| Ok(Value::Undefined)));
    }
}

fn install_object_namespace(scope: &ScopeRef) {
    let mut object = JsObject::new();

    object.insert(
        "keys".to_string(),
        native("keys", |_, args| match args.first() {
            Some(Value::Object(obj)) => Ok(Value::array(
                obj.borrow().keys().into_iter().map(Value::string).collect(),
            )),
            Some(Value::Array(elements)) => Ok(Value::array(
                (0..elements.borrow().len()).map(|i| Value::string(i.to_string())).collect(),
            )),
            _ => Ok(Value::array(Vec::new())),
        }),
    );

    object.insert(
        "values".to_string(),
        native("values", |_, args| match args.first() {
            Some(Value::Object(obj)) => {
                let obj = obj.borrow();
                Ok(Value::array(
                    obj.keys().iter().filter_map(|k| obj.get(k)).collect(),
                ))
            }
            Some(Value::Array(elements)) => Ok(Value::array(elements.borrow().clone())),
            _ => Ok(Value::array(Vec::new())),
        }),
    );

    object.insert(
        "entries".to_string(),
        native("entries", |_, args| match args.first() {
            Some(Value::Object(obj)) => {
                let obj = obj.borrow();
                Ok(Value::array(
                    obj.keys()
                        .iter()
                        .filter_map(|k| {
                            obj.get(k).map(|v| Value::array(vec![Value::string(k.clone()), v]))
                        })
                        .collect(),
                ))
            }
            _ => Ok(Value::array(Vec::new())),
        }),
    );

    object.insert(
        "assign".to_string(),
        native("assign", |_, args| {
            let target = match args.first() {
                Some(Value::Object(target)) => Rc::clone(target),
                _ => return Err(RuntimeError::new("Object.assign target must be an object")),
            };
            for source in &args[1..] {
                if let Value::Object(source) = source {
                    let entries: Vec<(String, Option<Value>)> = {
                        let source = source.borrow();
                        source.keys().into_iter().map(|k| { let v = source.get(&k); (k, v) }).collect()
                    };
                    for (key, value) in entries {
                        if let Some(value) = value {
                            target.borrow_mut().insert(key, value);
                        }
                    }
                }
            }
            Ok(Value::Object(target))
        }),
    );

    object.insert(
        "freeze".to_string(),
        native("freeze", |_, args| Ok(args.first().cloned().unwrap_or(Value::Undefined))),
    );

    object.insert(
        "fromEntries".to_string(),
        native("fromEntries", |_, args| {
            let mut result = JsObject::new();
            if let Some(Value::Array(entries)) = args.first() {
                for entry in entries.borrow().iter() {
                    if let Value::Array(pair) = entry {
                        let pair = pair.borrow();
                        if let Some(key) = pair.first() {
                            result.insert(
                                key.to_display_string(),
                                pair.get(1).cloned().unwrap_or(Value::Undefined),
                            );
                        }
                    }
                }
            }
            Ok(Value::object(result))
        }),
    );

    define(scope, "Object", Value::object(object));
}

fn install_array_namespace(scope: &ScopeRef) {
    let mut array = JsObject::new();

    array.insert(
        "isArray".to_string(),
        native("isArray", |_, args| {
            Ok(Value::Bool(matches!(args.first(), Some(Value::Array(_)))))
        }),
    );

    array.insert(
        "from".to_string(),
        native("from", |_, args| match args.first() {
            Some(Value::Array(elements)) => Ok(Value::array(elements.borrow().clone())),
            Some(Value::Str(s)) => {
                Ok(Value::array(s.chars().map(|c| Value::string(c.to_string())).collect()))
            }
            _ => Ok(Value::array(Vec::new())),
        }),
    );

    define(scope, "Array", Value::object(array));
}

fn install_json_namespace(scope: &ScopeRef) {
    let mut json = JsObject::new();

    json.insert(
        "stringify".to_string(),
        native("stringify", |_, args| {
            let value = args.first().cloned().unwrap_or(Value::Undefined);
            if matches!(value, Value::Undefined | Value::Function(_) | Value::Native(_)) {
                return Ok(Value::Undefined);
            }
            match serde_json::to_string(&value.to_json()) {
                Ok(text) => Ok(Value::string(text)),
                Err(e) => Err(RuntimeError::new(format!("JSON.stringify failed: {}", e))),
            }
        }),
    );

    json.insert(
        "parse".to_string(),
        native("parse", |_, args| {
            let text = match args.first() {
                Some(Value::Str(s)) => s.as_ref().clone(),
                other => {
                    return Err(RuntimeError::new(format!(
                        "JSON.parse expects a string, got {}",
                        other.map(|v| v.type_of()).unwrap_or("undefined")
                    )))
                }
            };
            match text.parse::<serde_json::Value>() {
                Ok(json) => Ok(Value::from_json(&json)),
                Err(e) => Err(RuntimeError::new(format!("JSON.parse failed: {}", e))),
            }
        }),
    );

    define(scope, "JSON", Value::object(json));
}

fn install_math_namespace(scope: &ScopeRef) {
    let mut math = JsObject::new();
    math.insert("PI".to_string(), Value::Number(std::f64::consts::PI));

    math.insert(
        "min".to_string(),
        native("min", |_, args| {
            Ok(Value::Number(args.iter().map(|v| v.to_number()).fold(f64::INFINITY, f64::min)))
        }),
    );
    math.insert(
        "max".to_string(),
        native("max", |_, args| {
            Ok(Value::Number(
                args.iter().map(|v| v.to_number()).fold(f64::NEG_INFINITY, f64::max),
            ))
        }),
    );
    math.insert(
        "floor".to_string(),
        native("floor", |_, args| Ok(Value::Number(first_number(args).floor()))),
    );
    math.insert(
        "ceil".to_string(),
        native("ceil", |_, args| Ok(Value::Number(first_number(args).ceil()))),
    );
    math.insert(
        "round".to_string(),
        native("round", |_, args| Ok(Value::Number(first_number(args).round()))),
    );
    math.insert(
        "abs".to_string(),
        native("abs", |_, args| Ok(Value::Number(first_number(args).abs()))),
    );
    math.insert(
        "pow".to_string(),
        native("pow", |_, args| {
            let base = first_number(args);
            let exp = args.get(1).map(|v| v.to_number()).unwrap_or(f64::NAN);
            Ok(Value::Number(base.powf(exp)))
        }),
    );
    math.insert(
        "sqrt".to_string(),
        native("sqrt", |_, args| Ok(Value::Number(first_number(args).sqrt()))),
    );

    define(scope, "Math", Value::object(math));
}

fn first_number(args: &[Value]) -> f64 {
    args.first().map(|v| v.to_number()).unwrap_or(f64::NAN)
}

fn install_error_constructors(scope: &ScopeRef) {
    for name in ["Error", "TypeError", "RangeError", "SyntaxError"] {
        define(
            scope,
            name,
            native(name, move |_, args| {
                let mut error = JsObject::new();
                error.insert("name".to_string(), Value::string(name));
                error.insert(
                    "message".to_string(),
                    Value::string(
                        args.first().map(|v| v.to_display_string()).unwrap_or_default(),
                    ),
                );
                Ok(Value::object(error))
            }),
        );
    }
}

fn install_conversions(scope: &ScopeRef) {
    define(
        scope,
        "String",
        native("String", |_, args| {
            Ok(Value::string(args.first().map(|v| v.to_display_string()).unwrap_or_default()))
        }),
    );
    define(
        scope,
        "Number",
        native("Number", |_, args| {
            Ok(Value::Number(args.first().map(|v| v.to_number()).unwrap_or(0.0)))
        }),
    );
    define(
        scope,
        "Boolean",
        native("Boolean", |_, args| {
            Ok(Value::Bool(args.first().map(|v| v.is_truthy()).unwrap_or(false)))
        }),
    );
    define(
        scope,
        "parseFloat",
        native("parseFloat", |_, args| Ok(Value::Number(first_number(args)))),
    );
    define(
        scope,
        "parseInt",
        native("parseInt", |_, args| {
            let text = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            let radix = args.get(1).map(|v| v.to_number() as u32).unwrap_or(10);
            let radix = if radix == 0 { 10 } else { radix };
            if !(2..=36).contains(&radix) {
                return Ok(Value::Number(f64::NAN));
            }
            let trimmed = text.trim();
            let (sign, digits) = match trimmed.strip_prefix('-') {
                Some(rest) => (-1.0, rest),
                None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
            };
            let end = digits
                .char_indices()
                .find(|(_, c)| !c.is_digit(radix))
                .map(|(i, _)| i)
                .unwrap_or(digits.len());
            if end == 0 {
                return Ok(Value::Number(f64::NAN));
            }
            match i64::from_str_radix(&digits[..end], radix) {
                Ok(n) => Ok(Value::Number(sign * n as f64)),
                Err(_) => Ok(Value::Number(f64::NAN)),
            }
        }),
    );
}

/// Method lookup for member access on strings, arrays and plain objects
pub fn member_method(receiver: &Value, key: &str) -> Option<Value> {
    match receiver {
        Value::Str(_) => string_method(receiver.clone(), key),
        Value::Array(_) => array_method(receiver.clone(), key),
        Value::Object(_) => object_method(receiver.clone(), key),
        _ => None,
    }
}

fn receiver_string(receiver: &Value) -> String {
    match receiver {
        Value::Str(s) => s.as_ref().clone(),
        other => other.to_display_string(),
    }
}

fn string_method(receiver: Value, key: &str) -> Option<Value> {
    let method: Value = match key {
        "includes" => native("includes", move |_, args| {
            let needle = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            Ok(Value::Bool(receiver_string(&receiver).contains(&needle)))
        }),
        "startsWith" => native("startsWith", move |_, args| {
            let needle = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            Ok(Value::Bool(receiver_string(&receiver).starts_with(&needle)))
        }),
        "endsWith" => native("endsWith", move |_, args| {
            let needle = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            Ok(Value::Bool(receiver_string(&receiver).ends_with(&needle)))
        }),
        "indexOf" => native("indexOf", move |_, args| {
            let needle = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            let text = receiver_string(&receiver);
            Ok(Value::Number(match text.find(&needle) {
                Some(byte_index) => text[..byte_index].chars().count() as f64,
                None => -1.0,
            }))
        }),
        "slice" => native("slice", move |_, args| {
            let text = receiver_string(&receiver);
            let chars: Vec<char> = text.chars().collect();
            let (start, end) = slice_bounds(chars.len(), args);
            Ok(Value::string(chars[start..end].iter().collect::<String>()))
        }),
        "replace" => native("replace", move |_, args| {
            let pattern = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            let replacement = args.get(1).map(|v| v.to_display_string()).unwrap_or_default();
            Ok(Value::string(receiver_string(&receiver).replacen(&pattern, &replacement, 1)))
        }),
        "replaceAll" => native("replaceAll", move |_, args| {
            let pattern = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            let replacement = args.get(1).map(|v| v.to_display_string()).unwrap_or_default();
            Ok(Value::string(receiver_string(&receiver).replace(&pattern, &replacement)))
        }),
        "split" => native("split", move |_, args| {
            let separator = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            let text = receiver_string(&receiver);
            let parts: Vec<Value> = if separator.is_empty() {
                text.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                text.split(&separator).map(Value::string).collect()
            };
            Ok(Value::array(parts))
        }),
        "toUpperCase" => native("toUpperCase", move |_, _| {
            Ok(Value::string(receiver_string(&receiver).to_uppercase()))
        }),
        "toLowerCase" => native("toLowerCase", move |_, _| {
            Ok(Value::string(receiver_string(&receiver).to_lowercase()))
        }),
        "trim" => native("trim", move |_, _| {
            Ok(Value::string(receiver_string(&receiver).trim().to_string()))
        }),
        "charAt" => native("charAt", move |_, args| {
            let index = args.first().map(|v| v.to_number()).unwrap_or(0.0) as usize;
            let text = receiver_string(&receiver);
            Ok(Value::string(
                text.chars().nth(index).map(|c| c.to_string()).unwrap_or_default(),
            ))
        }),
        "concat" => native("concat", move |_, args| {
            let mut out = receiver_string(&receiver);
            for arg in args {
                out.push_str(&arg.to_display_string());
            }
            Ok(Value::string(out))
        }),
        "repeat" => native("repeat", move |_, args| {
            let count = args.first().map(|v| v.to_number()).unwrap_or(0.0);
            if count < 0.0 {
                return Err(RuntimeError::new("repeat count must be non-negative"));
            }
            Ok(Value::string(receiver_string(&receiver).repeat(count as usize)))
        }),
        "toString" => native("toString", move |_, _| {
            Ok(Value::string(receiver_string(&receiver)))
        }),
        _ => return None,
    };
    Some(method)
}

fn slice_bounds(len: usize, args: &[Value]) -> (usize, usize) {
    let norm = |v: f64| -> usize {
        if v < 0.0 {
            len.saturating_sub((-v) as usize)
        } else {
            (v as usize).min(len)
        }
    };
    let start = args.first().map(|v| norm(v.to_number())).unwrap_or(0);
    let end = args.get(1).map(|v| norm(v.to_number())).unwrap_or(len);
    (start, end.max(start))
}

fn array_method(receiver: Value, key: &str) -> Option<Value> {
    let elements = match &receiver {
        Value::Array(elements) => Rc::clone(elements),
        _ => return None,
    };

    let method: Value = match key {
        "push" => native("push", move |_, args| {
            let mut elements = elements.borrow_mut();
            elements.extend(args.iter().cloned());
            Ok(Value::Number(elements.len() as f64))
        }),
        "pop" => native("pop", move |_, _| {
            Ok(elements.borrow_mut().pop().unwrap_or(Value::Undefined))
        }),
        "map" => native("map", move |interp, args| {
            let callback = args.first().cloned().unwrap_or(Value::Undefined);
            let snapshot = elements.borrow().clone();
            let mut out = Vec::with_capacity(snapshot.len());
            for (i, element) in snapshot.into_iter().enumerate() {
                out.push(interp.call_value(&callback, vec![element, Value::Number(i as f64)])?);
            }
            Ok(Value::array(out))
        }),
        "filter" => native("filter", move |interp, args| {
            let callback = args.first().cloned().unwrap_or(Value::Undefined);
            let snapshot = elements.borrow().clone();
            let mut out = Vec::new();
            for (i, element) in snapshot.into_iter().enumerate() {
                if interp
                    .call_value(&callback, vec![element.clone(), Value::Number(i as f64)])?
                    .is_truthy()
                {
                    out.push(element);
                }
            }
            Ok(Value::array(out))
        }),
        "forEach" => native("forEach", move |interp, args| {
            let callback = args.first().cloned().unwrap_or(Value::Undefined);
            let snapshot = elements.borrow().clone();
            for (i, element) in snapshot.into_iter().enumerate() {
                interp.call_value(&callback, vec![element, Value::Number(i as f64)])?;
            }
            Ok(Value::Undefined)
        }),
        "join" => native("join", move |_, args| {
            let separator = args
                .first()
                .map(|v| v.to_display_string())
                .unwrap_or_else(|| ",".to_string());
            Ok(Value::string(
                elements
                    .borrow()
                    .iter()
                    .map(|v| v.to_display_string())
                    .collect::<Vec<_>>()
                    .join(&separator),
            ))
        }),
        "indexOf" => native("indexOf", move |_, args| {
            let needle = args.first().cloned().unwrap_or(Value::Undefined);
            let index = elements.borrow().iter().position(|v| v.strict_equals(&needle));
            Ok(Value::Number(index.map(|i| i as f64).unwrap_or(-1.0)))
        }),
        "includes" => native("includes", move |_, args| {
            let needle = args.first().cloned().unwrap_or(Value::Undefined);
            Ok(Value::Bool(elements.borrow().iter().any(|v| v.strict_equals(&needle))))
        }),
        "concat" => native("concat", move |_, args| {
            let mut out = elements.borrow().clone();
            for arg in args {
                match arg {
                    Value::Array(other) => out.extend(other.borrow().clone()),
                    other => out.push(other.clone()),
                }
            }
            Ok(Value::array(out))
        }),
        "slice" => native("slice", move |_, args| {
            let snapshot = elements.borrow();
            let (start, end) = slice_bounds(snapshot.len(), args);
            Ok(Value::array(snapshot[start..end].to_vec()))
        }),
        "find" => native("find", move |interp, args| {
            let callback = args.first().cloned().unwrap_or(Value::Undefined);
            let snapshot = elements.borrow().clone();
            for (i, element) in snapshot.into_iter().enumerate() {
                if interp
                    .call_value(&callback, vec![element.clone(), Value::Number(i as f64)])?
                    .is_truthy()
                {
                    return Ok(element);
                }
            }
            Ok(Value::Undefined)
        }),
        "some" => native("some", move |interp, args| {
            let callback = args.first().cloned().unwrap_or(Value::Undefined);
            let snapshot = elements.borrow().clone();
            for (i, element) in snapshot.into_iter().enumerate() {
                if interp
                    .call_value(&callback, vec![element, Value::Number(i as f64)])?
                    .is_truthy()
                {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }),
        "every" => native("every", move |interp, args| {
            let callback = args.first().cloned().unwrap_or(Value::Undefined);
            let snapshot = elements.borrow().clone();
            for (i, element) in snapshot.into_iter().enumerate() {
                if !interp
                    .call_value(&callback, vec![element, Value::Number(i as f64)])?
                    .is_truthy()
                {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }),
        "reduce" => native("reduce", move |interp, args| {
            let callback = args.first().cloned().unwrap_or(Value::Undefined);
            let snapshot = elements.borrow().clone();
            let mut iter = snapshot.into_iter().enumerate();

            let mut acc = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match iter.next() {
                    Some((_, first)) => first,
                    None => {
                        return Err(RuntimeError::new("reduce of empty array with no initial value"))
                    }
                },
            };

            for (i, element) in iter {
                acc = interp.call_value(&callback, vec![acc, element, Value::Number(i as f64)])?;
            }
            Ok(acc)
        }),
        "flat" => native("flat", move |_, _| {
            let mut out = Vec::new();
            for element in elements.borrow().iter() {
                match element {
                    Value::Array(inner) => out.extend(inner.borrow().clone()),
                    other => out.push(other.clone()),
                }
            }
            Ok(Value::array(out))
        }),
        _ => return None,
    };
    Some(method)
}

fn object_method(receiver: Value, key: &str) -> Option<Value> {
    let object = match &receiver {
        Value::Object(object) => Rc::clone(object),
        _ => return None,
    };

    let method: Value = match key {
        "hasOwnProperty" => native("hasOwnProperty", move |_, args| {
            let key = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            Ok(Value::Bool(object.borrow().contains_key(&key)))
        }),
        "toString" => native("toString", move |_, _| Ok(Value::string("[object Object]"))),
        _ => return None,
    };
    Some(method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Scope;

    #[test]
    fn test_globals_installed() {
        let scope = Scope::root();
        install_globals(&scope);

        for name in ["console", "Object", "Array", "JSON", "Math", "setTimeout", "Error"] {
            assert!(
                crate::environment::lookup(&scope, name).is_some(),
                "missing global {}",
                name
            );
        }
    }

    #[test]
    fn test_member_method_lookup() {
        let s = Value::string("hello");
        assert!(member_method(&s, "includes").is_some());
        assert!(member_method(&s, "definitelyNot").is_none());

        let a = Value::array(vec![Value::Number(1.0)]);
        assert!(member_method(&a, "map").is_some());
    }
}
