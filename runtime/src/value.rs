//! Runtime values for sandboxed module evaluation
//!
//! Objects and arrays are shared references so factory functions can mutate
//! the `exports` object they are handed. Object properties keep insertion
//! order; a property slot is either plain data or a lazy alias onto another
//! object's key (the re-export form installed by `export_star`).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use parser::js_ast::{ArrowBody, BlockStatement, Expression, FunctionParam};

use crate::environment::ScopeRef;
use crate::interpreter::{Interpreter, RuntimeError};

pub type ObjectRef = Rc<RefCell<JsObject>>;
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// A JavaScript value in the sandbox
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<String>),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Rc<JsFunction>),
    Native(NativeFunction),
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Value::Str(Rc::new(value.into()))
    }

    pub fn object(object: JsObject) -> Self {
        Value::Object(Rc::new(RefCell::new(object)))
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// `typeof` semantics
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) | Value::Native(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Native(_) => true,
        }
    }

    /// `===` semantics (reference equality for objects)
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==` semantics, restricted to null/undefined coercion plus strict
    /// equality everywhere else
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            _ => self.strict_equals(other),
        }
    }

    /// String conversion used by `+` concatenation and template literals
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.as_ref().clone(),
            Value::Array(elements) => elements
                .borrow()
                .iter()
                .map(|v| v.to_display_string())
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(_) | Value::Native(_) => "function".to_string(),
        }
    }

    /// Numeric coercion for arithmetic
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// Convert to a JSON value for handing results across the sandbox
    /// boundary. Functions and undefined become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.as_ref().clone()),
            Value::Array(elements) => {
                serde_json::Value::Array(elements.borrow().iter().map(|v| v.to_json()).collect())
            }
            Value::Object(object) => {
                let object = object.borrow();
                let mut map = serde_json::Map::new();
                for key in object.keys() {
                    if let Some(value) = object.get(&key) {
                        map.insert(key, value.to_json());
                    }
                }
                serde_json::Value::Object(map)
            }
            Value::Function(_) | Value::Native(_) => serde_json::Value::Null,
        }
    }

    /// Build a runtime value from a JSON value
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::string(s.clone()),
            serde_json::Value::Array(elements) => {
                Value::array(elements.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut object = JsObject::new();
                for (key, value) in map {
                    object.insert(key.clone(), Value::from_json(value));
                }
                Value::object(object)
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", element)?;
                }
                write!(f, "]")
            }
            Value::Object(object) => {
                write!(f, "{{")?;
                let object = object.borrow();
                for (i, key) in object.keys().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match object.get(key) {
                        Some(value) => write!(f, "{}: {:?}", key, value)?,
                        None => write!(f, "{}: undefined", key)?,
                    }
                }
                write!(f, "}}")
            }
            Value::Function(function) => {
                write!(f, "[function {}]", function.name.as_deref().unwrap_or("anonymous"))
            }
            Value::Native(native) => write!(f, "[native {}]", native.name),
        }
    }
}

/// Format a number the way JavaScript's ToString does for the common cases
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One object property: plain data or a lazy alias onto another object
#[derive(Clone, Debug)]
pub enum PropertySlot {
    Data(Value),
    Alias { source: ObjectRef, key: String },
}

/// An ordered-property object
#[derive(Clone, Debug, Default)]
pub struct JsObject {
    properties: IndexMap<String, PropertySlot>,
}

impl JsObject {
    pub fn new() -> Self {
        Self { properties: IndexMap::new() }
    }

    pub fn insert(&mut self, key: String, value: Value) {
        self.properties.insert(key, PropertySlot::Data(value));
    }

    /// Install a lazy alias slot unless the key is already present
    pub fn insert_alias_if_absent(&mut self, key: String, source: ObjectRef) {
        if !self.properties.contains_key(&key) {
            self.properties.insert(key.clone(), PropertySlot::Alias { source, key });
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Resolve a property, following alias slots
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.properties.get(key)? {
            PropertySlot::Data(value) => Some(value.clone()),
            PropertySlot::Alias { source, key } => source.borrow().get(key),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// The body of an interpreted function
#[derive(Clone, Debug)]
pub enum FunctionBody {
    Block(BlockStatement),
    Expression(Expression),
}

impl From<ArrowBody> for FunctionBody {
    fn from(body: ArrowBody) -> Self {
        match body {
            ArrowBody::Expression(expr) => FunctionBody::Expression(*expr),
            ArrowBody::Block(block) => FunctionBody::Block(block),
        }
    }
}

/// A user-defined function value with its captured scope
#[derive(Clone, Debug)]
pub struct JsFunction {
    pub name: Option<String>,
    pub params: Vec<FunctionParam>,
    pub body: FunctionBody,
    pub closure: ScopeRef,
}

/// A built-in function implemented in Rust
#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub func: Rc<dyn Fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>>,
}

impl NativeFunction {
    pub fn new(
        name: &'static str,
        func: impl Fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        Self { name, func: Rc::new(func) }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[native {}]", self.name)
    }
}
