//! Sandbox runtime for build-time module evaluation
//!
//! A minimal, isolated JavaScript execution environment: a tree-walking
//! interpreter over the `parser` crate's AST plus a CommonJS-style module
//! loader for the wrapped wire format. Each [`Sandbox`] owns its own module
//! registry and global scope; nothing is shared between evaluations.

pub mod builtins;
pub mod environment;
pub mod interpreter;
pub mod sandbox;
pub mod value;

pub use interpreter::{Flow, Interpreter, RuntimeError};
pub use sandbox::Sandbox;
pub use value::{JsFunction, JsObject, NativeFunction, ObjectRef, PropertySlot, Value};
