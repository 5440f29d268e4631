//! JavaScript/TypeScript module parser, emitter and traversal
//!
//! The front half of the build-time evaluation pipeline: parse module
//! source into a span-tracked AST (`js_ast` / `js_parser*`), walk it
//! (`visit`), and render programs back to JavaScript text (`codegen`).

pub mod js_ast;
pub mod js_parser;
pub mod js_parser_decls;
pub mod js_parser_expr;
pub mod js_parser_expr2;

pub mod codegen;
pub mod custom_error;
pub mod error;
pub mod visit;

// Re-export diagnostics from the diagnostics crate
pub use diagnostics::*;

pub use codegen::{expression_to_code, program_to_code, CodeEmitter, MODULE_WRAPPER_FN};
pub use error::ParseError;
pub use js_ast::*;
pub use js_parser::{parse_program, PResult};
pub use visit::{Visit, VisitMut};
