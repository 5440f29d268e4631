//! Parse error reporting
//!
//! Converts the parser's contextual nom errors into a displayable error with
//! file/line/column information and a rendered diagnostic snippet.

use std::fmt;

use diagnostics::{DiagnosticBuilder, ErrorFormatter, SourceMap};

use crate::custom_error::ContextualError;

/// A fatal parse error for one source file
#[derive(Debug, Clone)]
pub struct ParseError {
    pub filename: String,
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// Rendered diagnostic with the offending source line
    pub rendered: String,
}

impl ParseError {
    pub fn new(filename: &str, source: &str, offset: usize, message: &str) -> Self {
        let mut source_map = SourceMap::new();
        let file_id = source_map.add_file(filename.to_string(), source.to_string());

        let offset = offset.min(source.len());
        let span = source_map
            .span_from_offsets(file_id, offset, (offset + 1).min(source.len()))
            .expect("file was just added");

        let (line, column) = (span.start.line, span.start.column);

        let diagnostic = DiagnosticBuilder::error(message, span).code("E0001").build();
        let rendered = ErrorFormatter::new().format_diagnostic(&diagnostic, &source_map);

        Self {
            filename: filename.to_string(),
            message: message.to_string(),
            line,
            column,
            rendered,
        }
    }

    /// Build from a contextual nom error, using the deepest failure point
    pub fn from_contextual(filename: &str, source: &str, error: &ContextualError<&str>) -> Self {
        let offset = source.len() - error.input.len();
        let message = error.message().unwrap_or("syntax error");
        Self::new(filename, source, offset, message)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.filename, self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}
