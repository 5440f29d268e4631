//! Diagnostics library for rich error reporting
//!
//! This library provides Rust-style diagnostics with:
//! - Multiple severity levels (Error, Warning, Info, Hint)
//! - Source code snippets with highlighting
//! - Multi-file source map support
//! - Colored terminal output

use std::fmt;

// Re-export source mapping types from the source_map crate
pub use source_map::{FileId, SourceFile, SourceMap, SourcePosition, SourceSpan};

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Info => write!(f, "info"),
            DiagnosticSeverity::Hint => write!(f, "hint"),
        }
    }
}

/// Style for diagnostic labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    Primary,
    Secondary,
}

/// A label that points to a span of code
#[derive(Debug, Clone)]
pub struct Label {
    pub span: SourceSpan,
    pub message: String,
    pub style: LabelStyle,
}

impl Label {
    pub fn primary(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    pub fn secondary(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}

/// A diagnostic message with severity, labels, and notes
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
    pub span: SourceSpan,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

/// Collection of diagnostics
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
    }
}

/// Builder for creating diagnostics
pub struct DiagnosticBuilder {
    severity: DiagnosticSeverity,
    code: Option<String>,
    message: String,
    span: SourceSpan,
    labels: Vec<Label>,
    notes: Vec<String>,
    help: Vec<String>,
}

impl DiagnosticBuilder {
    pub fn error(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticSeverity::Error, message, span)
    }

    pub fn warning(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticSeverity::Warning, message, span)
    }

    fn new(severity: DiagnosticSeverity, message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            span,
            labels: vec![],
            notes: vec![],
            help: vec![],
        }
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn label(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    pub fn secondary_label(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn help(mut self, help_msg: impl Into<String>) -> Self {
        self.help.push(help_msg.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        Diagnostic {
            severity: self.severity,
            code: self.code,
            message: self.message,
            span: self.span,
            labels: self.labels,
            notes: self.notes,
            help: self.help,
        }
    }
}

/// Formatter for displaying diagnostics
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    pub fn with_colors() -> Self {
        Self { use_colors: true }
    }

    pub fn format_diagnostics(&self, diagnostics: &Diagnostics, source_map: &SourceMap) -> String {
        let mut output = String::new();

        for (i, diagnostic) in diagnostics.diagnostics.iter().enumerate() {
            if i > 0 {
                output.push('\n');
            }
            output.push_str(&self.format_diagnostic(diagnostic, source_map));
        }

        output
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic, source_map: &SourceMap) -> String {
        let mut output = String::new();

        let (severity_color, reset, bold, dim) = if self.use_colors {
            let color = match diagnostic.severity {
                DiagnosticSeverity::Error => "\x1b[31m",
                DiagnosticSeverity::Warning => "\x1b[33m",
                DiagnosticSeverity::Info => "\x1b[36m",
                DiagnosticSeverity::Hint => "\x1b[32m",
            };
            (color, "\x1b[0m", "\x1b[1m", "\x1b[2m")
        } else {
            ("", "", "", "")
        };

        // Header: `error[E0001]: message`
        output.push_str(severity_color);
        output.push_str(bold);
        output.push_str(&diagnostic.severity.to_string());
        if let Some(code) = &diagnostic.code {
            output.push_str(&format!("[{}]", code));
        }
        output.push_str(reset);
        output.push_str(bold);
        output.push_str(&format!(": {}", diagnostic.message));
        output.push_str(reset);
        output.push('\n');

        // Location: ` --> file:line:col`
        if let Some(file) = source_map.get_file(diagnostic.span.file_id) {
            output.push_str(dim);
            output.push_str(&format!(
                "  --> {}:{}:{}\n",
                file.name, diagnostic.span.start.line, diagnostic.span.start.column
            ));
            output.push_str(reset);

            // Source snippet with a caret underline
            if let Some(line_text) = file.get_line(diagnostic.span.start.line) {
                let line_number = diagnostic.span.start.line;
                let gutter_width = line_number.to_string().len();

                output.push_str(&format!("{:width$} |\n", "", width = gutter_width));
                output.push_str(&format!("{} | {}\n", line_number, line_text));
                output.push_str(&format!("{:width$} | ", "", width = gutter_width));

                let col = diagnostic.span.start.column.saturating_sub(1);
                let underline_len = if diagnostic.span.end.line == diagnostic.span.start.line {
                    (diagnostic.span.end.column.saturating_sub(diagnostic.span.start.column)).max(1)
                } else {
                    1
                };

                output.push_str(&" ".repeat(col));
                output.push_str(severity_color);
                output.push_str(&"^".repeat(underline_len));
                output.push_str(reset);
                output.push('\n');
            }
        }

        for label in &diagnostic.labels {
            let marker = match label.style {
                LabelStyle::Primary => "^",
                LabelStyle::Secondary => "-",
            };
            output.push_str(&format!("  {} {}\n", marker, label.message));
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("  = note: {}\n", note));
        }

        for help in &diagnostic.help {
            output.push_str(&format!("  = help: {}\n", help));
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_in(source_map: &mut SourceMap, name: &str, content: &str) -> SourceSpan {
        let file_id = source_map.add_file(name.to_string(), content.to_string());
        source_map.span_from_offsets(file_id, 0, 5).unwrap()
    }

    #[test]
    fn test_format_error_without_colors() {
        let mut source_map = SourceMap::new();
        let span = span_in(&mut source_map, "input.ts", "const a = ;");

        let diagnostic = DiagnosticBuilder::error("unexpected token", span)
            .code("E0001")
            .help("an expression is required after '='")
            .build();

        let formatter = ErrorFormatter::new();
        let rendered = formatter.format_diagnostic(&diagnostic, &source_map);

        assert!(rendered.contains("error[E0001]: unexpected token"));
        assert!(rendered.contains("--> input.ts:1:1"));
        assert!(rendered.contains("const a = ;"));
        assert!(rendered.contains("= help: an expression is required after '='"));
    }

    #[test]
    fn test_has_errors() {
        let mut source_map = SourceMap::new();
        let span = span_in(&mut source_map, "input.ts", "let x = 1;");

        let mut diagnostics = Diagnostics::new();
        assert!(!diagnostics.has_errors());

        diagnostics.push(DiagnosticBuilder::warning("unused binding", span.clone()).build());
        assert!(!diagnostics.has_errors());

        diagnostics.push(DiagnosticBuilder::error("boom", span).build());
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.errors().count(), 1);
        assert_eq!(diagnostics.warnings().count(), 1);
    }
}
