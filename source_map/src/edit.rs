//! Span-tracking edit buffer over a single source file
//!
//! The transform rewrites call sites by patching byte ranges of the original
//! source rather than re-printing the whole program. [`EditBuffer`] keeps the
//! untouched pieces of the source addressable so the final output can be
//! rendered together with a Source Map v3 object that still points edited
//! output back at the original text.

use serde::Serialize;

use crate::compute_line_starts_for;

/// One piece of the output: either a still-untouched slice of the original
/// source, or replacement text attributed to the original offset it replaced.
#[derive(Debug, Clone)]
enum Piece {
    Original { start: usize, end: usize },
    Synthetic { text: String, origin: Option<usize> },
}

/// An append-only patch buffer over one source text.
///
/// Ranges passed to [`EditBuffer::update`] are byte offsets into the original
/// source and must not overlap previously replaced ranges.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    source: String,
    line_starts: Vec<usize>,
    prefix: Vec<String>,
    pieces: Vec<Piece>,
    suffix: Vec<String>,
}

impl EditBuffer {
    pub fn new(source: &str) -> Self {
        Self {
            line_starts: compute_line_starts_for(source),
            pieces: vec![Piece::Original { start: 0, end: source.len() }],
            source: source.to_string(),
            prefix: Vec::new(),
            suffix: Vec::new(),
        }
    }

    /// The unmodified source text this buffer was created over.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Slice of the original source, by byte range.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        &self.source[start..end]
    }

    /// Insert text before everything else, in call order.
    pub fn prepend(&mut self, text: &str) {
        self.prefix.push(text.to_string());
    }

    /// Insert text after everything else, in call order.
    pub fn append(&mut self, text: &str) {
        self.suffix.push(text.to_string());
    }

    /// Replace the byte range `start..end` of the original source with
    /// `text`. A range that falls entirely inside an already-replaced range
    /// is dropped.
    pub fn update(&mut self, start: usize, end: usize, text: &str) {
        let mut next = Vec::with_capacity(self.pieces.len() + 2);
        let mut replacement = Some(Piece::Synthetic {
            text: text.to_string(),
            origin: Some(start),
        });

        for piece in self.pieces.drain(..) {
            match piece {
                Piece::Original { start: s, end: e } if s < end && e > start => {
                    if s < start {
                        next.push(Piece::Original { start: s, end: start });
                    }
                    if let Some(rep) = replacement.take() {
                        next.push(rep);
                    }
                    if e > end {
                        next.push(Piece::Original { start: end, end: e });
                    }
                }
                other => next.push(other),
            }
        }

        self.pieces = next;
    }

    /// Remove the byte range `start..end` of the original source.
    pub fn remove(&mut self, start: usize, end: usize) {
        self.update(start, end, "");
    }

    /// Render the patched output text.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        for chunk in &self.prefix {
            out.push_str(chunk);
        }
        for piece in &self.pieces {
            match piece {
                Piece::Original { start, end } => out.push_str(&self.source[*start..*end]),
                Piece::Synthetic { text, .. } => out.push_str(text),
            }
        }
        for chunk in &self.suffix {
            out.push_str(chunk);
        }
        out
    }

    /// Render a Source Map v3 object mapping the patched output back to the
    /// original source. Untouched pieces get a mapping per output line;
    /// replacements map to the start of the range they replaced.
    pub fn render_map(&self, source_name: &str) -> RenderedSourceMap {
        let mut builder = MappingsBuilder::new();

        for chunk in &self.prefix {
            builder.advance(chunk);
        }
        for piece in &self.pieces {
            match piece {
                Piece::Original { start, end } => {
                    let text = &self.source[*start..*end];
                    let (mut line, mut col) = self.offset_to_line_col0(*start);
                    builder.add_segment(line, col);
                    for ch in text.chars() {
                        builder.advance_char(ch);
                        if ch == '\n' {
                            line += 1;
                            col = 0;
                            builder.add_segment(line, col);
                        } else {
                            col += 1;
                        }
                    }
                }
                Piece::Synthetic { text, origin } => {
                    if let Some(offset) = origin {
                        if !text.is_empty() {
                            let (line, col) = self.offset_to_line_col0(*offset);
                            builder.add_segment(line, col);
                        }
                    }
                    builder.advance(text);
                }
            }
        }
        for chunk in &self.suffix {
            builder.advance(chunk);
        }

        RenderedSourceMap {
            version: 3,
            file: None,
            sources: vec![source_name.to_string()],
            sources_content: vec![self.source.clone()],
            names: Vec::new(),
            mappings: builder.finish(),
        }
    }

    /// 0-based line/column for a byte offset into the original source
    fn offset_to_line_col0(&self, offset: usize) -> (usize, usize) {
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line_index).copied().unwrap_or(0);
        let column = self.source[line_start..offset].chars().count();
        (line_index, column)
    }
}

/// A rendered Source Map v3 object
#[derive(Debug, Clone, Serialize)]
pub struct RenderedSourceMap {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(rename = "sourcesContent")]
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl RenderedSourceMap {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Incremental builder for the semicolon/comma separated VLQ `mappings` field
struct MappingsBuilder {
    mappings: String,
    generated_column: i64,
    prev_generated_column: i64,
    prev_original_line: i64,
    prev_original_column: i64,
    prev_source_index: i64,
    line_has_segment: bool,
}

impl MappingsBuilder {
    fn new() -> Self {
        Self {
            mappings: String::new(),
            generated_column: 0,
            prev_generated_column: 0,
            prev_original_line: 0,
            prev_original_column: 0,
            prev_source_index: 0,
            line_has_segment: false,
        }
    }

    /// Record a mapping from the current generated position to an original
    /// 0-based line/column.
    fn add_segment(&mut self, original_line: usize, original_column: usize) {
        if self.line_has_segment {
            self.mappings.push(',');
        }
        self.line_has_segment = true;

        encode_vlq(&mut self.mappings, self.generated_column - self.prev_generated_column);
        encode_vlq(&mut self.mappings, 0 - self.prev_source_index);
        encode_vlq(&mut self.mappings, original_line as i64 - self.prev_original_line);
        encode_vlq(&mut self.mappings, original_column as i64 - self.prev_original_column);

        self.prev_generated_column = self.generated_column;
        self.prev_source_index = 0;
        self.prev_original_line = original_line as i64;
        self.prev_original_column = original_column as i64;
    }

    fn advance(&mut self, text: &str) {
        for ch in text.chars() {
            self.advance_char(ch);
        }
    }

    fn advance_char(&mut self, ch: char) {
        if ch == '\n' {
            self.mappings.push(';');
            self.generated_column = 0;
            self.prev_generated_column = 0;
            self.line_has_segment = false;
        } else {
            self.generated_column += 1;
        }
    }

    fn finish(self) -> String {
        self.mappings
    }
}

const BASE64_CHARS: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Base64 VLQ encoding as used by the Source Map v3 `mappings` field
fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq: u64 = if value < 0 {
        (((-value) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = (vlq & 0x1f) as u8;
        vlq >>= 5;
        if vlq != 0 {
            digit |= 0x20;
        }
        out.push(BASE64_CHARS[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_unchanged() {
        let buffer = EditBuffer::new("const a = 1;\n");
        assert_eq!(buffer.render(), "const a = 1;\n");
    }

    #[test]
    fn test_update_replaces_range() {
        let mut buffer = EditBuffer::new("const a = 1;");
        buffer.update(10, 11, "2");
        assert_eq!(buffer.render(), "const a = 2;");
    }

    #[test]
    fn test_update_then_prepend_append() {
        let mut buffer = EditBuffer::new("makeStyles({})");
        buffer.update(0, 14, "__styles({})");
        buffer.prepend("import { __styles } from \"x\";\n");
        buffer.append("\n// end");
        assert_eq!(
            buffer.render(),
            "import { __styles } from \"x\";\n__styles({})\n// end"
        );
    }

    #[test]
    fn test_non_overlapping_updates() {
        let mut buffer = EditBuffer::new("aaa bbb ccc");
        buffer.update(0, 3, "xxx");
        buffer.update(8, 11, "yyy");
        assert_eq!(buffer.render(), "xxx bbb yyy");
    }

    #[test]
    fn test_remove() {
        let mut buffer = EditBuffer::new("keep drop keep");
        buffer.remove(4, 9);
        assert_eq!(buffer.render(), "keep keep");
    }

    #[test]
    fn test_vlq_encoding() {
        let mut out = String::new();
        encode_vlq(&mut out, 0);
        assert_eq!(out, "A");

        let mut out = String::new();
        encode_vlq(&mut out, 1);
        assert_eq!(out, "C");

        let mut out = String::new();
        encode_vlq(&mut out, -1);
        assert_eq!(out, "D");

        let mut out = String::new();
        encode_vlq(&mut out, 16);
        assert_eq!(out, "gB");
    }

    #[test]
    fn test_map_for_identity_render() {
        let buffer = EditBuffer::new("let a = 1;\nlet b = 2;\n");
        let map = buffer.render_map("input.ts");

        assert_eq!(map.version, 3);
        assert_eq!(map.sources, vec!["input.ts".to_string()]);
        // First line maps to line 0 column 0 with no prior state: "AAAA"
        assert!(map.mappings.starts_with("AAAA"));
        assert!(map.mappings.contains(';'));
    }

    #[test]
    fn test_map_after_prepend_shifts_lines() {
        let mut buffer = EditBuffer::new("let a = 1;\n");
        buffer.prepend("import x from \"y\";\n");
        let map = buffer.render_map("input.ts");

        // The prepended line has no mappings, so the map starts with ';'
        assert!(map.mappings.starts_with(';'));
    }
}
