//! Source text bookkeeping: spans, sources, and the source map.
//!
//! A [`Span`] ties a byte range to the logical file name it came from.
//! Spans stay cheap (no line/column baked in); positions are resolved
//! against a [`Source`] only when a diagnostic is rendered.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// A logical file name, shared between spans without copying.
pub type FileName = Arc<str>;

// =============================================================================
// Span
// =============================================================================

/// A byte range inside a named source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    /// Logical name of the file this span points into.
    pub file: FileName,
    /// Start byte offset (inclusive).
    pub start: u32,
    /// End byte offset (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a span covering `start..end` in `file`.
    pub fn new(file: FileName, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Merge two spans into one covering both.
    ///
    /// Both spans must point into the same file; the first span's file
    /// name is kept.
    pub fn to(&self, other: &Span) -> Span {
        Span {
            file: self.file.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Whether the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl Serialize for Span {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Span", 3)?;
        s.serialize_field("file", &*self.file)?;
        s.serialize_field("start", &self.start)?;
        s.serialize_field("end", &self.end)?;
        s.end()
    }
}

// =============================================================================
// Source
// =============================================================================

/// A named piece of source text.
///
/// Line starts are computed once at construction so that offset → position
/// lookups during diagnostic rendering are cheap.
#[derive(Debug, Clone)]
pub struct Source {
    name: FileName,
    text: Arc<str>,
    line_starts: Vec<u32>,
}

impl Source {
    /// Create a source from a logical name and its text.
    pub fn new(name: impl Into<FileName>, text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self {
            name: name.into(),
            text,
            line_starts,
        }
    }

    /// The logical file name.
    pub fn name(&self) -> &FileName {
        &self.name
    }

    /// The full source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Resolve a byte offset to a 1-indexed line number.
    pub fn line_of(&self, offset: u32) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }

    /// Byte offset at which the given 1-indexed line starts.
    pub fn line_start(&self, line: usize) -> u32 {
        self.line_starts[line - 1]
    }

    /// Resolve a byte offset to `(line, column)`.
    ///
    /// Lines are 1-indexed; columns are 0-indexed character counts, the
    /// convention the snippet renderer expects.
    pub fn line_col(&self, offset: u32) -> (usize, usize) {
        let line = self.line_of(offset);
        let start = self.line_start(line) as usize;
        let col = self.text[start..offset as usize].chars().count();
        (line, col)
    }

    /// Text of the given 1-indexed line, without its trailing newline.
    pub fn line_text(&self, line: usize) -> &str {
        let start = self.line_start(line) as usize;
        let rest = &self.text[start..];
        rest.lines().next().unwrap_or("")
    }
}

// =============================================================================
// SourceMap
// =============================================================================

/// All sources touched by a compilation, keyed by logical file name.
///
/// Returned alongside diagnostics so spans can be rendered without going
/// back to the provider.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: FxHashMap<FileName, Source>,
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, replacing any previous entry with the same name.
    pub fn insert(&mut self, source: Source) {
        self.files.insert(source.name.clone(), source);
    }

    /// Look up a source by logical file name.
    pub fn get(&self, name: &str) -> Option<&Source> {
        self.files.get(name)
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the map holds no sources.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn span(file: &str, start: u32, end: u32) -> Span {
        Span::new(FileName::from(file), start, end)
    }

    #[test]
    fn test_line_col_first_line() {
        let src = Source::new("a.decl", "hello\nworld\n");
        assert_eq!(src.line_col(0), (1, 0));
        assert_eq!(src.line_col(4), (1, 4));
    }

    #[test]
    fn test_line_col_later_lines() {
        let src = Source::new("a.decl", "hello\nworld\nlast");
        assert_eq!(src.line_col(6), (2, 0));
        assert_eq!(src.line_col(12), (3, 0));
        assert_eq!(src.line_col(14), (3, 2));
    }

    #[test]
    fn test_line_col_multibyte() {
        let src = Source::new("a.decl", "héllo\nx");
        // 'é' is two bytes but one column
        assert_eq!(src.line_col(6), (1, 5));
    }

    #[test]
    fn test_line_text() {
        let src = Source::new("a.decl", "one\ntwo\nthree");
        assert_eq!(src.line_text(1), "one");
        assert_eq!(src.line_text(2), "two");
        assert_eq!(src.line_text(3), "three");
    }

    #[test]
    fn test_span_merge() {
        let a = span("a.decl", 3, 7);
        let b = span("a.decl", 5, 12);
        assert_eq!(a.to(&b), span("a.decl", 3, 12));
    }

    #[test]
    fn test_span_serializes_flat() {
        let s = span("a.decl", 1, 4);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["file"], "a.decl");
        assert_eq!(json["start"], 1);
        assert_eq!(json["end"], 4);
    }

    #[test]
    fn test_source_map_lookup() {
        let mut map = SourceMap::new();
        map.insert(Source::new("a.decl", "abc"));
        assert!(map.get("a.decl").is_some());
        assert!(map.get("b.decl").is_none());
    }
}
