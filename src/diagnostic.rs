//! Diagnostics: the record type, collection helpers, and rendering.
//!
//! Diagnostics are data, never control flow: checking returns them in
//! emission order for assertion, and nothing in this module throws.
//!
//! # Two-Layer API
//!
//! The [`DiagnosticsExt`] trait provides two levels:
//!
//! ## Simple: Ready-to-Use Formatting
//!
//! ```ignore
//! use decl_harness::DiagnosticsExt;
//!
//! let output = compilation.diagnostics.format(&compilation.sources);
//! eprintln!("{output}");
//! ```
//!
//! ## Advanced: Structured Data
//!
//! Use `.resolve()` to get [`DiagnosticInfo`] records with file/line/column
//! already computed, or `.to_stable_string()` for a deterministic JSON
//! form suited to snapshot assertions.
//!
//! # Example Output
//!
//! ```text
//! error: property `tokne` does not exist on type `{ token: string }`
//!   ┌─ <snippet>:4:15
//!   │
//! 4 │   let token = data.tokne;
//!   │               ^^^^^^^^^^
//!   = hint: did you mean `token`?
//! ```

use std::fmt::{self, Write};

use serde::Serialize;

use crate::source::{SourceMap, Span};

// =============================================================================
// Severity & Category
// =============================================================================

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The program is ill-formed.
    Error,
    /// Suspicious but not ill-formed.
    Warning,
}

/// Which phase produced a diagnostic.
///
/// The category is what lets a test distinguish "the import could not be
/// resolved" from "the code is ill-typed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Produced while lexing or parsing.
    Syntax,
    /// An import that could not be resolved through the provider.
    Resolution,
    /// Produced by the checking passes.
    Check,
}

// =============================================================================
// Diagnostic
// =============================================================================

/// A single structured report from compilation.
///
/// Spans stay unresolved (byte offsets) until rendering; use
/// [`DiagnosticsExt::resolve`] or the formatters to turn them into
/// positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: Severity,
    /// The phase that produced this diagnostic.
    pub category: Category,
    /// Human-readable message.
    pub message: String,
    /// Where in the source the problem is, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Follow-up hints ("did you mean ...").
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(category: Category, span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            message: message.into(),
            span: Some(span),
            hints: Vec::new(),
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(category: Category, span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            message: message.into(),
            span: Some(span),
            hints: Vec::new(),
        }
    }

    /// Attach a hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

// =============================================================================
// Diagnostic Options
// =============================================================================

/// Display style for diagnostic output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayStyle {
    /// Rich output with source snippets and highlighting.
    #[default]
    Rich,
    /// Short output with just file:line:col and message.
    Short,
}

/// Options for controlling diagnostic formatting.
///
/// # Example
///
/// ```ignore
/// use decl_harness::{DiagnosticOptions, DisplayStyle};
///
/// // Default: colored rich output
/// let opts = DiagnosticOptions::default();
///
/// // Plain text (no ANSI colors) for snapshots and logs
/// let opts = DiagnosticOptions::plain();
///
/// // Short format for CI/IDE integration
/// let opts = DiagnosticOptions::short();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticOptions {
    /// Whether to use ANSI colors in output.
    pub colored: bool,
    /// Display style (rich with snippets or short).
    pub style: DisplayStyle,
    /// Whether to include source code snippets.
    pub snippets: bool,
    /// Whether to include hints.
    pub hints: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            colored: true,
            style: DisplayStyle::Rich,
            snippets: true,
            hints: true,
        }
    }
}

impl DiagnosticOptions {
    /// Create options for plain text output (no ANSI colors).
    ///
    /// This is the form to use for snapshot assertions: the output is
    /// deterministic and byte-comparable.
    pub fn plain() -> Self {
        Self {
            colored: false,
            ..Self::default()
        }
    }

    /// Create options for short format (`file:line:col: severity: message`).
    pub fn short() -> Self {
        Self {
            colored: false,
            style: DisplayStyle::Short,
            snippets: false,
            hints: false,
        }
    }

    /// Set whether to use colors.
    pub fn with_colored(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Set display style.
    pub fn with_style(mut self, style: DisplayStyle) -> Self {
        self.style = style;
        self
    }

    /// Set whether to include source snippets.
    pub fn with_snippets(mut self, snippets: bool) -> Self {
        self.snippets = snippets;
        self
    }

    /// Set whether to include hints.
    pub fn with_hints(mut self, hints: bool) -> Self {
        self.hints = hints;
        self
    }
}

// =============================================================================
// Diagnostic Summary
// =============================================================================

/// Summary of diagnostic counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticSummary {
    /// Number of errors.
    pub errors: usize,
    /// Number of warnings.
    pub warnings: usize,
}

impl DiagnosticSummary {
    /// Total number of diagnostics.
    pub fn total(&self) -> usize {
        self.errors + self.warnings
    }

    /// Whether there are any errors.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Whether there are any diagnostics at all.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for DiagnosticSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.errors, self.warnings) {
            (0, 0) => write!(f, "no diagnostics"),
            (e, 0) => write!(f, "{e} error{}", if e == 1 { "" } else { "s" }),
            (0, w) => write!(f, "{w} warning{}", if w == 1 { "" } else { "s" }),
            (e, w) => write!(
                f,
                "{e} error{}, {w} warning{}",
                if e == 1 { "" } else { "s" },
                if w == 1 { "" } else { "s" }
            ),
        }
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Filters for excluding diagnostics.
///
/// Used with [`DiagnosticsExt::filter_out`] to remove unwanted entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticFilter {
    /// Filter out all warnings (keep only errors).
    AllWarnings,
    /// Filter out diagnostics of the given category.
    Category(Category),
    /// Filter out diagnostics containing specific text in the message.
    MessageContains(String),
}

impl DiagnosticFilter {
    /// Check if a diagnostic should be filtered out.
    fn matches(&self, diag: &Diagnostic) -> bool {
        match self {
            DiagnosticFilter::AllWarnings => diag.severity == Severity::Warning,
            DiagnosticFilter::Category(category) => diag.category == *category,
            DiagnosticFilter::MessageContains(text) => diag.message.contains(text.as_str()),
        }
    }
}

// =============================================================================
// Diagnostic Info - Structured data for custom rendering
// =============================================================================

/// A diagnostic with its span resolved to file/line/column.
///
/// Serializes to a stable JSON shape; this is what snapshot assertions
/// compare.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticInfo {
    /// Error or warning.
    pub severity: Severity,
    /// The phase that produced this diagnostic.
    pub category: Category,
    /// The message.
    pub message: String,
    /// Logical file name (if the span is known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Line number (1-indexed, if resolvable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Column number (1-indexed, if resolvable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// Hint messages.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

fn resolve_diagnostic(diag: &Diagnostic, sources: &SourceMap) -> DiagnosticInfo {
    let view = diag
        .span
        .as_ref()
        .and_then(|span| SpanView::resolve(span, sources));

    DiagnosticInfo {
        severity: diag.severity,
        category: diag.category,
        message: diag.message.clone(),
        file: view.as_ref().map(|v| v.file.clone()),
        line: view.as_ref().map(|v| v.start_line),
        column: view.as_ref().map(|v| v.start_col + 1),
        hints: diag.hints.clone(),
    }
}

// =============================================================================
// Diagnostics Extension Trait
// =============================================================================

/// Extension trait for working with diagnostic slices.
///
/// # Example
///
/// ```ignore
/// use decl_harness::DiagnosticsExt;
///
/// let result = compile(source, &provider)?;
///
/// if result.diagnostics.has_errors() {
///     eprintln!("{}", result.diagnostics.format(&result.sources));
/// }
/// println!("{}", result.diagnostics.summary()); // "2 errors, 1 warning"
/// ```
pub trait DiagnosticsExt {
    /// Check if there are any errors.
    fn has_errors(&self) -> bool;

    /// Check if there are any warnings.
    fn has_warnings(&self) -> bool;

    /// Count errors.
    fn error_count(&self) -> usize;

    /// Count warnings.
    fn warning_count(&self) -> usize;

    /// Count diagnostics of the given category.
    fn category_count(&self, category: Category) -> usize;

    /// Get a summary of the diagnostics.
    fn summary(&self) -> DiagnosticSummary;

    /// Filter out diagnostics matching any of the given filters.
    fn filter_out(&self, filters: &[DiagnosticFilter]) -> Vec<Diagnostic>;

    /// Format into a human-readable string with default options
    /// (colored, rich with snippets). Emission order is preserved.
    fn format(&self, sources: &SourceMap) -> String;

    /// Format with custom options.
    fn format_with(&self, sources: &SourceMap, options: &DiagnosticOptions) -> String;

    /// Resolve to structured data for custom rendering.
    fn resolve(&self, sources: &SourceMap) -> Vec<DiagnosticInfo>;

    /// Serialize to a deterministic, comparable JSON string.
    ///
    /// The output is stable across runs for identical diagnostics, which
    /// makes it suitable for snapshot-style assertions.
    fn to_stable_string(&self, sources: &SourceMap) -> String;
}

impl DiagnosticsExt for [Diagnostic] {
    fn has_errors(&self) -> bool {
        self.iter().any(|d| d.severity == Severity::Error)
    }

    fn has_warnings(&self) -> bool {
        self.iter().any(|d| d.severity == Severity::Warning)
    }

    fn error_count(&self) -> usize {
        self.iter().filter(|d| d.severity == Severity::Error).count()
    }

    fn warning_count(&self) -> usize {
        self.iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    fn category_count(&self, category: Category) -> usize {
        self.iter().filter(|d| d.category == category).count()
    }

    fn summary(&self) -> DiagnosticSummary {
        DiagnosticSummary {
            errors: self.error_count(),
            warnings: self.warning_count(),
        }
    }

    fn filter_out(&self, filters: &[DiagnosticFilter]) -> Vec<Diagnostic> {
        self.iter()
            .filter(|d| !filters.iter().any(|f| f.matches(d)))
            .cloned()
            .collect()
    }

    fn format(&self, sources: &SourceMap) -> String {
        self.format_with(sources, &DiagnosticOptions::default())
    }

    fn format_with(&self, sources: &SourceMap, options: &DiagnosticOptions) -> String {
        let mut output = String::new();
        for (i, diag) in self.iter().enumerate() {
            format_diagnostic(&mut output, diag, sources, options);
            if i < self.len() - 1 {
                output.push('\n');
            }
        }
        output
    }

    fn resolve(&self, sources: &SourceMap) -> Vec<DiagnosticInfo> {
        self.iter().map(|d| resolve_diagnostic(d, sources)).collect()
    }

    fn to_stable_string(&self, sources: &SourceMap) -> String {
        // serde_json keeps struct field order, so this is deterministic.
        serde_json::to_string_pretty(&self.resolve(sources))
            .unwrap_or_else(|_| String::from("[]"))
    }
}

impl DiagnosticsExt for Vec<Diagnostic> {
    fn has_errors(&self) -> bool {
        self.as_slice().has_errors()
    }

    fn has_warnings(&self) -> bool {
        self.as_slice().has_warnings()
    }

    fn error_count(&self) -> usize {
        self.as_slice().error_count()
    }

    fn warning_count(&self) -> usize {
        self.as_slice().warning_count()
    }

    fn category_count(&self, category: Category) -> usize {
        self.as_slice().category_count(category)
    }

    fn summary(&self) -> DiagnosticSummary {
        self.as_slice().summary()
    }

    fn filter_out(&self, filters: &[DiagnosticFilter]) -> Vec<Diagnostic> {
        self.as_slice().filter_out(filters)
    }

    fn format(&self, sources: &SourceMap) -> String {
        self.as_slice().format(sources)
    }

    fn format_with(&self, sources: &SourceMap, options: &DiagnosticOptions) -> String {
        self.as_slice().format_with(sources, options)
    }

    fn resolve(&self, sources: &SourceMap) -> Vec<DiagnosticInfo> {
        self.as_slice().resolve(sources)
    }

    fn to_stable_string(&self, sources: &SourceMap) -> String {
        self.as_slice().to_stable_string(sources)
    }
}

// =============================================================================
// Internal Coloring
// =============================================================================

#[cfg(feature = "colored-diagnostics")]
fn colorize(text: &str, severity: Severity) -> String {
    use owo_colors::OwoColorize;
    match severity {
        Severity::Error => text.red().to_string(),
        Severity::Warning => text.yellow().to_string(),
    }
}

#[cfg(feature = "colored-diagnostics")]
fn colorize_help(text: &str) -> String {
    use owo_colors::OwoColorize;
    text.cyan().to_string()
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize(text: &str, _severity: Severity) -> String {
    text.to_owned()
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize_help(text: &str) -> String {
    text.to_owned()
}

fn get_paint_fn(options: &DiagnosticOptions, severity: Severity) -> Box<dyn Fn(&str) -> String> {
    if options.colored {
        Box::new(move |s| colorize(s, severity))
    } else {
        Box::new(|s: &str| s.to_owned())
    }
}

// =============================================================================
// Gutter Characters
// =============================================================================

/// Box-drawing characters for source code display.
mod gutter {
    pub const HEADER: &str = "┌─";
    pub const BAR: &str = "│";
    pub const SPAN_START: &str = "╭";
    pub const SPAN_END: &str = "╰";
    pub const DASH: &str = "─";
    pub const MARKER: &str = "^";
}

// =============================================================================
// Span View
// =============================================================================

/// Resolved source location information for a diagnostic span.
struct SpanView {
    /// Logical file name.
    file: String,
    /// Starting line number (1-indexed).
    start_line: usize,
    /// Starting column (0-indexed).
    start_col: usize,
    /// Source lines covered by the span.
    lines: Vec<String>,
    /// Column where highlighting ends in the last line (0-indexed, exclusive).
    end_col: usize,
}

impl SpanView {
    fn resolve(span: &Span, sources: &SourceMap) -> Option<Self> {
        let source = sources.get(&span.file)?;
        if span.end as usize > source.text().len() {
            return None;
        }

        let (start_line, start_col) = source.line_col(span.start);
        let (end_line, end_col) = source.line_col(span.end);

        let lines = (start_line..=end_line)
            .map(|n| source.line_text(n).to_owned())
            .collect();

        Some(Self {
            file: span.file.to_string(),
            start_line,
            start_col,
            lines,
            end_col,
        })
    }

    #[inline]
    fn is_multiline(&self) -> bool {
        self.lines.len() > 1
    }

    #[inline]
    fn end_line(&self) -> usize {
        self.start_line + self.lines.len() - 1
    }

    #[inline]
    fn line_num_width(&self) -> usize {
        self.end_line().to_string().len().max(1)
    }
}

// =============================================================================
// Snippet Writer
// =============================================================================

/// Helper for writing formatted source snippets with aligned gutters.
struct SnippetWriter<'a, F>
where
    F: Fn(&str) -> String,
{
    output: &'a mut String,
    paint: F,
    line_num_width: usize,
}

impl<'a, F> SnippetWriter<'a, F>
where
    F: Fn(&str) -> String,
{
    fn new(output: &'a mut String, paint: F, line_num_width: usize) -> Self {
        Self {
            output,
            paint,
            line_num_width,
        }
    }

    /// Write the location header: `  ┌─ file:line:col`
    fn write_header(&mut self, file: &str, line: usize, col: usize) {
        _ = writeln!(
            self.output,
            "{:>width$} {} {}:{}:{}",
            "",
            (self.paint)(gutter::HEADER),
            file,
            line,
            col,
            width = self.line_num_width
        );
    }

    /// Write an empty gutter line: `  │`
    fn write_empty_gutter(&mut self) {
        _ = writeln!(
            self.output,
            "{:>width$} {}",
            "",
            (self.paint)(gutter::BAR),
            width = self.line_num_width
        );
    }

    /// Write a source line with optional box character and highlighting.
    fn write_source_line(
        &mut self,
        line_num: usize,
        line_text: &str,
        box_char: Option<&str>,
        highlight: Option<(usize, usize)>,
    ) {
        let line_num_str = format!("{:>width$}", line_num, width = self.line_num_width);

        let formatted = match (box_char, highlight) {
            (Some(bc), Some((start, end))) => {
                let (before, mid, after) = split_line(line_text, start, end);
                format!(
                    "{} {} {} {}{}{}",
                    (self.paint)(&line_num_str),
                    (self.paint)(gutter::BAR),
                    (self.paint)(bc),
                    before,
                    (self.paint)(&mid),
                    after
                )
            }
            (None, Some((start, end))) => {
                let (before, mid, after) = split_line(line_text, start, end);
                format!(
                    "{} {} {}{}{}",
                    (self.paint)(&line_num_str),
                    (self.paint)(gutter::BAR),
                    before,
                    (self.paint)(&mid),
                    after
                )
            }
            _ => format!(
                "{} {} {}",
                (self.paint)(&line_num_str),
                (self.paint)(gutter::BAR),
                line_text
            ),
        };

        _ = writeln!(self.output, "{formatted}");
    }

    /// Write marker line for single-line spans: `  │   ^^^^`
    fn write_single_line_marker(&mut self, start_col: usize, span_len: usize) {
        let spaces = " ".repeat(start_col);
        let markers = gutter::MARKER.repeat(span_len.max(1));
        _ = writeln!(
            self.output,
            "{:>width$} {} {}{}",
            "",
            (self.paint)(gutter::BAR),
            spaces,
            (self.paint)(&markers),
            width = self.line_num_width
        );
    }

    /// Write marker line for multi-line spans: `  │ ╰────^`
    fn write_multiline_end_marker(&mut self, end_col: usize) {
        let dashes = gutter::DASH.repeat(end_col);
        _ = writeln!(
            self.output,
            "{:>width$} {} {}{}{}",
            "",
            (self.paint)(gutter::BAR),
            (self.paint)(gutter::SPAN_END),
            (self.paint)(&dashes),
            (self.paint)(gutter::MARKER),
            width = self.line_num_width
        );
    }
}

/// Split a line into (before, highlighted, after) by 0-indexed columns.
fn split_line(line: &str, start_col: usize, end_col: usize) -> (String, String, String) {
    let chars: Vec<char> = line.chars().collect();
    let start_idx = start_col.min(chars.len());
    let end_idx = end_col.min(chars.len()).max(start_idx);

    let before: String = chars[..start_idx].iter().collect();
    let mid: String = chars[start_idx..end_idx].iter().collect();
    let after: String = chars[end_idx..].iter().collect();

    (before, mid, after)
}

// =============================================================================
// Diagnostic Formatting (Internal)
// =============================================================================

fn format_diagnostic(
    output: &mut String,
    diag: &Diagnostic,
    sources: &SourceMap,
    options: &DiagnosticOptions,
) {
    let label = match diag.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    let paint = get_paint_fn(options, diag.severity);

    match options.style {
        DisplayStyle::Short => format_short(output, diag, sources, label, &paint),
        DisplayStyle::Rich => format_rich(output, diag, sources, label, &paint, options),
    }
}

/// Short style: `file:line:col: severity: message`
fn format_short(
    output: &mut String,
    diag: &Diagnostic,
    sources: &SourceMap,
    label: &str,
    paint: &dyn Fn(&str) -> String,
) {
    let view = diag
        .span
        .as_ref()
        .and_then(|span| SpanView::resolve(span, sources));
    match view {
        Some(view) => {
            _ = writeln!(
                output,
                "{}:{}:{}: {}: {}",
                view.file,
                view.start_line,
                view.start_col + 1,
                paint(label),
                diag.message
            );
        }
        None => {
            _ = writeln!(output, "{}: {}", paint(label), diag.message);
        }
    }
}

/// Rich style with source snippets.
fn format_rich(
    output: &mut String,
    diag: &Diagnostic,
    sources: &SourceMap,
    label: &str,
    paint: &dyn Fn(&str) -> String,
    options: &DiagnosticOptions,
) {
    _ = writeln!(output, "{}: {}", paint(label), diag.message);

    if options.snippets {
        let view = diag
            .span
            .as_ref()
            .and_then(|span| SpanView::resolve(span, sources));
        if let Some(view) = view {
            write_snippet(output, &view, paint);
        }
    }

    if options.hints {
        let help_paint: Box<dyn Fn(&str) -> String> = if options.colored {
            Box::new(colorize_help)
        } else {
            Box::new(|s: &str| s.to_owned())
        };
        for hint in &diag.hints {
            _ = writeln!(output, "  {} hint: {}", help_paint("="), hint);
        }
    }
}

fn write_snippet(output: &mut String, view: &SpanView, paint: &dyn Fn(&str) -> String) {
    let mut writer = SnippetWriter::new(output, |s| paint(s), view.line_num_width());

    writer.write_header(&view.file, view.start_line, view.start_col);
    writer.write_empty_gutter();

    if view.is_multiline() {
        for (i, line_text) in view.lines.iter().enumerate() {
            let line_num = view.start_line + i;
            let line_len = line_text.chars().count();
            let (box_char, highlight) = if i == 0 {
                (gutter::SPAN_START, (view.start_col, line_len + 1))
            } else {
                (gutter::BAR, (1, line_len + 1))
            };
            writer.write_source_line(line_num, line_text, Some(box_char), Some(highlight));
        }
        writer.write_multiline_end_marker(view.end_col);
    } else {
        let line_text = view.lines.first().map_or("", String::as_str);
        let span_len = view.end_col.saturating_sub(view.start_col).max(1);
        writer.write_source_line(
            view.start_line,
            line_text,
            None,
            Some((view.start_col, view.end_col)),
        );
        writer.write_single_line_marker(view.start_col, span_len);
    }
}

// =============================================================================
// Tests
// =============================================================================
