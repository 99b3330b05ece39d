//! High-level compilation API.
//!
//! This is the harness's single entry point for test code: hand it a
//! source snippet and a [`FileProvider`], get back the ordered
//! diagnostics plus everything needed to render or snapshot them.
//!
//! # Example
//!
//! ```ignore
//! use decl_harness::{compile, DiagnosticsExt, FileProvider};
//!
//! let mut provider = FileProvider::builder()
//!     .file("app.decl", "export const api: { ping: () -> void };")
//!     .build()?;
//!
//! let result = compile(
//!     r#"
//!     import { api } from "app";
//!     api.ping();
//!     "#,
//!     &provider,
//! )?;
//!
//! assert!(result.is_clean());
//! ```

use thiserror::Error;

use crate::check::Checker;
use crate::diagnostic::{Diagnostic, DiagnosticOptions, DiagnosticSummary, DiagnosticsExt};
use crate::provider::{FileProvider, LoadError};
use crate::source::SourceMap;

/// Logical file name given to the anonymous entry module.
pub const SNIPPET_NAME: &str = "<snippet>";

// =============================================================================
// Errors
// =============================================================================

/// Fatal compilation failure.
///
/// Everything recoverable is a [`Diagnostic`] inside a successful
/// [`Compilation`]; an `Err` from [`compile`] means the harness itself is
/// misconfigured (most commonly a disk-backed file that the index knows
/// about but that cannot be read).
#[derive(Debug, Error)]
pub enum CompileError {
    /// A module the index claims is loadable could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}

// =============================================================================
// Result Type
// =============================================================================

/// Result of compiling one snippet.
#[derive(Debug)]
pub struct Compilation {
    /// All diagnostics, in emission order. Empty means a clean compile.
    pub diagnostics: Vec<Diagnostic>,
    /// Sources touched during compilation, for rendering spans.
    pub sources: SourceMap,
    /// Logical names of modules loaded through the provider, in load
    /// order. The entry snippet is not included.
    pub loaded_modules: Vec<String>,
}

impl Compilation {
    /// Whether the compile produced no diagnostics at all.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Summary of diagnostic counts.
    pub fn summary(&self) -> DiagnosticSummary {
        self.diagnostics.summary()
    }

    /// Format the diagnostics with the given options.
    ///
    /// Shorthand for `self.diagnostics.format_with(&self.sources, options)`.
    pub fn format_diagnostics(&self, options: &DiagnosticOptions) -> String {
        self.diagnostics.format_with(&self.sources, options)
    }

    /// Deterministic JSON form of the diagnostics for snapshot assertions.
    pub fn to_stable_string(&self) -> String {
        self.diagnostics.to_stable_string(&self.sources)
    }
}

// =============================================================================
// Compilation
// =============================================================================

/// Compile a source snippet against a provider and collect diagnostics.
///
/// The snippet becomes an anonymous entry module named
/// [`SNIPPET_NAME`]; every import in it (and every transitive import in
/// loaded declaration modules) is resolved by first asking
/// [`FileProvider::is_loadable_file`] and only then
/// [`FileProvider::load_file`]. An import the provider cannot resolve
/// becomes a resolution diagnostic in the result; a file that resolves
/// but cannot be read is a fatal [`CompileError`].
///
/// Repeated calls with identical inputs produce identical diagnostics;
/// reusing one provider across calls only warms its content cache.
pub fn compile(source: &str, provider: &FileProvider) -> Result<Compilation, CompileError> {
    let mut checker = Checker::new(provider);
    checker.check_snippet(SNIPPET_NAME, source)?;
    Ok(Compilation {
        diagnostics: checker.diagnostics,
        sources: checker.sources,
        loaded_modules: checker.loaded_modules,
    })
}

/// Compile many snippets in parallel against one shared provider.
///
/// Results come back in input order. Redundant concurrent loads of the
/// same declaration file are benign: every loader writes identical
/// content, so the last write wins without observable difference.
#[cfg(feature = "batch")]
pub fn compile_batch(
    snippets: &[&str],
    provider: &FileProvider,
) -> Vec<Result<Compilation, CompileError>> {
    use rayon::prelude::*;

    snippets
        .par_iter()
        .map(|source| compile(source, provider))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn provider_with_app() -> FileProvider {
        FileProvider::builder()
            .file(
                "app.decl",
                "export const api: { ping: () -> void, count: number };",
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_clean_compile() {
        let provider = provider_with_app();
        let result = compile("import { api } from \"app\";\napi.ping();", &provider).unwrap();
        assert!(result.is_clean());
        assert_eq!(result.loaded_modules, vec!["app.decl"]);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let provider = provider_with_app();
        let source = "import { api } from \"app\";\napi.pong();";

        let first = compile(source, &provider).unwrap();
        let second = compile(source, &provider).unwrap();
        assert_eq!(first.diagnostics, second.diagnostics);
        assert_eq!(first.to_stable_string(), second.to_stable_string());
    }

    #[test]
    fn test_provider_reuse_does_not_change_results() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("events.decl"),
            "export const hub: Emitter<{ \"e:a\": { n: number } }>;",
        )
        .unwrap();
        let provider = FileProvider::from_dirs([dir.path()]).unwrap();
        let source = "import { hub } from \"events\";\nhub.on(\"e:a\", data => data.n);";

        let cold = compile(source, &provider).unwrap();
        // The file is gone now; the second compile runs entirely from
        // the provider's cache.
        fs::remove_file(dir.path().join("events.decl")).unwrap();
        let warm = compile(source, &provider).unwrap();

        assert_eq!(cold.diagnostics, warm.diagnostics);
        assert!(warm.is_clean());
    }

    #[test]
    fn test_unreadable_module_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("gone.decl"), "export const x: number;").unwrap();
        let provider = FileProvider::from_dirs([dir.path()]).unwrap();
        fs::remove_file(dir.path().join("gone.decl")).unwrap();

        let result = compile("import { x } from \"gone\";", &provider);
        assert!(matches!(result, Err(CompileError::Load(LoadError::Io { .. }))));
    }

    #[test]
    fn test_unresolvable_import_is_a_diagnostic_not_an_error() {
        let provider = FileProvider::builder().build().unwrap();
        let result = compile("import { x } from \"nowhere\";", &provider).unwrap();
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.loaded_modules.is_empty());
    }

    #[cfg(feature = "batch")]
    #[test]
    fn test_batch_matches_sequential() {
        let provider = provider_with_app();
        let snippets = [
            "import { api } from \"app\";\napi.ping();",
            "import { api } from \"app\";\napi.pong();",
            "import { api } from \"app\";\nlet n = api.count;",
        ];

        let batch = compile_batch(&snippets, &provider);
        assert_eq!(batch.len(), 3);
        for (snippet, result) in snippets.iter().zip(batch) {
            let sequential = compile(snippet, &provider).unwrap();
            assert_eq!(result.unwrap().diagnostics, sequential.diagnostics);
        }
    }
}
