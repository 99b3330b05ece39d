//! # decl-harness
//!
//! An in-memory type-check harness: assert type-level behavior against
//! literal source snippets, without touching runtime behavior.
//!
//! The crate has two halves:
//!
//! - **Virtual files**: a [`FileProvider`] resolves logical file names to
//!   contents, scanning search directories once up front and reading each
//!   file at most once. Synthetic files injected with
//!   [`FileProvider::manually_add_file`] are indistinguishable from files
//!   on disk.
//! - **Compilation**: [`compile()`] checks a snippet as an anonymous entry
//!   module, resolving every import through the provider, and returns the
//!   ordered [`Diagnostic`]s for assertion. Unresolvable imports are
//!   diagnostics; harness misconfiguration is a hard [`CompileError`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use decl_harness::{compile, DiagnosticsExt, FileProvider};
//!
//! let provider = FileProvider::builder()
//!     .search_dir("fixtures/decls")
//!     .file(
//!         "awesome-app.decl",
//!         "export const api: { setAuthToken: (token: string) -> void };",
//!     )
//!     .build()?;
//!
//! let result = compile(
//!     r#"
//!     import { api } from "awesome-app";
//!     api.setAuthToken("abc");
//!     "#,
//!     &provider,
//! )?;
//!
//! assert!(result.is_clean(), "{}", result.format_diagnostics(&Default::default()));
//! ```
//!
//! ## Snapshot Assertions
//!
//! Diagnostics render deterministically: emission order is preserved and
//! [`Compilation::to_stable_string`] produces a stable JSON form, so
//! results can be compared against checked-in snapshots.
//!
//! ## Modules
//!
//! - [`provider`]: virtual file index and lazy content cache
//! - [`compile`](mod@compile): compile-and-collect-diagnostics entry point
//! - [`diagnostic`]: diagnostic records, filtering, formatting
//! - [`source`]: spans, sources, and position resolution

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compile;
pub mod diagnostic;
pub mod provider;
pub mod source;

mod check;
mod syntax;

// =============================================================================
// Prelude - import commonly used items with a single `use`
// =============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use decl_harness::prelude::*;
/// ```
pub mod prelude {
    pub use crate::compile::{compile, Compilation, CompileError, SNIPPET_NAME};

    pub use crate::diagnostic::{
        Category, Diagnostic, DiagnosticFilter, DiagnosticInfo, DiagnosticOptions,
        DiagnosticSummary, DiagnosticsExt, DisplayStyle, Severity,
    };

    pub use crate::provider::{
        FileProvider, FileProviderBuilder, LoadError, Origin, ScanError, DECL_SUFFIX,
    };

    pub use crate::source::{Source, SourceMap, Span};

    #[cfg(feature = "batch")]
    pub use crate::compile::compile_batch;
}

// =============================================================================
// High-Level API
// =============================================================================

pub use compile::{compile, Compilation, CompileError, SNIPPET_NAME};

#[cfg(feature = "batch")]
pub use compile::compile_batch;

// =============================================================================
// Diagnostics
// =============================================================================

pub use diagnostic::{
    // Record type and classification
    Category, Diagnostic, Severity,
    // Filtering
    DiagnosticFilter,
    // Options for formatting
    DiagnosticOptions, DisplayStyle,
    // Summary and extension trait (use .format(), .resolve(), etc.)
    DiagnosticSummary, DiagnosticsExt,
    // Structured data for custom rendering
    DiagnosticInfo,
};

// =============================================================================
// Infrastructure
// =============================================================================

pub use provider::{FileProvider, FileProviderBuilder, LoadError, Origin, ScanError, DECL_SUFFIX};
pub use source::{FileName, Source, SourceMap, Span};
