//! Syntax frontend: tokens, lexer, AST, and parser for declaration
//! modules and checked snippets.
//!
//! Both declaration files and test snippets share one grammar; a
//! declaration module is simply a module that happens to contain only
//! declarations. Syntax problems surface as [`crate::diagnostic::Diagnostic`]s
//! rather than hard errors so that checking can continue past them.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use parser::parse;
