//! Core interpreter for Cellar
//!
//! A small Lisp whose every aggregate (lists, vectors, hash-maps, scopes) is
//! a chain of two-slot pairs. This crate holds the reader, printer,
//! environments, evaluator and standard primitives. The interactive shell
//! lives in the `cellar-cli` crate.

pub mod environment;
pub mod error;
pub mod eval;
pub mod interner;
pub mod lexer;
pub mod native;
pub mod printer;
pub mod reader;
pub mod stdlib;
pub mod value;

// Re-export commonly used items for convenience
pub use environment::Environment;
pub use error::{Error, ParseErrorKind, Result};
pub use eval::{apply, eval, quasiquote};
pub use interner::Symbol;
pub use printer::print;
pub use reader::{Reader, read, read_all};
pub use stdlib::standard_env;
pub use value::{Value, cons, list};
