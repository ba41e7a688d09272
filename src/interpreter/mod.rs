//! Statement evaluator
//!
//! This module provides the core evaluation logic:
//! - [`engine`]: the [`Session`](engine::Session) and the AST walker
//! - [`errors`]: syntax, validation, runtime and type errors
//! - [`ops`]: operators, assignment and pointer access
//! - [`scope`]: the flat identifier scope with its built-ins
//!
//! # Evaluation Model
//!
//! One statement is parsed and evaluated to completion before the next one
//! starts. A failing statement aborts only itself; whatever earlier statements
//! did to the scope or the heap stays in place.
//!
//! # Built-in Functions
//!
//! `malloc`, `calloc`, `free`, `sizeof` and `strategy` are native functions
//! bound in the scope and implemented in [`builtins`].

pub mod builtins;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod ops;
pub mod predict;
pub mod scope;
pub mod type_system;

pub use engine::{Outcome, Session};
pub use errors::{EvalError, RuntimeError, TypeError};
