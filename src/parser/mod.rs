//! Statement parser
//!
//! This module transforms one line of user input into an AST:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parser`]: Parsing (tokens → AST)
//! - [`ast`]: AST node definitions
//!
//! # Supported Statements
//!
//! Each input is exactly one statement:
//! - Declarations: `uint8_t x;`, `int32_t* p;`, `double values[4];`
//! - Declaration with initializer: `uint16_t n = 70000;`
//! - Assignments through names, pointers and indices: `x = 1`, `*p = 2`, `p[3] = 4`
//! - Expressions with `+ - * /`, casts, parentheses, dereference, indexing and calls
//!
//! A trailing `;` is optional. There is no control flow and there are no
//! user-defined functions.
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser. No external parser generator dependencies.

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;

pub use parser::{parse_statement, SyntaxError};
