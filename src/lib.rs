//! # Introduction
//!
//! heaplab evaluates single C-like statements against a small simulated heap
//! and shows, cell by cell, what declarations, pointer writes and manual
//! allocation do to it. The terminal UI is built with
//! [ratatui](https://docs.rs/ratatui).
//!
//! ## Evaluation pipeline
//!
//! ```text
//! Statement → Lexer → Parser → AST → Session → Heap bytes → Block layout → TUI
//! ```
//!
//! 1. [`parser`]: tokenises one statement and builds its AST.
//! 2. [`interpreter`]: walks the AST inside a [`interpreter::Session`], which
//!    owns the scope, the heap and the allocator.
//! 3. [`memory`]: the value model and coercions, the byte heap, the free-list
//!    allocator whose headers live in the heap itself, and the reconstructor
//!    that re-derives blocks from raw bytes, flagging corruption.
//! 4. [`snapshot`]: save and load of a whole session as JSON.
//! 5. [`config`]: command-line options.
//! 6. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! ## Supported statements
//!
//! Types: `int8_t` to `int64_t`, `uint8_t` to `uint64_t`, `char`, `short`,
//! `int`, `long`, `double`, `string`, `void`, one pointer level, arrays.
//! Expressions: `+ - * /`, casts, `*p`, `p[i]`, parentheses, assignment.
//! Built-ins: `malloc`, `calloc`, `free`, `sizeof`, `strategy`.
//!
//! ```
//! use heaplab::interpreter::Session;
//! use heaplab::memory::allocator::FitStrategy;
//!
//! let mut session = Session::new(64, FitStrategy::First).unwrap();
//! session.execute("uint8_t x = 300;").unwrap();
//! assert_eq!(session.execute("x").unwrap().to_string(), "-> 44");
//! ```

pub mod config;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod snapshot;
pub mod ui;
