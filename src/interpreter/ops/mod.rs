pub mod access;
pub mod assign;
pub mod binary;

// Most operations are `impl Session` blocks; `apply` is the pure operator core
pub use binary::apply;
