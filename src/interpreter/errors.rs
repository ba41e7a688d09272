//! Error types for statement evaluation
//!
//! Four kinds of failure are kept apart so the front end can present each one
//! appropriately:
//!
//! - [`SyntaxError`]: the text did not parse
//! - validation: an AST shape the evaluator does not support reached it
//! - [`RuntimeError`]: a domain failure while evaluating
//! - [`TypeError`]: a static-shape violation caught before anything is mutated
//!
//! A failing statement aborts only itself. State changed by earlier
//! statements stays as it is.

use crate::memory::allocator::{AllocError, FreeFault};
use crate::memory::heap::HeapError;
use crate::memory::value::{CoercionError, LiteralKind, TypeDescriptor};
use crate::parser::ast::BinOp;
use crate::parser::SyntaxError;
use std::fmt;
use tracing::error;

/// Runtime errors that can occur during evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    UndefinedIdentifier {
        name: String,
    },

    /// A Void result was used where a value is required
    VoidValue,

    /// A native function name was used as a value
    NotAValue {
        name: String,
    },

    Coercion {
        from: LiteralKind,
        to: TypeDescriptor,
    },

    IncompatibleOperands {
        op: BinOp,
        left: LiteralKind,
        right: LiteralKind,
    },

    DivisionByZero,

    OutOfMemory {
        requested: usize,
        largest_free: usize,
    },

    InvalidMallocSize {
        size: i128,
    },

    InvalidFree {
        address: usize,
        reason: FreeFault,
    },

    DoubleFree {
        address: usize,
    },

    NullDereference,

    /// Access running outside the heap
    AddressOutOfRange {
        address: i128,
        width: usize,
        heap_size: usize,
    },

    /// Store into cells 1..=2
    ReservedWrite {
        address: usize,
    },

    NotCallable {
        name: String,
    },

    /// Assignment to a built-in constant or function
    NotAssignable {
        name: String,
    },

    ArgumentCountMismatch {
        function: String,
        expected: usize,
        got: usize,
    },

    InvalidArgument {
        function: String,
        message: String,
    },

    /// Dereference of something that is not a pointer to a sized type
    UnsupportedDereference {
        ty: String,
    },

    /// `sizeof` of a type with no fixed width
    UnsizedType {
        ty: String,
    },

    UnknownStrategy {
        name: String,
    },

    /// Heap failure with no more specific variant
    HeapFailure {
        message: String,
    },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UndefinedIdentifier { name } => {
                write!(f, "Undefined identifier '{}'", name)
            }
            RuntimeError::VoidValue => write!(f, "Void value used in expression"),
            RuntimeError::NotAValue { name } => {
                write!(f, "'{}' is a function and has no value", name)
            }
            RuntimeError::Coercion { from, to } => {
                write!(f, "Cannot convert {} to {}", from, to)
            }
            RuntimeError::IncompatibleOperands { op, left, right } => write!(
                f,
                "Incompatible operands for '{}': {} and {}",
                op, left, right
            ),
            RuntimeError::DivisionByZero => write!(f, "Division by zero"),
            RuntimeError::OutOfMemory {
                requested,
                largest_free,
            } => write!(
                f,
                "Out of memory: requested {} bytes, largest free block holds {}",
                requested, largest_free
            ),
            RuntimeError::InvalidMallocSize { size } => {
                write!(f, "Invalid malloc size: {} (must be positive)", size)
            }
            RuntimeError::InvalidFree { address, reason } => {
                write!(f, "Invalid free of address {}: {}", address, reason)
            }
            RuntimeError::DoubleFree { address } => {
                write!(f, "Double free of address {}", address)
            }
            RuntimeError::NullDereference => write!(f, "Null pointer dereference"),
            RuntimeError::AddressOutOfRange {
                address,
                width,
                heap_size,
            } => write!(
                f,
                "Address {} (+{} bytes) is outside the {}-cell heap",
                address, width, heap_size
            ),
            RuntimeError::ReservedWrite { address } => {
                write!(f, "Cell {} is reserved and cannot be written", address)
            }
            RuntimeError::NotCallable { name } => {
                write!(f, "'{}' is not a function", name)
            }
            RuntimeError::NotAssignable { name } => {
                write!(f, "'{}' is built in and cannot be assigned", name)
            }
            RuntimeError::ArgumentCountMismatch {
                function,
                expected,
                got,
            } => write!(
                f,
                "Function '{}' expects {} argument{}, got {}",
                function,
                expected,
                if *expected == 1 { "" } else { "s" },
                got
            ),
            RuntimeError::InvalidArgument { function, message } => {
                write!(f, "Invalid argument to '{}': {}", function, message)
            }
            RuntimeError::UnsupportedDereference { ty } => {
                write!(f, "Cannot dereference a value of type {}", ty)
            }
            RuntimeError::UnsizedType { ty } => {
                write!(f, "Type {} has no fixed size", ty)
            }
            RuntimeError::UnknownStrategy { name } => write!(
                f,
                "Unknown fit strategy '{}' (expected first, next, best or worst)",
                name
            ),
            RuntimeError::HeapFailure { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<CoercionError> for RuntimeError {
    fn from(err: CoercionError) -> Self {
        RuntimeError::Coercion {
            from: err.from,
            to: err.to,
        }
    }
}

impl From<HeapError> for RuntimeError {
    fn from(err: HeapError) -> Self {
        match err {
            HeapError::Null => RuntimeError::NullDereference,
            HeapError::Reserved { index } => RuntimeError::ReservedWrite { address: index },
            HeapError::OutOfRange { index, width, len } => RuntimeError::AddressOutOfRange {
                address: index as i128,
                width,
                heap_size: len,
            },
            other @ HeapError::InvalidSize { .. } => RuntimeError::HeapFailure {
                message: other.to_string(),
            },
        }
    }
}

impl From<AllocError> for RuntimeError {
    fn from(err: AllocError) -> Self {
        match err {
            AllocError::InvalidSize { size } => RuntimeError::InvalidMallocSize { size: size as i128 },
            AllocError::OutOfMemory {
                requested,
                largest_free,
            } => RuntimeError::OutOfMemory {
                requested,
                largest_free,
            },
            AllocError::InvalidFree { address, reason } => {
                RuntimeError::InvalidFree { address, reason }
            }
            AllocError::DoubleFree { address } => RuntimeError::DoubleFree { address },
            AllocError::Heap(heap) => heap.into(),
        }
    }
}

/// Static-shape violations, raised before any state changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    VoidDeclaration { name: String },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::VoidDeclaration { name } => {
                write!(f, "Cannot declare '{}' with type void", name)
            }
        }
    }
}

impl std::error::Error for TypeError {}

/// Every way a statement can fail
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    Syntax(SyntaxError),
    /// Unsupported AST shape; the message is for logs only
    Validation(String),
    Runtime(RuntimeError),
    Type(TypeError),
}

impl EvalError {
    /// Build a validation error, logging its detail
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(%message, "validation failure");
        EvalError::Validation(message)
    }

    /// The text the front end shows for this error
    pub fn display_message(&self) -> String {
        match self {
            // the column stays in the error for logs only
            EvalError::Syntax(err) => format!("Syntax error: {}", err.message),
            EvalError::Validation(_) => "Internal error".to_string(),
            EvalError::Runtime(err) => err.to_string(),
            EvalError::Type(err) => err.to_string(),
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Validation(message) => write!(f, "Internal error: {}", message),
            EvalError::Syntax(err) => write!(f, "{}", err),
            other => f.write_str(&other.display_message()),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<SyntaxError> for EvalError {
    fn from(err: SyntaxError) -> Self {
        EvalError::Syntax(err)
    }
}

impl From<RuntimeError> for EvalError {
    fn from(err: RuntimeError) -> Self {
        EvalError::Runtime(err)
    }
}

impl From<TypeError> for EvalError {
    fn from(err: TypeError) -> Self {
        EvalError::Type(err)
    }
}

impl From<CoercionError> for EvalError {
    fn from(err: CoercionError) -> Self {
        EvalError::Runtime(err.into())
    }
}

impl From<HeapError> for EvalError {
    fn from(err: HeapError) -> Self {
        EvalError::Runtime(err.into())
    }
}

impl From<AllocError> for EvalError {
    fn from(err: AllocError) -> Self {
        EvalError::Runtime(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatible_operands_message() {
        let err = RuntimeError::IncompatibleOperands {
            op: BinOp::Sub,
            left: LiteralKind::String,
            right: LiteralKind::String,
        };
        assert_eq!(
            err.to_string(),
            "Incompatible operands for '-': string and string"
        );
    }

    #[test]
    fn test_validation_is_hidden() {
        let err = EvalError::validation("unexpected type node");
        assert_eq!(err.display_message(), "Internal error");
        assert!(err.to_string().contains("unexpected type node"));
    }

    #[test]
    fn test_syntax_message() {
        let err = EvalError::from(SyntaxError {
            message: "Expected ')'".to_string(),
            position: 7,
        });
        assert_eq!(err.display_message(), "Syntax error: Expected ')'");
        assert_eq!(err.to_string(), "Syntax error: Expected ')' (column 7)");
    }

    #[test]
    fn test_heap_errors_map_to_runtime() {
        assert_eq!(
            RuntimeError::from(HeapError::Reserved { index: 2 }),
            RuntimeError::ReservedWrite { address: 2 }
        );
        assert_eq!(
            RuntimeError::from(AllocError::DoubleFree { address: 4 }),
            RuntimeError::DoubleFree { address: 4 }
        );
        assert_eq!(
            RuntimeError::from(AllocError::Heap(HeapError::Null)),
            RuntimeError::NullDereference
        );
    }
}
