//! Built-in function implementations
//!
//! Built-ins are bound in the [`Scope`](crate::interpreter::scope::Scope) as
//! native functions and dispatched here when a call node names one.
//!
//! # Supported Built-ins
//!
//! - `malloc(size)`: allocate `size` bytes, yields a `void*`
//! - `calloc(count, size)`: allocate `count * size` zeroed bytes
//! - `free(ptr)`: release an allocation, yields void; `free(NULL)` does nothing
//! - `sizeof(type_or_expr)`: byte width, see [`type_system`](super::type_system)
//! - `strategy(name)`: switch the allocator's fit strategy, yields void

use crate::interpreter::engine::Session;
use crate::interpreter::errors::{EvalError, RuntimeError};
use crate::interpreter::scope::{Binding, NativeFunction};
use crate::memory::allocator::FitStrategy;
use crate::memory::value::{coerce, Literal, TypeDescriptor, TypeKind, Value};
use crate::parser::ast::AstNode;
use tracing::debug;

impl Session {
    pub(crate) fn call_builtin(&mut self, name: &str, args: &[AstNode]) -> Result<Value, EvalError> {
        let function = match self.scope.get(name) {
            Some(Binding::Native(function)) => *function,
            Some(_) => {
                return Err(RuntimeError::NotCallable {
                    name: name.to_string(),
                }
                .into())
            }
            None => {
                return Err(RuntimeError::UndefinedIdentifier {
                    name: name.to_string(),
                }
                .into())
            }
        };

        if args.len() != function.arity() {
            return Err(RuntimeError::ArgumentCountMismatch {
                function: name.to_string(),
                expected: function.arity(),
                got: args.len(),
            }
            .into());
        }

        match function {
            NativeFunction::Malloc => {
                let size = self.size_argument(&args[0])?;
                self.builtin_malloc(size, false)
            }
            NativeFunction::Calloc => {
                let count = self.size_argument(&args[0])?;
                let size = self.size_argument(&args[1])?;
                self.builtin_malloc(count.saturating_mul(size), true)
            }
            NativeFunction::Free => self.builtin_free(&args[0]),
            NativeFunction::Sizeof => {
                let width = self.evaluate_sizeof(&args[0])?;
                Ok(Value::Untyped(Literal::Integer(width as i128)))
            }
            NativeFunction::Strategy => self.builtin_strategy(&args[0]),
        }
    }

    /// Evaluate an allocation size; it must be a positive integer
    fn size_argument(&mut self, arg: &AstNode) -> Result<i128, EvalError> {
        let literal = self.eval_literal(arg)?;
        let size = literal.as_integer().ok_or(RuntimeError::Coercion {
            from: literal.kind(),
            to: TypeDescriptor::new(TypeKind::UInt64),
        })?;
        if size < 1 {
            return Err(RuntimeError::InvalidMallocSize { size }.into());
        }
        Ok(size)
    }

    fn builtin_malloc(&mut self, size: i128, zeroed: bool) -> Result<Value, EvalError> {
        // Anything past usize can never fit, report it like any other miss
        let bytes = usize::try_from(size).map_err(|_| RuntimeError::OutOfMemory {
            requested: usize::MAX,
            largest_free: self.allocator.largest_capacity(),
        })?;
        let address = self.allocator.malloc(&mut self.heap, bytes)?;
        if zeroed {
            self.heap.fill(address, bytes, 0)?;
        }

        let pointer = coerce(
            Literal::Integer(address as i128),
            TypeDescriptor::pointer_to(TypeKind::Void),
        )?;
        Ok(Value::Typed(pointer))
    }

    fn builtin_free(&mut self, arg: &AstNode) -> Result<Value, EvalError> {
        let literal = self.eval_literal(arg)?;
        let address = literal.as_integer().ok_or(RuntimeError::Coercion {
            from: literal.kind(),
            to: TypeDescriptor::pointer_to(TypeKind::Void),
        })?;
        if address == 0 {
            debug!("free(NULL) ignored");
            return Ok(Value::Void);
        }

        let heap_size = self.heap.len();
        let index = usize::try_from(address)
            .ok()
            .filter(|index| *index < heap_size)
            .ok_or(RuntimeError::AddressOutOfRange {
                address,
                width: 1,
                heap_size,
            })?;
        self.allocator.free(&mut self.heap, index)?;
        Ok(Value::Void)
    }

    fn builtin_strategy(&mut self, arg: &AstNode) -> Result<Value, EvalError> {
        let name = match self.eval_literal(arg)? {
            Literal::Str(name) => name,
            other => {
                return Err(RuntimeError::InvalidArgument {
                    function: "strategy".to_string(),
                    message: format!("expected a string, got {}", other.kind()),
                }
                .into())
            }
        };
        let strategy: FitStrategy = name
            .parse()
            .map_err(|_| RuntimeError::UnknownStrategy { name: name.clone() })?;
        self.set_strategy(strategy);
        Ok(Value::Void)
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::engine::{Outcome, Session};
    use crate::interpreter::errors::{EvalError, RuntimeError};
    use crate::memory::allocator::FitStrategy;

    fn session() -> Session {
        Session::new(32, FitStrategy::First).unwrap()
    }

    #[test]
    fn test_malloc_returns_void_pointer() {
        let mut s = session();
        let outcome = s.execute("p = malloc(4)").unwrap();
        assert_eq!(outcome.to_string(), "-> 4");
        assert_eq!(s.free_list()[0].ptr, 10);
    }

    #[test]
    fn test_malloc_rejects_non_positive_sizes() {
        let mut s = session();
        assert!(matches!(
            s.execute("malloc(0)").unwrap_err(),
            EvalError::Runtime(RuntimeError::InvalidMallocSize { size: 0 })
        ));
        assert!(s.execute("malloc(-3)").is_err());
        assert!(s.execute("malloc(\"four\")").is_err());
    }

    #[test]
    fn test_out_of_memory() {
        let mut s = session();
        let err = s.execute("malloc(100)").unwrap_err();
        assert!(matches!(
            err,
            EvalError::Runtime(RuntimeError::OutOfMemory {
                requested: 100,
                largest_free: 27
            })
        ));
    }

    #[test]
    fn test_calloc_zeroes_payload() {
        let mut s = session();
        s.execute("uint8_t *p = malloc(4);").unwrap();
        s.execute("p[0] = 7;").unwrap();
        s.execute("free(p);").unwrap();

        s.execute("uint8_t *q = calloc(2, 2);").unwrap();
        assert_eq!(s.execute("q[0]").unwrap().to_string(), "-> 0");
        assert!(s.execute("calloc(0, 4)").is_err());
    }

    #[test]
    fn test_free_errors() {
        let mut s = session();
        s.execute("p = malloc(4);").unwrap();
        s.execute("free(p);").unwrap();
        assert!(matches!(
            s.execute("free(p)").unwrap_err(),
            EvalError::Runtime(RuntimeError::DoubleFree { address: 4 })
        ));
        assert!(matches!(
            s.execute("free(500)").unwrap_err(),
            EvalError::Runtime(RuntimeError::AddressOutOfRange { address: 500, .. })
        ));
        assert_eq!(s.execute("free(NULL)").unwrap(), Outcome::Void);
    }

    #[test]
    fn test_argument_count() {
        let mut s = session();
        assert!(matches!(
            s.execute("malloc(1, 2)").unwrap_err(),
            EvalError::Runtime(RuntimeError::ArgumentCountMismatch {
                expected: 1,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_calling_a_non_function() {
        let mut s = session();
        s.execute("x = 1").unwrap();
        assert!(matches!(
            s.execute("x(2)").unwrap_err(),
            EvalError::Runtime(RuntimeError::NotCallable { .. })
        ));
        assert!(matches!(
            s.execute("nothing(2)").unwrap_err(),
            EvalError::Runtime(RuntimeError::UndefinedIdentifier { .. })
        ));
    }

    #[test]
    fn test_strategy_switch() {
        let mut s = session();
        assert_eq!(s.execute("strategy(\"best\")").unwrap(), Outcome::Void);
        assert_eq!(s.strategy(), FitStrategy::Best);
        assert!(matches!(
            s.execute("strategy(\"random\")").unwrap_err(),
            EvalError::Runtime(RuntimeError::UnknownStrategy { .. })
        ));
        assert!(matches!(
            s.execute("strategy(3)").unwrap_err(),
            EvalError::Runtime(RuntimeError::InvalidArgument { .. })
        ));
    }
}
