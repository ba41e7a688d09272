//! Type resolution and `sizeof`
//!
//! Source spellings ([`TypeName`]) allow any number of `*`, but values carry
//! at most one pointer level. Deeper spellings parse fine and are rejected here
//! as validation errors.
//!
//! # Widths
//!
//! - `sizeof(type)`: the fixed width of the type; a pointer is one cell,
//!   `string` and `void` have no width
//! - `sizeof(expr)`: the width of the value's type. Untyped results use
//!   4 bytes for integers, 8 for doubles, 1 for characters and the byte
//!   length for strings.

use crate::interpreter::constants::UNTYPED_INTEGER_WIDTH;
use crate::interpreter::engine::Session;
use crate::interpreter::errors::{EvalError, RuntimeError};
use crate::memory::value::{Literal, TypeDescriptor, Value};
use crate::parser::ast::{AstNode, TypeName};

fn literal_width(literal: &Literal) -> usize {
    match literal {
        Literal::Integer(_) => UNTYPED_INTEGER_WIDTH,
        Literal::Double(_) => 8,
        Literal::Char(_) => 1,
        Literal::Str(s) => s.len(),
    }
}

impl Session {
    pub(crate) fn resolve_type(&self, name: &TypeName) -> Result<TypeDescriptor, EvalError> {
        name.descriptor().ok_or_else(|| {
            EvalError::validation(format!("unsupported pointer depth in type '{}'", name))
        })
    }

    pub(crate) fn evaluate_sizeof(&mut self, arg: &AstNode) -> Result<usize, EvalError> {
        if let AstNode::Type(name, _) = arg {
            let ty = self.resolve_type(name)?;
            return ty.byte_width().ok_or_else(|| {
                RuntimeError::UnsizedType {
                    ty: ty.to_string(),
                }
                .into()
            });
        }

        match self.eval_value(arg)? {
            // A string variable has no fixed width, so it reports its contents
            Value::Typed(tv) => Ok(tv.ty.byte_width().unwrap_or_else(|| literal_width(&tv.value))),
            Value::Untyped(literal) => Ok(literal_width(&literal)),
            Value::Void => Err(RuntimeError::VoidValue.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::engine::Session;
    use crate::interpreter::errors::{EvalError, RuntimeError};
    use crate::memory::allocator::FitStrategy;

    fn sizeof(s: &mut Session, source: &str) -> String {
        s.execute(source).unwrap().to_string()
    }

    #[test]
    fn test_sizeof_types() {
        let mut s = Session::new(64, FitStrategy::First).unwrap();
        assert_eq!(sizeof(&mut s, "sizeof(int64_t)"), "-> 8");
        assert_eq!(sizeof(&mut s, "sizeof(short)"), "-> 2");
        assert_eq!(sizeof(&mut s, "sizeof(double*)"), "-> 1");
        assert!(matches!(
            s.execute("sizeof(string)").unwrap_err(),
            EvalError::Runtime(RuntimeError::UnsizedType { .. })
        ));
        assert!(s.execute("sizeof(void)").is_err());
    }

    #[test]
    fn test_sizeof_expressions() {
        let mut s = Session::new(64, FitStrategy::First).unwrap();
        assert_eq!(sizeof(&mut s, "sizeof(1 + 2)"), "-> 4");
        assert_eq!(sizeof(&mut s, "sizeof(1.5)"), "-> 8");
        assert_eq!(sizeof(&mut s, "sizeof('a')"), "-> 1");
        assert_eq!(sizeof(&mut s, "sizeof(\"four\")"), "-> 4");

        s.execute("uint16_t w;").unwrap();
        assert_eq!(sizeof(&mut s, "sizeof(w)"), "-> 2");
        s.execute("string name = \"abc\";").unwrap();
        assert_eq!(sizeof(&mut s, "sizeof(name)"), "-> 3");
    }

    #[test]
    fn test_deep_pointer_types_are_internal() {
        let mut s = Session::new(64, FitStrategy::First).unwrap();
        let err = s.execute("sizeof(int32_t**)").unwrap_err();
        assert!(matches!(err, EvalError::Validation(_)));
    }
}
