use crate::interpreter::engine::Session;
use crate::interpreter::errors::{EvalError, RuntimeError};
use crate::memory::value::{coerce, Literal, TypeDescriptor, Value};
use crate::memory::{pointer_add, pointer_diff};
use crate::parser::ast::{AstNode, BinOp};

/// Floor division on integers; the caller has ruled out a zero divisor
fn floor_div(a: i128, b: i128) -> i128 {
    let quotient = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) {
        quotient - 1
    } else {
        quotient
    }
}

fn integer_op(op: BinOp, a: i128, b: i128) -> Result<i128, RuntimeError> {
    match op {
        BinOp::Add => Ok(a.wrapping_add(b)),
        BinOp::Sub => Ok(a.wrapping_sub(b)),
        BinOp::Mul => Ok(a.wrapping_mul(b)),
        BinOp::Div if b == 0 => Err(RuntimeError::DivisionByZero),
        BinOp::Div => Ok(floor_div(a, b)),
    }
}

fn double_op(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
    }
}

/// Apply `op` to two literals.
///
/// Promotion ladder, first match wins:
/// 1. integer/double pairs: integer arithmetic when both are integers,
///    double arithmetic otherwise
/// 2. integer/char pairs with at least one char: two chars combine their
///    codes (wrapping at 256), a mixed pair works on integers
/// 3. char/string pairs: only `+`, which concatenates
/// 4. anything else is an error naming both kinds
pub fn apply(op: BinOp, left: &Literal, right: &Literal) -> Result<Literal, RuntimeError> {
    let incompatible = || RuntimeError::IncompatibleOperands {
        op,
        left: left.kind(),
        right: right.kind(),
    };

    match (left, right) {
        (Literal::Integer(a), Literal::Integer(b)) => integer_op(op, *a, *b).map(Literal::Integer),
        (Literal::Integer(_) | Literal::Double(_), Literal::Integer(_) | Literal::Double(_)) => {
            let as_double = |lit: &Literal| match lit {
                Literal::Integer(n) => *n as f64,
                Literal::Double(d) => *d,
                _ => 0.0,
            };
            Ok(Literal::Double(double_op(op, as_double(left), as_double(right))))
        }
        (Literal::Char(a), Literal::Char(b)) => {
            let code = integer_op(op, *a as i128, *b as i128)?;
            Ok(Literal::Char(code.rem_euclid(256) as u8))
        }
        (Literal::Integer(_) | Literal::Char(_), Literal::Integer(_) | Literal::Char(_)) => {
            match (left.as_integer(), right.as_integer()) {
                (Some(a), Some(b)) => integer_op(op, a, b).map(Literal::Integer),
                _ => Err(incompatible()),
            }
        }
        (Literal::Char(_) | Literal::Str(_), Literal::Char(_) | Literal::Str(_)) => {
            if op != BinOp::Add {
                return Err(incompatible());
            }
            let text = |lit: &Literal| match lit {
                Literal::Char(c) => (*c as char).to_string(),
                Literal::Str(s) => s.clone(),
                _ => String::new(),
            };
            Ok(Literal::Str(text(left) + &text(right)))
        }
        _ => Err(incompatible()),
    }
}

fn pointer_type(value: &Value) -> Option<TypeDescriptor> {
    value.type_descriptor().filter(|ty| ty.is_pointer)
}

impl Session {
    /// Evaluate an operator node. Pointer operands get scaled arithmetic;
    /// everything else goes through [`apply`] and yields an untyped result.
    pub(crate) fn evaluate_binary_op(
        &mut self,
        op: BinOp,
        left: &AstNode,
        right: &AstNode,
    ) -> Result<Value, EvalError> {
        let lhs = self.eval_value(left)?;
        let rhs = self.eval_value(right)?;
        let (left_lit, right_lit) = match (lhs.literal(), rhs.literal()) {
            (Some(l), Some(r)) => (l, r),
            _ => return Err(RuntimeError::VoidValue.into()),
        };

        let pointer = match (op, pointer_type(&lhs), pointer_type(&rhs)) {
            (BinOp::Add | BinOp::Sub, Some(ty), None) => right_lit
                .as_integer()
                .zip(left_lit.as_integer())
                .map(|(offset, addr)| {
                    let offset = if op == BinOp::Sub {
                        offset.wrapping_neg()
                    } else {
                        offset
                    };
                    (pointer_add(addr, offset, ty), ty)
                }),
            (BinOp::Add, None, Some(ty)) => left_lit
                .as_integer()
                .zip(right_lit.as_integer())
                .map(|(offset, addr)| (pointer_add(addr, offset, ty), ty)),
            (BinOp::Sub, Some(a), Some(b)) if a == b => {
                let diff = left_lit
                    .as_integer()
                    .zip(right_lit.as_integer())
                    .map(|(l, r)| pointer_diff(l, r, a));
                if let Some(diff) = diff {
                    return Ok(Value::Untyped(Literal::Integer(diff)));
                }
                None
            }
            _ => None,
        };

        if let Some((address, ty)) = pointer {
            return Ok(Value::Typed(coerce(Literal::Integer(address), ty)?));
        }
        Ok(Value::Untyped(apply(op, left_lit, right_lit)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::value::LiteralKind;

    #[test]
    fn test_integer_division_floors() {
        assert_eq!(
            apply(BinOp::Div, &Literal::Integer(7), &Literal::Integer(2)),
            Ok(Literal::Integer(3))
        );
        assert_eq!(
            apply(BinOp::Div, &Literal::Integer(-7), &Literal::Integer(2)),
            Ok(Literal::Integer(-4))
        );
    }

    #[test]
    fn test_double_division() {
        assert_eq!(
            apply(BinOp::Div, &Literal::Double(7.0), &Literal::Double(2.0)),
            Ok(Literal::Double(3.5))
        );
        assert_eq!(
            apply(BinOp::Mul, &Literal::Integer(3), &Literal::Double(0.5)),
            Ok(Literal::Double(1.5))
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            apply(BinOp::Div, &Literal::Integer(1), &Literal::Integer(0)),
            Err(RuntimeError::DivisionByZero)
        );
        assert_eq!(
            apply(BinOp::Div, &Literal::Char(b'a'), &Literal::Char(0)),
            Err(RuntimeError::DivisionByZero)
        );
        assert_eq!(
            apply(BinOp::Div, &Literal::Double(1.0), &Literal::Integer(0)),
            Ok(Literal::Double(f64::INFINITY))
        );
    }

    #[test]
    fn test_char_codes_combine() {
        assert_eq!(
            apply(BinOp::Add, &Literal::Char(b'a'), &Literal::Char(b'b')),
            Ok(Literal::Char(b'a' + b'b'))
        );
        assert_eq!(
            apply(BinOp::Add, &Literal::Char(200), &Literal::Char(100)),
            Ok(Literal::Char(44))
        );
        assert_eq!(
            apply(BinOp::Div, &Literal::Char(b'd'), &Literal::Char(3)),
            Ok(Literal::Char(33))
        );
    }

    #[test]
    fn test_char_with_integer_promotes() {
        assert_eq!(
            apply(BinOp::Add, &Literal::Char(b'a'), &Literal::Integer(1)),
            Ok(Literal::Integer(98))
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            apply(
                BinOp::Add,
                &Literal::Str("ab".into()),
                &Literal::Char(b'c')
            ),
            Ok(Literal::Str("abc".into()))
        );
    }

    #[test]
    fn test_string_subtraction_fails() {
        let err = apply(
            BinOp::Sub,
            &Literal::Str("hello".into()),
            &Literal::Str("world".into()),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RuntimeError::IncompatibleOperands {
                op: BinOp::Sub,
                left: LiteralKind::String,
                right: LiteralKind::String,
            }
        );
    }

    #[test]
    fn test_mixed_families_fail() {
        assert!(matches!(
            apply(BinOp::Add, &Literal::Str("a".into()), &Literal::Integer(1)),
            Err(RuntimeError::IncompatibleOperands {
                left: LiteralKind::String,
                right: LiteralKind::Integer,
                ..
            })
        ));
        assert!(apply(BinOp::Add, &Literal::Char(b'a'), &Literal::Double(1.0)).is_err());
    }

    #[test]
    fn test_integer_arithmetic_wraps_instead_of_panicking() {
        assert_eq!(
            apply(BinOp::Add, &Literal::Integer(i128::MAX), &Literal::Integer(1)),
            Ok(Literal::Integer(i128::MIN))
        );
        assert_eq!(
            apply(BinOp::Div, &Literal::Integer(i128::MIN), &Literal::Integer(-1)),
            Ok(Literal::Integer(i128::MIN))
        );
    }

    #[test]
    fn test_pointer_minus_extreme_offset_wraps() {
        let mut session = Session::new(32, crate::memory::allocator::FitStrategy::First).unwrap();
        session.execute("int32_t *p = malloc(4);").unwrap();
        let outcome = session
            .execute("p - (170141183460469231731687303715884105727 + 1)")
            .unwrap();
        // i128::MIN * 4 wraps to zero, leaving the address unchanged
        assert_eq!(outcome.to_string(), "-> 4");
    }
}
