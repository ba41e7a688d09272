use crate::interpreter::engine::Session;
use crate::interpreter::errors::{EvalError, RuntimeError};
use crate::memory::codec::{self, NumericFormat};
use crate::memory::pointer_add;
use crate::memory::value::{coerce, Literal, TypeDescriptor, TypeKind, TypedValue, Value};
use crate::parser::ast::AstNode;

/// A sized location in the heap reached through a pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Target {
    pub address: i128,
    pub ty: TypeDescriptor,
}

impl Target {
    fn format(&self) -> Result<NumericFormat, EvalError> {
        NumericFormat::for_type(self.ty).ok_or_else(|| {
            RuntimeError::UnsupportedDereference {
                ty: format!("{}*", self.ty),
            }
            .into()
        })
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Typed(tv) => tv.ty.to_string(),
        Value::Untyped(lit) => lit.kind().to_string(),
        Value::Void => "void".to_string(),
    }
}

impl Session {
    /// Evaluate a node that must yield an address. Bare integers address
    /// single bytes.
    fn pointer_operand(&mut self, node: &AstNode) -> Result<(i128, TypeDescriptor), EvalError> {
        let value = self.eval_value(node)?;
        match &value {
            Value::Typed(TypedValue { ty, value: lit }) if ty.is_pointer => {
                let address = lit.as_integer().ok_or_else(|| RuntimeError::UnsupportedDereference {
                    ty: describe(&value),
                })?;
                Ok((address, *ty))
            }
            Value::Untyped(Literal::Integer(address)) => {
                Ok((*address, TypeDescriptor::pointer_to(TypeKind::UInt8)))
            }
            _ => Err(RuntimeError::UnsupportedDereference {
                ty: describe(&value),
            }
            .into()),
        }
    }

    fn target_at(&self, address: i128, pointer: TypeDescriptor) -> Result<Target, EvalError> {
        let target = Target {
            address,
            ty: TypeDescriptor::new(pointer.kind),
        };
        // Rejects void* and string* before any heap access
        target.format()?;
        Ok(target)
    }

    /// `*operand`
    pub(crate) fn deref_target(&mut self, operand: &AstNode) -> Result<Target, EvalError> {
        let (address, pointer) = self.pointer_operand(operand)?;
        self.target_at(address, pointer)
    }

    /// `array[index]`, scaled by the element width
    pub(crate) fn index_target(
        &mut self,
        array: &AstNode,
        index: &AstNode,
    ) -> Result<Target, EvalError> {
        let (base, pointer) = self.pointer_operand(array)?;
        let index_value = self.eval_literal(index)?;
        let offset = index_value.as_integer().ok_or(RuntimeError::Coercion {
            from: index_value.kind(),
            to: TypeDescriptor::new(TypeKind::Int64),
        })?;
        self.target_at(pointer_add(base, offset, pointer), pointer)
    }

    fn heap_index(&self, address: i128, width: usize) -> Result<usize, RuntimeError> {
        if address == 0 {
            return Err(RuntimeError::NullDereference);
        }
        let out_of_range = RuntimeError::AddressOutOfRange {
            address,
            width,
            heap_size: self.heap.len(),
        };
        let index = usize::try_from(address).map_err(|_| out_of_range.clone())?;
        match index.checked_add(width) {
            Some(end) if end <= self.heap.len() => Ok(index),
            _ => Err(out_of_range),
        }
    }

    pub(crate) fn read_target(&self, target: Target) -> Result<Value, EvalError> {
        let format = target.format()?;
        let index = self.heap_index(target.address, format.width())?;
        let bytes = self.heap.read_range(index, format.width())?;
        let value = codec::decode(format, bytes)
            .map_err(|err| EvalError::validation(format!("decode failed: {}", err)))?;
        Ok(Value::Typed(TypedValue {
            ty: target.ty,
            value,
        }))
    }

    /// Store `value` at the target, coerced to the pointee type; yields
    /// the stored value
    pub(crate) fn write_target(&mut self, target: Target, value: Value) -> Result<Value, EvalError> {
        let format = target.format()?;
        let literal = value.into_literal().ok_or(RuntimeError::VoidValue)?;
        let typed = coerce(literal, target.ty)?;
        let bytes = codec::encode(format, &typed.value)
            .map_err(|err| EvalError::validation(format!("encode failed: {}", err)))?;
        let index = self.heap_index(target.address, bytes.len())?;
        self.heap.write_range(index, &bytes)?;
        Ok(Value::Typed(typed))
    }
}
