use crate::interpreter::engine::Session;
use crate::interpreter::errors::{EvalError, RuntimeError};
use crate::interpreter::scope::Binding;
use crate::memory::value::{coerce, Value};
use crate::parser::ast::AstNode;

impl Session {
    pub(crate) fn evaluate_assignment(
        &mut self,
        lhs: &AstNode,
        rhs: &AstNode,
    ) -> Result<Value, EvalError> {
        match lhs {
            AstNode::Declaration {
                name,
                var_type,
                array_len: None,
                ..
            } => {
                // The declaration binds the zero value first, so a failing
                // right-hand side leaves the variable declared
                self.evaluate_declaration(name, var_type, None)?;
                let value = self.eval_value(rhs)?;
                self.assign_variable(name, value)
            }
            AstNode::Identifier(name, _) => {
                let value = self.eval_value(rhs)?;
                self.assign_variable(name, value)
            }
            AstNode::Parenthesis { expr, .. } => self.evaluate_assignment(expr, rhs),
            AstNode::Dereference { operand, .. } => {
                let target = self.deref_target(operand)?;
                let value = self.eval_value(rhs)?;
                self.write_target(target, value)
            }
            AstNode::ArrayIndex { array, index, .. } => {
                let target = self.index_target(array, index)?;
                let value = self.eval_value(rhs)?;
                self.write_target(target, value)
            }
            other => Err(EvalError::validation(format!(
                "cannot assign to a {}",
                other.kind_name()
            ))),
        }
    }

    /// Bind `value` to `name`, coercing to the declared type when there is one
    pub(crate) fn assign_variable(&mut self, name: &str, value: Value) -> Result<Value, EvalError> {
        let stored = match self.scope.get(name) {
            Some(Binding::Constant { .. }) | Some(Binding::Native(_)) => {
                return Err(RuntimeError::NotAssignable {
                    name: name.to_string(),
                }
                .into())
            }
            Some(Binding::Variable(Value::Typed(existing))) => {
                let ty = existing.ty;
                let literal = value.into_literal().ok_or(RuntimeError::VoidValue)?;
                Value::Typed(coerce(literal, ty)?)
            }
            _ => {
                if value.is_void() {
                    return Err(RuntimeError::VoidValue.into());
                }
                value
            }
        };

        self.scope.bind(name, stored.clone());
        Ok(stored)
    }
}
