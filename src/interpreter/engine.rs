// Evaluation session: the heap, its allocator and the identifier scope

use crate::config::SessionConfig;
use crate::interpreter::errors::{EvalError, RuntimeError, TypeError};
use crate::interpreter::predict;
use crate::interpreter::scope::{Binding, Scope};
use crate::memory::allocator::{AllocError, Allocator, FitStrategy, FreeListEntry};
use crate::memory::blocks::{reconstruct, summarize, Block, HeapStats};
use crate::memory::heap::HeapStore;
use crate::memory::value::{coerce, zero_value, Literal, LiteralKind, TypeDescriptor, Value};
use crate::parser::ast::{AstNode, TypeName};
use crate::parser::parse_statement;
use std::fmt;
use tracing::debug;

/// One independent evaluation context.
///
/// Every statement runs against a single `Session`; there is no global state,
/// so any number of sessions can coexist.
#[derive(Debug, Clone)]
pub struct Session {
    /// Simulated byte heap
    pub(crate) heap: HeapStore,

    /// Free list and fit strategy; its metadata also lives in `heap`
    pub(crate) allocator: Allocator,

    /// Built-ins and user variables
    pub(crate) scope: Scope,
}

/// What a successfully evaluated statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Void,
    Value { kind: LiteralKind, text: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Void => write!(f, "-> void"),
            Outcome::Value { text, .. } => write!(f, "-> {}", text),
        }
    }
}

impl Session {
    /// Create a session with a freshly formatted heap of `heap_size` cells
    pub fn new(heap_size: usize, strategy: FitStrategy) -> Result<Self, AllocError> {
        let mut heap = HeapStore::new(heap_size)?;
        let allocator = Allocator::new(&mut heap, strategy)?;
        debug!(heap_size, %strategy, "session created");
        Ok(Session {
            heap,
            allocator,
            scope: Scope::with_builtins(heap_size),
        })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, AllocError> {
        Self::new(config.heap_size, config.strategy)
    }

    /// Parse and evaluate one statement
    pub fn execute(&mut self, source: &str) -> Result<Outcome, EvalError> {
        debug!(statement = source, "evaluating");
        let ast = parse_statement(source)?;
        self.evaluate(&ast)
    }

    /// Evaluate an already parsed statement
    pub fn evaluate(&mut self, ast: &AstNode) -> Result<Outcome, EvalError> {
        let outcome = match self.eval(ast)?.into_literal() {
            None => Outcome::Void,
            Some(literal) => Outcome::Value {
                kind: literal.kind(),
                text: literal.render(),
            },
        };
        Ok(outcome)
    }

    pub(crate) fn eval(&mut self, node: &AstNode) -> Result<Value, EvalError> {
        match node {
            AstNode::IntLiteral(n, _) => Ok(Value::Untyped(Literal::Integer(*n))),
            AstNode::DoubleLiteral(d, _) => Ok(Value::Untyped(Literal::Double(*d))),
            AstNode::CharLiteral(c, _) => Ok(Value::Untyped(Literal::Char(*c))),
            AstNode::StringLiteral(s, _) => Ok(Value::Untyped(Literal::Str(s.clone()))),

            AstNode::Identifier(name, _) => self.lookup(name),

            AstNode::Declaration {
                name,
                var_type,
                array_len,
                ..
            } => {
                self.evaluate_declaration(name, var_type, *array_len)?;
                Ok(Value::Void)
            }

            AstNode::Assignment { lhs, rhs, .. } => self.evaluate_assignment(lhs, rhs),

            AstNode::FunctionCall { name, args, .. } => self.call_builtin(name, args),

            AstNode::ArrayIndex { array, index, .. } => {
                let target = self.index_target(array, index)?;
                self.read_target(target)
            }

            AstNode::Cast {
                target_type, expr, ..
            } => {
                let ty = self.resolve_type(target_type)?;
                let literal = self.eval_literal(expr)?;
                Ok(Value::Typed(coerce(literal, ty)?))
            }

            AstNode::BinaryOp {
                op, left, right, ..
            } => self.evaluate_binary_op(*op, left, right),

            AstNode::Parenthesis { expr, .. } => self.eval(expr),

            AstNode::Dereference { operand, .. } => {
                let target = self.deref_target(operand)?;
                self.read_target(target)
            }

            AstNode::Type(name, _) => Err(EvalError::validation(format!(
                "type '{}' used as a value",
                name
            ))),
        }
    }

    /// Evaluate a node that must produce a value
    pub(crate) fn eval_value(&mut self, node: &AstNode) -> Result<Value, EvalError> {
        let value = self.eval(node)?;
        if value.is_void() {
            return Err(RuntimeError::VoidValue.into());
        }
        Ok(value)
    }

    pub(crate) fn eval_literal(&mut self, node: &AstNode) -> Result<Literal, EvalError> {
        self.eval(node)?
            .into_literal()
            .ok_or_else(|| RuntimeError::VoidValue.into())
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        match self.scope.get(name) {
            Some(Binding::Variable(value)) => Ok(value.clone()),
            Some(Binding::Constant { value, .. }) => Ok(Value::Typed(value.clone())),
            Some(Binding::Native(_)) => Err(RuntimeError::NotAValue {
                name: name.to_string(),
            }
            .into()),
            None => Err(RuntimeError::UndefinedIdentifier {
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// Bind `name` to the zero value of its type, or to a fresh heap array.
    ///
    /// Every check runs before the scope or the heap is touched.
    pub(crate) fn evaluate_declaration(
        &mut self,
        name: &str,
        var_type: &TypeName,
        array_len: Option<usize>,
    ) -> Result<(), EvalError> {
        if self.scope.is_builtin(name) {
            return Err(RuntimeError::NotAssignable {
                name: name.to_string(),
            }
            .into());
        }
        let ty = self.resolve_type(var_type)?;
        if ty.is_void() {
            return Err(TypeError::VoidDeclaration {
                name: name.to_string(),
            }
            .into());
        }

        let Some(len) = array_len else {
            let zero = zero_value(ty)?;
            self.scope.bind(name, Value::Typed(zero));
            return Ok(());
        };

        if ty.is_pointer {
            return Err(EvalError::validation(format!(
                "array of pointers '{}'",
                name
            )));
        }
        let width = ty.byte_width().ok_or_else(|| {
            EvalError::validation(format!("array '{}' of unsized type {}", name, ty))
        })?;
        let bytes = len.checked_mul(width).ok_or(RuntimeError::OutOfMemory {
            requested: usize::MAX,
            largest_free: self.allocator.largest_capacity(),
        })?;
        let address = self.allocator.malloc(&mut self.heap, bytes)?;
        let pointer = coerce(
            Literal::Integer(address as i128),
            TypeDescriptor::pointer_to(ty.kind),
        )?;
        debug!(name, address, len, "array declared");
        self.scope.bind(name, Value::Typed(pointer));
        Ok(())
    }

    pub fn heap(&self) -> &HeapStore {
        &self.heap
    }

    pub fn heap_size(&self) -> usize {
        self.heap.len()
    }

    pub fn free_list(&self) -> &[FreeListEntry] {
        self.allocator.entries()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn strategy(&self) -> FitStrategy {
        self.allocator.strategy()
    }

    pub fn set_strategy(&mut self, strategy: FitStrategy) {
        self.allocator.set_strategy(strategy);
    }

    /// Block layout re-derived from the raw heap bytes
    pub fn display_blocks(&self) -> Vec<Block> {
        reconstruct(self.heap.as_bytes(), self.allocator.entries())
    }

    pub fn heap_stats(&self) -> HeapStats {
        summarize(&self.display_blocks())
    }

    /// Complete the identifier being typed at the end of `partial`
    pub fn predict(&self, partial: &str) -> String {
        predict::predict(partial, self.scope.completion_candidates())
    }

    /// Overwrite one heap cell directly, bypassing the allocator
    pub fn write_cell(&mut self, index: usize, value: u8) -> Result<(), RuntimeError> {
        self.heap.write(index, value)?;
        debug!(index, value, "cell edited");
        Ok(())
    }
}
