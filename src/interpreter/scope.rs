//! Flat, session-wide identifier scope
//!
//! There is no block scoping: a name stays bound until it is redeclared or
//! the session is replaced by a load.

use crate::memory::value::{Literal, TypeDescriptor, TypeKind, TypedValue, Value};
use rustc_hash::FxHashMap;

/// Functions implemented by the session itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFunction {
    Malloc,
    Calloc,
    Free,
    Sizeof,
    Strategy,
}

impl NativeFunction {
    pub const ALL: [NativeFunction; 5] = [
        NativeFunction::Malloc,
        NativeFunction::Calloc,
        NativeFunction::Free,
        NativeFunction::Sizeof,
        NativeFunction::Strategy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NativeFunction::Malloc => "malloc",
            NativeFunction::Calloc => "calloc",
            NativeFunction::Free => "free",
            NativeFunction::Sizeof => "sizeof",
            NativeFunction::Strategy => "strategy",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            NativeFunction::Calloc => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// User variable; never holds [`Value::Void`]
    Variable(Value),
    /// Built-in constant. Keyword constants are not offered for completion.
    Constant { value: TypedValue, keyword: bool },
    Native(NativeFunction),
}

impl Binding {
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Binding::Variable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scope {
    bindings: FxHashMap<String, Binding>,
}

impl Scope {
    /// Scope holding only the built-ins for a heap of `heap_size` cells
    pub fn with_builtins(heap_size: usize) -> Self {
        let mut bindings = FxHashMap::default();
        let int = TypeDescriptor::new(TypeKind::Int32);

        let constants = [
            ("true", int, 1, true),
            ("false", int, 0, true),
            ("NULL", TypeDescriptor::pointer_to(TypeKind::Void), 0, true),
            ("HEAP_SIZE", int, heap_size as i128, false),
        ];
        for (name, ty, value, keyword) in constants {
            bindings.insert(
                name.to_string(),
                Binding::Constant {
                    value: TypedValue {
                        ty,
                        value: Literal::Integer(value),
                    },
                    keyword,
                },
            );
        }
        for function in NativeFunction::ALL {
            bindings.insert(function.name().to_string(), Binding::Native(function));
        }

        Scope { bindings }
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.bindings.get(name).is_some_and(Binding::is_builtin)
    }

    /// Bind or rebind a user variable
    pub fn bind(&mut self, name: &str, value: Value) {
        self.bindings
            .insert(name.to_string(), Binding::Variable(value));
    }

    /// Names offered by prediction
    pub fn completion_candidates(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().filter_map(|(name, binding)| match binding {
            Binding::Constant { keyword: true, .. } => None,
            _ => Some(name.as_str()),
        })
    }

    /// User variables sorted by name
    pub fn variables(&self) -> Vec<(&str, &Value)> {
        let mut variables: Vec<(&str, &Value)> = self
            .bindings
            .iter()
            .filter_map(|(name, binding)| match binding {
                Binding::Variable(value) => Some((name.as_str(), value)),
                _ => None,
            })
            .collect();
        variables.sort_by(|a, b| a.0.cmp(b.0));
        variables
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let scope = Scope::with_builtins(64);
        assert!(scope.is_builtin("malloc"));
        assert!(scope.is_builtin("NULL"));
        assert!(!scope.is_builtin("x"));
        assert!(matches!(
            scope.get("HEAP_SIZE"),
            Some(Binding::Constant { value: TypedValue { value: Literal::Integer(64), .. }, keyword: false })
        ));
        assert!(scope.variables().is_empty());
    }

    #[test]
    fn test_keyword_constants_are_not_candidates() {
        let scope = Scope::with_builtins(64);
        let mut names: Vec<&str> = scope.completion_candidates().collect();
        names.sort();
        assert_eq!(
            names,
            vec!["HEAP_SIZE", "calloc", "free", "malloc", "sizeof", "strategy"]
        );
    }

    #[test]
    fn test_rebinding_overwrites() {
        let mut scope = Scope::with_builtins(64);
        scope.bind("x", Value::Untyped(Literal::Integer(1)));
        scope.bind("x", Value::Untyped(Literal::Integer(2)));
        assert_eq!(
            scope.variables(),
            vec![("x", &Value::Untyped(Literal::Integer(2)))]
        );
    }
}
