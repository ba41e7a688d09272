// Save and load of a whole session as a JSON blob

use crate::interpreter::constants::RESERVED_CELLS;
use crate::interpreter::engine::Session;
use crate::interpreter::scope::{Binding, Scope};
use crate::memory::allocator::{Allocator, FitStrategy, FreeListEntry};
use crate::memory::heap::HeapStore;
use crate::memory::value::{coerce, Literal, TypeDescriptor, TypeKind, TypedValue, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Current blob layout
pub const SNAPSHOT_VERSION: u32 = 1;

/// Literal as stored in a blob. Integers go through a string since JSON
/// numbers cannot hold every `i128`; doubles keep their exact bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum StoredLiteral {
    Integer(String),
    Double(u64),
    Char(u8),
    Str(String),
}

impl From<&Literal> for StoredLiteral {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Integer(n) => StoredLiteral::Integer(n.to_string()),
            Literal::Double(d) => StoredLiteral::Double(d.to_bits()),
            Literal::Char(c) => StoredLiteral::Char(*c),
            Literal::Str(s) => StoredLiteral::Str(s.clone()),
        }
    }
}

impl StoredLiteral {
    fn to_literal(&self) -> Result<Literal, SnapshotError> {
        Ok(match self {
            StoredLiteral::Integer(text) => Literal::Integer(text.parse().map_err(|_| {
                SnapshotError::Invalid(format!("'{}' is not an integer", text))
            })?),
            StoredLiteral::Double(bits) => Literal::Double(f64::from_bits(*bits)),
            StoredLiteral::Char(c) => Literal::Char(*c),
            StoredLiteral::Str(s) => Literal::Str(s.clone()),
        })
    }
}

/// A user variable; `ty` is absent for untyped values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBinding {
    pub name: String,
    pub ty: Option<TypeDescriptor>,
    pub value: StoredLiteral,
}

/// Everything needed to rebuild a session. Built-ins are not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub heap: Vec<u8>,
    pub free_list: Vec<FreeListEntry>,
    pub strategy: FitStrategy,
    pub next_fit_cursor: usize,
    pub bindings: Vec<StoredBinding>,
}

#[derive(Debug)]
pub enum SnapshotError {
    /// The blob is not a well-formed snapshot document
    Malformed(serde_json::Error),
    UnsupportedVersion(u32),
    /// Well-formed, but describes a state the session cannot be in
    Invalid(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Malformed(err) => write!(f, "Malformed snapshot: {}", err),
            SnapshotError::UnsupportedVersion(version) => {
                write!(f, "Unsupported snapshot version {}", version)
            }
            SnapshotError::Invalid(message) => write!(f, "Invalid snapshot: {}", message),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Malformed(err)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && TypeKind::from_keyword(name).is_none()
}

/// Literal equality that treats doubles bit for bit, so NaN matches itself
fn same_literal(a: &Literal, b: &Literal) -> bool {
    match (a, b) {
        (Literal::Double(x), Literal::Double(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

fn restore_binding(stored: &StoredBinding) -> Result<Value, SnapshotError> {
    let literal = stored.value.to_literal()?;
    let Some(ty) = stored.ty else {
        return Ok(Value::Untyped(literal));
    };
    if ty.is_void() {
        return Err(SnapshotError::Invalid(format!(
            "'{}' is declared void",
            stored.name
        )));
    }
    // A typed value must already be in its type's range
    match coerce(literal.clone(), ty) {
        Ok(TypedValue { value, .. }) if same_literal(&value, &literal) => {
            Ok(Value::Typed(TypedValue { ty, value }))
        }
        _ => Err(SnapshotError::Invalid(format!(
            "'{}' holds {} which is not a valid {}",
            stored.name,
            literal.render(),
            ty
        ))),
    }
}

impl SessionSnapshot {
    pub fn capture(session: &Session) -> Self {
        let bindings = session
            .scope
            .variables()
            .into_iter()
            .filter_map(|(name, value)| {
                let (ty, literal) = match value {
                    Value::Typed(tv) => (Some(tv.ty), &tv.value),
                    Value::Untyped(literal) => (None, literal),
                    Value::Void => return None,
                };
                Some(StoredBinding {
                    name: name.to_string(),
                    ty,
                    value: literal.into(),
                })
            })
            .collect();

        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            heap: session.heap.as_bytes().to_vec(),
            free_list: session.allocator.entries().to_vec(),
            strategy: session.allocator.strategy(),
            next_fit_cursor: session.allocator.next_fit_cursor(),
            bindings,
        }
    }

    /// Check every invariant and build the parts of a session
    fn restore(self) -> Result<(HeapStore, Allocator, Scope), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }

        let heap = HeapStore::from_bytes(self.heap)
            .map_err(|err| SnapshotError::Invalid(err.to_string()))?;
        if heap.as_bytes()[..RESERVED_CELLS].iter().any(|&b| b != 0) {
            return Err(SnapshotError::Invalid(
                "reserved cells are not zero".to_string(),
            ));
        }

        Allocator::validate_free_list(&self.free_list, heap.len())
            .map_err(SnapshotError::Invalid)?;
        if self.next_fit_cursor > heap.len() {
            return Err(SnapshotError::Invalid(format!(
                "next-fit cursor {} is outside the heap",
                self.next_fit_cursor
            )));
        }
        let allocator = Allocator::from_parts(self.free_list, self.strategy, self.next_fit_cursor);

        let mut scope = Scope::with_builtins(heap.len());
        for stored in &self.bindings {
            if !is_identifier(&stored.name) {
                return Err(SnapshotError::Invalid(format!(
                    "'{}' is not an identifier",
                    stored.name
                )));
            }
            match scope.get(&stored.name) {
                Some(Binding::Variable(_)) => {
                    return Err(SnapshotError::Invalid(format!(
                        "'{}' is stored twice",
                        stored.name
                    )))
                }
                Some(_) => {
                    return Err(SnapshotError::Invalid(format!(
                        "'{}' is a built-in",
                        stored.name
                    )))
                }
                None => {}
            }
            scope.bind(&stored.name, restore_binding(stored)?);
        }

        Ok((heap, allocator, scope))
    }
}

impl Session {
    /// Serialize the heap, the allocator state and the user variables
    pub fn save(&self) -> Result<Vec<u8>, SnapshotError> {
        let blob = serde_json::to_vec_pretty(&SessionSnapshot::capture(self))?;
        info!(bytes = blob.len(), "session saved");
        Ok(blob)
    }

    /// Replace the whole session with the one in `blob`.
    ///
    /// Nothing changes unless the blob is entirely valid.
    pub fn load(&mut self, blob: &[u8]) -> Result<&Scope, SnapshotError> {
        let snapshot: SessionSnapshot = serde_json::from_slice(blob)?;
        let (heap, allocator, scope) = snapshot.restore()?;

        self.heap = heap;
        self.allocator = allocator;
        self.scope = scope;
        info!(heap_size = self.heap.len(), "session loaded");
        Ok(&self.scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::engine::Outcome;

    fn populated() -> Session {
        let mut session = Session::new(32, FitStrategy::Best).unwrap();
        for line in [
            "uint8_t small = 300;",
            "double ratio = 0.1;",
            "string greeting = \"hi\";",
            "int16_t *p = malloc(4);",
            "p[1] = -2;",
            "loose = 'x';",
        ] {
            session.execute(line).unwrap();
        }
        session
    }

    #[test]
    fn test_round_trip_restores_everything() {
        let original = populated();
        let blob = original.save().unwrap();

        let mut restored = Session::new(8, FitStrategy::First).unwrap();
        let scope = restored.load(&blob).unwrap();
        assert_eq!(scope.variables(), original.scope().variables());

        assert_eq!(restored.heap(), original.heap());
        assert_eq!(restored.free_list(), original.free_list());
        assert_eq!(restored.strategy(), FitStrategy::Best);
        assert_eq!(restored.display_blocks(), original.display_blocks());
        assert_eq!(
            restored.execute("p[1]").unwrap(),
            Outcome::Value {
                kind: crate::memory::value::LiteralKind::Integer,
                text: "-2".to_string()
            }
        );
        assert_eq!(restored.execute("HEAP_SIZE").unwrap().to_string(), "-> 32");
    }

    #[test]
    fn test_malformed_blob_changes_nothing() {
        let mut session = populated();
        let before = session.clone();
        assert!(matches!(
            session.load(b"{ not json"),
            Err(SnapshotError::Malformed(_))
        ));
        assert_eq!(session.heap(), before.heap());
        assert_eq!(session.scope(), before.scope());
    }

    #[test]
    fn test_rejects_other_versions() {
        let mut snapshot = SessionSnapshot::capture(&populated());
        snapshot.version = 2;
        let blob = serde_json::to_vec(&snapshot).unwrap();
        let mut session = Session::new(16, FitStrategy::First).unwrap();
        assert!(matches!(
            session.load(&blob),
            Err(SnapshotError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_rejects_broken_invariants() {
        let base = SessionSnapshot::capture(&populated());
        let mut session = Session::new(16, FitStrategy::First).unwrap();

        let mut overlapping = base.clone();
        overlapping
            .free_list
            .push(FreeListEntry { ptr: 5, size_with_header: 4 });
        let blob = serde_json::to_vec(&overlapping).unwrap();
        assert!(matches!(session.load(&blob), Err(SnapshotError::Invalid(_))));

        let mut out_of_range = base.clone();
        out_of_range.bindings.push(StoredBinding {
            name: "tiny".to_string(),
            ty: Some(TypeDescriptor::new(TypeKind::UInt8)),
            value: StoredLiteral::Integer("300".to_string()),
        });
        let blob = serde_json::to_vec(&out_of_range).unwrap();
        assert!(matches!(session.load(&blob), Err(SnapshotError::Invalid(_))));

        let mut shadowing = base.clone();
        shadowing.bindings.push(StoredBinding {
            name: "malloc".to_string(),
            ty: None,
            value: StoredLiteral::Integer("1".to_string()),
        });
        let blob = serde_json::to_vec(&shadowing).unwrap();
        assert!(matches!(session.load(&blob), Err(SnapshotError::Invalid(_))));

        let mut reserved = base;
        reserved.heap[1] = 7;
        let blob = serde_json::to_vec(&reserved).unwrap();
        assert!(matches!(session.load(&blob), Err(SnapshotError::Invalid(_))));

        assert_eq!(session.heap_size(), 16);
        assert!(session.scope().variables().is_empty());
    }

    #[test]
    fn test_nan_double_survives() {
        let mut session = Session::new(16, FitStrategy::First).unwrap();
        session.execute("double d = 0.0 / 0.0;").unwrap();
        let blob = session.save().unwrap();
        let mut restored = Session::new(16, FitStrategy::First).unwrap();
        assert!(restored.load(&blob).is_ok());
        assert_eq!(restored.execute("d").unwrap().to_string(), "-> NaN");
    }
}
