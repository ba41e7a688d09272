//! Runtime value representation and coercion
//!
//! Every evaluation result is one of three shapes:
//!
//! - [`Value::Void`]: the result of a declaration or a `free`
//! - [`Value::Untyped`]: a bare [`Literal`] whose width is not fixed yet
//! - [`Value::Typed`]: a [`Literal`] bound to a [`TypeDescriptor`]
//!
//! # Coercion
//!
//! [`coerce`] turns a literal into a typed value. Integer targets keep the low
//! `W` bits of the value (two's complement for signed targets), doubles are
//! floored first, and pointers always land in a single unsigned byte because
//! heap cells are addressed one byte at a time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base kinds a declared type can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Double,
    String,
    Void,
}

impl TypeKind {
    /// Every spelling the lexer accepts, with the kind it maps to.
    pub const KEYWORDS: [(&'static str, TypeKind); 15] = [
        ("int8_t", TypeKind::Int8),
        ("int16_t", TypeKind::Int16),
        ("int32_t", TypeKind::Int32),
        ("int64_t", TypeKind::Int64),
        ("uint8_t", TypeKind::UInt8),
        ("uint16_t", TypeKind::UInt16),
        ("uint32_t", TypeKind::UInt32),
        ("uint64_t", TypeKind::UInt64),
        ("char", TypeKind::Int8),
        ("short", TypeKind::Int16),
        ("int", TypeKind::Int32),
        ("long", TypeKind::Int64),
        ("double", TypeKind::Double),
        ("string", TypeKind::String),
        ("void", TypeKind::Void),
    ];

    pub fn from_keyword(word: &str) -> Option<TypeKind> {
        Self::KEYWORDS
            .iter()
            .find(|(spelling, _)| *spelling == word)
            .map(|(_, kind)| *kind)
    }

    /// Canonical spelling used in messages
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Int8 => "int8_t",
            TypeKind::Int16 => "int16_t",
            TypeKind::Int32 => "int32_t",
            TypeKind::Int64 => "int64_t",
            TypeKind::UInt8 => "uint8_t",
            TypeKind::UInt16 => "uint16_t",
            TypeKind::UInt32 => "uint32_t",
            TypeKind::UInt64 => "uint64_t",
            TypeKind::Double => "double",
            TypeKind::String => "string",
            TypeKind::Void => "void",
        }
    }

    /// Bit width and signedness for integer kinds
    pub fn integer_format(self) -> Option<(u32, bool)> {
        match self {
            TypeKind::Int8 => Some((8, true)),
            TypeKind::Int16 => Some((16, true)),
            TypeKind::Int32 => Some((32, true)),
            TypeKind::Int64 => Some((64, true)),
            TypeKind::UInt8 => Some((8, false)),
            TypeKind::UInt16 => Some((16, false)),
            TypeKind::UInt32 => Some((32, false)),
            TypeKind::UInt64 => Some((64, false)),
            _ => None,
        }
    }

    /// Size in heap cells; `None` for kinds that have no fixed layout
    pub fn byte_width(self) -> Option<usize> {
        match self {
            TypeKind::Double => Some(8),
            TypeKind::String | TypeKind::Void => None,
            other => other.integer_format().map(|(bits, _)| bits as usize / 8),
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared type: a base kind, optionally behind one level of pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub kind: TypeKind,
    pub is_pointer: bool,
}

impl TypeDescriptor {
    pub fn new(kind: TypeKind) -> Self {
        TypeDescriptor {
            kind,
            is_pointer: false,
        }
    }

    pub fn pointer_to(kind: TypeKind) -> Self {
        TypeDescriptor {
            kind,
            is_pointer: true,
        }
    }

    /// The kind actually used to store a value of this type
    pub fn storage_kind(&self) -> TypeKind {
        if self.is_pointer {
            TypeKind::UInt8
        } else {
            self.kind
        }
    }

    /// The type obtained by dereferencing a pointer of this type
    pub fn pointee(&self) -> Option<TypeDescriptor> {
        self.is_pointer.then(|| TypeDescriptor::new(self.kind))
    }

    pub fn is_void(&self) -> bool {
        self.kind == TypeKind::Void && !self.is_pointer
    }

    pub fn byte_width(&self) -> Option<usize> {
        self.storage_kind().byte_width()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pointer {
            write!(f, "{}*", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// Literal kinds, used for operator dispatch and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Integer,
    Double,
    Char,
    String,
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LiteralKind::Integer => "integer",
            LiteralKind::Double => "double",
            LiteralKind::Char => "char",
            LiteralKind::String => "string",
        };
        f.write_str(name)
    }
}

/// A raw value produced by evaluation.
///
/// Integers are held in an `i128` so that every 64-bit signed and unsigned
/// value fits before coercion picks a width.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i128),
    Double(f64),
    Char(u8),
    Str(String),
}

impl Literal {
    pub fn kind(&self) -> LiteralKind {
        match self {
            Literal::Integer(_) => LiteralKind::Integer,
            Literal::Double(_) => LiteralKind::Double,
            Literal::Char(_) => LiteralKind::Char,
            Literal::Str(_) => LiteralKind::String,
        }
    }

    /// Integer view of int-like literals (characters yield their code)
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Literal::Integer(n) => Some(*n),
            Literal::Char(c) => Some(*c as i128),
            _ => None,
        }
    }

    /// Text shown after `->` in the command panel
    pub fn render(&self) -> String {
        match self {
            Literal::Integer(n) => n.to_string(),
            Literal::Double(d) => render_double(*d),
            Literal::Char(c) => format!("'{}'", escape_char(*c)),
            Literal::Str(s) => format!("{:?}", s),
        }
    }
}

/// Plain notation for everyday magnitudes, shortest exponent form otherwise
fn render_double(d: f64) -> String {
    let magnitude = d.abs();
    if d.is_finite() && d != 0.0 && !(1e-6..1e16).contains(&magnitude) {
        format!("{:e}", d)
    } else {
        d.to_string()
    }
}

fn escape_char(c: u8) -> String {
    match c {
        b'\n' => "\\n".to_string(),
        b'\t' => "\\t".to_string(),
        b'\r' => "\\r".to_string(),
        0 => "\\0".to_string(),
        b'\'' => "\\'".to_string(),
        b'\\' => "\\\\".to_string(),
        c if c.is_ascii_graphic() || c == b' ' => (c as char).to_string(),
        c => format!("\\x{:02x}", c),
    }
}

/// A literal bound to its declared type
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub ty: TypeDescriptor,
    pub value: Literal,
}

/// The result of evaluating any node
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Void,
    Untyped(Literal),
    Typed(TypedValue),
}

impl Value {
    pub fn literal(&self) -> Option<&Literal> {
        match self {
            Value::Void => None,
            Value::Untyped(lit) => Some(lit),
            Value::Typed(tv) => Some(&tv.value),
        }
    }

    pub fn into_literal(self) -> Option<Literal> {
        match self {
            Value::Void => None,
            Value::Untyped(lit) => Some(lit),
            Value::Typed(tv) => Some(tv.value),
        }
    }

    pub fn type_descriptor(&self) -> Option<TypeDescriptor> {
        match self {
            Value::Typed(tv) => Some(tv.ty),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }
}

/// A literal that cannot reach the requested type
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionError {
    pub from: LiteralKind,
    pub to: TypeDescriptor,
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot convert {} to {}", self.from, self.to)
    }
}

impl std::error::Error for CoercionError {}

/// Keep the low `bits` bits of `value`, reinterpreting them as signed when asked
pub fn wrap_integer(value: i128, bits: u32, signed: bool) -> i128 {
    let modulus = 1i128 << bits;
    let low = value.rem_euclid(modulus);
    if signed && low >= modulus >> 1 {
        low - modulus
    } else {
        low
    }
}

/// Convert a literal into a value of the target type
pub fn coerce(value: Literal, target: TypeDescriptor) -> Result<TypedValue, CoercionError> {
    let error = CoercionError {
        from: value.kind(),
        to: target,
    };
    let storage = target.storage_kind();

    let converted = if let Some((bits, signed)) = storage.integer_format() {
        let raw = match &value {
            Literal::Integer(n) => *n,
            Literal::Char(c) => *c as i128,
            Literal::Double(d) if !d.is_finite() => return Err(error),
            // fmod by a power of two is exact, so only the low bits survive
            Literal::Double(d) => (d.floor() % 2f64.powi(bits as i32)) as i128,
            Literal::Str(_) => return Err(error),
        };
        Literal::Integer(wrap_integer(raw, bits, signed))
    } else {
        match (storage, value) {
            (TypeKind::Double, Literal::Integer(n)) => Literal::Double(n as f64),
            (TypeKind::Double, Literal::Char(c)) => Literal::Double(c as f64),
            (TypeKind::Double, Literal::Double(d)) => Literal::Double(d),
            (TypeKind::String, Literal::Str(s)) => Literal::Str(s),
            (TypeKind::String, Literal::Char(c)) => Literal::Str((c as char).to_string()),
            _ => return Err(error),
        }
    };

    Ok(TypedValue {
        ty: target,
        value: converted,
    })
}

/// The value a fresh declaration of `ty` starts with
pub fn zero_value(ty: TypeDescriptor) -> Result<TypedValue, CoercionError> {
    if ty.storage_kind() == TypeKind::String {
        return Ok(TypedValue {
            ty,
            value: Literal::Str(String::new()),
        });
    }
    coerce(Literal::Integer(0), ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(kind: TypeKind) -> TypeDescriptor {
        TypeDescriptor::new(kind)
    }

    #[test]
    fn test_unsigned_masking() {
        let tv = coerce(Literal::Integer(300), int(TypeKind::UInt8)).unwrap();
        assert_eq!(tv.value, Literal::Integer(44));

        let tv = coerce(Literal::Integer(-1), int(TypeKind::UInt16)).unwrap();
        assert_eq!(tv.value, Literal::Integer(65535));
    }

    #[test]
    fn test_signed_wrapping() {
        let tv = coerce(Literal::Integer(200), int(TypeKind::Int8)).unwrap();
        assert_eq!(tv.value, Literal::Integer(-56));

        let tv = coerce(Literal::Integer(-5), int(TypeKind::Int64)).unwrap();
        assert_eq!(tv.value, Literal::Integer(-5));
    }

    #[test]
    fn test_sixty_four_bit_values_survive() {
        let big = u64::MAX as i128;
        let tv = coerce(Literal::Integer(big), int(TypeKind::UInt64)).unwrap();
        assert_eq!(tv.value, Literal::Integer(big));
    }

    #[test]
    fn test_double_is_floored() {
        let tv = coerce(Literal::Double(3.9), int(TypeKind::Int32)).unwrap();
        assert_eq!(tv.value, Literal::Integer(3));

        let tv = coerce(Literal::Double(-0.5), int(TypeKind::Int32)).unwrap();
        assert_eq!(tv.value, Literal::Integer(-1));

        let tv = coerce(Literal::Double(257.2), int(TypeKind::UInt8)).unwrap();
        assert_eq!(tv.value, Literal::Integer(1));
    }

    #[test]
    fn test_pointer_coerces_as_byte() {
        let target = TypeDescriptor::pointer_to(TypeKind::Int32);
        let tv = coerce(Literal::Integer(260), target).unwrap();
        assert_eq!(tv.value, Literal::Integer(4));
        assert_eq!(tv.ty, target);
    }

    #[test]
    fn test_double_target() {
        let tv = coerce(Literal::Integer(7), int(TypeKind::Double)).unwrap();
        assert_eq!(tv.value, Literal::Double(7.0));
        assert!(coerce(Literal::Str("x".into()), int(TypeKind::Double)).is_err());
    }

    #[test]
    fn test_string_target() {
        let tv = coerce(Literal::Str("hi".into()), int(TypeKind::String)).unwrap();
        assert_eq!(tv.value, Literal::Str("hi".into()));

        let err = coerce(Literal::Integer(1), int(TypeKind::String)).unwrap_err();
        assert_eq!(err.from, LiteralKind::Integer);
        assert_eq!(err.to, int(TypeKind::String));
    }

    #[test]
    fn test_double_to_integer_floors_then_wraps() {
        let tv = coerce(Literal::Double(-3.5), int(TypeKind::Int32)).unwrap();
        assert_eq!(tv.value, Literal::Integer(-4));

        let tv = coerce(Literal::Double(-1.5), int(TypeKind::UInt64)).unwrap();
        assert_eq!(tv.value, Literal::Integer(u64::MAX as i128 - 1));

        let tv = coerce(Literal::Double(1e300), int(TypeKind::Int64)).unwrap();
        assert_eq!(tv.value, Literal::Integer(0));

        let tv = coerce(Literal::Double(-1e300), int(TypeKind::UInt64)).unwrap();
        assert_eq!(tv.value, Literal::Integer(0));

        // above 2^64 only the low bits survive
        let tv = coerce(Literal::Double(2f64.powi(64) + 4096.0), int(TypeKind::UInt64)).unwrap();
        assert_eq!(tv.value, Literal::Integer(4096));

        let tv = coerce(Literal::Double(-(2f64.powi(64)) - 32768.0), int(TypeKind::Int16)).unwrap();
        assert_eq!(tv.value, Literal::Integer(-32768));
    }

    #[test]
    fn test_non_finite_double_to_integer_fails() {
        for d in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = coerce(Literal::Double(d), int(TypeKind::Int32)).unwrap_err();
            assert_eq!(err.from, LiteralKind::Double);
        }
        assert!(coerce(Literal::Double(f64::NAN), TypeDescriptor::pointer_to(TypeKind::Int8)).is_err());
    }

    #[test]
    fn test_string_to_integer_fails() {
        let err = coerce(Literal::Str("12".into()), int(TypeKind::Int32)).unwrap_err();
        assert_eq!(err.to_string(), "Cannot convert string to int32_t");
    }

    #[test]
    fn test_void_target_fails() {
        assert!(coerce(Literal::Integer(0), int(TypeKind::Void)).is_err());
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(
            zero_value(int(TypeKind::String)).unwrap().value,
            Literal::Str(String::new())
        );
        assert_eq!(
            zero_value(int(TypeKind::Double)).unwrap().value,
            Literal::Double(0.0)
        );
        assert_eq!(
            zero_value(TypeDescriptor::pointer_to(TypeKind::Void))
                .unwrap()
                .value,
            Literal::Integer(0)
        );
    }

    #[test]
    fn test_extreme_doubles_render_compactly() {
        assert_eq!(Literal::Double(1e300).render(), "1e300");
        assert_eq!(Literal::Double(-2.5e-8).render(), "-2.5e-8");
        let subnormal = Literal::Double(f64::from_bits(1)).render();
        assert_eq!(subnormal, "5e-324");
    }

    #[test]
    fn test_keywords() {
        assert_eq!(TypeKind::from_keyword("uint16_t"), Some(TypeKind::UInt16));
        assert_eq!(TypeKind::from_keyword("char"), Some(TypeKind::Int8));
        assert_eq!(TypeKind::from_keyword("float"), None);
    }

    #[test]
    fn test_render() {
        assert_eq!(Literal::Str("a\"b".into()).render(), "\"a\\\"b\"");
        assert_eq!(Literal::Char(b'a').render(), "'a'");
        assert_eq!(Literal::Double(3.5).render(), "3.5");
        assert_eq!(Literal::Double(f64::INFINITY).render(), "inf");
        assert_eq!(Literal::Double(0.000125).render(), "0.000125");
        assert_eq!(Literal::Integer(-2).render(), "-2");
    }
}
