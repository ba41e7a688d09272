//! Fixed-width numeric encoding for heap cells
//!
//! Multi-byte values are laid out little endian across consecutive cells.

use super::value::{Literal, LiteralKind, TypeDescriptor, TypeKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericFormat {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl NumericFormat {
    pub fn width(self) -> usize {
        match self {
            NumericFormat::I8 | NumericFormat::U8 => 1,
            NumericFormat::I16 | NumericFormat::U16 => 2,
            NumericFormat::I32 | NumericFormat::U32 | NumericFormat::F32 => 4,
            NumericFormat::I64 | NumericFormat::U64 | NumericFormat::F64 => 8,
        }
    }

    fn is_signed(self) -> bool {
        matches!(
            self,
            NumericFormat::I8 | NumericFormat::I16 | NumericFormat::I32 | NumericFormat::I64
        )
    }

    fn is_float(self) -> bool {
        matches!(self, NumericFormat::F32 | NumericFormat::F64)
    }

    /// Storage format of a value type; strings and void have none
    pub fn for_type(ty: TypeDescriptor) -> Option<NumericFormat> {
        let format = match ty.storage_kind() {
            TypeKind::Int8 => NumericFormat::I8,
            TypeKind::Int16 => NumericFormat::I16,
            TypeKind::Int32 => NumericFormat::I32,
            TypeKind::Int64 => NumericFormat::I64,
            TypeKind::UInt8 => NumericFormat::U8,
            TypeKind::UInt16 => NumericFormat::U16,
            TypeKind::UInt32 => NumericFormat::U32,
            TypeKind::UInt64 => NumericFormat::U64,
            TypeKind::Double => NumericFormat::F64,
            TypeKind::String | TypeKind::Void => return None,
        };
        Some(format)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    WrongLength { expected: usize, got: usize },
    NotNumeric(LiteralKind),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::WrongLength { expected, got } => {
                write!(f, "Expected {} bytes, got {}", expected, got)
            }
            CodecError::NotNumeric(kind) => write!(f, "Cannot encode a {} as bytes", kind),
        }
    }
}

impl std::error::Error for CodecError {}

pub fn encode(format: NumericFormat, value: &Literal) -> Result<Vec<u8>, CodecError> {
    if format.is_float() {
        let float = match value {
            Literal::Double(d) => *d,
            Literal::Integer(n) => *n as f64,
            Literal::Char(c) => *c as f64,
            Literal::Str(_) => return Err(CodecError::NotNumeric(value.kind())),
        };
        return Ok(match format {
            NumericFormat::F32 => (float as f32).to_le_bytes().to_vec(),
            _ => float.to_le_bytes().to_vec(),
        });
    }

    let integer = match value {
        Literal::Integer(n) => *n,
        Literal::Char(c) => *c as i128,
        Literal::Double(d) => d.floor() as i128,
        Literal::Str(_) => return Err(CodecError::NotNumeric(value.kind())),
    };
    // Two's complement keeps the low bytes correct for both signednesses
    Ok(integer.to_le_bytes()[..format.width()].to_vec())
}

pub fn decode(format: NumericFormat, bytes: &[u8]) -> Result<Literal, CodecError> {
    let width = format.width();
    if bytes.len() != width {
        return Err(CodecError::WrongLength {
            expected: width,
            got: bytes.len(),
        });
    }

    match format {
        NumericFormat::F32 => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(bytes);
            Ok(Literal::Double(f32::from_le_bytes(raw) as f64))
        }
        NumericFormat::F64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            Ok(Literal::Double(f64::from_le_bytes(raw)))
        }
        _ => {
            let negative = format.is_signed() && bytes[width - 1] & 0x80 != 0;
            let mut raw = if negative { [0xffu8; 16] } else { [0u8; 16] };
            raw[..width].copy_from_slice(bytes);
            Ok(Literal::Integer(i128::from_le_bytes(raw)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_layout() {
        let bytes = encode(NumericFormat::U32, &Literal::Integer(0x0102_0304)).unwrap();
        assert_eq!(bytes, vec![0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_signed_decode_sign_extends() {
        let bytes = encode(NumericFormat::I16, &Literal::Integer(-2)).unwrap();
        assert_eq!(bytes, vec![0xfe, 0xff]);
        assert_eq!(
            decode(NumericFormat::I16, &bytes).unwrap(),
            Literal::Integer(-2)
        );
        assert_eq!(
            decode(NumericFormat::U16, &bytes).unwrap(),
            Literal::Integer(65534)
        );
    }

    #[test]
    fn test_unsigned_64_extremes() {
        let bytes = encode(NumericFormat::U64, &Literal::Integer(u64::MAX as i128)).unwrap();
        assert_eq!(bytes, vec![0xff; 8]);
        assert_eq!(
            decode(NumericFormat::U64, &bytes).unwrap(),
            Literal::Integer(u64::MAX as i128)
        );
        assert_eq!(
            decode(NumericFormat::I64, &bytes).unwrap(),
            Literal::Integer(-1)
        );
    }

    #[test]
    fn test_floats() {
        let bytes = encode(NumericFormat::F64, &Literal::Double(3.5)).unwrap();
        assert_eq!(
            decode(NumericFormat::F64, &bytes).unwrap(),
            Literal::Double(3.5)
        );

        let bytes = encode(NumericFormat::F32, &Literal::Double(0.25)).unwrap();
        assert_eq!(bytes.len(), 4);
        assert_eq!(
            decode(NumericFormat::F32, &bytes).unwrap(),
            Literal::Double(0.25)
        );
    }

    #[test]
    fn test_truncates_to_width() {
        let bytes = encode(NumericFormat::U8, &Literal::Integer(300)).unwrap();
        assert_eq!(bytes, vec![44]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            decode(NumericFormat::I32, &[1, 2]),
            Err(CodecError::WrongLength {
                expected: 4,
                got: 2
            })
        );
        assert_eq!(
            encode(NumericFormat::I8, &Literal::Str("x".into())),
            Err(CodecError::NotNumeric(LiteralKind::String))
        );
    }

    #[test]
    fn test_format_for_type() {
        assert_eq!(
            NumericFormat::for_type(TypeDescriptor::pointer_to(TypeKind::Double)),
            Some(NumericFormat::U8)
        );
        assert_eq!(
            NumericFormat::for_type(TypeDescriptor::new(TypeKind::Double)),
            Some(NumericFormat::F64)
        );
        assert_eq!(
            NumericFormat::for_type(TypeDescriptor::new(TypeKind::String)),
            None
        );
    }
}
