use std::fmt;

use crate::error::{Error, Result};
use crate::relation::schema::ColumnType;

/// A single column value. One variant per [`ColumnType`] family.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Text(String),
}

impl Value {
    /// Converts literal text (from `INSERT`/`SET`/CSV) into a typed value,
    /// per §3's per-column encode rules.
    pub fn parse_literal(text: &str, col_type: ColumnType) -> Result<Self> {
        match col_type {
            ColumnType::Int => text
                .trim()
                .parse::<i32>()
                .map(Value::Int)
                .map_err(|_| Error::TypeMismatch {
                    value: text.to_string(),
                    expected: "INT".to_string(),
                }),
            ColumnType::Float => text
                .trim()
                .parse::<f32>()
                .map(Value::Float)
                .map_err(|_| Error::TypeMismatch {
                    value: text.to_string(),
                    expected: "FLOAT".to_string(),
                }),
            ColumnType::Char(_) => Ok(Value::Text(text.to_string())),
        }
    }

    /// Writes this value's bytes at `buf[offset..]` per `col_type`'s width.
    /// Panics on a type/column mismatch — callers type-check against the
    /// schema before this point, so a mismatch here is a caller bug.
    pub fn encode_into(&self, buf: &mut [u8], offset: usize, col_type: ColumnType) {
        match (self, col_type) {
            (Value::Int(v), ColumnType::Int) => {
                buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
            }
            (Value::Float(v), ColumnType::Float) => {
                buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
            }
            (Value::Text(s), ColumnType::Char(n)) => {
                let bytes = s.as_bytes();
                let take = bytes.len().min(n);
                buf[offset..offset + take].copy_from_slice(&bytes[..take]);
                for b in &mut buf[offset + take..offset + n] {
                    *b = 0;
                }
            }
            _ => unreachable!("value/column type mismatch should be caught before encode"),
        }
    }

    pub fn decode_from(buf: &[u8], offset: usize, col_type: ColumnType) -> Self {
        match col_type {
            ColumnType::Int => {
                let raw: [u8; 4] = buf[offset..offset + 4].try_into().unwrap();
                Value::Int(i32::from_le_bytes(raw))
            }
            ColumnType::Float => {
                let raw: [u8; 4] = buf[offset..offset + 4].try_into().unwrap();
                Value::Float(f32::from_le_bytes(raw))
            }
            ColumnType::Char(n) => {
                let raw = &buf[offset..offset + n];
                let end = raw.iter().rposition(|&b| b != 0).map(|i| i + 1).unwrap_or(0);
                Value::Text(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
        }
    }

    /// Numeric view used by condition evaluation's coercion rule; `None`
    /// when this value has no sensible numeric reading.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_roundtrips_through_bytes() {
        let mut buf = vec![0u8; 4];
        Value::Int(-7).encode_into(&mut buf, 0, ColumnType::Int);
        assert_eq!(Value::decode_from(&buf, 0, ColumnType::Int), Value::Int(-7));
    }

    #[test]
    fn char_strips_trailing_zero_padding() {
        let mut buf = vec![0u8; 8];
        Value::Text("hi".to_string()).encode_into(&mut buf, 0, ColumnType::Char(8));
        assert_eq!(&buf, b"hi\0\0\0\0\0\0");
        assert_eq!(
            Value::decode_from(&buf, 0, ColumnType::Char(8)),
            Value::Text("hi".to_string())
        );
    }

    #[test]
    fn char_truncates_overlong_text() {
        let mut buf = vec![0u8; 3];
        Value::Text("abcdef".to_string()).encode_into(&mut buf, 0, ColumnType::Char(3));
        assert_eq!(&buf, b"abc");
    }

    #[test]
    fn bad_int_literal_is_type_mismatch() {
        let err = Value::parse_literal("not-a-number", ColumnType::Int).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }
}
