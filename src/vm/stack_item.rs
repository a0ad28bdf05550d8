use num_bigint::BigInt;
use num_traits::{One, Zero};
use serde::{Serialize, Serializer};

use super::errors::VmError;
use crate::bigint;

/// Integers wider than this fault when produced or converted.
pub const MAX_INTEGER_SIZE: usize = 32;

/// A value on the evaluation stack.
///
/// Serializes to JSON as `{"type": ..., "value": ...}`; integers are written
/// as decimal strings so values beyond 64 bits survive the trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum StackItem {
    Null,
    Boolean(bool),
    Integer(#[serde(serialize_with = "decimal")] BigInt),
    ByteString(#[serde(serialize_with = "lower_hex")] Vec<u8>),
    Pointer(usize),
}

fn decimal<S: Serializer>(n: &BigInt, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(n)
}

fn lower_hex<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes))
}

impl StackItem {
    pub fn type_name(&self) -> &'static str {
        match self {
            StackItem::Null => "Null",
            StackItem::Boolean(_) => "Boolean",
            StackItem::Integer(_) => "Integer",
            StackItem::ByteString(_) => "ByteString",
            StackItem::Pointer(_) => "Pointer",
        }
    }

    pub fn to_integer(&self) -> Result<BigInt, VmError> {
        match self {
            StackItem::Integer(n) => Ok(n.clone()),
            StackItem::Boolean(b) => Ok(if *b { BigInt::one() } else { BigInt::zero() }),
            StackItem::ByteString(bytes) if bytes.len() <= MAX_INTEGER_SIZE => {
                Ok(bigint::from_bytes(bytes))
            }
            StackItem::ByteString(bytes) => {
                Err(VmError::ItemTooLarge(bytes.len(), MAX_INTEGER_SIZE))
            }
            other => Err(VmError::InvalidConversion(other.type_name(), "Integer")),
        }
    }

    pub fn to_bool(&self) -> Result<bool, VmError> {
        match self {
            StackItem::Null => Ok(false),
            StackItem::Boolean(b) => Ok(*b),
            StackItem::Integer(n) => Ok(!n.is_zero()),
            StackItem::ByteString(bytes) if bytes.len() <= MAX_INTEGER_SIZE => {
                Ok(bytes.iter().any(|b| *b != 0))
            }
            StackItem::ByteString(bytes) => {
                Err(VmError::ItemTooLarge(bytes.len(), MAX_INTEGER_SIZE))
            }
            StackItem::Pointer(_) => Ok(true),
        }
    }

    /// Byte view used by the splice instructions.
    pub fn to_bytes(&self) -> Result<Vec<u8>, VmError> {
        match self {
            StackItem::ByteString(bytes) => Ok(bytes.clone()),
            StackItem::Integer(n) => Ok(bigint::to_bytes(n)),
            StackItem::Boolean(b) => Ok(vec![u8::from(*b)]),
            other => Err(VmError::InvalidConversion(other.type_name(), "ByteString")),
        }
    }
}

impl From<BigInt> for StackItem {
    fn from(n: BigInt) -> Self {
        StackItem::Integer(n)
    }
}

impl From<i64> for StackItem {
    fn from(n: i64) -> Self {
        StackItem::Integer(BigInt::from(n))
    }
}

impl From<bool> for StackItem {
    fn from(b: bool) -> Self {
        StackItem::Boolean(b)
    }
}

impl From<Vec<u8>> for StackItem {
    fn from(bytes: Vec<u8>) -> Self {
        StackItem::ByteString(bytes)
    }
}

impl From<&str> for StackItem {
    fn from(s: &str) -> Self {
        StackItem::ByteString(s.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape() {
        let items = vec![
            StackItem::from(7i64),
            StackItem::from(true),
            StackItem::from("hi"),
            StackItem::Null,
        ];
        let json = serde_json::to_string(&items).unwrap();
        assert_eq!(
            json,
            r#"[{"type":"Integer","value":"7"},{"type":"Boolean","value":true},{"type":"ByteString","value":"6869"},{"type":"Null"}]"#
        );
    }

    #[test]
    fn byte_strings_convert_through_the_codec() {
        let item = StackItem::ByteString(vec![0x80]);
        assert_eq!(item.to_integer().unwrap(), BigInt::from(-128));
        assert!(StackItem::ByteString(vec![0, 0]).to_bool().is_ok_and(|b| !b));
    }
}
