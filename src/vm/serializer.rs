//! Binary wire form of stack items.
//!
//! Layout: one type byte, then a payload. Integers and byte strings carry a
//! var-int length prefix; integer payloads are the canonical encoding from
//! [`crate::bigint`].

use super::errors::VmError;
use super::stack_item::{StackItem, MAX_INTEGER_SIZE};
use crate::bigint;

const TYPE_NULL: u8 = 0x00;
const TYPE_BOOLEAN: u8 = 0x20;
const TYPE_INTEGER: u8 = 0x21;
const TYPE_BYTE_STRING: u8 = 0x28;

/// Largest serialized item accepted in either direction.
pub const MAX_ITEM_SIZE: usize = 1024 * 1024;

pub fn serialize(item: &StackItem) -> Result<Vec<u8>, VmError> {
    let mut out = Vec::new();
    match item {
        StackItem::Null => out.push(TYPE_NULL),
        StackItem::Boolean(b) => {
            out.push(TYPE_BOOLEAN);
            out.push(u8::from(*b));
        }
        StackItem::Integer(n) => {
            out.push(TYPE_INTEGER);
            write_var_bytes(&mut out, &bigint::to_bytes(n));
        }
        StackItem::ByteString(bytes) => {
            out.push(TYPE_BYTE_STRING);
            write_var_bytes(&mut out, bytes);
        }
        StackItem::Pointer(_) => {
            return Err(VmError::Serialization("Pointer is not serializable".into()))
        }
    }
    if out.len() > MAX_ITEM_SIZE {
        return Err(VmError::ItemTooLarge(out.len(), MAX_ITEM_SIZE));
    }
    Ok(out)
}

pub fn deserialize(data: &[u8]) -> Result<StackItem, VmError> {
    let mut reader = Reader { data, pos: 0 };
    let item = match reader.byte()? {
        TYPE_NULL => StackItem::Null,
        TYPE_BOOLEAN => StackItem::Boolean(reader.byte()? != 0),
        TYPE_INTEGER => {
            let bytes = reader.var_bytes()?;
            if bytes.len() > MAX_INTEGER_SIZE {
                return Err(VmError::ItemTooLarge(bytes.len(), MAX_INTEGER_SIZE));
            }
            StackItem::Integer(bigint::from_bytes(bytes))
        }
        TYPE_BYTE_STRING => StackItem::ByteString(reader.var_bytes()?.to_vec()),
        other => {
            return Err(VmError::Serialization(format!(
                "unsupported item type 0x{other:02x}"
            )))
        }
    };
    if reader.pos != data.len() {
        return Err(VmError::Serialization("trailing bytes".into()));
    }
    Ok(item)
}

fn write_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    let len = bytes.len() as u64;
    match len {
        0..=0xFC => out.push(len as u8),
        0xFD..=0xFFFF => {
            out.push(0xFD);
            out.extend_from_slice(&(len as u16).to_le_bytes());
        }
        0x1_0000..=0xFFFF_FFFF => {
            out.push(0xFE);
            out.extend_from_slice(&(len as u32).to_le_bytes());
        }
        _ => {
            out.push(0xFF);
            out.extend_from_slice(&len.to_le_bytes());
        }
    }
    out.extend_from_slice(bytes);
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], VmError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| VmError::Serialization("unexpected end of data".into()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, VmError> {
        Ok(self.take(1)?[0])
    }

    fn var_int(&mut self) -> Result<u64, VmError> {
        let width = match self.byte()? {
            0xFD => 2,
            0xFE => 4,
            0xFF => 8,
            small => return Ok(u64::from(small)),
        };
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(self.take(width)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn var_bytes(&mut self) -> Result<&'a [u8], VmError> {
        let len = self.var_int()?;
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= MAX_ITEM_SIZE)
            .ok_or(VmError::ItemTooLarge(MAX_ITEM_SIZE + 1, MAX_ITEM_SIZE))?;
        self.take(len)
    }
}
