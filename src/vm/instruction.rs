use super::errors::LoadError;
use super::opcode::{Opcode, Operand};

/// One decoded instruction, borrowing its operand from the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub offset: usize,
    pub opcode: Opcode,
    /// Operand bytes with any length prefix already stripped.
    pub operand: &'a [u8],
    /// Total encoded size including opcode and prefix.
    pub size: usize,
}

impl<'a> Instruction<'a> {
    pub fn decode(script: &'a [u8], offset: usize) -> Result<Self, LoadError> {
        let byte = *script.get(offset).ok_or(LoadError::Truncated {
            offset,
            mnemonic: "RET",
        })?;
        let opcode =
            Opcode::try_from(byte).map_err(|byte| LoadError::InvalidOpcode { offset, byte })?;
        let truncated = || LoadError::Truncated {
            offset,
            mnemonic: opcode.mnemonic(),
        };

        let start = offset + 1;
        let (operand_start, operand_len) = match opcode.operand() {
            Operand::None => (start, 0),
            Operand::Fixed(n) => (start, n),
            Operand::Prefixed(width) => {
                let prefix = script.get(start..start + width).ok_or_else(truncated)?;
                let mut len = [0u8; 8];
                len[..width].copy_from_slice(prefix);
                let len = usize::try_from(u64::from_le_bytes(len)).map_err(|_| truncated())?;
                (start + width, len)
            }
        };

        let end = operand_start.checked_add(operand_len).ok_or_else(truncated)?;
        let operand = script.get(operand_start..end).ok_or_else(truncated)?;

        Ok(Self {
            offset,
            opcode,
            operand,
            size: end - offset,
        })
    }

    pub fn next_offset(&self) -> usize {
        self.offset + self.size
    }

    /// Signed operand of 1, 2, 4 or 8 bytes, used by jumps and calls.
    pub fn operand_i64(&self) -> i64 {
        let n = self.operand.len().min(8);
        if n == 0 {
            return 0;
        }
        let mut buf = [0u8; 8];
        buf[..n].copy_from_slice(&self.operand[..n]);
        let shift = 64 - 8 * n as u32;
        (i64::from_le_bytes(buf) << shift) >> shift
    }

    pub fn operand_u32(&self) -> u32 {
        let mut buf = [0u8; 4];
        let n = self.operand.len().min(4);
        buf[..n].copy_from_slice(&self.operand[..n]);
        u32::from_le_bytes(buf)
    }
}

/// Iterates the instructions of a script in program order.
pub struct Instructions<'a> {
    script: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.script.len() {
            return None;
        }
        let decoded = Instruction::decode(self.script, self.offset);
        match &decoded {
            Ok(instr) => self.offset = instr.next_offset(),
            Err(_) => self.offset = self.script.len(),
        }
        Some(decoded)
    }
}

pub fn instructions(script: &[u8]) -> Instructions<'_> {
    Instructions { script, offset: 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushdata_operand_excludes_prefix() {
        let script = [Opcode::PUSHDATA1 as u8, 3, 1, 2, 3, Opcode::RET as u8];
        let instr = Instruction::decode(&script, 0).unwrap();
        assert_eq!(instr.operand, &[1, 2, 3]);
        assert_eq!(instr.size, 5);
        assert_eq!(instr.next_offset(), 5);
    }

    #[test]
    fn negative_jump_offsets_sign_extend() {
        let script = [Opcode::JMP as u8, 0xFE];
        let instr = Instruction::decode(&script, 0).unwrap();
        assert_eq!(instr.operand_i64(), -2);
    }

    #[test]
    fn truncated_operand_is_reported() {
        let script = [Opcode::PUSHINT32 as u8, 1, 2];
        assert_eq!(
            Instruction::decode(&script, 0),
            Err(LoadError::Truncated {
                offset: 0,
                mnemonic: "PUSHINT32"
            })
        );
    }
}
