//! Syscall identifiers.
//!
//! A SYSCALL operand is the first four bytes (little-endian) of the SHA-256
//! of the interop's name. The table below resolves ids back to names for
//! disassembly; only a handful of interops are executable here.

use std::collections::HashMap;
use std::sync::OnceLock;

use sha2::{Digest, Sha256};

const NAMES: &[&str] = &[
    "System.Binary.Base64Decode",
    "System.Binary.Base64Encode",
    "System.Binary.Deserialize",
    "System.Binary.Serialize",
    "System.Contract.Call",
    "System.Contract.CallNative",
    "System.Contract.GetCallFlags",
    "System.Crypto.CheckMultisig",
    "System.Crypto.CheckSig",
    "System.Iterator.Next",
    "System.Iterator.Value",
    "System.Runtime.BurnGas",
    "System.Runtime.CheckWitness",
    "System.Runtime.GasLeft",
    "System.Runtime.GetCallingScriptHash",
    "System.Runtime.GetEntryScriptHash",
    "System.Runtime.GetExecutingScriptHash",
    "System.Runtime.GetInvocationCounter",
    "System.Runtime.GetNetwork",
    "System.Runtime.GetNotifications",
    "System.Runtime.GetScriptContainer",
    "System.Runtime.GetTime",
    "System.Runtime.GetTrigger",
    "System.Runtime.Log",
    "System.Runtime.Notify",
    "System.Runtime.Platform",
    "System.Storage.AsReadOnly",
    "System.Storage.Delete",
    "System.Storage.Find",
    "System.Storage.Get",
    "System.Storage.GetContext",
    "System.Storage.GetReadOnlyContext",
    "System.Storage.Put",
];

/// Interops the engine can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interop {
    BinarySerialize,
    BinaryDeserialize,
    RuntimeLog,
    RuntimePlatform,
}

impl Interop {
    pub fn resolve(id: u32) -> Option<Self> {
        match name_of(id)? {
            "System.Binary.Serialize" => Some(Interop::BinarySerialize),
            "System.Binary.Deserialize" => Some(Interop::BinaryDeserialize),
            "System.Runtime.Log" => Some(Interop::RuntimeLog),
            "System.Runtime.Platform" => Some(Interop::RuntimePlatform),
            _ => None,
        }
    }
}

pub fn interop_id(name: &str) -> u32 {
    let digest = Sha256::digest(name.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

pub fn name_of(id: u32) -> Option<&'static str> {
    static TABLE: OnceLock<HashMap<u32, &'static str>> = OnceLock::new();
    TABLE
        .get_or_init(|| NAMES.iter().map(|name| (interop_id(name), *name)).collect())
        .get(&id)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_known_values() {
        assert_eq!(interop_id("System.Binary.Serialize"), 0x24011c3f);
        assert_eq!(interop_id("System.Runtime.Log"), 0x9647e7cf);
        assert_eq!(name_of(0x9647e7cf), Some("System.Runtime.Log"));
        assert_eq!(Interop::resolve(0x24011c3f), Some(Interop::BinarySerialize));
        assert_eq!(name_of(0), None);
    }
}
