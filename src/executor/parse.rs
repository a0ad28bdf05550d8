//! The `parse` command: every reading of one token as integer, hex,
//! address, base64 and plain string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use num_bigint::BigInt;

use super::address::{self, SCRIPT_HASH_LEN};
use crate::bigint;

pub type View = (&'static str, String);

pub fn parse_views(token: &str) -> Vec<View> {
    let mut views = Vec::new();

    if is_decimal(token) {
        if let Ok(n) = token.parse::<BigInt>() {
            let bytes = bigint::to_bytes(&n);
            views.push(("Integer to Hex", hex::encode(&bytes)));
            views.push(("Integer to Base64", STANDARD.encode(&bytes)));
        }
    }

    let hex_token = token.strip_prefix("0x").unwrap_or(token);
    if let Ok(bytes) = hex::decode(hex_token) {
        if let Ok(hash) = <[u8; SCRIPT_HASH_LEN]>::try_from(bytes.as_slice()) {
            let mut reversed = hash;
            reversed.reverse();
            views.push(("BE ScriptHash to Address", address::from_script_hash(&hash)));
            views.push(("LE ScriptHash to Address", address::from_script_hash(&reversed)));
        }
        views.push(("Hex to String", quote(&bytes)));
        views.push(("Hex to Integer", bigint::from_bytes(&bytes).to_string()));
        views.push(("Swap Endianness", hex::encode(reversed(&bytes))));
    }

    if let Some(hash) = address::to_script_hash(token) {
        let le = reversed(&hash);
        views.push(("Address to BE ScriptHash", hex::encode(hash)));
        views.push(("Address to LE ScriptHash", hex::encode(&le)));
        views.push(("Address to Base64 (BE)", STANDARD.encode(hash)));
        views.push(("Address to Base64 (LE)", STANDARD.encode(&le)));
    }

    if let Ok(bytes) = STANDARD.decode(token) {
        views.push(("Base64 to String", quote(&bytes)));
        views.push(("Base64 to BigInteger", bigint::from_bytes(&bytes).to_string()));
    }

    views.push(("String to Hex", hex::encode(token)));
    views.push(("String to Base64", STANDARD.encode(token)));
    views
}

fn is_decimal(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn reversed(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Double-quoted rendering: printable text as is, everything else escaped,
/// bytes that are not UTF-8 as `\xNN`.
pub fn quote(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() && (c as u32) < 0x80 => {
                    out.push_str(&format!("\\x{:02x}", c as u32))
                }
                c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        for b in chunk.invalid() {
            out.push_str(&format!("\\x{b:02x}"));
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(views: &[View]) -> Vec<&'static str> {
        views.iter().map(|(label, _)| *label).collect()
    }

    #[test]
    fn plain_words_only_have_string_views() {
        let views = parse_views("hello!");
        assert_eq!(labels(&views), vec!["String to Hex", "String to Base64"]);
        assert_eq!(views[0].1, "68656c6c6f21");
    }

    #[test]
    fn hex_prefix_is_accepted() {
        let views = parse_views("0x0102");
        assert!(views.contains(&("Hex to Integer", "513".to_string())));
        assert!(views.contains(&("Swap Endianness", "0201".to_string())));
    }

    #[test]
    fn quoting_escapes_non_text() {
        assert_eq!(quote(b"fg"), "\"fg\"");
        assert_eq!(quote(&[0x00, b'A', 0xFF]), "\"\\x00A\\xff\"");
        assert_eq!(quote("뮻".as_bytes()), "\"뮻\"");
    }
}
