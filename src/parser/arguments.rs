//! Conversions from raw command tokens to typed values.

use num_bigint::BigInt;

use crate::bigint;
use crate::debugger::DebugError;
use crate::vm::{StackItem, MAX_INTEGER_SIZE};

pub fn required<'a>(arg: Option<&'a str>, name: &'static str) -> Result<&'a str, DebugError> {
    arg.ok_or(DebugError::MissingParameter(name))
}

/// A non-negative instruction offset, decimal digits only.
pub fn parse_offset(token: &str) -> Result<usize, DebugError> {
    digits(token).ok_or_else(|| {
        DebugError::InvalidParameter(format!("{token:?} is not an instruction offset"))
    })
}

/// A positive repeat count; absent means one.
pub fn parse_count(token: Option<&str>) -> Result<usize, DebugError> {
    let Some(token) = token else {
        return Ok(1);
    };
    digits(token)
        .filter(|n| *n > 0)
        .ok_or_else(|| DebugError::InvalidParameter(format!("{token:?} is not a positive count")))
}

/// `str::parse` alone would also take a leading `+`.
fn digits(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// A `run` parameter: `int:<n>`, `bool:<b>`, `string:<s>` or untyped.
///
/// Untyped tokens become integers or booleans when they read as one and
/// byte strings otherwise.
pub fn parse_param(token: &str) -> Result<StackItem, DebugError> {
    let invalid = || DebugError::InvalidParameter(format!("{token:?}"));

    match token.split_once(':') {
        Some(("int", value)) => parse_integer(value).ok_or_else(invalid),
        Some(("bool", value)) => parse_bool(value).ok_or_else(invalid),
        Some(("string", value)) => Ok(StackItem::from(value)),
        _ => Ok(parse_integer(token)
            .or_else(|| parse_bool(token))
            .unwrap_or_else(|| StackItem::from(token))),
    }
}

fn parse_integer(value: &str) -> Option<StackItem> {
    let n = value.parse::<BigInt>().ok()?;
    (bigint::encoded_len(&n) <= MAX_INTEGER_SIZE).then_some(StackItem::Integer(n))
}

fn parse_bool(value: &str) -> Option<StackItem> {
    match value {
        "true" => Some(StackItem::Boolean(true)),
        "false" => Some(StackItem::Boolean(false)),
        _ => None,
    }
}
