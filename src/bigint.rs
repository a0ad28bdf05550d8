//! Canonical integer encoding.
//!
//! Every integer the VM exchanges with the outside world (stack
//! serialization, script operands, the `parse` views) uses one byte form:
//! little-endian two's complement of minimal length. Other implementations
//! of the VM produce the same bytes, so this module must never pick a
//! "shorter" or "wider" alternative.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};

/// Encodes `n` as the shortest little-endian two's-complement byte string.
///
/// Zero encodes as a single `0x00` byte.
pub fn to_bytes(n: &BigInt) -> Vec<u8> {
    if n.is_zero() {
        return vec![0];
    }

    let mut bytes = n.magnitude().to_bytes_le();

    match n.sign() {
        Sign::Minus => {
            negate_in_place(&mut bytes);
            if last_is_positive(&bytes) {
                bytes.push(0xFF);
            }
        }
        _ => {
            if !last_is_positive(&bytes) {
                bytes.push(0x00);
            }
        }
    }

    bytes
}

/// Decodes little-endian two's-complement bytes.
///
/// Accepts any input: the empty slice is zero, and redundant sign
/// extension (`00` after a positive value, `FF` after a negative one)
/// yields the same value as the canonical form.
pub fn from_bytes(bytes: &[u8]) -> BigInt {
    let Some(&last) = bytes.last() else {
        return BigInt::zero();
    };

    let unsigned = BigInt::from(BigUint::from_bytes_le(bytes));
    if last & 0x80 == 0 {
        unsigned
    } else {
        unsigned - (BigInt::one() << (bytes.len() * 8))
    }
}

/// Encoded length of `n` in bytes.
pub fn encoded_len(n: &BigInt) -> usize {
    if n.is_zero() {
        return 1;
    }
    // A value needs bits() magnitude bits plus one sign bit, except for
    // negative powers of two which fit exactly.
    let bits = n.bits() as usize;
    let needs_sign_bit = match n.sign() {
        Sign::Minus => !is_power_of_two(n.magnitude()),
        _ => true,
    };
    (bits + usize::from(needs_sign_bit) + 7) / 8
}

fn is_power_of_two(m: &BigUint) -> bool {
    m.count_ones() == 1
}

fn last_is_positive(bytes: &[u8]) -> bool {
    bytes.last().map_or(true, |b| b & 0x80 == 0)
}

/// Two's complement of a little-endian magnitude, same width.
fn negate_in_place(bytes: &mut [u8]) {
    let mut carry = true;
    for b in bytes.iter_mut() {
        *b = !*b;
        if carry {
            let (sum, overflow) = b.overflowing_add(1);
            *b = sum;
            carry = overflow;
        }
    }
    // The complement of a non-zero magnitude always has a clear bit, so the
    // increment cannot run off the end.
    debug_assert!(!carry);
}
