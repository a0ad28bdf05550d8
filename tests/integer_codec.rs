use num_bigint::BigInt;
use num_traits::One;

use neovm_debugger::bigint::{encoded_len, from_bytes, to_bytes};

// Known encodings produced by the reference node implementation
const CASES: &[(i64, &[u8])] = &[
    (0, &[0]),
    (1, &[1]),
    (-1, &[255]),
    (127, &[127]),
    (-127, &[129]),
    (128, &[128, 0]),
    (-128, &[128]),
    (-129, &[127, 255]),
    (255, &[255, 0]),
    (-255, &[1, 255]),
    (256, &[0, 1]),
    (-256, &[0, 255]),
    (123456789, &[21, 205, 91, 7]),
    (-123456789, &[235, 50, 164, 248]),
    (-6777216, &[128, 150, 152]),
    (6777216, &[128, 105, 103]),
    (-32641, &[127, 128]),
    (33023, &[0xff, 0x80, 0x00]),
    (-172, &[0x54, 0xff]),
    (i32::MAX as i64, &[0xff, 0xff, 0xff, 0x7f]),
    (i32::MIN as i64, &[0x00, 0x00, 0x00, 0x80]),
    (0x8000112233, &[0x33, 0x22, 0x11, 0x00, 0x80, 0x00]),
    (-0x8000112233, &[0xcd, 0xdd, 0xee, 0xff, 0x7f, 0xff]),
    (-0xfeff00000000, &[0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0xff]),
    (i64::MAX, &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f]),
    (i64::MIN, &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80]),
];

// Values beyond 64 bits, written in decimal
const WIDE_CASES: &[(&str, &[u8])] = &[
    (
        "-1256271214286163627607479687759920896",
        &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 255],
    ),
    (
        "168884912246183068104079824028124185087",
        &[255, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 127],
    ),
    (
        "-43536131589161850832973096317989605473920",
        &[128, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 128],
    ),
    (
        "43235871975677457350187428577111288447360",
        &[128, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 127],
    ),
];

fn big(text: &str) -> BigInt {
    text.parse().expect("not a decimal integer")
}

#[cfg(test)]
mod codec_tests {
    use super::*;

    #[test]
    fn test_known_encodings() {
        for (value, bytes) in CASES {
            let n = BigInt::from(*value);
            assert_eq!(to_bytes(&n), *bytes, "encoding {value}");
            assert_eq!(from_bytes(bytes), n, "decoding {value}");
            assert_eq!(encoded_len(&n), bytes.len(), "length of {value}");
        }
    }

    #[test]
    fn test_sign_extension_is_ignored_when_decoding() {
        for (value, bytes) in CASES {
            let pad = if *value >= 0 { 0x00 } else { 0xFF };
            let mut padded = bytes.to_vec();
            padded.extend_from_slice(&[pad, pad, pad]);
            assert_eq!(from_bytes(&padded), BigInt::from(*value), "padded {value}");
        }
    }

    #[test]
    fn test_empty_input_is_zero() {
        assert_eq!(from_bytes(&[]), BigInt::from(0i64));
    }

    #[test]
    fn test_wide_values() {
        for (text, bytes) in WIDE_CASES {
            let n = big(text);
            assert_eq!(from_bytes(bytes), n, "decoding {text}");
            assert_eq!(to_bytes(&n), *bytes, "encoding {text}");
        }
    }

    #[test]
    fn test_big_endian_reference_values() {
        // Listed most significant byte first
        let cases: &[(&str, &[u8])] = &[
            ("33022", &[0x00, 0x80, 0xFE]),
            ("-32514", &[0x80, 0xFE]),
            (
                "-18374686475376656384",
                &[0xff, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
            ),
            (
                "-18446744069414584320",
                &[0xff, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
            ),
        ];
        for (text, be) in cases {
            let le: Vec<u8> = be.iter().rev().copied().collect();
            assert_eq!(from_bytes(&le), big(text), "decoding {text}");
        }
    }

    #[test]
    fn test_thousand_digit_values() {
        let power = BigInt::one() << 4000usize;
        assert!(power.to_string().len() > 1000);

        let mut max = vec![0xFFu8; 500];
        max.push(0x00);
        let below = &power - BigInt::one();
        assert_eq!(to_bytes(&below), max);
        assert_eq!(from_bytes(&max), below);

        let mut min = vec![0x00u8; 500];
        min.push(0xFF);
        let negative = -power;
        assert_eq!(to_bytes(&negative), min);
        assert_eq!(from_bytes(&min), negative);
    }
}
