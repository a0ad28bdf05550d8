//! N3 addresses: base58check over a version byte and a big-endian script hash.

use sha2::{Digest, Sha256};

pub const ADDRESS_VERSION: u8 = 0x35;
pub const SCRIPT_HASH_LEN: usize = 20;

pub fn from_script_hash(hash_be: &[u8; SCRIPT_HASH_LEN]) -> String {
    let mut payload = Vec::with_capacity(1 + SCRIPT_HASH_LEN + 4);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(hash_be);
    let check = checksum(&payload);
    payload.extend_from_slice(&check);
    bs58::encode(payload).into_string()
}

/// Big-endian script hash of a well-formed address.
pub fn to_script_hash(address: &str) -> Option<[u8; SCRIPT_HASH_LEN]> {
    let decoded = bs58::decode(address).into_vec().ok()?;
    if decoded.len() != 1 + SCRIPT_HASH_LEN + 4 || decoded[0] != ADDRESS_VERSION {
        return None;
    }
    let (payload, check) = decoded.split_at(1 + SCRIPT_HASH_LEN);
    if checksum(payload)[..] != *check {
        return None;
    }
    payload[1..].try_into().ok()
}

fn checksum(data: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(data));
    [digest[0], digest[1], digest[2], digest[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_script_hash() {
        let hash = to_script_hash("NbTiM6h8r99kpRtb428XcsUk1TzKed2gTc").unwrap();
        assert_eq!(hex::encode(hash), "aa8acf859d4fe402b34e673f2156821796a488eb");
        assert_eq!(from_script_hash(&hash), "NbTiM6h8r99kpRtb428XcsUk1TzKed2gTc");
    }

    #[test]
    fn rejects_bad_checksum() {
        assert_eq!(to_script_hash("NbTiM6h8r99kpRtb428XcsUk1TzKed2gTd"), None);
        assert_eq!(to_script_hash("not an address"), None);
    }
}
