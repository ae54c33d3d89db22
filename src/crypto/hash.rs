//! Canonical block hashing.

use sha2::{Digest, Sha256};

use crate::error::BlockError;

/// Hash a block's attributes into its unique hex digest.
///
/// Each attribute value is first rendered to its JSON string form by the
/// caller (the attributes are heterogeneously typed: index, timestamp,
/// nonce, difficulty, data, last_hash); the resulting strings are sorted
/// lexicographically (not by attribute position), concatenated, and hashed
/// with SHA-256. Sorting before concatenation means the digest only depends
/// on the multiset of attribute values, not on the order they were passed
/// in.
pub fn hash_block(jsonified_args: &[String]) -> String {
    let mut stringified = jsonified_args.to_vec();
    stringified.sort();
    let joined = stringified.concat();

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hex::encode(hasher.finalize())
}

/// Render a value to its JSON string form for use with [`hash_block`].
pub fn to_json_string<T: serde::Serialize>(value: &T) -> Result<String, BlockError> {
    serde_json::to_string(value)
        .map_err(|e| BlockError::Schema(format!("could not encode block data: {e}")))
}

/// Convert a hex digest into its zero-padded 256-bit binary representation.
pub fn hex_to_binary(hash: &str) -> String {
    let value = u128::from_str_radix(&hash[..32], 16).unwrap_or(0);
    let high = u128::from_str_radix(&hash[32..], 16).unwrap_or(0);
    format!("{:0128b}{:0128b}", value, high)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_order_insensitive() {
        let a = hash_block(&["\"a\"".to_string(), "\"b\"".to_string()]);
        let b = hash_block(&["\"b\"".to_string(), "\"a\"".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn hash_is_64_hex_chars() {
        let h = hash_block(&[
            to_json_string(&1).unwrap(),
            to_json_string(&2).unwrap(),
            to_json_string(&3).unwrap(),
        ]);
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hex_to_binary_zero_prefix() {
        let bin = hex_to_binary(&"0".repeat(64));
        assert_eq!(bin, "0".repeat(256));
    }

    #[test]
    fn hex_to_binary_length() {
        let bin = hex_to_binary(&"f".repeat(64));
        assert_eq!(bin.len(), 256);
        assert!(bin.chars().all(|c| c == '1'));
    }
}
