use crate::error::{SolverError, SolverResult};

/// Derive the cache key for a normalized expression.
///
/// Hex encoding of the UTF-8 bytes: deterministic, injective and reversible,
/// so two distinct normalized strings can never share a key. A lossy hash
/// would be shorter but could fold distinct expressions together.
pub fn derive_key(normalized: &str) -> String {
    hex::encode(normalized.as_bytes())
}

/// Recover the normalized expression from a cache key.
///
/// Used for log inspection and debugging of stored entries; the hot path
/// only ever goes the other way.
pub fn decode_key(key: &str) -> SolverResult<String> {
    let bytes = hex::decode(key)
        .map_err(|e| SolverError::CacheError(format!("Invalid cache key encoding: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| SolverError::CacheError(format!("Cache key is not valid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        assert_eq!(derive_key("sin^2x"), derive_key("sin^2x"));
    }

    #[test]
    fn test_derive_key_injective() {
        let inputs = [
            "", "1", "x", "x^2", "x^21", "sin^2x", "sin^12x", "sinx", "a/b",
        ];
        for (i, a) in inputs.iter().enumerate() {
            for (j, b) in inputs.iter().enumerate() {
                let same = derive_key(a) == derive_key(b);
                assert_eq!(same, i == j, "keys for {:?} and {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_derive_key_round_trip() {
        for input in ["sin^2x", "∫x²dx", "", "a+b/c"] {
            assert_eq!(decode_key(&derive_key(input)).unwrap(), input);
        }
    }

    #[test]
    fn test_decode_key_rejects_garbage() {
        assert!(decode_key("zz").is_err());
        assert!(decode_key("abc").is_err()); // odd length
    }
}
