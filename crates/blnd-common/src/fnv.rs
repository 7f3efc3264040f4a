//! FNV-1a hashing utilities.
//!
//! BLND path records carry a 32-bit FNV-1a hash of their path bytes.

/// FNV-1a 32-bit offset basis.
pub const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;

/// FNV-1a 32-bit prime.
pub const FNV_PRIME: u32 = 16_777_619;

/// Compute the FNV-1a hash of a byte slice.
#[inline]
pub fn hash_bytes(data: &[u8]) -> u32 {
    data.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Compute the FNV-1a hash of a string.
#[inline]
pub fn hash_str(s: &str) -> u32 {
    hash_bytes(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_hash() {
        assert_eq!(hash_bytes(&[]), FNV_OFFSET_BASIS);
    }

    #[test]
    fn test_known_hash() {
        assert_eq!(hash_str("a"), 0xE40C_292C);
        assert_eq!(hash_str("foobar"), 0xBF9C_F968);
    }

    #[test]
    fn test_case_sensitive() {
        assert_ne!(hash_str("Jinx"), hash_str("jinx"));
        assert_ne!(hash_str("jinx"), hash_str("jinx2"));
    }
}
