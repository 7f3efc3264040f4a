//! Hashed path records.

use blnd_common::{fnv, OffsetBase};

use crate::memory::{Encode, RelativeWriter};
use crate::session::{Decode, DecodeSession};
use crate::Result;

/// A path string with its FNV-1a hash.
///
/// Layout: `hash: u32`, then a self-relative offset to a C string.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PathRecord {
    /// Hash as stored in the file. Ignored on encode.
    pub hash: u32,
    /// The path string.
    pub path: String,
}

impl PathRecord {
    /// Create a record with a freshly computed hash.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            hash: fnv::hash_str(&path),
            path,
        }
    }

    /// The hash the encoder will write for this path.
    pub fn computed_hash(&self) -> u32 {
        fnv::hash_str(&self.path)
    }

    /// Check if the stored hash matches the path.
    pub fn is_hash_current(&self) -> bool {
        self.hash == self.computed_hash()
    }
}

impl Decode for PathRecord {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let base = session.cursor.position();
        let hash = session.cursor.read_u32()?;
        let path_at = session.cursor.read_offset(OffsetBase::Field)?;
        let path = session.read_required_string(path_at, "path", base)?;
        Ok(Self { hash, path })
    }
}

impl Encode for PathRecord {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        w.write_u32(self.computed_hash());
        w.write_str_ref(OffsetBase::Field, Some(self.path.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_computes_hash() {
        let record = PathRecord::new("Characters/Jinx/Jinx");
        assert_eq!(record.hash, fnv::hash_str("Characters/Jinx/Jinx"));
        assert_ne!(record.hash, fnv::hash_str("characters/jinx/jinx"));
        assert!(record.is_hash_current());
    }

    #[test]
    fn test_stale_hash_rewritten() {
        let record = PathRecord {
            hash: 0xDEAD_BEEF,
            path: "idle1".to_string(),
        };
        assert!(!record.is_hash_current());

        let bytes = RelativeWriter::encode_root(&record).unwrap();
        assert_eq!(&bytes[..4], &fnv::hash_str("idle1").to_le_bytes());
        assert_eq!(&bytes[4..8], &4i32.to_le_bytes());
        assert_eq!(&bytes[8..], b"idle1\0");
    }
}
