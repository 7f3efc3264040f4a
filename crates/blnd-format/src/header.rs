//! BLND binary block header.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{Error, Result};

/// The 12-byte header at the start of every BLND file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(C)]
pub struct BinaryHeader {
    /// Engine tag, `b"r3d2"`.
    pub engine_type: u32,
    /// Block type tag, `b"blnd"`.
    pub block_type: u32,
    /// Block layout version.
    pub block_version: u32,
}

impl BinaryHeader {
    /// Engine tag (`b"r3d2"` read as a little-endian u32).
    pub const ENGINE_TYPE: u32 = u32::from_le_bytes(*b"r3d2");

    /// Block type tag (`b"blnd"` read as a little-endian u32).
    pub const BLOCK_TYPE: u32 = u32::from_le_bytes(*b"blnd");

    /// The only supported block version.
    pub const BLOCK_VERSION: u32 = 1;

    /// Size of the header in bytes.
    pub const SIZE: usize = 12;

    /// Header for a freshly built file.
    pub const fn current() -> Self {
        Self {
            engine_type: Self::ENGINE_TYPE,
            block_type: Self::BLOCK_TYPE,
            block_version: Self::BLOCK_VERSION,
        }
    }

    /// Check the magic values and version.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("engine_type", Self::ENGINE_TYPE, self.engine_type),
            ("block_type", Self::BLOCK_TYPE, self.block_type),
            ("block_version", Self::BLOCK_VERSION, self.block_version),
        ];
        for (field, expected, found) in fields {
            if expected != found {
                return Err(Error::FormatMismatch {
                    field,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

impl Default for BinaryHeader {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_values() {
        assert_eq!(BinaryHeader::ENGINE_TYPE, 845_427_570);
        assert_eq!(BinaryHeader::BLOCK_TYPE, 1_684_958_306);
        assert_eq!(std::mem::size_of::<BinaryHeader>(), BinaryHeader::SIZE);
    }

    #[test]
    fn test_validate() {
        assert!(BinaryHeader::current().validate().is_ok());

        let header = BinaryHeader {
            block_version: 2,
            ..BinaryHeader::current()
        };
        match header.validate() {
            Err(Error::FormatMismatch {
                field,
                expected,
                found,
            }) => {
                assert_eq!(field, "block_version");
                assert_eq!(expected, 1);
                assert_eq!(found, 2);
            }
            other => panic!("expected FormatMismatch, got {other:?}"),
        }
    }
}
