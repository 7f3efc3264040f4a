//! Error types for BLND decoding and encoding.

use thiserror::Error;

/// Errors that can occur when decoding or encoding BLND files.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering error.
    #[cfg(feature = "json")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Byte-level error (out-of-bounds read or seek, invalid UTF-8).
    #[error("{0}")]
    Common(#[from] blnd_common::Error),

    /// Header magic or version does not match the supported format.
    #[error("format mismatch in {field}: expected {expected:#010x}, got {found:#010x}")]
    FormatMismatch {
        field: &'static str,
        expected: u32,
        found: u32,
    },

    /// A type tag has no registered decoder.
    #[error("unknown {domain} type tag {tag} at offset {offset:#x}")]
    UnknownVariant {
        domain: &'static str,
        tag: u32,
        offset: usize,
    },

    /// A known variant whose layout is not supported.
    #[error("{what} at offset {offset:#x} is not supported")]
    NotImplemented { what: &'static str, offset: usize },

    /// A required reference was encoded as a zero offset.
    #[error("required reference {field} is null in record at offset {offset:#x}")]
    NullReference { field: &'static str, offset: usize },

    /// The identity cache holds a different record type at this position.
    #[error("record at offset {offset:#x} was already decoded as a different type than {expected}")]
    CacheTypeMismatch {
        offset: usize,
        expected: &'static str,
    },

    /// A relative offset does not fit in a signed 32-bit field.
    #[error("offset from {base:#x} to {target:#x} does not fit in 32 bits")]
    OffsetOverflow { target: usize, base: usize },

    /// A collection is too large for its count field.
    #[error("{field} has {count} entries, which does not fit in its count field")]
    CountOverflow { field: &'static str, count: usize },

    /// The size and write passes of the encoder diverged.
    #[error("allocator consistency error: {0}")]
    AllocatorConsistency(String),
}

/// Result type for BLND operations.
pub type Result<T> = std::result::Result<T, Error>;
