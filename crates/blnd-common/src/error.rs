//! Error types for blnd-common.

use thiserror::Error;

/// Common error type for byte-level operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A read or seek fell outside the buffer.
    #[error("out of bounds at offset {offset:#x}: needed {needed} bytes, buffer is {len} bytes")]
    Bounds {
        offset: usize,
        needed: usize,
        len: usize,
    },

    /// UTF-8 decoding error.
    #[error("invalid UTF-8 string at offset {offset:#x}: {source}")]
    Utf8 {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
