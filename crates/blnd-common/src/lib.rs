//! Common utilities for BLND tooling.
//!
//! This crate provides the byte-level building blocks used by the format crate:
//!
//! - [`ByteCursor`] - Bounds-checked little-endian reading with random access
//! - [`ByteWriter`] - Seekable little-endian writing, optionally counting only
//! - [`OffsetBase`] / [`TableBase`] - Relative offset addressing conventions
//! - [`fnv`] - FNV-1a hashing used for path records

mod cursor;
mod error;
mod offset;
mod writer;

pub mod fnv;

pub use cursor::ByteCursor;
pub use error::{Error, Result};
pub use offset::{OffsetBase, TableBase};
pub use writer::ByteWriter;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
