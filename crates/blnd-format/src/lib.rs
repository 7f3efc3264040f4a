//! BLND animation blend container decoder and encoder.
//!
//! BLND files store an engine's animation graph (clips, tracks, masks,
//! events and animation headers) as a single block of records that point at
//! each other through relative offsets. This crate decodes that block into
//! an owned object graph and encodes it back, byte for byte.
//!
//! # File Format
//!
//! - 12 bytes: [`BinaryHeader`] (`r3d2`, `blnd`, version 1)
//! - [`PoolData`]: the root record, inline after the header
//! - Every other record, laid out in the order it is first referenced
//!
//! Offset fields are signed 32-bit deltas; zero means "absent". Depending on
//! the field, the delta is relative to the field itself or to the start of
//! the enclosing record (see [`OffsetBase`](blnd_common::OffsetBase)).
//!
//! # Decoding
//!
//! [`DecodeSession`] memoizes shared records by file position, so two
//! offsets that point at the same record yield the same [`Rc`](std::rc::Rc).
//! Clip and event records carry a type tag that selects the concrete layout.
//!
//! # Encoding
//!
//! [`RelativeWriter`] runs the encode traversal twice: once to measure and
//! discover every referenced record, then again to write each record at its
//! assigned address and patch offsets.
//!
//! # Example
//!
//! ```no_run
//! use blnd_format::BlendFile;
//!
//! let file = BlendFile::open("Jinx.blnd")?;
//! println!("{} clips", file.pool.clips.len());
//!
//! let bytes = file.to_bytes()?;
//! assert_eq!(bytes, std::fs::read("Jinx.blnd")?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod file;
mod header;
pub mod memory;
pub mod resources;
pub mod session;


pub use error::{Error, Result};
pub use file::BlendFile;
pub use header::BinaryHeader;
pub use memory::{Encode, NodeKey, RelativeWriter};
pub use session::{Decode, DecodeSession, VariantDecoder};

// Re-export commonly used types at crate root
pub use resources::{
    AnimResource, BaseEventData, ClipData, ClipFlags, ClipResource, ClipType, EventPayload,
    EventResource, EventType, MaskResource, PathRecord, PoolData, TrackResource, UpdaterResource,
};
