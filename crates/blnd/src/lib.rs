//! BLND - animation blend container library.
//!
//! This crate provides a unified interface to the BLND library crates.
//!
//! # Crates
//!
//! - [`blnd_common`] - Common utilities (byte cursor and writer, offsets, FNV-1a)
//! - [`blnd_format`] - BLND document model, decoder and relative-offset encoder
//!
//! # Example
//!
//! ```no_run
//! use blnd::prelude::*;
//!
//! let file = BlendFile::open("Jinx.blnd")?;
//! for clip in &file.pool.clips {
//!     println!("{:?} {:?}", clip.name, clip.clip_type());
//! }
//!
//! // Write back (possibly modified)
//! file.save("Jinx.out.blnd")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use blnd_common as common;
pub use blnd_format as format;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use blnd_common::{fnv, ByteCursor, ByteWriter, OffsetBase, TableBase};
    pub use blnd_format::resources::*;
    pub use blnd_format::{BinaryHeader, BlendFile, DecodeSession, RelativeWriter};
}

// Re-export commonly used types at the crate root
pub use blnd_format::{BlendFile, Error, Result};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
