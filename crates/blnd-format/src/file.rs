//! BLND file load and save.

use std::fs::{self, File};
use std::path::Path;

use memmap2::Mmap;

use crate::header::BinaryHeader;
use crate::memory::{Encode, RelativeWriter};
use crate::resources::PoolData;
use crate::session::{Decode, DecodeSession};
use crate::Result;

/// A decoded BLND file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BlendFile {
    pub header: BinaryHeader,
    pub pool: PoolData,
}

impl BlendFile {
    /// Create a file with the current header around a pool.
    pub fn new(pool: PoolData) -> Self {
        Self {
            header: BinaryHeader::current(),
            pool,
        }
    }

    /// Decode a whole file buffer.
    #[tracing::instrument(skip_all, fields(len = data.len()))]
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut session = DecodeSession::new(data);

        let header: BinaryHeader = session.cursor.read_struct()?;
        header.validate()?;
        let pool = PoolData::decode(&mut session)?;

        tracing::debug!(shared = session.cached_len(), "decoded file");
        Ok(Self { header, pool })
    }

    /// Memory-map and decode a file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::parse(&mmap)
    }

    /// Encode the file into a new buffer.
    #[tracing::instrument(skip_all)]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = RelativeWriter::encode_root(self)?;
        tracing::debug!(len = bytes.len(), "encoded file");
        Ok(bytes)
    }

    /// Encode the file and write it to disk.
    ///
    /// Nothing is written if encoding fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Render the decoded graph as pretty-printed JSON.
    ///
    /// Shared records appear once per owner.
    #[cfg(feature = "json")]
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Encode for BlendFile {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        w.write_struct(&self.header);
        w.write_inline(&self.pool)
    }
}
