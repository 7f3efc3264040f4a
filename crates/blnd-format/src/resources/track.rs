//! Blend tracks.

use super::NAME_LEN;
use crate::memory::{Encode, RelativeWriter};
use crate::session::{Decode, DecodeSession};
use crate::Result;

/// A blend track.
///
/// Tracks live in the pool's inline track array; clips refer back to them
/// by offset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TrackResource {
    pub blend_weight: f32,
    pub blend_mode: u32,
    pub index: u32,
    /// Track name. Encoded into a 32-byte field, truncated to 31 bytes.
    pub name: String,
}

impl TrackResource {
    /// Encoded size in bytes.
    pub const SIZE: usize = 16 + NAME_LEN;
}

impl Decode for TrackResource {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let _size = session.cursor.read_u32()?;
        Ok(Self {
            blend_weight: session.cursor.read_f32()?,
            blend_mode: session.cursor.read_u32()?,
            index: session.cursor.read_u32()?,
            name: session.cursor.read_fixed_string(NAME_LEN)?,
        })
    }
}

impl Encode for TrackResource {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        w.write_u32(w.size_of(self)?);
        w.write_f32(self.blend_weight);
        w.write_u32(self.blend_mode);
        w.write_u32(self.index);
        w.write_fixed_string(&self.name, NAME_LEN);
        Ok(())
    }
}
