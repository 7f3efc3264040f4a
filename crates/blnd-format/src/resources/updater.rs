//! Parameter updaters attached to atomic clips.

use blnd_common::OffsetBase;

use super::count_field;
use crate::memory::{Encode, RelativeWriter};
use crate::session::{Decode, DecodeSession};
use crate::Result;

/// A set of updaters.
///
/// Layout: size, version, `num_updaters: u16`, padding, then a
/// record-relative offset to an inline [`UpdaterData`] array.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UpdaterResource {
    pub version: u32,
    pub updaters: Vec<UpdaterData>,
}

/// Maps one input value through a chain of processors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UpdaterData {
    pub input_type: u16,
    pub output_type: u16,
    pub processors: Vec<AnimValueProcessorData>,
}

/// A single value processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnimValueProcessorData {
    pub processor_type: u16,
}

impl Decode for UpdaterResource {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let base = session.cursor.position();
        let _size = session.cursor.read_u32()?;
        let version = session.cursor.read_u32()?;
        let count = session.cursor.read_u16()? as usize;
        session.cursor.skip(2)?;
        let updaters_at = session.cursor.read_offset(OffsetBase::Record(base))?;

        let updaters = session.read_array(updaters_at, count, "updaters", base, UpdaterData::decode)?;
        Ok(Self { version, updaters })
    }
}

impl Encode for UpdaterResource {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        let base = w.position();
        w.write_u32(w.size_of(self)?);
        w.write_u32(self.version);
        w.write_u16(count_field("updaters", self.updaters.len())?);
        w.write_u16(0);
        w.write_array_ref(OffsetBase::Record(base), &self.updaters)
    }
}

impl Decode for UpdaterData {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let base = session.cursor.position();
        let _size = session.cursor.read_u32()?;
        let input_type = session.cursor.read_u16()?;
        let output_type = session.cursor.read_u16()?;
        let count = session.cursor.read_u8()? as usize;
        session.cursor.skip(3)?;
        let processors_at = session.cursor.read_offset(OffsetBase::Record(base))?;

        let processors = session.read_array(
            processors_at,
            count,
            "processors",
            base,
            AnimValueProcessorData::decode,
        )?;
        Ok(Self {
            input_type,
            output_type,
            processors,
        })
    }
}

impl Encode for UpdaterData {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        let base = w.position();
        w.write_u32(w.size_of(self)?);
        w.write_u16(self.input_type);
        w.write_u16(self.output_type);
        w.write_u8(count_field("processors", self.processors.len())?);
        w.write_bytes(&[0; 3]);
        w.write_array_ref(OffsetBase::Record(base), &self.processors)
    }
}

impl Decode for AnimValueProcessorData {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let _size = session.cursor.read_u32()?;
        let processor_type = session.cursor.read_u16()?;
        session.cursor.skip(2)?;
        Ok(Self { processor_type })
    }
}

impl Encode for AnimValueProcessorData {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        w.write_u32(w.size_of(self)?);
        w.write_u16(self.processor_type);
        w.write_u16(0);
        Ok(())
    }
}
