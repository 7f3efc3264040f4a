//! Animation resource headers.

use std::rc::Rc;

use blnd_common::OffsetBase;

use super::count_field;
use crate::memory::{Encode, RelativeWriter};
use crate::session::{Decode, DecodeSession};
use crate::Result;

/// Header of an animation referenced from the pool's anim table.
///
/// Atomic clips select one of these by index. Layout: size, format token,
/// version, flags, channel count, tick count, tick duration, six
/// record-relative offsets (joint hashes, asset name, time, vector palette,
/// quaternion palette, tick data), then three reserved words.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnimResource {
    pub format_token: u32,
    pub version: u32,
    pub flags: u32,
    pub num_ticks: u32,
    pub tick_duration: f32,
    /// One hash per animated channel.
    pub joint_name_hashes: Vec<u32>,
    pub asset_name: Option<String>,
    pub time: Option<Rc<AnimBlock>>,
    pub vector_palette: Option<Rc<AnimBlock>>,
    pub quat_palette: Option<Rc<AnimBlock>>,
    pub tick_data: Option<Rc<AnimBlock>>,
    pub reserved: [u32; 3],
}

/// Opaque animation data carried through unchanged.
///
/// The header does not state how long these blocks are; a decoded block
/// runs up to the next position anything in the file refers to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnimBlock {
    pub bytes: Vec<u8>,
}

impl Decode for AnimBlock {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let start = session.cursor.position();
        let end = session.next_landmark(start);
        let bytes = session.cursor.read_bytes(end - start)?.to_vec();
        Ok(Self { bytes })
    }
}

impl Encode for AnimBlock {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        w.write_bytes(&self.bytes);
        Ok(())
    }
}

impl Decode for AnimResource {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let base = session.cursor.position();
        let _size = session.cursor.read_u32()?;
        let format_token = session.cursor.read_u32()?;
        let version = session.cursor.read_u32()?;
        let flags = session.cursor.read_u32()?;
        let num_channels = session.cursor.read_u32()? as usize;
        let num_ticks = session.cursor.read_u32()?;
        let tick_duration = session.cursor.read_f32()?;
        let hashes_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let asset_name_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let time_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let vector_palette_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let quat_palette_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let tick_data_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let reserved = [
            session.cursor.read_u32()?,
            session.cursor.read_u32()?,
            session.cursor.read_u32()?,
        ];

        // Blocks end where the next one starts
        let targets = [
            hashes_at,
            asset_name_at,
            time_at,
            vector_palette_at,
            quat_palette_at,
            tick_data_at,
        ];
        for position in targets.into_iter().flatten() {
            session.mark(position);
        }

        let joint_name_hashes =
            session.read_pod_array(hashes_at, num_channels, "joint_name_hashes", base)?;
        let asset_name = session.read_string(asset_name_at)?;

        Ok(Self {
            format_token,
            version,
            flags,
            num_ticks,
            tick_duration,
            joint_name_hashes,
            asset_name,
            time: session.decode_ref(time_at)?,
            vector_palette: session.decode_ref(vector_palette_at)?,
            quat_palette: session.decode_ref(quat_palette_at)?,
            tick_data: session.decode_ref(tick_data_at)?,
            reserved,
        })
    }
}

impl Encode for AnimResource {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        let base = w.position();
        w.write_u32(w.size_of(self)?);
        w.write_u32(self.format_token);
        w.write_u32(self.version);
        w.write_u32(self.flags);
        w.write_u32(count_field("joint_name_hashes", self.joint_name_hashes.len())?);
        w.write_u32(self.num_ticks);
        w.write_f32(self.tick_duration);
        w.write_pod_array_ref(OffsetBase::Record(base), &self.joint_name_hashes)?;
        w.write_str_ref(OffsetBase::Record(base), self.asset_name.as_deref())?;
        w.write_ref(OffsetBase::Record(base), self.time.as_ref())?;
        w.write_ref(OffsetBase::Record(base), self.vector_palette.as_ref())?;
        w.write_ref(OffsetBase::Record(base), self.quat_palette.as_ref())?;
        w.write_ref(OffsetBase::Record(base), self.tick_data.as_ref())?;
        for value in self.reserved {
            w.write_u32(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Header at 0, then hashes, name and four blocks laid out back to back.
    fn laid_out() -> Vec<u8> {
        let mut data = words(&[64, 0x1234, 5, 0, 1, 3, 0]);
        data.extend(words(&[64, 68, 72, 80, 84, 88]));
        data.extend(words(&[7, 8, 9]));
        data.extend(words(&[0xAABB_CCDD]));
        data.extend(b"abc\0");
        data.extend(words(&[10, 11]));
        data.extend(words(&[12]));
        data.extend(words(&[13]));
        data.extend(words(&[14, 15, 16]));
        data
    }

    #[test]
    fn test_blocks_end_at_next_reference() {
        let data = laid_out();
        let mut session = DecodeSession::new(&data);
        let anim = AnimResource::decode(&mut session).unwrap();

        assert_eq!(anim.joint_name_hashes, vec![0xAABB_CCDD]);
        assert_eq!(anim.asset_name.as_deref(), Some("abc"));
        assert_eq!(anim.time.as_ref().unwrap().bytes, words(&[10, 11]));
        assert_eq!(anim.vector_palette.as_ref().unwrap().bytes, words(&[12]));
        assert_eq!(anim.quat_palette.as_ref().unwrap().bytes, words(&[13]));
        assert_eq!(anim.tick_data.as_ref().unwrap().bytes, words(&[14, 15, 16]));
        assert_eq!(anim.reserved, [7, 8, 9]);
    }

    #[test]
    fn test_layout_preserved() {
        let data = laid_out();
        let mut session = DecodeSession::new(&data);
        let anim = AnimResource::decode(&mut session).unwrap();

        let bytes = RelativeWriter::encode_root(&anim).unwrap();
        assert_eq!(bytes, data);
    }

    #[test]
    fn test_shared_block_written_once() {
        let mut data = laid_out();
        // Vector and quaternion palettes share one block
        data[44..48].copy_from_slice(&80u32.to_le_bytes());
        data[84..88].fill(0);

        let mut session = DecodeSession::new(&data);
        let anim = AnimResource::decode(&mut session).unwrap();
        assert!(Rc::ptr_eq(
            anim.vector_palette.as_ref().unwrap(),
            anim.quat_palette.as_ref().unwrap()
        ));
        assert_eq!(anim.vector_palette.as_ref().unwrap().bytes, words(&[12, 0]));

        let bytes = RelativeWriter::encode_root(&anim).unwrap();
        assert_eq!(&bytes[40..48], &words(&[80, 80])[..]);
        assert_eq!(bytes, data);
    }
}
