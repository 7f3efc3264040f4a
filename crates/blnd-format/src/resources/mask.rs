//! Joint blend masks.

use blnd_common::OffsetBase;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::{count_field, NAME_LEN};
use crate::memory::{Encode, NodeKey, RelativeWriter};
use crate::session::{Decode, DecodeSession};
use crate::Result;

/// Joint name hash entry of a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(C)]
pub struct JointHash {
    pub weight_id: i32,
    pub joint_hash: u32,
}

/// Joint index entry of a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(C)]
pub struct JointIndex {
    pub weight_id: i32,
    pub joint_index: i32,
}

/// One masked joint.
///
/// On disk the three parts live in three parallel arrays.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MaskElement {
    pub weight: f32,
    pub joint_hash: JointHash,
    pub joint_index: JointIndex,
}

/// A per-joint blend mask.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MaskResource {
    pub format_token: u32,
    pub version: u32,
    pub flags: u16,
    pub unique_id: u32,
    pub elements: Vec<MaskElement>,
    /// Mask name. Encoded into a 32-byte field, truncated to 31 bytes.
    pub name: String,
    pub reserved: [u32; 2],
}

const WEIGHTS_SLOT: u32 = 1;
const JOINT_HASHES_SLOT: u32 = 2;
const JOINT_INDICES_SLOT: u32 = 3;

impl MaskResource {
    /// Write a record-relative offset to one of the parallel element arrays.
    fn write_elements(
        &self,
        w: &mut RelativeWriter,
        base: usize,
        slot: u32,
        write_one: fn(&mut RelativeWriter, &MaskElement),
    ) -> Result<()> {
        if self.elements.is_empty() {
            w.write_i32(0);
            return Ok(());
        }
        let key = NodeKey::of(self).with_slot(slot);
        w.write_ref_with(OffsetBase::Record(base), key, |w| {
            for element in &self.elements {
                write_one(w, element);
            }
            Ok(())
        })
    }
}

impl Decode for MaskResource {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let base = session.cursor.position();
        let _size = session.cursor.read_u32()?;
        let format_token = session.cursor.read_u32()?;
        let version = session.cursor.read_u32()?;
        let flags = session.cursor.read_u16()?;
        let count = session.cursor.read_u16()? as usize;
        let unique_id = session.cursor.read_u32()?;
        let weights_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let hashes_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let indices_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let name = session.cursor.read_fixed_string(NAME_LEN)?;
        let reserved = [session.cursor.read_u32()?, session.cursor.read_u32()?];

        let weights: Vec<f32> = session.read_pod_array(weights_at, count, "weights", base)?;
        let hashes: Vec<JointHash> =
            session.read_pod_array(hashes_at, count, "joint_hashes", base)?;
        let indices: Vec<JointIndex> =
            session.read_pod_array(indices_at, count, "joint_indices", base)?;

        let elements = weights
            .into_iter()
            .zip(hashes)
            .zip(indices)
            .map(|((weight, joint_hash), joint_index)| MaskElement {
                weight,
                joint_hash,
                joint_index,
            })
            .collect();

        Ok(Self {
            format_token,
            version,
            flags,
            unique_id,
            elements,
            name,
            reserved,
        })
    }
}

impl Encode for MaskResource {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        let base = w.position();
        w.write_u32(w.size_of(self)?);
        w.write_u32(self.format_token);
        w.write_u32(self.version);
        w.write_u16(self.flags);
        w.write_u16(count_field("mask elements", self.elements.len())?);
        w.write_u32(self.unique_id);

        self.write_elements(w, base, WEIGHTS_SLOT, |w, e| w.write_f32(e.weight))?;
        self.write_elements(w, base, JOINT_HASHES_SLOT, |w, e| {
            w.write_struct(&e.joint_hash)
        })?;
        self.write_elements(w, base, JOINT_INDICES_SLOT, |w, e| {
            w.write_struct(&e.joint_index)
        })?;

        w.write_fixed_string(&self.name, NAME_LEN);
        for value in self.reserved {
            w.write_u32(value);
        }
        Ok(())
    }
}
