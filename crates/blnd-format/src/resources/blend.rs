//! Blend and transition tables.

use blnd_common::OffsetBase;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::count_field;
use crate::memory::{Encode, RelativeWriter};
use crate::session::{Decode, DecodeSession};
use crate::Result;

/// Blend settings between two animations.
#[derive(Debug, Clone, Copy, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(C)]
pub struct BlendData {
    pub from_anim_id: u32,
    pub to_anim_id: u32,
    pub blend_flags: u32,
    /// Blend time in seconds.
    pub blend_time: f32,
}

/// One destination of a [`TransitionClipData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(C)]
pub struct TransitionToData {
    pub to_anim_id: u32,
    /// Animation played while transitioning.
    pub transition_anim_id: u32,
}

/// Transitions from one animation.
///
/// Layout: `from_anim_id`, `transition_count`, then a self-relative offset
/// to `transition_count` [`TransitionToData`] entries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TransitionClipData {
    pub from_anim_id: u32,
    pub transitions: Vec<TransitionToData>,
}

impl Decode for TransitionClipData {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let base = session.cursor.position();
        let from_anim_id = session.cursor.read_u32()?;
        let count = session.cursor.read_u32()? as usize;
        let entries_at = session.cursor.read_offset(OffsetBase::Field)?;

        let transitions = session.read_pod_array(entries_at, count, "transitions", base)?;
        Ok(Self {
            from_anim_id,
            transitions,
        })
    }
}

impl Encode for TransitionClipData {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        w.write_u32(self.from_anim_id);
        w.write_u32(count_field("transitions", self.transitions.len())?);
        w.write_pod_array_ref(OffsetBase::Field, &self.transitions)
    }
}
