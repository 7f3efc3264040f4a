//! The pool: root record of a BLND file.

use std::rc::Rc;

use blnd_common::{OffsetBase, TableBase};

use super::{
    count_field, AnimResource, BlendData, ClipResource, EventResource, MaskResource, PathRecord,
    TrackResource, TransitionClipData,
};
use crate::memory::{Encode, RelativeWriter};
use crate::session::{Decode, DecodeSession};
use crate::Result;

/// Root record holding every top-level collection.
///
/// Collection offsets are self-relative. Clip, mask, event and animation
/// collections are offset tables whose entries are relative to the table
/// start; the others are inline arrays. Every count is written from the
/// length of its collection.
///
/// Animations are decoded after everything else, since their data blocks
/// extend up to the next referenced position in the file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolData {
    pub format_token: u32,
    pub version: u32,
    /// Cascade blend switch, kept as the stored word.
    pub use_cascade_blend: u32,
    pub cascade_blend_value: f32,
    pub blends: Vec<BlendData>,
    pub transitions: Vec<TransitionClipData>,
    pub tracks: Vec<Rc<TrackResource>>,
    pub clips: Vec<Rc<ClipResource>>,
    pub masks: Vec<Rc<MaskResource>>,
    pub events: Vec<Rc<EventResource>>,
    pub anims: Vec<Rc<AnimResource>>,
    pub anim_names: Vec<PathRecord>,
    /// Skeleton path, stored inline in the pool.
    pub skeleton: PathRecord,
    pub reserved: u32,
}

impl PoolData {
    /// Check if cascade blending is switched on.
    pub fn cascade_blend_enabled(&self) -> bool {
        self.use_cascade_blend != 0
    }
}

impl Decode for PoolData {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let base = session.cursor.position();
        let _size = session.cursor.read_u32()?;
        let format_token = session.cursor.read_u32()?;
        let version = session.cursor.read_u32()?;

        let num_clips = session.cursor.read_u32()? as usize;
        let num_blends = session.cursor.read_u32()? as usize;
        let num_transitions = session.cursor.read_u32()? as usize;
        let num_tracks = session.cursor.read_u32()? as usize;
        let num_anims = session.cursor.read_u32()? as usize;
        let num_masks = session.cursor.read_u32()? as usize;
        let num_events = session.cursor.read_u32()? as usize;

        let use_cascade_blend = session.cursor.read_u32()?;
        let cascade_blend_value = session.cursor.read_f32()?;

        let blends_at = session.cursor.read_offset(OffsetBase::Field)?;
        let transitions_at = session.cursor.read_offset(OffsetBase::Field)?;
        let tracks_at = session.cursor.read_offset(OffsetBase::Field)?;
        let clips_at = session.cursor.read_offset(OffsetBase::Field)?;
        let masks_at = session.cursor.read_offset(OffsetBase::Field)?;
        let events_at = session.cursor.read_offset(OffsetBase::Field)?;
        let anims_at = session.cursor.read_offset(OffsetBase::Field)?;
        let num_anim_names = session.cursor.read_u32()? as usize;
        let anim_names_at = session.cursor.read_offset(OffsetBase::Field)?;
        let skeleton = PathRecord::decode(session)?;
        let reserved = session.cursor.read_u32()?;

        let blends = session.read_pod_array(blends_at, num_blends, "blends", base)?;
        let transitions = session.read_array(
            transitions_at,
            num_transitions,
            "transitions",
            base,
            TransitionClipData::decode,
        )?;
        let tracks = session.read_array(
            tracks_at,
            num_tracks,
            "tracks",
            base,
            DecodeSession::decode_shared::<TrackResource>,
        )?;

        let clips = session.read_table(clips_at, num_clips, TableBase::TableStart, "clips", base)?;
        let masks = session.read_table(masks_at, num_masks, TableBase::TableStart, "masks", base)?;
        let events =
            session.read_table(events_at, num_events, TableBase::TableStart, "events", base)?;
        let anim_names = session.read_array(
            anim_names_at,
            num_anim_names,
            "anim_names",
            base,
            PathRecord::decode,
        )?;
        let anims = session.read_table(anims_at, num_anims, TableBase::TableStart, "anims", base)?;

        tracing::debug!(
            clips = clips.len(),
            tracks = tracks.len(),
            masks = masks.len(),
            events = events.len(),
            anims = anims.len(),
            "decoded pool"
        );

        Ok(Self {
            format_token,
            version,
            use_cascade_blend,
            cascade_blend_value,
            blends,
            transitions,
            tracks,
            clips,
            masks,
            events,
            anims,
            anim_names,
            skeleton,
            reserved,
        })
    }
}

impl Encode for PoolData {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        w.write_u32(w.size_of(self)?);
        w.write_u32(self.format_token);
        w.write_u32(self.version);

        w.write_u32(count_field("clips", self.clips.len())?);
        w.write_u32(count_field("blends", self.blends.len())?);
        w.write_u32(count_field("transitions", self.transitions.len())?);
        w.write_u32(count_field("tracks", self.tracks.len())?);
        w.write_u32(count_field("anims", self.anims.len())?);
        w.write_u32(count_field("masks", self.masks.len())?);
        w.write_u32(count_field("events", self.events.len())?);

        w.write_u32(self.use_cascade_blend);
        w.write_f32(self.cascade_blend_value);

        w.write_pod_array_ref(OffsetBase::Field, &self.blends)?;
        w.write_array_ref(OffsetBase::Field, &self.transitions)?;
        w.write_array_ref(OffsetBase::Field, &self.tracks)?;
        w.write_table_ref(OffsetBase::Field, TableBase::TableStart, &self.clips)?;
        w.write_table_ref(OffsetBase::Field, TableBase::TableStart, &self.masks)?;
        w.write_table_ref(OffsetBase::Field, TableBase::TableStart, &self.events)?;
        w.write_table_ref(OffsetBase::Field, TableBase::TableStart, &self.anims)?;
        w.write_u32(count_field("anim_names", self.anim_names.len())?);
        w.write_array_ref(OffsetBase::Field, &self.anim_names)?;
        self.skeleton.encode(w)?;
        w.write_u32(self.reserved);
        Ok(())
    }
}
