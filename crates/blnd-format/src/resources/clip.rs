//! Clip resources and their tagged clip payloads.

use std::fmt;
use std::rc::Rc;

use blnd_common::OffsetBase;

use super::{count_field, EventResource, MaskResource, TrackResource, UpdaterResource};
use crate::memory::{Encode, RelativeWriter};
use crate::session::{Decode, DecodeSession, VariantDecoder};
use crate::{Error, Result};

/// Clip behaviour flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ClipFlags(pub u32);

impl ClipFlags {
    pub const NONE: Self = Self(0);
    pub const MAIN: Self = Self(0x1);
    pub const LOOP: Self = Self(0x2);
    pub const CONTINUE: Self = Self(0x4);
    pub const PLAY_ONCE: Self = Self(0x8);

    /// Raw flag bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Check if every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ClipFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for ClipFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ClipFlags, &str); 4] = [
            (ClipFlags::MAIN, "MAIN"),
            (ClipFlags::LOOP, "LOOP"),
            (ClipFlags::CONTINUE, "CONTINUE"),
            (ClipFlags::PLAY_ONCE, "PLAY_ONCE"),
        ];

        let mut list = f.debug_set();
        let mut rest = self.0;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                list.entry(&format_args!("{name}"));
                rest &= !flag.0;
            }
        }
        if rest != 0 {
            list.entry(&format_args!("{rest:#x}"));
        }
        list.finish()
    }
}

/// Clip payload type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u32)]
pub enum ClipType {
    Atomic = 1,
    Selector = 2,
    Sequencer = 3,
    Parallel = 4,
    /// Known tag with no supported layout.
    MultiChild = 5,
    Parametric = 6,
    ConditionBool = 7,
    ConditionFloat = 8,
}

impl ClipType {
    /// The on-disk tag value.
    pub fn tag(self) -> u32 {
        self as u32
    }
}

/// Decoders for every known clip tag.
const CLIP_DECODERS: &[(u32, VariantDecoder<ClipData>)] = &[
    (ClipType::Atomic as u32, AtomicClip::decode_payload),
    (ClipType::Selector as u32, SelectorClip::decode_selector),
    (ClipType::Sequencer as u32, SelectorClip::decode_sequencer),
    (ClipType::Parallel as u32, ParallelClip::decode_payload),
    (ClipType::MultiChild as u32, decode_multi_child),
    (ClipType::Parametric as u32, ParametricClip::decode_payload),
    (ClipType::ConditionBool as u32, ConditionClip::decode_bool),
    (ClipType::ConditionFloat as u32, ConditionClip::decode_float),
];

fn decode_multi_child(_session: &mut DecodeSession<'_>, base: usize) -> Result<ClipData> {
    Err(Error::NotImplemented {
        what: "multi-child clip",
        offset: base,
    })
}

/// A named clip.
///
/// Layout: size, flags, unique id, then record-relative offsets to the name
/// and the [`ClipData`] payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ClipResource {
    pub flags: ClipFlags,
    pub unique_id: u32,
    pub name: Option<String>,
    pub data: ClipData,
}

impl ClipResource {
    /// The payload's type tag.
    pub fn clip_type(&self) -> ClipType {
        self.data.clip_type()
    }
}

impl Decode for ClipResource {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let base = session.cursor.position();
        let _size = session.cursor.read_u32()?;
        let flags = ClipFlags(session.cursor.read_u32()?);
        let unique_id = session.cursor.read_u32()?;
        let name_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let data_at = session.cursor.read_offset(OffsetBase::Record(base))?;

        let name = session.read_string(name_at)?;
        let data = session.decode_owned(data_at, "clip_data", base)?;

        Ok(Self {
            flags,
            unique_id,
            name,
            data,
        })
    }
}

impl Encode for ClipResource {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        let base = w.position();
        w.write_u32(w.size_of(self)?);
        w.write_u32(self.flags.bits());
        w.write_u32(self.unique_id);
        w.write_str_ref(OffsetBase::Record(base), self.name.as_deref())?;
        w.write_ref(OffsetBase::Record(base), Some(&self.data))
    }
}

/// Type-specific part of a clip.
///
/// Clip payloads carry no size field; the type tag is the first word and
/// nested offsets are relative to the payload start.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ClipData {
    Atomic(AtomicClip),
    Selector(SelectorClip),
    Sequencer(SelectorClip),
    Parallel(ParallelClip),
    Parametric(ParametricClip),
    ConditionBool(ConditionClip),
    ConditionFloat(ConditionClip),
}

impl ClipData {
    /// The type tag of this payload.
    pub fn clip_type(&self) -> ClipType {
        match self {
            Self::Atomic(_) => ClipType::Atomic,
            Self::Selector(_) => ClipType::Selector,
            Self::Sequencer(_) => ClipType::Sequencer,
            Self::Parallel(_) => ClipType::Parallel,
            Self::Parametric(_) => ClipType::Parametric,
            Self::ConditionBool(_) => ClipType::ConditionBool,
            Self::ConditionFloat(_) => ClipType::ConditionFloat,
        }
    }
}

impl Decode for ClipData {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let decode_payload = session.peek_variant("clip", 0, CLIP_DECODERS)?;
        let base = session.cursor.position();
        let _tag = session.cursor.read_u32()?;
        decode_payload(session, base)
    }
}

impl Encode for ClipData {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        let base = w.position();
        w.write_u32(self.clip_type().tag());
        match self {
            Self::Atomic(clip) => clip.encode_fields(w, base),
            Self::Selector(clip) | Self::Sequencer(clip) => {
                w.write_u32(clip.track_index);
                w.write_u32(clip.num_pairs);
                Ok(())
            }
            Self::Parallel(clip) => {
                w.write_pod_array_ref(OffsetBase::Field, &clip.clip_flags)?;
                w.write_u32(count_field("clip_flags", clip.clip_flags.len())?);
                Ok(())
            }
            Self::Parametric(clip) => {
                w.write_u32(clip.num_pairs);
                w.write_u32(clip.updater_type);
                w.write_ref(OffsetBase::Record(base), clip.mask.as_ref())?;
                w.write_ref(OffsetBase::Record(base), clip.track.as_ref())
            }
            Self::ConditionBool(clip) | Self::ConditionFloat(clip) => {
                w.write_u32(clip.track_index);
                w.write_u32(clip.num_pairs);
                w.write_u32(clip.updater_type);
                w.write_u32(clip.change_animation_mid_play);
                Ok(())
            }
        }
    }
}

/// Plays a single animation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomicClip {
    pub start_tick: u32,
    pub end_tick: u32,
    pub tick_duration: f32,
    /// Unused pointer slot in front of the animation index, kept verbatim.
    pub anim_data_slot: u32,
    /// Index into the pool's animation table.
    pub anim_data_index: u32,
    pub event: Option<Rc<EventResource>>,
    pub mask: Option<Rc<MaskResource>>,
    pub track: Option<Rc<TrackResource>>,
    pub updater: Option<Rc<UpdaterResource>>,
    pub sync_group_name: Option<String>,
    pub sync_group: u32,
    pub reserved: [u32; 2],
}

impl AtomicClip {
    fn decode_payload(session: &mut DecodeSession<'_>, base: usize) -> Result<ClipData> {
        let start_tick = session.cursor.read_u32()?;
        let end_tick = session.cursor.read_u32()?;
        let tick_duration = session.cursor.read_f32()?;
        let anim_data_slot = session.cursor.read_u32()?;
        let anim_data_index = session.cursor.read_u32()?;
        let event_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let mask_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let track_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let updater_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let sync_group_name_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let sync_group = session.cursor.read_u32()?;
        let reserved = [session.cursor.read_u32()?, session.cursor.read_u32()?];

        Ok(ClipData::Atomic(Self {
            start_tick,
            end_tick,
            tick_duration,
            anim_data_slot,
            anim_data_index,
            event: session.decode_ref(event_at)?,
            mask: session.decode_ref(mask_at)?,
            track: session.decode_ref(track_at)?,
            updater: session.decode_ref(updater_at)?,
            sync_group_name: session.read_string(sync_group_name_at)?,
            sync_group,
            reserved,
        }))
    }

    fn encode_fields(&self, w: &mut RelativeWriter, base: usize) -> Result<()> {
        w.write_u32(self.start_tick);
        w.write_u32(self.end_tick);
        w.write_f32(self.tick_duration);
        w.write_u32(self.anim_data_slot);
        w.write_u32(self.anim_data_index);
        w.write_ref(OffsetBase::Record(base), self.event.as_ref())?;
        w.write_ref(OffsetBase::Record(base), self.mask.as_ref())?;
        w.write_ref(OffsetBase::Record(base), self.track.as_ref())?;
        w.write_ref(OffsetBase::Record(base), self.updater.as_ref())?;
        w.write_str_ref(OffsetBase::Record(base), self.sync_group_name.as_deref())?;
        w.write_u32(self.sync_group);
        for value in self.reserved {
            w.write_u32(value);
        }
        Ok(())
    }
}

/// Picks one of several tracks. Also the layout of sequencer clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SelectorClip {
    pub track_index: u32,
    pub num_pairs: u32,
}

impl SelectorClip {
    fn read(session: &mut DecodeSession<'_>) -> Result<Self> {
        Ok(Self {
            track_index: session.cursor.read_u32()?,
            num_pairs: session.cursor.read_u32()?,
        })
    }

    fn decode_selector(session: &mut DecodeSession<'_>, _base: usize) -> Result<ClipData> {
        Self::read(session).map(ClipData::Selector)
    }

    fn decode_sequencer(session: &mut DecodeSession<'_>, _base: usize) -> Result<ClipData> {
        Self::read(session).map(ClipData::Sequencer)
    }
}

/// Plays several clips at once.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ParallelClip {
    /// One flag word per child clip.
    pub clip_flags: Vec<u32>,
}

impl ParallelClip {
    fn decode_payload(session: &mut DecodeSession<'_>, base: usize) -> Result<ClipData> {
        let flags_at = session.cursor.read_offset(OffsetBase::Field)?;
        let num_clips = session.cursor.read_u32()? as usize;
        let clip_flags = session.read_pod_array(flags_at, num_clips, "clip_flags", base)?;
        Ok(ClipData::Parallel(Self { clip_flags }))
    }
}

/// Blends clips by a parameter value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ParametricClip {
    pub num_pairs: u32,
    pub updater_type: u32,
    pub mask: Option<Rc<MaskResource>>,
    pub track: Option<Rc<TrackResource>>,
}

impl ParametricClip {
    fn decode_payload(session: &mut DecodeSession<'_>, base: usize) -> Result<ClipData> {
        let num_pairs = session.cursor.read_u32()?;
        let updater_type = session.cursor.read_u32()?;
        let mask_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let track_at = session.cursor.read_offset(OffsetBase::Record(base))?;

        Ok(ClipData::Parametric(Self {
            num_pairs,
            updater_type,
            mask: session.decode_ref(mask_at)?,
            track: session.decode_ref(track_at)?,
        }))
    }
}

/// Switches clips on a condition. Shared by the bool and float variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConditionClip {
    pub track_index: u32,
    pub num_pairs: u32,
    pub updater_type: u32,
    /// Stored as a word; any non-zero value switches it on.
    pub change_animation_mid_play: u32,
}

impl ConditionClip {
    /// Check if the clip may switch animations while one is playing.
    pub fn changes_animation_mid_play(&self) -> bool {
        self.change_animation_mid_play != 0
    }

    fn read(session: &mut DecodeSession<'_>) -> Result<Self> {
        Ok(Self {
            track_index: session.cursor.read_u32()?,
            num_pairs: session.cursor.read_u32()?,
            updater_type: session.cursor.read_u32()?,
            change_animation_mid_play: session.cursor.read_u32()?,
        })
    }

    fn decode_bool(session: &mut DecodeSession<'_>, _base: usize) -> Result<ClipData> {
        Self::read(session).map(ClipData::ConditionBool)
    }

    fn decode_float(session: &mut DecodeSession<'_>, _base: usize) -> Result<ClipData> {
        Self::read(session).map(ClipData::ConditionFloat)
    }
}
