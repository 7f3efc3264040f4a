//! Event resources and their tagged event records.

use std::rc::Rc;

use blnd_common::{OffsetBase, TableBase};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::count_field;
use crate::memory::{Encode, RelativeWriter};
use crate::session::{Decode, DecodeSession, VariantDecoder};
use crate::Result;

/// Event record type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u32)]
pub enum EventType {
    Sound = 1,
    Particle = 2,
    SubmeshVisibility = 3,
    Fade = 4,
    JointSnap = 5,
    EnableLookAt = 6,
}

impl EventType {
    /// The on-disk tag value.
    pub fn tag(self) -> u32 {
        self as u32
    }
}

/// Decoders for every known event tag.
const EVENT_DECODERS: &[(u32, VariantDecoder<EventPayload>)] = &[
    (EventType::Sound as u32, SoundEvent::decode_payload),
    (EventType::Particle as u32, ParticleEvent::decode_payload),
    (
        EventType::SubmeshVisibility as u32,
        SubmeshVisibilityEvent::decode_payload,
    ),
    (EventType::Fade as u32, FadeEvent::decode_payload),
    (EventType::JointSnap as u32, JointSnapEvent::decode_payload),
    (EventType::EnableLookAt as u32, EnableLookAtEvent::decode_payload),
];

/// A named list of events.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EventResource {
    pub format_token: u32,
    pub version: u32,
    pub flags: u16,
    pub unique_id: u32,
    /// Events reached through the offset table.
    pub events: Vec<Rc<BaseEventData>>,
    /// The "current" event slot. Usually one of `events`.
    pub current: Option<Rc<BaseEventData>>,
    pub name_hash: Option<EventNameHash>,
    pub frame: Option<EventFrame>,
    pub name: Option<String>,
    pub reserved: [u32; 2],
}

/// Name hash attached to an event resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(C)]
pub struct EventNameHash {
    pub data_id: u32,
    pub name_hash: u32,
}

/// Frame attached to an event resource.
#[derive(Debug, Clone, Copy, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(C)]
pub struct EventFrame {
    pub data_id: u32,
    pub frame: f32,
}

impl Decode for EventNameHash {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        Ok(session.cursor.read_struct()?)
    }
}

impl Encode for EventNameHash {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        w.write_struct(self);
        Ok(())
    }
}

impl Decode for EventFrame {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        Ok(session.cursor.read_struct()?)
    }
}

impl Encode for EventFrame {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        w.write_struct(self);
        Ok(())
    }
}

impl Decode for EventResource {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        let base = session.cursor.position();
        let _size = session.cursor.read_u32()?;
        let format_token = session.cursor.read_u32()?;
        let version = session.cursor.read_u32()?;
        let flags = session.cursor.read_u16()?;
        let count = session.cursor.read_u16()? as usize;
        let unique_id = session.cursor.read_u32()?;
        let table_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let current_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let name_hash_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let frame_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let name_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let reserved = [session.cursor.read_u32()?, session.cursor.read_u32()?];

        let events = session.read_table(table_at, count, TableBase::Record(base), "events", base)?;
        let current = session.decode_ref(current_at)?;
        let name_hash = session.decode_optional(name_hash_at)?;
        let frame = session.decode_optional(frame_at)?;
        let name = session.read_string(name_at)?;

        Ok(Self {
            format_token,
            version,
            flags,
            unique_id,
            events,
            current,
            name_hash,
            frame,
            name,
            reserved,
        })
    }
}

impl Encode for EventResource {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        let base = w.position();
        w.write_u32(w.size_of(self)?);
        w.write_u32(self.format_token);
        w.write_u32(self.version);
        w.write_u16(self.flags);
        w.write_u16(count_field("events", self.events.len())?);
        w.write_u32(self.unique_id);
        w.write_table_ref(OffsetBase::Record(base), TableBase::Record(base), &self.events)?;
        w.write_ref(OffsetBase::Record(base), self.current.as_ref())?;
        w.write_ref(OffsetBase::Record(base), self.name_hash.as_ref())?;
        w.write_ref(OffsetBase::Record(base), self.frame.as_ref())?;
        w.write_str_ref(OffsetBase::Record(base), self.name.as_deref())?;
        for value in self.reserved {
            w.write_u32(value);
        }
        Ok(())
    }
}

/// A single tagged event.
///
/// Layout: size, type tag, flags, frame, record-relative name offset, then
/// the payload fields of the concrete event type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BaseEventData {
    /// Whether the size word holds the record size. Many files leave it
    /// at zero, and it is written back that way.
    pub declares_size: bool,
    pub flags: u32,
    pub frame: f32,
    pub name: Option<String>,
    pub payload: EventPayload,
}

impl BaseEventData {
    /// The type tag written for this event.
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}

impl Decode for BaseEventData {
    fn decode(session: &mut DecodeSession<'_>) -> Result<Self> {
        // Tag sits after the size field
        let decode_payload = session.peek_variant("event", 4, EVENT_DECODERS)?;

        let base = session.cursor.position();
        let size = session.cursor.read_u32()?;
        let _tag = session.cursor.read_u32()?;
        let flags = session.cursor.read_u32()?;
        let frame = session.cursor.read_f32()?;
        let name_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let payload = decode_payload(session, base)?;
        let name = session.read_string(name_at)?;

        Ok(Self {
            declares_size: size != 0,
            flags,
            frame,
            name,
            payload,
        })
    }
}

impl Encode for BaseEventData {
    fn encode(&self, w: &mut RelativeWriter) -> Result<()> {
        let base = w.position();
        let size = if self.declares_size { w.size_of(self)? } else { 0 };
        w.write_u32(size);
        w.write_u32(self.event_type().tag());
        w.write_u32(self.flags);
        w.write_f32(self.frame);
        w.write_str_ref(OffsetBase::Record(base), self.name.as_deref())?;
        self.payload.encode_fields(w, base)
    }
}

/// Type-specific part of an event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum EventPayload {
    Sound(SoundEvent),
    Particle(ParticleEvent),
    SubmeshVisibility(SubmeshVisibilityEvent),
    Fade(FadeEvent),
    JointSnap(JointSnapEvent),
    EnableLookAt(EnableLookAtEvent),
}

impl EventPayload {
    /// The type tag of this payload.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Sound(_) => EventType::Sound,
            Self::Particle(_) => EventType::Particle,
            Self::SubmeshVisibility(_) => EventType::SubmeshVisibility,
            Self::Fade(_) => EventType::Fade,
            Self::JointSnap(_) => EventType::JointSnap,
            Self::EnableLookAt(_) => EventType::EnableLookAt,
        }
    }

    fn encode_fields(&self, w: &mut RelativeWriter, base: usize) -> Result<()> {
        match self {
            Self::Sound(event) => {
                w.write_str_ref(OffsetBase::Field, event.sound_name.as_deref())?;
            }
            Self::Particle(event) => {
                w.write_str_ref(OffsetBase::Record(base), event.effect_name.as_deref())?;
                w.write_str_ref(OffsetBase::Record(base), event.bone_name.as_deref())?;
                w.write_str_ref(OffsetBase::Record(base), event.target_bone_name.as_deref())?;
                w.write_f32(event.end_frame);
            }
            Self::SubmeshVisibility(event) => {
                w.write_f32(event.end_frame);
                w.write_u32(event.show_submesh_hash);
                w.write_u32(event.hide_submesh_hash);
            }
            Self::Fade(event) => {
                w.write_f32(event.time_to_fade);
                w.write_f32(event.target_alpha);
                w.write_f32(event.end_frame);
            }
            Self::JointSnap(event) => {
                w.write_f32(event.end_frame);
                w.write_u16(event.joint_to_override);
                w.write_u16(event.joint_to_snap_to);
            }
            Self::EnableLookAt(event) => {
                w.write_f32(event.end_frame);
                w.write_u32(event.enable_look_at);
                w.write_u32(event.lock_current_values);
            }
        }
        Ok(())
    }
}

/// Plays a sound.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SoundEvent {
    pub sound_name: Option<String>,
}

impl SoundEvent {
    fn decode_payload(session: &mut DecodeSession<'_>, _base: usize) -> Result<EventPayload> {
        // The sound name is the one self-relative offset in an event
        let sound_name_at = session.cursor.read_offset(OffsetBase::Field)?;
        let sound_name = session.read_string(sound_name_at)?;
        Ok(EventPayload::Sound(Self { sound_name }))
    }
}

/// Spawns a particle effect on a bone.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ParticleEvent {
    pub effect_name: Option<String>,
    pub bone_name: Option<String>,
    pub target_bone_name: Option<String>,
    pub end_frame: f32,
}

impl ParticleEvent {
    fn decode_payload(session: &mut DecodeSession<'_>, base: usize) -> Result<EventPayload> {
        let effect_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let bone_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let target_bone_at = session.cursor.read_offset(OffsetBase::Record(base))?;
        let end_frame = session.cursor.read_f32()?;

        Ok(EventPayload::Particle(Self {
            effect_name: session.read_string(effect_at)?,
            bone_name: session.read_string(bone_at)?,
            target_bone_name: session.read_string(target_bone_at)?,
            end_frame,
        }))
    }
}

/// Shows one submesh and hides another.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SubmeshVisibilityEvent {
    pub end_frame: f32,
    pub show_submesh_hash: u32,
    pub hide_submesh_hash: u32,
}

impl SubmeshVisibilityEvent {
    fn decode_payload(session: &mut DecodeSession<'_>, _base: usize) -> Result<EventPayload> {
        Ok(EventPayload::SubmeshVisibility(Self {
            end_frame: session.cursor.read_f32()?,
            show_submesh_hash: session.cursor.read_u32()?,
            hide_submesh_hash: session.cursor.read_u32()?,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FadeEvent {
    pub time_to_fade: f32,
    pub target_alpha: f32,
    pub end_frame: f32,
}

impl FadeEvent {
    fn decode_payload(session: &mut DecodeSession<'_>, _base: usize) -> Result<EventPayload> {
        Ok(EventPayload::Fade(Self {
            time_to_fade: session.cursor.read_f32()?,
            target_alpha: session.cursor.read_f32()?,
            end_frame: session.cursor.read_f32()?,
        }))
    }
}

/// Snaps one joint onto another for the duration of the event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct JointSnapEvent {
    pub end_frame: f32,
    pub joint_to_override: u16,
    pub joint_to_snap_to: u16,
}

impl JointSnapEvent {
    fn decode_payload(session: &mut DecodeSession<'_>, _base: usize) -> Result<EventPayload> {
        Ok(EventPayload::JointSnap(Self {
            end_frame: session.cursor.read_f32()?,
            joint_to_override: session.cursor.read_u16()?,
            joint_to_snap_to: session.cursor.read_u16()?,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EnableLookAtEvent {
    pub end_frame: f32,
    pub enable_look_at: u32,
    pub lock_current_values: u32,
}

impl EnableLookAtEvent {
    fn decode_payload(session: &mut DecodeSession<'_>, _base: usize) -> Result<EventPayload> {
        Ok(EventPayload::EnableLookAt(Self {
            end_frame: session.cursor.read_f32()?,
            enable_look_at: session.cursor.read_u32()?,
            lock_current_values: session.cursor.read_u32()?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// A fade event with the given size word.
    fn fade(size: u32) -> Vec<u8> {
        words(&[
            size,
            EventType::Fade.tag(),
            0,
            1.0f32.to_bits(),
            0,
            0.5f32.to_bits(),
            0,
            2.0f32.to_bits(),
        ])
    }

    #[test]
    fn test_zero_size_word_preserved() {
        let data = fade(0);
        let mut session = DecodeSession::new(&data);
        let event = BaseEventData::decode(&mut session).unwrap();
        assert!(!event.declares_size);
        assert_eq!(event.frame, 1.0);

        let bytes = RelativeWriter::encode_root(&event).unwrap();
        assert_eq!(bytes, data);
    }

    #[test]
    fn test_declared_size_recomputed() {
        let data = fade(99);
        let mut session = DecodeSession::new(&data);
        let event = BaseEventData::decode(&mut session).unwrap();
        assert!(event.declares_size);

        let bytes = RelativeWriter::encode_root(&event).unwrap();
        assert_eq!(bytes, fade(32));
    }
}
