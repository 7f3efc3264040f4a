//! The BLND document model.
//!
//! # Structure Overview
//!
//! A BLND file is a [`BinaryHeader`](crate::BinaryHeader) followed by a
//! single [`PoolData`] record. Everything else hangs off the pool:
//!
//! - [`BlendData`] / [`TransitionClipData`]: blend and transition tables
//! - [`TrackResource`]: blend tracks (inline array)
//! - [`ClipResource`]: named clips wrapping a polymorphic [`ClipData`]
//! - [`MaskResource`]: per-joint blend weights
//! - [`EventResource`]: event lists with polymorphic [`BaseEventData`]
//! - [`AnimResource`]: animation headers referenced by index
//! - [`PathRecord`]: hashed path strings (animation names, skeleton)
//!
//! Records that several parents may point at are held in an [`Rc`](std::rc::Rc).
//! Decoding a file hands out one `Rc` per distinct file position, and
//! encoding writes each distinct `Rc` once.
//!
//! # Resource Records
//!
//! Most records begin with their own encoded size. That field is never
//! stored on the model; it is recomputed from the layout on every encode.

mod anim;
mod blend;
mod clip;
mod event;
mod mask;
mod path;
mod pool;
mod track;
mod updater;

pub use anim::{AnimBlock, AnimResource};
pub use blend::{BlendData, TransitionClipData, TransitionToData};
pub use clip::{
    AtomicClip, ClipData, ClipFlags, ClipResource, ClipType, ConditionClip, ParallelClip,
    ParametricClip, SelectorClip,
};
pub use event::{
    BaseEventData, EnableLookAtEvent, EventFrame, EventNameHash, EventPayload, EventResource,
    EventType, FadeEvent, JointSnapEvent, ParticleEvent, SoundEvent, SubmeshVisibilityEvent,
};
pub use mask::{JointHash, JointIndex, MaskElement, MaskResource};
pub use path::PathRecord;
pub use pool::PoolData;
pub use track::TrackResource;
pub use updater::{AnimValueProcessorData, UpdaterData, UpdaterResource};

use crate::{Error, Result};

/// Width of the fixed name field in masks and tracks.
pub const NAME_LEN: usize = 32;

/// Convert a live collection length into its on-disk count field.
pub(crate) fn count_field<T: TryFrom<usize>>(field: &'static str, len: usize) -> Result<T> {
    T::try_from(len).map_err(|_| Error::CountOverflow { field, count: len })
}
