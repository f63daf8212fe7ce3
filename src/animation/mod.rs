//! Animation engine.
//!
//! Clips bind property tracks to graph nodes and are driven off the master
//! clock PTS: the driver evaluates all playing clips once per tick, after
//! render traversal. Keyframe times are 90 kHz ticks from clip start.

mod clip;
mod easing;
mod keyframe;
mod manager;
mod persist;
mod track;

pub use clip::{AnimationClip, AnimationState, LoopMode};
pub use easing::{ease, EaseType};
pub use keyframe::{Keyframe, KeyframeData, NO_KEYFRAME};
pub use manager::{AnimationManager, ClipKey};
pub use persist::{
    apply_track_json, keyframe_from_json, property_value_from_json, KeyframeJson, TrackJson,
};
pub use track::{PostKeyframeBehavior, PreKeyframeBehavior, PropertyTrack};
