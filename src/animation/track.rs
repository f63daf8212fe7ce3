//! Property track: ordered keyframes for one property of one node.

use crate::properties::{PropertyType, PropertyValue, INVALID_PROPERTY_INDEX};

use super::easing::ease;
use super::keyframe::{Keyframe, KeyframeData, NO_KEYFRAME};

/// Behavior before the first keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum PreKeyframeBehavior {
    /// Keep the property unchanged (evaluation yields the empty sentinel).
    #[default]
    Hold,
    /// Assume the first keyframe's value.
    UseFirstValue,
    /// Use the track's default value.
    UseDefault,
}

impl PreKeyframeBehavior {
    #[must_use]
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => PreKeyframeBehavior::Hold,
            1 => PreKeyframeBehavior::UseFirstValue,
            2 => PreKeyframeBehavior::UseDefault,
            _ => return None,
        })
    }
}

/// Behavior at or after the last keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum PostKeyframeBehavior {
    /// Hold the last keyframe's value.
    #[default]
    Hold,
    /// Return to the track's default value.
    UseDefault,
    /// Loop; the wrap itself is the clip's loop transform, so at track
    /// level this reduces to Hold.
    Loop,
}

impl PostKeyframeBehavior {
    #[must_use]
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => PostKeyframeBehavior::Hold,
            1 => PostKeyframeBehavior::UseDefault,
            2 => PostKeyframeBehavior::Loop,
            _ => return None,
        })
    }
}

/// Keyframes plus extrapolation policy for one animated property.
#[derive(Debug, Clone, Default)]
pub struct PropertyTrack {
    pub property_name: String,
    pub property_index: u32,
    pub property_type: PropertyType,
    pub pre_behavior: PreKeyframeBehavior,
    pub post_behavior: PostKeyframeBehavior,
    pub default_value: PropertyValue,
    keyframes: KeyframeData,
}

impl PropertyTrack {
    #[must_use]
    pub fn new(property_name: &str, property_index: u32, property_type: PropertyType) -> Self {
        Self {
            property_name: property_name.to_string(),
            property_index,
            property_type,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn has_keyframes(&self) -> bool {
        !self.keyframes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn keyframes(&self) -> &KeyframeData {
        &self.keyframes
    }

    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.property_index != INVALID_PROPERTY_INDEX
    }

    /// Clears keyframes but keeps the binding and policies.
    pub fn reset(&mut self) {
        self.keyframes.clear();
    }

    pub fn add_keyframe(&mut self, frame: Keyframe) {
        self.keyframes.add(frame);
    }

    pub fn remove_keyframe(&mut self, index: usize) {
        self.keyframes.remove(index);
    }

    /// End time of the last keyframe, clip-relative.
    #[must_use]
    pub fn absolute_end_time(&self) -> i64 {
        self.keyframes.absolute_end_time()
    }

    /// Evaluates the track at a clip-local time.
    ///
    /// Returns [`PropertyValue::Empty`] when the property should not be
    /// written (pre-roll with `Hold`); callers must treat the empty variant
    /// as "no change", never as "write the default".
    #[must_use]
    pub fn evaluate_at_time(&self, time_from_start: i64) -> PropertyValue {
        if self.keyframes.is_empty() {
            return self.default_value.clone();
        }

        let (prev, next) = self.keyframes.find_keyframe_indices(time_from_start);

        // Before the first keyframe
        if prev == NO_KEYFRAME {
            return match self.pre_behavior {
                PreKeyframeBehavior::Hold => PropertyValue::Empty,
                PreKeyframeBehavior::UseFirstValue => {
                    self.keyframes.get(next).map(|f| f.value).unwrap_or_default()
                }
                PreKeyframeBehavior::UseDefault => self.default_value.clone(),
            };
        }

        // At or after the last keyframe
        if next == NO_KEYFRAME {
            let last = self.keyframes.get(prev).map(|f| f.value).unwrap_or_default();
            return match self.post_behavior {
                PostKeyframeBehavior::Hold | PostKeyframeBehavior::Loop => last,
                PostKeyframeBehavior::UseDefault => self.default_value.clone(),
            };
        }

        // Between keyframes: interpolate through the eased parameter.
        let Some(prev_frame) = self.keyframes.get(prev) else {
            return PropertyValue::Empty;
        };
        let Some(next_frame) = self.keyframes.get(next) else {
            return PropertyValue::Empty;
        };

        let duration = next_frame.time_from_start - prev_frame.time_from_start;
        if duration <= 0 {
            return prev_frame.value;
        }

        let t = (time_from_start - prev_frame.time_from_start) as f32 / duration as f32;
        let eased = ease(prev_frame.ease_type, t.clamp(0.0, 1.0));
        PropertyValue::interpolate(&prev_frame.value, &next_frame.value, eased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::EaseType;

    fn track_with(values: &[(i64, f32)]) -> PropertyTrack {
        let mut track = PropertyTrack::new("opacity", 0, PropertyType::F32);
        for &(t, v) in values {
            track.add_keyframe(Keyframe {
                time_from_start: t,
                value: PropertyValue::F32(v),
                ease_type: EaseType::Linear,
            });
        }
        track
    }

    #[test]
    fn empty_track_yields_default() {
        let mut track = PropertyTrack::new("opacity", 0, PropertyType::F32);
        track.default_value = PropertyValue::F32(0.25);
        assert_eq!(track.evaluate_at_time(0), PropertyValue::F32(0.25));
    }

    #[test]
    fn pre_hold_is_no_change_sentinel() {
        let track = track_with(&[(1000, 1.0)]);
        assert_eq!(track.evaluate_at_time(0), PropertyValue::Empty);
    }

    #[test]
    fn pre_use_first_value() {
        let mut track = track_with(&[(1000, 1.0)]);
        track.pre_behavior = PreKeyframeBehavior::UseFirstValue;
        assert_eq!(track.evaluate_at_time(0), PropertyValue::F32(1.0));
    }

    #[test]
    fn post_use_default() {
        let mut track = track_with(&[(0, 1.0)]);
        track.post_behavior = PostKeyframeBehavior::UseDefault;
        track.default_value = PropertyValue::F32(-1.0);
        assert_eq!(track.evaluate_at_time(500), PropertyValue::F32(-1.0));
    }

    #[test]
    fn midpoint_interpolates() {
        let track = track_with(&[(0, 0.0), (90_000, 1.0)]);
        let PropertyValue::F32(v) = track.evaluate_at_time(45_000) else {
            panic!("expected f32");
        };
        assert!((v - 0.5).abs() < 1e-5);
    }
}
