//! Persisted keyframe and track JSON.
//!
//! Wire format:
//!
//! ```json
//! { "time_from_start": 90000, "value": [1.0, 0.5], "ease_type": 2 }
//! ```
//!
//! for keyframes, and for tracks:
//!
//! ```json
//! {
//!   "property_name": "opacity",
//!   "property_index": 0,
//!   "property_type": 10,
//!   "pre_behavior": 0,
//!   "post_behavior": 0,
//!   "default_value": 1.0,
//!   "keyframes": [ ... ]
//! }
//! ```
//!
//! Enums travel as their underlying integers. Parsing returns structured
//! errors; there is no catch boundary.

use serde::Deserialize;

use crate::errors::{PrismError, Result};
use crate::properties::{PropertyType, PropertyValue};

use super::easing::EaseType;
use super::keyframe::Keyframe;
use super::track::{PostKeyframeBehavior, PreKeyframeBehavior, PropertyTrack};

#[derive(Debug, Deserialize)]
pub struct KeyframeJson {
    pub time_from_start: i64,
    pub value: serde_json::Value,
    #[serde(default)]
    pub ease_type: u32,
}

#[derive(Debug, Deserialize)]
pub struct TrackJson {
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub property_index: Option<u32>,
    #[serde(default)]
    pub property_type: Option<u32>,
    #[serde(default)]
    pub pre_behavior: Option<u32>,
    #[serde(default)]
    pub post_behavior: Option<u32>,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
    #[serde(default)]
    pub keyframes: Vec<KeyframeJson>,
}

fn invalid(msg: impl Into<String>) -> PrismError {
    PrismError::PropertyParseError(msg.into())
}

/// Converts a JSON value into a typed property value.
///
/// Numbers and booleans parse directly; arrays and strings reuse the compact
/// text grammar (the bracketed form of a JSON array is identical to it).
pub fn property_value_from_json(
    kind: PropertyType,
    value: &serde_json::Value,
) -> Result<PropertyValue> {
    let text = match value {
        serde_json::Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    };
    PropertyValue::parse(kind, &text)
        .ok_or_else(|| invalid(format!("cannot parse {text} as {kind:?}")))
}

/// Parses one keyframe JSON object against the track's property type.
pub fn keyframe_from_json(kind: PropertyType, json: &str) -> Result<Keyframe> {
    let parsed: KeyframeJson = serde_json::from_str(json)?;
    keyframe_from_parsed(kind, &parsed)
}

fn keyframe_from_parsed(kind: PropertyType, parsed: &KeyframeJson) -> Result<Keyframe> {
    Ok(Keyframe {
        time_from_start: parsed.time_from_start,
        value: property_value_from_json(kind, &parsed.value)?,
        ease_type: EaseType::from_u32(parsed.ease_type)
            .ok_or_else(|| invalid(format!("unknown ease_type {}", parsed.ease_type)))?,
    })
}

/// Applies track JSON onto an existing track: bindings, policies, default
/// value and keyframes. Fields absent from the JSON keep their current
/// values.
pub fn apply_track_json(track: &mut PropertyTrack, json: &str) -> Result<()> {
    let parsed: TrackJson = serde_json::from_str(json)?;

    if let Some(name) = parsed.property_name {
        track.property_name = name;
    }
    if let Some(index) = parsed.property_index {
        track.property_index = index;
    }
    if let Some(kind) = parsed.property_type {
        track.property_type = PropertyType::from_u32(kind)
            .ok_or_else(|| invalid(format!("unknown property_type {kind}")))?;
    }
    if let Some(pre) = parsed.pre_behavior {
        track.pre_behavior = PreKeyframeBehavior::from_u32(pre)
            .ok_or_else(|| invalid(format!("unknown pre_behavior {pre}")))?;
    }
    if let Some(post) = parsed.post_behavior {
        track.post_behavior = PostKeyframeBehavior::from_u32(post)
            .ok_or_else(|| invalid(format!("unknown post_behavior {post}")))?;
    }
    if let Some(default) = parsed.default_value {
        track.default_value = property_value_from_json(track.property_type, &default)?;
    }
    for frame in &parsed.keyframes {
        track.add_keyframe(keyframe_from_parsed(track.property_type, frame)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyframe_round_trip() {
        let frame = keyframe_from_json(
            PropertyType::Vec2,
            r#"{ "time_from_start": 4500, "value": [1.0, -2.0], "ease_type": 3 }"#,
        )
        .unwrap();
        assert_eq!(frame.time_from_start, 4500);
        assert_eq!(frame.value, PropertyValue::Vec2(glam::Vec2::new(1.0, -2.0)));
        assert_eq!(frame.ease_type, EaseType::EaseInOut);
    }

    #[test]
    fn track_json_applies_policies_and_keyframes() {
        let mut track = PropertyTrack::new("opacity", 2, PropertyType::F32);
        apply_track_json(
            &mut track,
            r#"{
                "property_name": "opacity",
                "property_index": 2,
                "property_type": 10,
                "pre_behavior": 2,
                "post_behavior": 1,
                "default_value": 0.5,
                "keyframes": [
                    { "time_from_start": 0, "value": 0.0 },
                    { "time_from_start": 90000, "value": 1.0, "ease_type": 1 }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(track.pre_behavior, PreKeyframeBehavior::UseDefault);
        assert_eq!(track.post_behavior, PostKeyframeBehavior::UseDefault);
        assert_eq!(track.default_value, PropertyValue::F32(0.5));
        assert_eq!(track.keyframes().len(), 2);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut track = PropertyTrack::new("opacity", 0, PropertyType::F32);
        assert!(apply_track_json(&mut track, "not json").is_err());
    }

    #[test]
    fn wrong_value_type_is_an_error() {
        assert!(keyframe_from_json(
            PropertyType::Vec3,
            r#"{ "time_from_start": 0, "value": "nope" }"#,
        )
        .is_err());
    }
}
