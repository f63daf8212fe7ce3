//! Property Record Tests
//!
//! Tests for:
//! - Record generation: name table, index dispatch, typed accessors
//! - Serialize/deserialize round-trips over the compact map form
//! - Change notification through the bound notifier
//! - Type-mismatch and parse-failure rejection

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use glam::{Mat4, Quat, UVec2, Vec2, Vec3, Vec4};
use prism::define_properties;
use prism::properties::{PropertyNotifier, PropertyRecord, PropertyType, PropertyValue};

define_properties! {
    pub struct SampleProps {
        visible: Bool = true,
        count: I32 = 7,
        seed: U64 = 42,
        opacity: F32 = 1.0,
        translation: Vec2 = Vec2::ZERO,
        tint: Vec3 = Vec3::ONE,
        region: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0),
        orientation: Quat = Quat::IDENTITY,
        placement: Mat4 = Mat4::IDENTITY,
        resolution: UVec2 = UVec2::new(1920, 1080),
        label: String = String::new(),
        asset_path: Path = PathBuf::new(),
    }
}

// ============================================================================
// Name table & index dispatch
// ============================================================================

#[test]
fn name_table_resolves_index_and_type() {
    let props = SampleProps::default();
    assert_eq!(props.property_desc("visible"), Some((0, PropertyType::Bool)));
    assert_eq!(
        props.property_desc("translation"),
        Some((SampleProps::TRANSLATION_INDEX, PropertyType::Vec2))
    );
    assert_eq!(props.property_desc("no_such"), None);
    assert_eq!(props.property_count(), 12);
}

#[test]
fn get_by_index_mirrors_fields() {
    let props = SampleProps::default();
    assert_eq!(
        props.get_by_index(SampleProps::COUNT_INDEX),
        Some(PropertyValue::I32(7))
    );
    assert_eq!(props.get_by_index(99), None);
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn serialize_deserialize_round_trip() {
    let mut props = SampleProps::default();
    props.visible = false;
    props.count = -3;
    props.opacity = 0.25;
    props.translation = Vec2::new(0.5, -0.5);
    props.tint = Vec3::new(1.0, 0.5, 0.25);
    props.orientation = Quat::from_rotation_z(1.0);
    props.placement = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    props.resolution = UVec2::new(640, 480);
    props.label = "layer one".to_string();
    props.asset_path = PathBuf::from("media/clip.png");

    let serialized = props.serialize();
    let mut restored = SampleProps::default();
    restored.deserialize(&serialized, false, None);

    assert_eq!(restored, props, "round trip through {serialized}");
}

#[test]
fn deserialize_skips_unknown_names_but_applies_the_rest() {
    let mut props = SampleProps::default();
    props.deserialize("{ bogus: 12, opacity: 0.5 }", false, None);
    assert!((props.opacity - 0.5).abs() < 1e-6);
}

#[test]
fn vector_values_use_bracket_form() {
    let mut props = SampleProps::default();
    props.translation = Vec2::new(1.5, -2.0);
    let serialized = props.serialize();
    assert!(serialized.contains("translation: [1.5,-2]"), "{serialized}");
}

// ============================================================================
// Notification
// ============================================================================

#[test]
fn setters_notify_with_serialized_values() {
    let received: Arc<Mutex<Vec<(u64, u32, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let notifier = PropertyNotifier::new(
        17,
        Arc::new(move |node, index, value| {
            sink.lock().unwrap().push((node, index, value.to_string()));
        }),
    );

    let mut props = SampleProps::default();
    props.set_opacity(0.5, true, Some(&notifier));
    props.set_opacity(0.25, false, Some(&notifier)); // notify = false
    props.set_serialized(SampleProps::COUNT_INDEX, "11", true, Some(&notifier));

    let received = received.lock().unwrap();
    assert_eq!(
        received.as_slice(),
        &[
            (17, SampleProps::OPACITY_INDEX, "0.5".to_string()),
            (17, SampleProps::COUNT_INDEX, "11".to_string()),
        ]
    );
}

#[test]
fn notify_property_change_re_announces_current_value() {
    let received: Arc<Mutex<Vec<(u32, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let notifier = PropertyNotifier::new(
        1,
        Arc::new(move |_, index, value| {
            sink.lock().unwrap().push((index, value.to_string()));
        }),
    );

    let mut props = SampleProps::default();
    props.label = "fade".to_string();
    props.notify_property_change(SampleProps::LABEL_INDEX, &notifier);
    assert_eq!(
        received.lock().unwrap().as_slice(),
        &[(SampleProps::LABEL_INDEX, "\"fade\"".to_string())]
    );
}

// ============================================================================
// Rejection paths
// ============================================================================

#[test]
fn type_mismatch_is_rejected_without_mutation() {
    let mut props = SampleProps::default();
    let ok = props.set_by_index(
        SampleProps::OPACITY_INDEX,
        &PropertyValue::String("nope".into()),
        false,
        None,
    );
    assert!(!ok);
    assert!((props.opacity - 1.0).abs() < 1e-6);
}

#[test]
fn parse_failure_is_rejected() {
    let mut props = SampleProps::default();
    assert!(!props.set_serialized(SampleProps::COUNT_INDEX, "not-a-number", false, None));
    assert!(!props.set_serialized(999, "1", false, None));
    assert_eq!(props.count, 7);
}
