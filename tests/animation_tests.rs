//! Animation Engine Tests
//!
//! Tests for:
//! - Keyframe ordering and adjacency search under mutation
//! - Track pre/post extrapolation policies
//! - Clip loop transforms (Repeat round-trip, PingPong symmetry)
//! - Pause/resume value holding against the master clock PTS
//! - Track/keyframe JSON persistence through the graph model

mod common;

use common::{test_registry, ManualClock};

use std::sync::Arc;

use prism::animation::{
    AnimationClip, EaseType, Keyframe, LoopMode, PropertyTrack,
};
use prism::graph::{GraphModel, NodeContext, NodeKey};
use prism::properties::{PropertyType, PropertyValue};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn f32_keyframe(time: i64, value: f32) -> Keyframe {
    Keyframe {
        time_from_start: time,
        value: PropertyValue::F32(value),
        ease_type: EaseType::Linear,
    }
}

/// Clip with one linear f32 track from (0, 0.0) to (duration, 1.0).
fn ramp_clip(duration: i64) -> AnimationClip {
    let mut clip = AnimationClip::new(NodeKey::default());
    let mut track = PropertyTrack::new("opacity", 0, PropertyType::F32);
    track.add_keyframe(f32_keyframe(0, 0.0));
    track.add_keyframe(f32_keyframe(duration, 1.0));
    clip.add_property_track(track);
    clip
}

fn eval_f32(clip: &AnimationClip, global_pts: i64) -> Option<f32> {
    let mut result = None;
    clip.evaluate_at_time(global_pts, |_, value| {
        if let PropertyValue::F32(v) = value {
            result = Some(v);
        }
    });
    result
}

// ============================================================================
// Keyframe ordering
// ============================================================================

#[test]
fn keyframes_stay_ordered_under_mutation() {
    let mut track = PropertyTrack::new("opacity", 0, PropertyType::F32);
    for &(t, v) in &[(3000i64, 3.0f32), (1000, 1.0), (2000, 2.0), (500, 0.5)] {
        track.add_keyframe(f32_keyframe(t, v));
    }
    assert_eq!(track.keyframes().times(), &[500, 1000, 2000, 3000]);

    track.remove_keyframe(1);
    assert_eq!(track.keyframes().times(), &[500, 2000, 3000]);

    track.add_keyframe(f32_keyframe(1500, 1.5));
    assert_eq!(track.keyframes().times(), &[500, 1500, 2000, 3000]);

    // Adjacency stays correct over the whole sampled range.
    for t in (0..3500).step_by(100) {
        let (prev, next) = track.keyframes().find_keyframe_indices(t);
        let times = track.keyframes().times();
        if t < times[0] {
            assert_eq!((prev, next), (usize::MAX, 0));
        } else if t >= *times.last().unwrap() {
            assert_eq!((prev, next), (times.len() - 1, usize::MAX));
        } else {
            assert!(times[prev] <= t && t < times[next], "t={t}");
            assert_eq!(next, prev + 1);
        }
    }
}

// ============================================================================
// Loop transforms
// ============================================================================

#[test]
fn repeat_local_time_round_trips() {
    let duration = 90_000;
    let mut clip = ramp_clip(duration);
    clip.loop_mode = LoopMode::Repeat;
    clip.play(1_000);

    for n in 1..4i64 {
        for t in [0, 100, 44_000, 89_999] {
            let wrapped = clip.local_time(1_000 + n * duration + t);
            let direct = clip.local_time(1_000 + t);
            assert_eq!(wrapped, direct, "n={n} t={t}");
        }
    }
}

#[test]
fn ping_pong_is_reflected_at_the_midpoint() {
    let duration = 90_000;
    let mut clip = ramp_clip(duration);
    clip.loop_mode = LoopMode::PingPong;
    clip.play(0);

    for t in [1, 1_000, 30_000, 89_999] {
        let forward = clip.local_time(t);
        let mirrored = clip.local_time(2 * duration - t);
        assert_eq!(forward, mirrored, "t={t}");
    }
}

#[test]
fn hold_clamps_to_duration() {
    let duration = 90_000;
    let mut clip = ramp_clip(duration);
    clip.loop_mode = LoopMode::Hold;
    clip.play(0);

    assert_eq!(clip.local_time(duration + 50_000), duration);
    assert!(approx(eval_f32(&clip, duration + 50_000).unwrap(), 1.0));
}

#[test]
fn explicit_duration_overrides_track_end() {
    let mut clip = ramp_clip(90_000);
    clip.clip_duration = 45_000;
    assert_eq!(clip.effective_duration(), 45_000);
    clip.clip_duration = 0;
    assert_eq!(clip.effective_duration(), 90_000);
}

// ============================================================================
// Pause / resume
// ============================================================================

#[test]
fn paused_clip_holds_its_value_and_resume_shifts_the_anchor() {
    let mut clip = ramp_clip(90_000);
    clip.play(0);

    assert!(approx(eval_f32(&clip, 45_000).unwrap(), 0.5));

    clip.pause(45_000);
    // While paused, later clock values still evaluate at the pause point.
    assert!(approx(eval_f32(&clip, 60_000).unwrap(), 0.5));

    clip.resume(60_000);
    // 15000 ticks of pause shift the anchor: local time is now 60000.
    let value = eval_f32(&clip, 75_000).unwrap();
    assert!(approx(value, 60_000.0 / 90_000.0), "got {value}");
}

#[test]
fn stopped_clip_does_not_evaluate() {
    let mut clip = ramp_clip(90_000);
    clip.play(0);
    clip.stop();
    assert!(eval_f32(&clip, 45_000).is_none());
}

#[test]
fn evaluation_before_start_is_skipped() {
    let mut clip = ramp_clip(90_000);
    clip.play(10_000);
    assert!(eval_f32(&clip, 5_000).is_none());
}

// ============================================================================
// Pre/post behaviors through a clip
// ============================================================================

#[test]
fn pre_hold_emits_no_write() {
    let mut clip = AnimationClip::new(NodeKey::default());
    let mut track = PropertyTrack::new("opacity", 0, PropertyType::F32);
    track.add_keyframe(f32_keyframe(50_000, 1.0));
    clip.add_property_track(track);
    clip.play(0);

    // Before the first keyframe the track yields the no-change sentinel,
    // which must not surface as a property write.
    assert!(eval_f32(&clip, 10_000).is_none());
    assert!(eval_f32(&clip, 50_000).is_some());
}

// ============================================================================
// Persistence through the graph model
// ============================================================================

fn build_model() -> (GraphModel<ManualClock>, NodeContext) {
    let model = GraphModel::with_clock(Arc::new(test_registry()), ManualClock::new());
    (model, NodeContext::headless())
}

#[test]
fn track_json_loads_through_the_model() {
    let (mut model, ctx) = build_model();
    let node = model.create_node(&ctx, "TestSource", "{}").unwrap();
    let clip = model.create_animation(node).unwrap();

    let track = model
        .add_property_track(
            clip,
            "opacity",
            r#"{
                "property_name": "opacity",
                "pre_behavior": 1,
                "post_behavior": 0,
                "keyframes": [
                    { "time_from_start": 0, "value": 0.0 },
                    { "time_from_start": 90000, "value": 1.0 }
                ]
            }"#,
        )
        .unwrap();

    model
        .add_keyframe(track, r#"{ "time_from_start": 45000, "value": 0.25 }"#)
        .unwrap();

    let clip_ref = model.animation_clip(clip).unwrap();
    assert_eq!(clip_ref.tracks().len(), 1);
    assert_eq!(clip_ref.tracks()[0].keyframes().times(), &[0, 45_000, 90_000]);

    model.remove_keyframe(track, 1);
    let clip_ref = model.animation_clip(clip).unwrap();
    assert_eq!(clip_ref.tracks()[0].keyframes().times(), &[0, 90_000]);
}

#[test]
fn unknown_property_and_bad_json_are_errors() {
    let (mut model, ctx) = build_model();
    let node = model.create_node(&ctx, "TestSource", "{}").unwrap();
    let clip = model.create_animation(node).unwrap();

    assert!(model.add_property_track(clip, "no_such_prop", "").is_err());
    assert!(model.add_property_track(clip, "opacity", "not json").is_err());
    // The failed track load does not leave a half-initialized track.
    assert_eq!(model.animation_clip(clip).unwrap().tracks().len(), 0);
}

#[test]
fn animation_writes_apply_on_tick() {
    let (mut model, ctx) = build_model();
    let node = model.create_node(&ctx, "TestSource", "{}").unwrap();
    let output = model.create_node(&ctx, "TestOutput", "{}").unwrap();
    assert!(model.connect_nodes(node, 0, output, 0));

    let clip = model.create_animation(node).unwrap();
    model
        .add_property_track(
            clip,
            "opacity",
            r#"{
                "keyframes": [
                    { "time_from_start": 0, "value": 0.0 },
                    { "time_from_start": 90000, "value": 1.0 }
                ]
            }"#,
        )
        .unwrap();
    model.animation_clip_mut(clip).unwrap().play(0);

    // Drive one frame at t=45000; the post-traversal animation pass
    // writes the interpolated value into the node's record.
    model.scheduler_mut().master_clock_mut().set(45_000);
    assert!(model.tick());
    let properties = model.node_properties(node);
    assert!(properties.contains("opacity: 0.5"), "got {properties}");
}
