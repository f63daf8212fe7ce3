//! Output Scheduler Tests
//!
//! Tests for:
//! - Multi-rate scheduling against one master clock (60 Hz + 30 Hz sweep)
//! - Frame-grid preservation across dropped frames
//! - Per-output PTS monotonicity
//! - Idle re-anchoring when the clock passes the scheduled horizon
//! - Play() re-basing outputs and clips

mod common;

use common::{test_registry, ManualClock};

use std::sync::Arc;

use prism::graph::{GraphModel, NodeContext, NodeKey};
use prism::sync::TIMEBASE_HZ;

fn model_with_outputs(rates: &[(u32, u32)]) -> (GraphModel<ManualClock>, Vec<NodeKey>) {
    let mut model = GraphModel::with_clock(Arc::new(test_registry()), ManualClock::new());
    let ctx = NodeContext::headless();
    let outputs = rates
        .iter()
        .map(|(num, den)| {
            model
                .create_node(&ctx, "TestOutput", &format!("{{ framerate: [{num},{den}] }}"))
                .unwrap()
        })
        .collect();
    (model, outputs)
}

// ============================================================================
// Multi-rate sweep
// ============================================================================

#[test]
fn two_outputs_at_different_rates_cover_one_second() {
    let (mut model, outputs) = model_with_outputs(&[(60, 1), (30, 1)]);
    let (fast, slow) = (outputs[0], outputs[1]);

    let mut returned: Vec<(NodeKey, i64)> = Vec::new();
    // Sweep just short of the t=90000 boundary (the epsilon window would
    // pull the next second's first frame in otherwise).
    let mut t = 0u64;
    while t <= 89_750 {
        model.scheduler_mut().master_clock_mut().set(t);
        while let Some(hit) = model.scheduler_mut().next_ready_output() {
            returned.push(hit);
        }
        t += 50;
    }

    let fast_pts: Vec<i64> = returned
        .iter()
        .filter(|(k, _)| *k == fast)
        .map(|(_, p)| *p)
        .collect();
    let slow_pts: Vec<i64> = returned
        .iter()
        .filter(|(k, _)| *k == slow)
        .map(|(_, p)| *p)
        .collect();

    assert_eq!(fast_pts.len(), 60, "60 Hz output: {fast_pts:?}");
    assert_eq!(slow_pts.len(), 30, "30 Hz output: {slow_pts:?}");

    // Every PTS sits on its output's frame grid.
    for pts in &fast_pts {
        assert_eq!(pts % 1500, 0, "off-grid 60 Hz pts {pts}");
    }
    for pts in &slow_pts {
        assert_eq!(pts % 3000, 0, "off-grid 30 Hz pts {pts}");
    }

    // Per-output monotonicity, and no global time-order inversion.
    assert!(fast_pts.windows(2).all(|w| w[1] > w[0]));
    assert!(slow_pts.windows(2).all(|w| w[1] > w[0]));
    assert!(returned.windows(2).all(|w| w[1].1 >= w[0].1));
}

// ============================================================================
// Drop-frame policy
// ============================================================================

#[test]
fn dropped_frames_stay_on_the_frame_grid() {
    // The 1 Hz output holds the scheduling horizon at 90000, so the 60 Hz
    // output takes the drop path instead of re-anchoring.
    let (mut model, outputs) = model_with_outputs(&[(60, 1), (1, 1)]);
    let fast = outputs[0];

    model.scheduler_mut().master_clock_mut().set(0);
    let mut first = Vec::new();
    while let Some(hit) = model.scheduler_mut().next_ready_output() {
        first.push(hit);
    }
    assert_eq!(first.len(), 2, "both outputs due at t=0");

    // Skip seven periods of the fast output, then poll on its grid.
    model.scheduler_mut().master_clock_mut().set(10_500);
    let hit = model.scheduler_mut().next_ready_output();
    assert_eq!(hit, Some((fast, 10_500)));

    // Between grid points nothing is due.
    model.scheduler_mut().master_clock_mut().set(12_700);
    assert_eq!(model.scheduler_mut().next_ready_output(), None);
    model.scheduler_mut().master_clock_mut().set(13_500);
    assert_eq!(model.scheduler_mut().next_ready_output(), Some((fast, 13_500)));
}

#[test]
fn idle_scheduler_reanchors_instead_of_replaying() {
    let (mut model, outputs) = model_with_outputs(&[(60, 1)]);
    let output = outputs[0];

    model.scheduler_mut().master_clock_mut().set(0);
    assert_eq!(model.scheduler_mut().next_ready_output(), Some((output, 0)));

    // The clock runs far past everything scheduled; the next poll anchors
    // at "now" rather than burning through the backlog.
    model.scheduler_mut().master_clock_mut().set(50_000);
    assert_eq!(
        model.scheduler_mut().next_ready_output(),
        Some((output, 50_000))
    );
    // And the grid restarts from the new anchor.
    model.scheduler_mut().master_clock_mut().set(51_500);
    assert_eq!(
        model.scheduler_mut().next_ready_output(),
        Some((output, 51_500))
    );
}

// ============================================================================
// Play
// ============================================================================

#[test]
fn play_rebases_outputs_to_a_common_origin() {
    let (mut model, outputs) = model_with_outputs(&[(60, 1), (30, 1)]);

    model.scheduler_mut().master_clock_mut().set(6_000);
    model.play();

    for &output in &outputs {
        let node = model.arena().get(output).unwrap();
        assert_eq!(node.base_pts(), 6_000);
    }

    // Both outputs come due together at the new base.
    model.scheduler_mut().master_clock_mut().set(6_000);
    let mut due = Vec::new();
    while let Some(hit) = model.scheduler_mut().next_ready_output() {
        due.push(hit.1);
    }
    assert_eq!(due, vec![6_000, 6_000]);
}

// ============================================================================
// Rational arithmetic at the scheduler boundary
// ============================================================================

#[test]
fn fractional_rates_do_not_drift() {
    // NTSC 29.97: frames at 3003-tick spacing with exact integer math.
    let (mut model, outputs) = model_with_outputs(&[(30_000, 1001)]);
    let output = outputs[0];

    let mut pts_values = Vec::new();
    let mut t = 0u64;
    while pts_values.len() < 100 {
        model.scheduler_mut().master_clock_mut().set(t);
        while let Some((key, pts)) = model.scheduler_mut().next_ready_output() {
            assert_eq!(key, output);
            pts_values.push(pts);
        }
        t += 100;
    }

    for (frame, pts) in pts_values.iter().enumerate() {
        let expected = (TIMEBASE_HZ * 1001 * frame as u64) / 30_000;
        assert_eq!(*pts, expected as i64, "frame {frame} drifted");
    }
}
