//! Frame-rate-aware output scheduler.
//!
//! A min-heap of scheduled outputs ordered by next-due PTS, driven by the
//! master clock. Heterogeneous output rates reconcile against one 90 kHz
//! timeline; overdue outputs drop frames and stay on their frame grid, and
//! an idle scheduler re-anchors rather than replaying the backlog.

use crate::sync::{round_to_frame_boundary, MasterClock, PtsClock, Rational, INVALID_PTS, TIMEBASE_HZ};

use super::node::NodeKey;

/// Timing tolerance in 90 kHz ticks (~2.2 ms). Within this window an output
/// counts as due.
pub const SCHEDULER_EPSILON_TICKS: i64 = 200;

/// Per-output scheduling state.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledOutput {
    pub output: NodeKey,
    pub last_pts: u64,
    pub base_pts: u64,
    pub next_pts: u64,
    pub frame_number: u64,
    pub framerate: Rational,
}

impl ScheduledOutput {
    /// Advances one frame and returns the presentation timestamp of the
    /// frame just scheduled.
    ///
    /// The next-due PTS is recomputed from the base and the integer frame
    /// number, not accumulated, so fractional rates (30000/1001) never
    /// drift.
    fn advance_to_next_frame(&mut self) -> u64 {
        self.frame_number += 1;
        self.last_pts = self.next_pts;
        if self.framerate.num() > 0 {
            self.next_pts = self.base_pts
                + (TIMEBASE_HZ * self.framerate.den() as u64 * self.frame_number)
                    / self.framerate.num() as u64;
        }
        self.last_pts
    }
}

/// Min-heap scheduler over registered outputs.
///
/// Generic over the master clock so tests can drive virtual time; the
/// default is the wall-clock-backed [`PtsClock`].
#[derive(Debug, Default)]
pub struct OutputScheduler<C: MasterClock = PtsClock> {
    master_clock: C,
    heap: Vec<ScheduledOutput>,
    /// Highest next-due PTS ever scheduled. When the clock passes it, every
    /// entry re-anchors to "now" instead of burning through the backlog.
    upper_boundary_pts: u64,
}

impl<C: MasterClock> OutputScheduler<C> {
    #[must_use]
    pub fn with_clock(master_clock: C) -> Self {
        Self {
            master_clock,
            heap: Vec::new(),
            upper_boundary_pts: 0,
        }
    }

    #[must_use]
    pub fn current_pts(&self) -> u64 {
        self.master_clock.current_pts()
    }

    #[must_use]
    pub fn master_clock(&self) -> &C {
        &self.master_clock
    }

    #[must_use]
    pub fn master_clock_mut(&mut self) -> &mut C {
        &mut self.master_clock
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Registers an output, aligning its base to the nearest frame boundary
    /// of its own rate.
    pub fn add_output(&mut self, output: NodeKey, framerate: Rational) {
        let base_pts = round_to_frame_boundary(self.master_clock.current_pts(), framerate);
        self.heap.push(ScheduledOutput {
            output,
            last_pts: 0,
            base_pts,
            next_pts: base_pts,
            frame_number: 0,
            framerate,
        });
        self.sift_up(self.heap.len() - 1);
    }

    /// Removes an output and re-heapifies.
    pub fn remove_output(&mut self, output: NodeKey) {
        self.heap.retain(|entry| entry.output != output);
        let len = self.heap.len();
        for i in (0..len / 2).rev() {
            self.sift_down(i);
        }
    }

    /// Updates the cached rate of an output (frame rate property changed).
    pub fn set_output_rate(&mut self, output: NodeKey, framerate: Rational) {
        let now = self.master_clock.current_pts();
        for entry in &mut self.heap {
            if entry.output == output {
                entry.framerate = framerate;
                entry.frame_number = 0;
                entry.base_pts = round_to_frame_boundary(now, framerate);
                entry.next_pts = entry.base_pts;
            }
        }
        let len = self.heap.len();
        for i in (0..len / 2).rev() {
            self.sift_down(i);
        }
    }

    /// Resets the master clock and restarts every entry at "now". Returns
    /// the new common base PTS so the caller can propagate it to the output
    /// nodes.
    pub fn play(&mut self) -> u64 {
        let now = self.master_clock.current_pts();
        self.master_clock.reset();
        for entry in &mut self.heap {
            entry.frame_number = 0;
            entry.last_pts = 0;
            entry.base_pts = now;
            entry.next_pts = now;
        }
        self.upper_boundary_pts = now;
        now
    }

    /// Returns the next due output and that frame's presentation PTS, or
    /// `None` when nothing is due yet.
    ///
    /// Overdue outputs are advanced frame by frame (each one a logged drop)
    /// until an entry lands inside the epsilon window, so the returned PTS
    /// is always on the output's frame grid.
    pub fn next_ready_output(&mut self) -> Option<(NodeKey, i64)> {
        if self.heap.is_empty() {
            return None;
        }

        let current_pts = self.master_clock.current_pts();
        if current_pts > self.upper_boundary_pts {
            // The clock ran past everything scheduled while outputs were
            // idle; re-anchor instead of replaying the gap.
            for entry in &mut self.heap {
                entry.frame_number = 0;
                entry.last_pts = 0;
                entry.base_pts = current_pts;
                entry.next_pts = current_pts;
            }
            self.upper_boundary_pts = current_pts;
        }

        loop {
            let entry = &mut self.heap[0];
            if entry.framerate.num() <= 0 || entry.framerate.den() <= 0 {
                // An output without a valid rate can never come due.
                return None;
            }
            let pts_diff = entry.next_pts as i64 - current_pts as i64;

            if pts_diff < -SCHEDULER_EPSILON_TICKS {
                // Overdue: drop this frame and keep looking.
                let output = entry.output;
                entry.advance_to_next_frame();
                let next = entry.next_pts;
                self.update_upper_bound(next);
                self.sift_down(0);
                log::warn!("OutputScheduler: dropped frame for overdue output {output:?}");
                continue;
            }
            if pts_diff.abs() <= SCHEDULER_EPSILON_TICKS {
                // Due now.
                let output = entry.output;
                let present_pts = entry.advance_to_next_frame();
                let next = entry.next_pts;
                self.update_upper_bound(next);
                self.sift_down(0);
                return Some((output, present_pts as i64));
            }
            // Not due yet.
            return None;
        }
    }

    /// PTS of the soonest scheduled frame, for drivers that want to sleep
    /// until work is due.
    #[must_use]
    pub fn next_due_pts(&self) -> i64 {
        self.heap.first().map_or(INVALID_PTS, |e| e.next_pts as i64)
    }

    fn update_upper_bound(&mut self, pts: u64) {
        if pts > self.upper_boundary_pts {
            self.upper_boundary_pts = pts;
        }
    }

    // ── Binary min-heap by next_pts ─────────────────────────────────────────

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].next_pts < self.heap[parent].next_pts {
                self.heap.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;
            if left < len && self.heap[left].next_pts < self.heap[smallest].next_pts {
                smallest = left;
            }
            if right < len && self.heap[right].next_pts < self.heap[smallest].next_pts {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.heap.swap(index, smallest);
            index = smallest;
        }
    }
}
