//! Animation clip: property tracks bound to one target node, with playback
//! state and loop transforms.

use crate::graph::NodeKey;
use crate::properties::PropertyValue;
use crate::sync::INVALID_PTS;

use super::track::PropertyTrack;

/// How the clip maps local time past its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum LoopMode {
    /// Play once, clamped at the end.
    #[default]
    None,
    /// Wrap from the start.
    Repeat,
    /// Bounce back and forth with a `2 * duration` cycle.
    PingPong,
    /// Hold at the end.
    Hold,
}

impl LoopMode {
    #[must_use]
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => LoopMode::None,
            1 => LoopMode::Repeat,
            2 => LoopMode::PingPong,
            3 => LoopMode::Hold,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// A clip owns its tracks and tracks its own playback state against the
/// master clock PTS.
#[derive(Debug)]
pub struct AnimationClip {
    target_node: NodeKey,
    tracks: Vec<PropertyTrack>,
    pub loop_mode: LoopMode,
    /// Explicit duration in ticks; 0 derives from the tracks.
    pub clip_duration: i64,
    start_time: i64,
    state: AnimationState,
    pause_time: i64,
    pause_local_time: i64,
    accumulated_pause_time: i64,
}

impl AnimationClip {
    #[must_use]
    pub fn new(target_node: NodeKey) -> Self {
        Self {
            target_node,
            tracks: Vec::new(),
            loop_mode: LoopMode::None,
            clip_duration: 0,
            start_time: 0,
            state: AnimationState::Stopped,
            pause_time: 0,
            pause_local_time: 0,
            accumulated_pause_time: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn target_node(&self) -> NodeKey {
        self.target_node
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> AnimationState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn tracks(&self) -> &[PropertyTrack] {
        &self.tracks
    }

    #[inline]
    #[must_use]
    pub fn tracks_mut(&mut self) -> &mut [PropertyTrack] {
        &mut self.tracks
    }

    /// Returns an existing track for `property_index` after clearing its
    /// keyframes, or creates a new one.
    pub fn add_property_track(&mut self, track: PropertyTrack) -> usize {
        if let Some(pos) = self
            .tracks
            .iter()
            .position(|t| t.property_index == track.property_index)
        {
            self.tracks[pos].reset();
            return pos;
        }
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    pub fn remove_property_track(&mut self, index: usize) {
        if index < self.tracks.len() {
            self.tracks.remove(index);
        }
    }

    // ── Playback ────────────────────────────────────────────────────────────

    /// Starts playback. A valid `start_pts` re-anchors the clip.
    pub fn play(&mut self, start_pts: i64) {
        if start_pts != INVALID_PTS {
            self.start_time = start_pts;
        }
        self.state = AnimationState::Playing;
        self.accumulated_pause_time = 0;
        self.pause_time = 0;
        self.pause_local_time = 0;
    }

    pub fn pause(&mut self, current_pts: i64) {
        if self.state != AnimationState::Playing {
            return;
        }
        // Capture the frozen local time first; the state switch changes how
        // local time resolves.
        self.pause_local_time = self.local_time(current_pts);
        self.state = AnimationState::Paused;
        self.pause_time = current_pts;
    }

    pub fn resume(&mut self, current_pts: i64) {
        if self.state != AnimationState::Paused {
            return;
        }
        self.state = AnimationState::Playing;
        let pause_duration = current_pts - self.pause_time;
        self.accumulated_pause_time += pause_duration;
        // Shift the anchor so the animation resumes where it paused.
        self.start_time += pause_duration;
    }

    pub fn stop(&mut self) {
        self.state = AnimationState::Stopped;
        self.accumulated_pause_time = 0;
        self.pause_time = 0;
        self.pause_local_time = 0;
    }

    // ── Time mapping ────────────────────────────────────────────────────────

    /// Explicit duration if set, else the max track end time.
    #[must_use]
    pub fn effective_duration(&self) -> i64 {
        if self.clip_duration > 0 {
            return self.clip_duration;
        }
        self.tracks
            .iter()
            .filter(|t| t.has_keyframes())
            .map(PropertyTrack::absolute_end_time)
            .max()
            .unwrap_or(0)
    }

    /// Maps a global PTS to clip-local time under the loop transform.
    /// Returns [`INVALID_PTS`] when stopped or not yet started.
    #[must_use]
    pub fn local_time(&self, global_pts: i64) -> i64 {
        match self.state {
            AnimationState::Stopped => INVALID_PTS,
            AnimationState::Paused => self.pause_local_time,
            AnimationState::Playing => {
                if global_pts < self.start_time {
                    return INVALID_PTS;
                }
                let local = global_pts - self.start_time;
                let duration = self.effective_duration();
                if duration <= 0 {
                    return local;
                }
                self.apply_loop_transform(local, duration)
            }
        }
    }

    fn apply_loop_transform(&self, local_time: i64, duration: i64) -> i64 {
        match self.loop_mode {
            LoopMode::None | LoopMode::Hold => local_time.min(duration),
            LoopMode::Repeat => local_time % duration,
            LoopMode::PingPong => {
                let cycle_length = duration * 2;
                let cycle_time = local_time % cycle_length;
                if cycle_time < duration {
                    cycle_time
                } else {
                    duration - (cycle_time - duration)
                }
            }
        }
    }

    // ── Evaluation ──────────────────────────────────────────────────────────

    /// Evaluates every track at the clip-local time, emitting
    /// `(property_index, value)` through `apply` for each non-empty result.
    ///
    /// The empty variant means "no change" and is skipped, never replaced
    /// by a default.
    pub fn evaluate_at_time(&self, global_pts: i64, mut apply: impl FnMut(u32, PropertyValue)) {
        if self.state == AnimationState::Stopped {
            return;
        }
        let local_time = self.local_time(global_pts);
        if local_time < 0 {
            return;
        }
        for track in &self.tracks {
            if !track.has_keyframes() || !track.is_bound() {
                continue;
            }
            let value = track.evaluate_at_time(local_time);
            if value.is_empty() {
                continue;
            }
            apply(track.property_index, value);
        }
    }
}
