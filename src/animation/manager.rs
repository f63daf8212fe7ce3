//! Animation manager: owns clips and broadcasts playback control.

use slotmap::{new_key_type, SlotMap};

use crate::graph::NodeKey;
use crate::properties::PropertyValue;

use super::clip::AnimationClip;

new_key_type! {
    /// Generational handle of an animation clip.
    pub struct ClipKey;
}

/// Owns all clips; destroyed together with the graph model.
#[derive(Debug, Default)]
pub struct AnimationManager {
    clips: SlotMap<ClipKey, AnimationClip>,
}

impl AnimationManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a new clip to `target_node` and returns its handle.
    pub fn add_clip(&mut self, target_node: NodeKey) -> ClipKey {
        self.clips.insert(AnimationClip::new(target_node))
    }

    pub fn remove_clip(&mut self, key: ClipKey) {
        self.clips.remove(key);
    }

    /// Drops every clip bound to a node being removed from the graph.
    pub fn remove_clips_for_node(&mut self, node: NodeKey) {
        self.clips.retain(|_, clip| clip.target_node() != node);
    }

    #[must_use]
    pub fn get(&self, key: ClipKey) -> Option<&AnimationClip> {
        self.clips.get(key)
    }

    #[must_use]
    pub fn get_mut(&mut self, key: ClipKey) -> Option<&mut AnimationClip> {
        self.clips.get_mut(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    // ── Broadcast control ───────────────────────────────────────────────────

    pub fn play(&mut self, start_pts: i64) {
        for clip in self.clips.values_mut() {
            clip.play(start_pts);
        }
    }

    pub fn pause(&mut self, current_pts: i64) {
        for clip in self.clips.values_mut() {
            clip.pause(current_pts);
        }
    }

    pub fn resume(&mut self, current_pts: i64) {
        for clip in self.clips.values_mut() {
            clip.resume(current_pts);
        }
    }

    pub fn stop(&mut self) {
        for clip in self.clips.values_mut() {
            clip.stop();
        }
    }

    /// Evaluates all clips at `global_pts`, emitting
    /// `(target_node, property_index, value)` for every property write.
    pub fn evaluate_at_pts(
        &self,
        global_pts: i64,
        mut apply: impl FnMut(NodeKey, u32, PropertyValue),
    ) {
        for clip in self.clips.values() {
            let target = clip.target_node();
            clip.evaluate_at_time(global_pts, |index, value| {
                apply(target, index, value);
            });
        }
    }
}
