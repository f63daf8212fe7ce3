//! Mutable graph model.
//!
//! Owns the node arena, the connection set, dirty tracking, the animation
//! manager and the output scheduler. All state here belongs to the driver
//! thread; notifier callbacks run synchronously on it and must not re-enter
//! the model.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use slotmap::Key;

use crate::animation::{apply_track_json, keyframe_from_json, AnimationManager, ClipKey, PropertyTrack};
use crate::errors::{PrismError, Result};
use crate::properties::{NotifyFn, PropertyNotifier, INVALID_PROPERTY_INDEX};
use crate::sync::{MasterClock, PtsClock};

use super::factory::{NodeContext, NodeRegistry};
use super::node::{EvaluationStrategy, NodeArena, NodeKey, NodeKind};
use super::ports::{Connection, PortKind, SourceTarget};
use super::scheduler::OutputScheduler;

/// Handle of a property track within a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackRef {
    pub clip: ClipKey,
    pub index: usize,
}

/// The scheduler-driven graph model.
///
/// Generic over the master clock so tests can drive virtual time.
pub struct GraphModel<C: MasterClock = PtsClock> {
    arena: NodeArena,
    outputs: Vec<NodeKey>,
    connections: FxHashSet<Connection>,
    dirty_nodes: FxHashSet<NodeKey>,
    animation: AnimationManager,
    scheduler: OutputScheduler<C>,
    registry: Arc<NodeRegistry>,
    change_observer: Option<Arc<NotifyFn>>,
}

impl GraphModel<PtsClock> {
    #[must_use]
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self::with_clock(registry, PtsClock::new())
    }
}

impl<C: MasterClock> GraphModel<C> {
    #[must_use]
    pub fn with_clock(registry: Arc<NodeRegistry>, clock: C) -> Self {
        Self {
            arena: NodeArena::new(),
            outputs: Vec::new(),
            connections: FxHashSet::default(),
            dirty_nodes: FxHashSet::default(),
            animation: AnimationManager::new(),
            scheduler: OutputScheduler::with_clock(clock),
            registry,
            change_observer: None,
        }
    }

    /// Binds the UI-side observer invoked by property setters.
    pub fn set_change_observer(&mut self, observer: Arc<NotifyFn>) {
        self.change_observer = Some(observer);
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    #[inline]
    #[must_use]
    pub fn outputs(&self) -> &[NodeKey] {
        &self.outputs
    }

    #[inline]
    #[must_use]
    pub fn connections(&self) -> &FxHashSet<Connection> {
        &self.connections
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &OutputScheduler<C> {
        &self.scheduler
    }

    #[inline]
    #[must_use]
    pub fn scheduler_mut(&mut self) -> &mut OutputScheduler<C> {
        &mut self.scheduler
    }

    #[inline]
    #[must_use]
    pub fn animation(&self) -> &AnimationManager {
        &self.animation
    }

    // ── Node lifecycle ──────────────────────────────────────────────────────

    /// Creates a node of the named type, binds its notifier, and registers
    /// it with the scheduler when it is an output.
    pub fn create_node(
        &mut self,
        ctx: &NodeContext,
        node_name: &str,
        properties: &str,
    ) -> Result<NodeKey> {
        let node = match self.registry.create(node_name, ctx, properties) {
            Ok(node) => node,
            Err(err) => {
                log::error!("Failed to create node `{node_name}`: {err}");
                return Err(err);
            }
        };
        let kind = node.node_kind();
        let fps = node.output_fps();
        let strategy = node.evaluation_strategy();

        let key = self.arena.insert(node);
        if let Some(observer) = &self.change_observer {
            if let Some(mut node) = self.arena.get_mut(key) {
                node.set_notifier(PropertyNotifier::new(
                    key.data().as_ffi(),
                    Arc::clone(observer),
                ));
            }
        }

        if kind == NodeKind::Output {
            self.outputs.push(key);
            self.scheduler.add_output(key, fps);
        }

        // Static nodes get their initial update on the next tick.
        if strategy == EvaluationStrategy::Static {
            self.dirty_nodes.insert(key);
        }
        Ok(key)
    }

    /// Removes a node, first rebinding all incident connections.
    pub fn remove_node(&mut self, key: NodeKey) {
        if !self.arena.contains(key) {
            log::error!("Node not found in the graph: {key:?}");
            return;
        }

        // Upstream half: edges terminating at this node's sinks.
        let sinks: Vec<(u32, NodeKey, u32)> = {
            let node = self.arena.get(key).expect("checked above");
            node.sinks()
                .iter()
                .enumerate()
                .filter_map(|(i, sink)| {
                    sink.source_node
                        .map(|source| (i as u32, source, sink.source_index))
                })
                .collect()
        };
        for (sink_index, source_node, source_index) in sinks {
            self.connections.remove(&Connection {
                from_node: source_node,
                from_index: source_index,
                to_node: key,
                to_index: sink_index,
            });
            if let Some(mut source) = self.arena.get_mut(source_node) {
                if let Some(port) = source.sources_mut().get_mut(source_index as usize) {
                    port.targets.remove(&SourceTarget {
                        sink_index,
                        sink_node: key,
                    });
                }
            }
        }

        // Downstream half: edges originating at this node's sources.
        let targets: Vec<(u32, SourceTarget)> = {
            let node = self.arena.get(key).expect("checked above");
            node.sources()
                .iter()
                .enumerate()
                .flat_map(|(i, source)| {
                    source
                        .targets
                        .iter()
                        .map(move |target| (i as u32, *target))
                })
                .collect()
        };
        for (source_index, target) in targets {
            self.connections.remove(&Connection {
                from_node: key,
                from_index: source_index,
                to_node: target.sink_node,
                to_index: target.sink_index,
            });
            if let Some(mut sink_node) = self.arena.get_mut(target.sink_node) {
                if let Some(sink) = sink_node.sinks_mut().get_mut(target.sink_index as usize) {
                    sink.reset();
                }
            }
        }

        self.dirty_nodes.remove(&key);
        let is_output = self
            .arena
            .get(key)
            .map(|n| n.node_kind() == NodeKind::Output)
            .unwrap_or(false);
        if is_output {
            self.scheduler.remove_output(key);
            self.outputs.retain(|&o| o != key);
        }
        self.arena.remove(key);
    }

    // ── Connections ─────────────────────────────────────────────────────────

    /// Connects `(from, from_index)` to `(to, to_index)`.
    ///
    /// Validates handles, index ranges, port compatibility and acyclicity.
    /// An occupied sink is overwritten: the stale edge is erased in full
    /// before the new one is installed. Returns `false` without mutating
    /// state on any validation failure or duplicate edge.
    pub fn connect_nodes(
        &mut self,
        from: NodeKey,
        from_index: i32,
        to: NodeKey,
        to_index: i32,
    ) -> bool {
        if !self.arena.contains(from) || !self.arena.contains(to) {
            log::error!("Failed to connect nodes: one or both nodes not found.");
            return false;
        }
        let source_kind = {
            let node = self.arena.get(from).expect("checked above");
            let sources = node.sources();
            if from_index < 0 || from_index as usize >= sources.len() {
                log::error!("Invalid output index {} for node {}", from_index, node.info());
                return false;
            }
            sources[from_index as usize].kind
        };
        let sink_state = {
            let node = self.arena.get(to).expect("checked above");
            let sinks = node.sinks();
            if to_index < 0 || to_index as usize >= sinks.len() {
                log::error!("Invalid input index {} for node {}", to_index, node.info());
                return false;
            }
            let sink = &sinks[to_index as usize];
            (sink.kind, sink.source_node, sink.source_index)
        };
        let (sink_kind, prev_source, prev_source_index) = sink_state;

        if !PortKind::compatible(source_kind, sink_kind) {
            log::error!(
                "Incompatible port types: {from:?} (output {from_index}) -> {to:?} (input {to_index})"
            );
            return false;
        }

        // Cycles are rejected up front: if `from` is reachable downstream
        // of `to`, this edge would close a loop.
        if self.reachable_downstream(to, from) {
            log::error!(
                "Rejected connection {from:?} -> {to:?}: edge would create a cycle"
            );
            return false;
        }

        let (from_index, to_index) = (from_index as u32, to_index as u32);
        let connection = Connection {
            from_node: from,
            from_index,
            to_node: to,
            to_index,
        };
        if !self.connections.insert(connection) {
            log::warn!(
                "Connection already exists: {from:?} -> {to:?} ({from_index} -> {to_index})"
            );
            return false;
        }

        // Overwrite case: erase the stale edge in full first.
        if let Some(prev_source) = prev_source {
            log::warn!("Overwriting existing connection at input index {to_index} on node {to:?}");
            self.connections.remove(&Connection {
                from_node: prev_source,
                from_index: prev_source_index,
                to_node: to,
                to_index,
            });
            if let Some(mut prev) = self.arena.get_mut(prev_source) {
                if let Some(port) = prev.sources_mut().get_mut(prev_source_index as usize) {
                    port.targets.remove(&SourceTarget {
                        sink_index: to_index,
                        sink_node: to,
                    });
                }
            }
        }

        {
            let mut node = self.arena.get_mut(to).expect("checked above");
            let sink = &mut node.sinks_mut()[to_index as usize];
            sink.source_node = Some(from);
            sink.source_index = from_index;
        }
        {
            let mut node = self.arena.get_mut(from).expect("checked above");
            node.sources_mut()[from_index as usize]
                .targets
                .insert(SourceTarget {
                    sink_index: to_index,
                    sink_node: to,
                });
        }

        self.mark_dirty_if_static(to);
        true
    }

    /// Disconnects the exact edge `(from, from_index) -> (to, to_index)`.
    pub fn disconnect_nodes(
        &mut self,
        from: NodeKey,
        from_index: i32,
        to: NodeKey,
        to_index: i32,
    ) -> bool {
        if !self.arena.contains(from) || !self.arena.contains(to) {
            log::error!("Failed to disconnect nodes: one or both nodes not found.");
            return false;
        }
        if from_index < 0 || to_index < 0 {
            log::error!("Invalid port index on disconnect: {from_index} -> {to_index}");
            return false;
        }
        let (from_index, to_index) = (from_index as u32, to_index as u32);
        let connection = Connection {
            from_node: from,
            from_index,
            to_node: to,
            to_index,
        };
        if !self.connections.remove(&connection) {
            log::warn!(
                "Connection does not exist: {from:?} -> {to:?} ({from_index} -> {to_index})"
            );
            return false;
        }

        if let Some(mut node) = self.arena.get_mut(to) {
            if let Some(sink) = node.sinks_mut().get_mut(to_index as usize) {
                sink.reset();
            }
        }
        if let Some(mut node) = self.arena.get_mut(from) {
            if let Some(port) = node.sources_mut().get_mut(from_index as usize) {
                port.targets.remove(&SourceTarget {
                    sink_index: to_index,
                    sink_node: to,
                });
            }
        }

        self.mark_dirty_if_static(to);
        true
    }

    /// Walks downstream from `start` through source targets; `true` when
    /// `needle` is reachable (including `start == needle`).
    fn reachable_downstream(&self, start: NodeKey, needle: NodeKey) -> bool {
        if start == needle {
            return true;
        }
        let mut visited: FxHashSet<NodeKey> = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(key) = stack.pop() {
            if !visited.insert(key) {
                continue;
            }
            let Some(node) = self.arena.get(key) else {
                continue;
            };
            for source in node.sources() {
                for target in &source.targets {
                    if target.sink_node == needle {
                        return true;
                    }
                    stack.push(target.sink_node);
                }
            }
        }
        false
    }

    // ── Properties ──────────────────────────────────────────────────────────

    pub fn set_node_property(&mut self, key: NodeKey, index: u32, value: &str, notify: bool) {
        let Some(mut node) = self.arena.get_mut(key) else {
            log::error!("Node not found in the graph: {key:?}");
            return;
        };
        node.set_property(index, value, notify);
        let is_output = node.node_kind() == NodeKind::Output;
        let fps = node.output_fps();
        drop(node);
        if is_output {
            // Frame rate properties feed the scheduler's cached rate.
            self.scheduler.set_output_rate(key, fps);
        }
        self.mark_dirty_if_static(key);
    }

    pub fn set_node_property_by_name(&mut self, key: NodeKey, name: &str, value: &str, notify: bool) {
        let index = {
            let Some(node) = self.arena.get(key) else {
                log::error!("Node not found in the graph: {key:?}");
                return;
            };
            match node.property_desc(name) {
                Some((index, _)) => index,
                None => {
                    log::error!("Unknown property `{name}` on node {key:?}");
                    return;
                }
            }
        };
        self.set_node_property(key, index, value, notify);
    }

    #[must_use]
    pub fn node_properties(&self, key: NodeKey) -> String {
        self.arena
            .get(key)
            .map_or_else(|| "{}".to_string(), |node| node.properties())
    }

    pub fn set_node_info(&mut self, key: NodeKey, info: &str) {
        if let Some(mut node) = self.arena.get_mut(key) {
            node.set_info(info);
        }
    }

    fn mark_dirty_if_static(&mut self, key: NodeKey) {
        if let Some(node) = self.arena.get(key) {
            if node.evaluation_strategy() == EvaluationStrategy::Static {
                self.dirty_nodes.insert(key);
            }
        }
    }

    // ── Animation ───────────────────────────────────────────────────────────

    /// Binds a new clip to `node`.
    pub fn create_animation(&mut self, node: NodeKey) -> Option<ClipKey> {
        if !self.arena.contains(node) {
            log::error!("Node not found in the graph: {node:?}");
            return None;
        }
        Some(self.animation.add_clip(node))
    }

    pub fn remove_animation(&mut self, clip: ClipKey) {
        self.animation.remove_clip(clip);
    }

    #[must_use]
    pub fn animation_clip(&self, clip: ClipKey) -> Option<&crate::animation::AnimationClip> {
        self.animation.get(clip)
    }

    #[must_use]
    pub fn animation_clip_mut(
        &mut self,
        clip: ClipKey,
    ) -> Option<&mut crate::animation::AnimationClip> {
        self.animation.get_mut(clip)
    }

    /// Creates (or reuses) a track for the named property of the clip's
    /// target node, optionally loading keyframes from track JSON.
    pub fn add_property_track(
        &mut self,
        clip: ClipKey,
        property_name: &str,
        keyframes_json: &str,
    ) -> Result<TrackRef> {
        let target = self
            .animation
            .get(clip)
            .map(|c| c.target_node())
            .ok_or_else(|| PrismError::PropertyParseError("invalid animation handle".into()))?;

        let (index, kind) = {
            let node = self
                .arena
                .get(target)
                .ok_or(PrismError::NodeNotFound(target.data().as_ffi()))?;
            node.property_desc(property_name).ok_or_else(|| {
                log::error!("Property '{property_name}' not found on target node");
                PrismError::PropertyParseError(format!("unknown property {property_name}"))
            })?
        };
        if index == INVALID_PROPERTY_INDEX {
            return Err(PrismError::PropertyParseError(format!(
                "unknown property {property_name}"
            )));
        }

        let clip_ref = self.animation.get_mut(clip).expect("checked above");
        let track_index =
            clip_ref.add_property_track(PropertyTrack::new(property_name, index, kind));

        if !keyframes_json.is_empty() {
            if let Err(err) =
                apply_track_json(&mut clip_ref.tracks_mut()[track_index], keyframes_json)
            {
                log::error!("Failed to deserialize keyframes for property: {property_name}");
                clip_ref.remove_property_track(track_index);
                return Err(err);
            }
        }
        Ok(TrackRef {
            clip,
            index: track_index,
        })
    }

    /// Parses and inserts one keyframe into a track.
    pub fn add_keyframe(&mut self, track: TrackRef, keyframe_json: &str) -> Result<()> {
        let clip = self
            .animation
            .get_mut(track.clip)
            .ok_or_else(|| PrismError::PropertyParseError("invalid track handle".into()))?;
        let track_slot = clip
            .tracks_mut()
            .get_mut(track.index)
            .ok_or_else(|| PrismError::PropertyParseError("invalid track handle".into()))?;
        let frame = keyframe_from_json(track_slot.property_type, keyframe_json)?;
        track_slot.add_keyframe(frame);
        Ok(())
    }

    pub fn remove_keyframe(&mut self, track: TrackRef, keyframe_index: usize) {
        if let Some(clip) = self.animation.get_mut(track.clip) {
            if let Some(track_slot) = clip.tracks_mut().get_mut(track.index) {
                track_slot.remove_keyframe(keyframe_index);
            }
        }
    }

    // ── Playback & driving ──────────────────────────────────────────────────

    /// Resets the master clock, re-anchors every scheduled output and
    /// restarts all clips.
    pub fn play(&mut self) {
        let now = self.scheduler.play();
        for &output in &self.outputs {
            if let Some(mut node) = self.arena.get_mut(output) {
                node.set_base_pts(now as i64);
            }
        }
        self.animation.play(now as i64);
    }

    pub fn pause(&mut self) {
        let now = self.scheduler.current_pts() as i64;
        self.animation.pause(now);
    }

    pub fn resume(&mut self) {
        let now = self.scheduler.current_pts() as i64;
        self.animation.resume(now);
    }

    pub fn stop(&mut self) {
        self.animation.stop();
    }

    /// One driver tick: run pending updates, evaluate the next due output,
    /// then advance the animation engine.
    ///
    /// Returns `false` when no output was due; the caller may sleep until
    /// [`OutputScheduler::next_due_pts`].
    pub fn tick(&mut self) -> bool {
        self.process_updates();

        let Some((output, pts)) = self.scheduler.next_ready_output() else {
            return false;
        };

        if let Some(mut node) = self.arena.get_mut(output) {
            node.evaluate_output(&self.arena, pts);
        }

        let now = self.scheduler.current_pts() as i64;
        let arena = &self.arena;
        self.animation.evaluate_at_pts(now, |node, index, value| {
            if let Some(mut target) = arena.get_mut(node) {
                // Animation writes never notify; the UI polls tracks.
                target.set_property_value(index, &value, false);
            }
        });
        true
    }

    /// Runs `update` once for every dynamic node and every dirty static
    /// node.
    fn process_updates(&mut self) {
        let keys: Vec<NodeKey> = self.arena.keys().collect();
        for key in keys {
            let Some(mut node) = self.arena.get_mut(key) else {
                continue;
            };
            let dynamic = node.evaluation_strategy() != EvaluationStrategy::Static;
            if dynamic || self.dirty_nodes.contains(&key) {
                node.update();
            }
        }
        self.dirty_nodes.clear();
    }
}
