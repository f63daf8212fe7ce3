//! Node contract and node storage.
//!
//! Nodes are concrete structs owning their property record by value; the
//! object-safe [`Node`] trait is the only dispatch surface. Handles are
//! generational slotmap keys, so a stale handle after removal simply fails
//! to resolve instead of dereferencing freed state. On the wire a handle
//! travels as the key's 64-bit FFI form.

use std::cell::RefCell;

use slotmap::{new_key_type, SlotMap};

use crate::properties::{PropertyNotifier, PropertyType, PropertyValue};
use crate::render::{ForwardDesc, RenderProbe};
use crate::sync::{Rational, INVALID_PTS};
use crate::utils::AudioBuffer;

use super::ports::{Sink, Source};

new_key_type! {
    /// Generational handle of a graph node.
    pub struct NodeKey;
}

/// Coarse node classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Input,
    Output,
    Filter,
}

/// When a node's `update` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationStrategy {
    /// Update only when properties change.
    #[default]
    Static,
    /// Update every driver tick.
    Dynamic,
    /// Follow the strategy of the upstream chain.
    Inherited,
}

/// Operations a node may override.
///
/// `update` runs at most once per driver tick, before any `evaluate`, and
/// is where mutation happens (reloading an image whose path changed,
/// draining decoded stream frames). `evaluate` produces one frame's worth of
/// GPU work for one output, pulling upstream sources recursively through the
/// arena; it returns `false` to propagate "no content" skips. Output nodes
/// override `evaluate_output` instead: they synthesize the initial forward
/// descriptor from their own target and own submission and presentation.
#[allow(unused_variables)]
pub trait Node {
    // ── Identity ────────────────────────────────────────────────────────────

    fn type_name(&self) -> &'static str;

    fn node_kind(&self) -> NodeKind;

    fn evaluation_strategy(&self) -> EvaluationStrategy {
        EvaluationStrategy::Static
    }

    fn info(&self) -> &str;

    fn set_info(&mut self, info: &str);

    // ── Ports ───────────────────────────────────────────────────────────────

    fn sinks(&self) -> &[Sink];

    fn sinks_mut(&mut self) -> &mut [Sink];

    fn sources(&self) -> &[Source];

    fn sources_mut(&mut self) -> &mut [Source];

    // ── Properties ──────────────────────────────────────────────────────────

    fn set_notifier(&mut self, notifier: PropertyNotifier);

    /// Parses and assigns a serialized property value by index.
    fn set_property(&mut self, index: u32, value: &str, notify: bool) -> bool;

    /// Assigns a typed property value by index (animation path).
    fn set_property_value(&mut self, index: u32, value: &PropertyValue, notify: bool) -> bool;

    /// Serialized map of all properties.
    fn properties(&self) -> String;

    /// Resolves a property name to `(index, type)`.
    fn property_desc(&self, name: &str) -> Option<(u32, PropertyType)>;

    // ── Evaluation ──────────────────────────────────────────────────────────

    /// Per-tick mutation point; called before any `evaluate`.
    fn update(&mut self) {}

    /// Produces one frame's work into `forward.target`. Returns `false`
    /// when skipped (no content).
    fn evaluate(
        &mut self,
        arena: &NodeArena,
        probe: &mut RenderProbe<'_>,
        forward: &ForwardDesc<'_>,
    ) -> bool {
        false
    }

    /// Audio-side variant; accumulates into the probe's audio buffer.
    fn evaluate_audio(&mut self, arena: &NodeArena, audio: &mut AudioBuffer) {}

    // ── Output surface (output nodes only) ──────────────────────────────────

    fn output_fps(&self) -> Rational {
        Rational::ZERO
    }

    fn output_size(&self) -> (u32, u32) {
        (0, 0)
    }

    fn set_base_pts(&mut self, pts: i64) {}

    fn base_pts(&self) -> i64 {
        INVALID_PTS
    }

    /// Drives one frame for this output at the given presentation
    /// timestamp: build the probe, walk the sinks, submit, present.
    fn evaluate_output(&mut self, arena: &NodeArena, pts: i64) -> bool {
        false
    }
}

/// Owning storage of all nodes, keyed by generational handles.
///
/// Nodes sit behind `RefCell` so render traversal can visit an upstream
/// node mutably while the arena itself is shared. The model rejects cyclic
/// connections, which is what guarantees a node is never re-entered on one
/// traversal path.
#[derive(Default)]
pub struct NodeArena {
    nodes: SlotMap<NodeKey, RefCell<Box<dyn Node>>>,
}

impl NodeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Box<dyn Node>) -> NodeKey {
        self.nodes.insert(RefCell::new(node))
    }

    pub fn remove(&mut self, key: NodeKey) -> Option<Box<dyn Node>> {
        self.nodes.remove(key).map(RefCell::into_inner)
    }

    #[must_use]
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.keys()
    }

    /// Immutable borrow of a node.
    ///
    /// # Panics
    ///
    /// Panics if the node is currently borrowed mutably (a traversal cycle,
    /// which connection validation rules out).
    #[must_use]
    pub fn get(&self, key: NodeKey) -> Option<std::cell::Ref<'_, Box<dyn Node>>> {
        self.nodes.get(key).map(RefCell::borrow)
    }

    /// Mutable borrow of a node. Same panic condition as [`Self::get`].
    #[must_use]
    pub fn get_mut(&self, key: NodeKey) -> Option<std::cell::RefMut<'_, Box<dyn Node>>> {
        self.nodes.get(key).map(RefCell::borrow_mut)
    }

    /// Recursively evaluates the node at `key` into `forward`.
    ///
    /// This is the traversal entry used by downstream nodes to pull their
    /// upstream sources. Returns `false` for dangling keys.
    pub fn evaluate(
        &self,
        key: NodeKey,
        probe: &mut RenderProbe<'_>,
        forward: &ForwardDesc<'_>,
    ) -> bool {
        match self.nodes.get(key) {
            Some(node) => node.borrow_mut().evaluate(self, probe, forward),
            None => false,
        }
    }

    /// Audio-side traversal entry.
    pub fn evaluate_audio(&self, key: NodeKey, audio: &mut AudioBuffer) {
        if let Some(node) = self.nodes.get(key) {
            node.borrow_mut().evaluate_audio(self, audio);
        }
    }
}
