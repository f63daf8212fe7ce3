//! Ports and connections.
//!
//! A sink is an input port holding at most one upstream source; a source is
//! an output port fanning out to any number of downstream sinks. Every
//! directed edge lives three times: in the model's connection set, in the
//! target's sink and in the source's target set. The model keeps all three
//! in step; breaking one half without the others is a bug.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::node::NodeKey;

/// Upper bound on simultaneously registered outputs, sized to the
/// `rendered_outputs` mask.
pub const MAX_OUTPUTS: usize = 64;

/// Payload kind carried by a port. Connections require matching kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortKind {
    #[default]
    RenderTexture,
    RenderTarget,
    Audio,
}

impl PortKind {
    /// Port compatibility: render texture to render texture, audio to audio.
    #[must_use]
    pub fn compatible(source: PortKind, sink: PortKind) -> bool {
        matches!(
            (source, sink),
            (PortKind::RenderTexture, PortKind::RenderTexture) | (PortKind::Audio, PortKind::Audio)
        )
    }
}

/// How a source's result is produced during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStrategy {
    None,
    /// Render directly into the forwarded target.
    #[default]
    Direct,
    /// Cache the result for reuse across outputs.
    Cache,
    /// Skip this source entirely.
    Bypass,
}

/// Input port.
#[derive(Debug, Clone, Default)]
pub struct Sink {
    pub kind: PortKind,
    pub source_node: Option<NodeKey>,
    pub source_index: u32,
}

impl Sink {
    #[must_use]
    pub fn new(kind: PortKind) -> Self {
        Self {
            kind,
            source_node: None,
            source_index: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.source_node.is_some()
    }

    pub fn reset(&mut self) {
        self.source_node = None;
        self.source_index = 0;
    }
}

/// One downstream endpoint of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceTarget {
    pub sink_index: u32,
    pub sink_node: NodeKey,
}

/// Output port.
#[derive(Debug, Clone, Default)]
pub struct Source {
    pub kind: PortKind,
    pub targets: FxHashSet<SourceTarget>,
    pub strategy: RenderStrategy,
    /// Outputs this source has been rendered for in the current frame,
    /// one bit per output slot.
    pub rendered_outputs: u64,
}

impl Source {
    #[must_use]
    pub fn new(kind: PortKind) -> Self {
        Self {
            kind,
            targets: FxHashSet::default(),
            strategy: RenderStrategy::Direct,
            rendered_outputs: 0,
        }
    }
}

/// A directed edge `(from, from_index) -> (to, to_index)`; the connection
/// set enforces uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    pub from_node: NodeKey,
    pub from_index: u32,
    pub to_node: NodeKey,
    pub to_index: u32,
}

/// Port storage embedded in each node.
///
/// Counts are fixed at node-type registration; the small-vector capacities
/// cover every built-in node without allocation.
#[derive(Debug, Default)]
pub struct Ports {
    pub sinks: SmallVec<[Sink; 2]>,
    pub sources: SmallVec<[Source; 1]>,
}

impl Ports {
    #[must_use]
    pub fn new(sink_kinds: &[PortKind], source_kinds: &[PortKind]) -> Self {
        Self {
            sinks: sink_kinds.iter().map(|&k| Sink::new(k)).collect(),
            sources: source_kinds.iter().map(|&k| Source::new(k)).collect(),
        }
    }
}
