//! Node factory: an inventory of constructors keyed by type name.
//!
//! The registry is an explicit resource the host constructs once and hands
//! to the graph model, not a process-wide singleton. Registration happens
//! once per node type; creation receives the shared engine resources and
//! the initial serialized property map.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::{PrismError, Result};
use crate::gfx::GpuContext;
use crate::nodes::NdiSenderFactory;
use crate::stream::StreamManager;

use super::node::Node;

/// Fixed port counts, known at node-type registration and surfaced to the
/// UI before any instance exists.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StaticNodeInfo {
    pub sinks: u32,
    pub sources: u32,
}

/// Shared engine resources available to node constructors.
///
/// Nodes capture what they need (by `Arc` clone) at construction; the
/// context itself is not retained. Fields are optional so graph logic can
/// be exercised with mock node types and no GPU — built-in nodes fail
/// construction when a resource they require is absent.
#[derive(Default)]
pub struct NodeContext {
    pub gfx: Option<Arc<GpuContext>>,
    pub streams: Option<Arc<StreamManager>>,
    pub ndi: Option<Arc<dyn NdiSenderFactory>>,
}

impl NodeContext {
    /// Context with no backing resources, for graph-only hosts and tests.
    #[must_use]
    pub fn headless() -> Self {
        Self::default()
    }

    pub fn require_gfx(&self) -> Result<&Arc<GpuContext>> {
        self.gfx
            .as_ref()
            .ok_or(PrismError::MissingResource("GPU context"))
    }

    pub fn require_streams(&self) -> Result<&Arc<StreamManager>> {
        self.streams
            .as_ref()
            .ok_or(PrismError::MissingResource("stream manager"))
    }
}

type CreateFn = fn(&NodeContext, &str) -> Result<Box<dyn Node>>;

/// Registry mapping node-type name to `(constructor, static info)`.
#[derive(Default)]
pub struct NodeRegistry {
    creators: FxHashMap<String, (CreateFn, StaticNodeInfo)>,
}

impl NodeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every built-in node type.
    #[must_use]
    pub fn with_builtin_nodes() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtin_nodes(&mut registry);
        registry
    }

    pub fn register(&mut self, name: &str, create: CreateFn, info: StaticNodeInfo) {
        if self
            .creators
            .insert(name.to_string(), (create, info))
            .is_some()
        {
            log::warn!("NodeRegistry: re-registered node type `{name}`");
        }
    }

    #[must_use]
    pub fn static_info(&self, name: &str) -> Option<StaticNodeInfo> {
        self.creators.get(name).map(|(_, info)| *info)
    }

    /// Iterates `(type name, static info)` for the UI's node palette.
    pub fn node_types(&self) -> impl Iterator<Item = (&str, StaticNodeInfo)> {
        self.creators
            .iter()
            .map(|(name, (_, info))| (name.as_str(), *info))
    }

    /// Constructs a node of the named type with the given initial
    /// properties.
    pub fn create(&self, name: &str, ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let Some((create, _)) = self.creators.get(name) else {
            return Err(PrismError::UnknownNodeType(name.to_string()));
        };
        create(ctx, properties)
    }
}
