//! Node graph: ports, node contract, factory, scheduler and the mutable
//! graph model.

mod factory;
mod model;
mod node;
mod ports;
mod scheduler;

pub use factory::{NodeContext, NodeRegistry, StaticNodeInfo};
pub use model::{GraphModel, TrackRef};
pub use node::{EvaluationStrategy, Node, NodeArena, NodeKey, NodeKind};
pub use ports::{Connection, PortKind, Ports, RenderStrategy, Sink, Source, SourceTarget, MAX_OUTPUTS};
pub use scheduler::{OutputScheduler, ScheduledOutput, SCHEDULER_EPSILON_TICKS};
