#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod app;
pub mod bridge;
pub mod codec;
pub mod engine;
pub mod errors;
pub mod gfx;
pub mod graph;
pub mod nodes;
pub mod properties;
pub mod render;
pub mod stream;
pub mod sync;
pub mod utils;

pub use engine::Engine;
pub use errors::{ErrorCode, PrismError, Result};
pub use gfx::{GpuContext, RenderWindow, WindowProvider};
pub use graph::{GraphModel, Node, NodeContext, NodeKey, NodeRegistry, OutputScheduler};
pub use properties::{PropertyRecord, PropertyType, PropertyValue};
pub use stream::StreamManager;
pub use sync::{PtsClock, Rational, WallClock};
