//! Per-frame render resource brokerage and the traversal contract types.

mod binding;
mod pool;
mod probe;

pub use binding::BindingBroker;
pub use pool::{TextureLease, TexturePool, INVALID_GENERATION};
pub use probe::{ForwardDesc, RenderProbe};
