//! Built-in node implementations.

mod blend;
mod color_correction;
mod common;
mod image_input;
mod ndi_output;
mod stream_input;
mod transform;
mod window_output;

pub use blend::{Blend, BlendProps};
pub use color_correction::{ColorCorrection, ColorCorrectionProps};
pub use image_input::{ImageInput, ImageInputProps};
pub use ndi_output::{FrameSender, NdiOutput, NdiOutputProps, NdiSenderFactory, OutboundVideoFrame};
pub use stream_input::{StreamInput, StreamInputProps};
pub use transform::{Transform, TransformProps};
pub use window_output::{WindowOutput, WindowOutputProps};

use crate::graph::{NodeRegistry, StaticNodeInfo};

/// Registers every built-in node type with the registry.
pub fn register_builtin_nodes(registry: &mut NodeRegistry) {
    registry.register(
        ImageInput::TYPE_NAME,
        ImageInput::create,
        StaticNodeInfo { sinks: 0, sources: 1 },
    );
    registry.register(
        StreamInput::TYPE_NAME,
        StreamInput::create,
        StaticNodeInfo { sinks: 0, sources: 2 },
    );
    registry.register(
        Blend::TYPE_NAME,
        Blend::create,
        StaticNodeInfo { sinks: 2, sources: 1 },
    );
    registry.register(
        Transform::TYPE_NAME,
        Transform::create,
        StaticNodeInfo { sinks: 1, sources: 1 },
    );
    registry.register(
        ColorCorrection::TYPE_NAME,
        ColorCorrection::create,
        StaticNodeInfo { sinks: 1, sources: 1 },
    );
    registry.register(
        WindowOutput::TYPE_NAME,
        WindowOutput::create,
        StaticNodeInfo { sinks: 1, sources: 0 },
    );
    registry.register(
        NdiOutput::TYPE_NAME,
        NdiOutput::create,
        StaticNodeInfo { sinks: 1, sources: 0 },
    );
}
