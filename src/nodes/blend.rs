//! Blend filter: composites an overlay input over a base input with a
//! configurable hardware blend mode.

use std::sync::Arc;

use crate::define_properties;
use crate::errors::Result;
use crate::gfx::GpuContext;
use crate::graph::{
    EvaluationStrategy, Node, NodeArena, NodeContext, NodeKind, PortKind, Ports,
};
use crate::properties::{PropertyNotifier, PropertyRecord};
use crate::render::{ForwardDesc, RenderProbe};

use super::common::{begin_pass, create_filter_pipeline, default_info, node_boilerplate};

/// Fixed-function blend states, indexed by the `blend_mode` property.
const BLEND_MODES: [(&str, wgpu::BlendState); 7] = [
    // Normal: standard alpha blending.
    (
        "Normal",
        wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        },
    ),
    // Multiply.
    (
        "Multiply",
        wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Dst,
                dst_factor: wgpu::BlendFactor::Zero,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Zero,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    ),
    // Screen.
    (
        "Screen",
        wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::OneMinusDst,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Zero,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    ),
    // Add.
    (
        "Add",
        wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Zero,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    ),
    // Subtract (dst - src).
    (
        "Subtract",
        wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::ReverseSubtract,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Zero,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    ),
    // Darken.
    (
        "Darken",
        wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Min,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Zero,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    ),
    // Lighten.
    (
        "Lighten",
        wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Max,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Zero,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    ),
];

define_properties! {
    /// Properties of the blend filter.
    pub struct BlendProps {
        /// Index into the hardware blend mode table.
        blend_mode: U32 = 0,
    }
}

/// Two-input compositor. Sink 0 is the base layer rendered straight into
/// the forwarded target; sink 1 is the overlay, rendered into a transient
/// and composited with the configured blend mode.
pub struct Blend {
    gfx: Arc<GpuContext>,
    info: String,
    ports: Ports,
    props: BlendProps,
    notifier: Option<PropertyNotifier>,
    pipelines: Vec<wgpu::RenderPipeline>,
}

impl Blend {
    pub const TYPE_NAME: &'static str = "Blend";

    pub fn create(ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let gfx = Arc::clone(ctx.require_gfx()?);
        let pipelines = BLEND_MODES
            .iter()
            .map(|(name, blend)| {
                create_filter_pipeline(
                    &gfx,
                    &format!("Blend Pipeline ({name})"),
                    include_str!("shaders/blit.wgsl"),
                    &[&gfx.layouts.texture],
                    Some(*blend),
                )
            })
            .collect();

        let mut props = BlendProps::default();
        props.deserialize(properties, false, None);

        Ok(Box::new(Self {
            gfx,
            info: default_info(Self::TYPE_NAME),
            ports: Ports::new(
                &[PortKind::RenderTexture, PortKind::RenderTexture],
                &[PortKind::RenderTexture],
            ),
            props,
            notifier: None,
            pipelines,
        }))
    }
}

impl Node for Blend {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn node_kind(&self) -> NodeKind {
        NodeKind::Filter
    }

    fn evaluation_strategy(&self) -> EvaluationStrategy {
        EvaluationStrategy::Inherited
    }

    node_boilerplate!();

    fn evaluate(
        &mut self,
        arena: &NodeArena,
        probe: &mut RenderProbe<'_>,
        forward: &ForwardDesc<'_>,
    ) -> bool {
        // The base input renders straight through into the final target.
        let base = self.ports.sinks[0].source_node;
        let mut source_valid = false;
        if let Some(base) = base {
            source_valid = arena.evaluate(base, probe, forward);
        }

        let Some(overlay) = self.ports.sinks[1].source_node else {
            return source_valid;
        };

        let lease = probe
            .pool
            .acquire(&self.gfx, forward.depth, forward.rt_generation);
        let child = forward.descend(lease.view(), lease.generation());
        if !arena.evaluate(overlay, probe, &child) {
            return source_valid;
        }

        let mode = (self.props.blend_mode() as usize).min(self.pipelines.len() - 1);
        let table = probe.binding.bind_texture(&self.gfx, lease.view());
        let mut pass = begin_pass(
            &mut probe.encoder,
            "Blend Pass",
            forward.target,
            wgpu::LoadOp::Load,
        );
        pass.set_pipeline(&self.pipelines[mode]);
        pass.set_bind_group(0, &table, &[]);
        pass.set_viewport(
            0.0,
            0.0,
            forward.output_size.0 as f32,
            forward.output_size.1 as f32,
            0.0,
            1.0,
        );
        pass.draw(0..3, 0..1);
        true
    }
}
