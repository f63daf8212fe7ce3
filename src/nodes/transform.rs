//! 2D transform filter: translation, scale, rotation around a pivot, and a
//! source crop window.

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::define_properties;
use crate::errors::Result;
use crate::gfx::GpuContext;
use crate::graph::{
    EvaluationStrategy, Node, NodeArena, NodeContext, NodeKind, PortKind, Ports,
};
use crate::properties::{PropertyNotifier, PropertyRecord};
use crate::render::{ForwardDesc, RenderProbe};

use super::common::{begin_pass, create_filter_pipeline, default_info, node_boilerplate};

define_properties! {
    /// Properties of the 2D transform filter. Coordinates are normalized
    /// target space: `[0, 1]` covers the full output.
    pub struct TransformProps {
        translation: Vec2 = Vec2::ZERO,
        scale: Vec2 = Vec2::ONE,
        /// Rotation in radians around the pivot.
        rotation: F32 = 0.0,
        pivot: Vec2 = Vec2::splat(0.5),
        /// Source window as `(x, y, w, h)` in `[0, 1]`.
        crop: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0),
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct TransformUniforms {
    transform: [[f32; 4]; 4],
    crop: [f32; 4],
}

/// Single-input placement filter. The upstream renders into a transient,
/// then the transient is drawn as a transformed quad.
pub struct Transform {
    gfx: Arc<GpuContext>,
    info: String,
    ports: Ports,
    props: TransformProps,
    notifier: Option<PropertyNotifier>,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_table: wgpu::BindGroup,
}

impl Transform {
    pub const TYPE_NAME: &'static str = "Transform";

    pub fn create(ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let gfx = Arc::clone(ctx.require_gfx()?);
        let pipeline = create_filter_pipeline(
            &gfx,
            "Transform Pipeline",
            include_str!("shaders/transform.wgsl"),
            &[&gfx.layouts.texture, &gfx.layouts.uniform],
            Some(wgpu::BlendState::ALPHA_BLENDING),
        );

        let uniform_buffer = gfx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Transform Uniforms"),
            size: std::mem::size_of::<TransformUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_table = gfx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Transform Uniform Table"),
            layout: &gfx.layouts.uniform,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let mut props = TransformProps::default();
        props.deserialize(properties, false, None);

        Ok(Box::new(Self {
            gfx,
            info: default_info(Self::TYPE_NAME),
            ports: Ports::new(&[PortKind::RenderTexture], &[PortKind::RenderTexture]),
            props,
            notifier: None,
            pipeline,
            uniform_buffer,
            uniform_table,
        }))
    }

    fn placement_matrix(&self) -> Mat4 {
        let pivot = self.props.pivot();
        let scale = self.props.scale();
        Mat4::from_translation((self.props.translation() + pivot).extend(0.0))
            * Mat4::from_rotation_z(self.props.rotation())
            * Mat4::from_scale(Vec3::new(scale.x, scale.y, 1.0))
            * Mat4::from_translation((-pivot).extend(0.0))
    }
}

impl Node for Transform {
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
        let Some(upstream) = self.ports.sinks[0].source_node else {
            return false;
        };

        let lease = probe
            .pool
            .acquire(&self.gfx, forward.depth, forward.rt_generation);
        let child = forward.descend(lease.view(), lease.generation());
        if !arena.evaluate(upstream, probe, &child) {
            return false;
        }

        let uniforms = TransformUniforms {
            transform: self.placement_matrix().to_cols_array_2d(),
            crop: self.props.crop().to_array(),
        };
        self.gfx
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let table = probe.binding.bind_texture(&self.gfx, lease.view());
        let mut pass = begin_pass(
            &mut probe.encoder,
            "Transform Pass",
            forward.target,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
        );
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &table, &[]);
        pass.set_bind_group(1, &self.uniform_table, &[]);
        pass.set_viewport(
            0.0,
            0.0,
            forward.output_size.0 as f32,
            forward.output_size.1 as f32,
            0.0,
            1.0,
        );
        pass.draw(0..6, 0..1);
        true
    }
}
