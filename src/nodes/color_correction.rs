//! Color-correction filter: scalar adjustments plus an optional LUT.

use std::path::PathBuf;
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

define_properties! {
    /// Properties of the color-correction filter.
    pub struct ColorCorrectionProps {
        brightness: F32 = 0.0,
        contrast: F32 = 1.0,
        saturation: F32 = 1.0,
        gamma: F32 = 1.0,
        /// Image holding a LUT strip: `N` slices of `N x N`, laid out
        /// horizontally (width `N*N`, height `N`). Empty disables the LUT.
        lut_path: Path = PathBuf::new(),
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ColorUniforms {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    gamma: f32,
    lut_size: f32,
    _pad: [f32; 3],
}

struct LutTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: f32,
}

/// Single-input grade. Renders the upstream into a transient, then applies
/// the adjustments into the forwarded target; with everything at neutral
/// the transient is bypassed and the upstream renders straight through.
pub struct ColorCorrection {
    gfx: Arc<GpuContext>,
    info: String,
    ports: Ports,
    props: ColorCorrectionProps,
    notifier: Option<PropertyNotifier>,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_table: wgpu::BindGroup,
    dummy_lut: LutTexture,
    lut: Option<LutTexture>,
    loaded_lut_path: PathBuf,
}

impl ColorCorrection {
    pub const TYPE_NAME: &'static str = "ColorCorrection";

    pub fn create(ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let gfx = Arc::clone(ctx.require_gfx()?);
        let pipeline = create_filter_pipeline(
            &gfx,
            "ColorCorrection Pipeline",
            include_str!("shaders/color_correction.wgsl"),
            &[&gfx.layouts.planar, &gfx.layouts.uniform],
            None,
        );

        let uniform_buffer = gfx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ColorCorrection Uniforms"),
            size: std::mem::size_of::<ColorUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_table = gfx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ColorCorrection Uniform Table"),
            layout: &gfx.layouts.uniform,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let dummy_lut = Self::upload_lut(&gfx, 1, 1, &[255, 255, 255, 255], 0.0);

        let mut props = ColorCorrectionProps::default();
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
            dummy_lut,
            lut: None,
            loaded_lut_path: PathBuf::new(),
        }))
    }

    fn upload_lut(gfx: &GpuContext, width: u32, height: u32, rgba: &[u8], size: f32) -> LutTexture {
        let texture = gfx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ColorCorrection LUT"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        gfx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        LutTexture {
            texture,
            view,
            size,
        }
    }

    fn reload_lut(&mut self) {
        let path = self.props.lut_path();
        self.loaded_lut_path = path.clone();
        self.lut = None;
        if path.as_os_str().is_empty() {
            return;
        }

        let decoded = match image::open(&path) {
            Ok(decoded) => decoded.to_rgba8(),
            Err(err) => {
                log::error!("Failed to load LUT {}: {err}", path.display());
                self.props
                    .set_lut_path(PathBuf::new(), true, self.notifier.as_ref());
                self.loaded_lut_path = PathBuf::new();
                return;
            }
        };

        let (width, height) = decoded.dimensions();
        if width != height * height {
            log::error!(
                "LUT {} has unexpected dimensions {width}x{height} (want N*N x N)",
                path.display()
            );
            return;
        }
        self.lut = Some(Self::upload_lut(
            &self.gfx,
            width,
            height,
            &decoded,
            height as f32,
        ));
    }

    /// Neither LUT nor scalar adjustments change anything.
    fn is_trivial(&self) -> bool {
        self.lut.is_none()
            && self.props.brightness() == 0.0
            && self.props.contrast() == 1.0
            && self.props.saturation() == 1.0
            && self.props.gamma() == 1.0
    }
}

impl Node for ColorCorrection {
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

    fn update(&mut self) {
        if self.props.lut_path() != self.loaded_lut_path {
            self.reload_lut();
        }
    }

    fn evaluate(
        &mut self,
        arena: &NodeArena,
        probe: &mut RenderProbe<'_>,
        forward: &ForwardDesc<'_>,
    ) -> bool {
        let Some(upstream) = self.ports.sinks[0].source_node else {
            return false;
        };

        // Neutral parameters bypass the transient entirely.
        if self.is_trivial() {
            return arena.evaluate(upstream, probe, forward);
        }

        let lease = probe
            .pool
            .acquire(&self.gfx, forward.depth, forward.rt_generation);
        let child = forward.descend(lease.view(), lease.generation());
        if !arena.evaluate(upstream, probe, &child) {
            return false;
        }

        let lut = self.lut.as_ref().unwrap_or(&self.dummy_lut);
        let uniforms = ColorUniforms {
            brightness: self.props.brightness(),
            contrast: self.props.contrast(),
            saturation: self.props.saturation(),
            gamma: self.props.gamma().max(1e-3),
            lut_size: lut.size,
            _pad: [0.0; 3],
        };
        self.gfx
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let table = probe.binding.bind_planar(&self.gfx, lease.view(), &lut.view);
        let mut pass = begin_pass(
            &mut probe.encoder,
            "ColorCorrection Pass",
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
        pass.draw(0..3, 0..1);
        true
    }
}
