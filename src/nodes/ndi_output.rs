//! NDI output node: renders into an offscreen target, packs it to UYVY on
//! the GPU, and hands completed frames to a network sender.
//!
//! The network library is an external collaborator referenced through
//! [`FrameSender`]; the node owns the double-buffered staging readback so
//! the send of frame `n - 1` overlaps the render of frame `n`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::UVec2;

use crate::codec::PixelFormat;
use crate::define_properties;
use crate::errors::Result;
use crate::gfx::{GpuContext, MAX_FRAMES_IN_FLIGHT, RENDER_FORMAT};
use crate::graph::{
    EvaluationStrategy, Node, NodeArena, NodeContext, NodeKind, PortKind, Ports,
};
use crate::properties::{PropertyNotifier, PropertyRecord};
use crate::render::{BindingBroker, ForwardDesc, RenderProbe, TexturePool, INVALID_GENERATION};
use crate::sync::{Rational, INVALID_PTS};
use crate::utils::AudioBuffer;

use super::common::{begin_pass, create_fullscreen_pipeline, default_info, node_boilerplate};

/// One packed video frame ready for the wire.
pub struct OutboundVideoFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
    pub data: &'a [u8],
    pub pts: i64,
    pub framerate: Rational,
}

/// Asynchronous network sender for one NDI source.
pub trait FrameSender: Send + Sync {
    fn send_video(&self, frame: &OutboundVideoFrame<'_>);
}

/// Host-side factory creating senders by source name.
pub trait NdiSenderFactory: Send + Sync {
    fn create_sender(&self, source_name: &str) -> Arc<dyn FrameSender>;
}

define_properties! {
    /// Properties of the NDI output.
    pub struct NdiOutputProps {
        source_name: String = "Prism".to_string(),
        output_size: UVec2 = UVec2::new(1280, 720),
        /// Output frame rate as `(num, den)`.
        framerate: UVec2 = UVec2::new(60, 1),
    }
}

struct StagingBuffer {
    buffer: wgpu::Buffer,
    mapped: Arc<AtomicBool>,
    pts: i64,
}

/// Network video output with the same traversal structure as the window
/// output; the "present" path is a UYVY pack, a staging copy and an
/// asynchronous send of the previous frame's buffer.
pub struct NdiOutput {
    gfx: Arc<GpuContext>,
    info: String,
    ports: Ports,
    props: NdiOutputProps,
    notifier: Option<PropertyNotifier>,

    sender: Arc<dyn FrameSender>,
    pool: TexturePool,
    broker: BindingBroker,
    audio: AudioBuffer,
    uyvy_pipeline: wgpu::RenderPipeline,

    size: (u32, u32),
    target_view: wgpu::TextureView,
    uyvy_view: wgpu::TextureView,
    #[allow(dead_code)]
    target: wgpu::Texture,
    uyvy_target: wgpu::Texture,
    staging: [StagingBuffer; 2],
    current_staging: usize,
    stride: u32,

    frame_index: usize,
    base_pts: i64,
}

/// Row stride padded to the copy alignment.
fn padded_stride(width: u32) -> u32 {
    let bytes = width * 4;
    bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

impl NdiOutput {
    pub const TYPE_NAME: &'static str = "NdiOutput";

    pub fn create(ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let gfx = Arc::clone(ctx.require_gfx()?);
        let ndi = ctx
            .ndi
            .as_ref()
            .ok_or(crate::errors::PrismError::MissingResource("NDI sender factory"))?;

        let mut props = NdiOutputProps::default();
        props.deserialize(properties, false, None);
        let size = props.output_size();
        let size = (size.x.max(2), size.y.max(1));

        let sender = ndi.create_sender(&props.source_name());

        let target = gfx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("NDI Render Target"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RENDER_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        // Each UYVY texel packs two source pixels.
        let uyvy_target = gfx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("NDI UYVY Target"),
            size: wgpu::Extent3d {
                width: size.0 / 2,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let uyvy_view = uyvy_target.create_view(&wgpu::TextureViewDescriptor::default());

        let uyvy_pipeline = create_fullscreen_pipeline(
            &gfx,
            "NDI UYVY Pipeline",
            include_str!("shaders/uyvy.wgsl"),
            &[&gfx.layouts.texture],
            None,
            wgpu::TextureFormat::Rgba8Unorm,
        );

        let stride = padded_stride(size.0 / 2);
        let staging = std::array::from_fn(|i| StagingBuffer {
            buffer: gfx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(if i == 0 { "NDI Staging 0" } else { "NDI Staging 1" }),
                size: u64::from(stride) * u64::from(size.1),
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            mapped: Arc::new(AtomicBool::new(false)),
            pts: INVALID_PTS,
        });

        let pool = TexturePool::new(&gfx, size);
        let broker = BindingBroker::new(&gfx);

        Ok(Box::new(Self {
            gfx,
            info: default_info(Self::TYPE_NAME),
            ports: Ports::new(&[PortKind::RenderTexture], &[]),
            props,
            notifier: None,
            sender: Arc::clone(&sender),
            pool,
            broker,
            audio: AudioBuffer::new(48_000),
            uyvy_pipeline,
            size,
            target_view,
            uyvy_view,
            target,
            uyvy_target,
            staging,
            current_staging: 0,
            stride,
            frame_index: 0,
            base_pts: INVALID_PTS,
        }))
    }

    fn framerate(&self) -> Rational {
        let rate = self.props.framerate();
        Rational::new(rate.x as i32, rate.y.max(1) as i32)
    }

    /// Sends the previously copied buffer if its map has completed, then
    /// unmaps it for reuse.
    fn send_previous(&mut self) {
        let previous = 1 - self.current_staging;
        let slot = &mut self.staging[previous];
        if !slot.mapped.swap(false, Ordering::AcqRel) {
            return;
        }

        {
            let data = slot.buffer.slice(..).get_mapped_range();
            let frame = OutboundVideoFrame {
                width: self.size.0,
                height: self.size.1,
                stride: self.stride,
                format: PixelFormat::Uyvy,
                data: &data,
                pts: slot.pts,
                framerate: Rational::new(
                    self.props.framerate().x as i32,
                    self.props.framerate().y.max(1) as i32,
                ),
            };
            self.sender.send_video(&frame);
        }
        slot.buffer.unmap();
    }
}

impl Node for NdiOutput {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn node_kind(&self) -> NodeKind {
        NodeKind::Output
    }

    fn evaluation_strategy(&self) -> EvaluationStrategy {
        EvaluationStrategy::Inherited
    }

    node_boilerplate!();

    fn output_fps(&self) -> Rational {
        self.framerate()
    }

    fn output_size(&self) -> (u32, u32) {
        self.size
    }

    fn set_base_pts(&mut self, pts: i64) {
        self.base_pts = pts;
    }

    fn base_pts(&self) -> i64 {
        self.base_pts
    }

    fn evaluate_output(&mut self, arena: &NodeArena, pts: i64) -> bool {
        let Some(upstream) = self.ports.sinks[0].source_node else {
            return false;
        };

        let encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("NdiOutput Encoder"),
            });
        let output_framerate = self.framerate();
        let mut probe = RenderProbe {
            encoder,
            binding: &self.broker,
            pool: &self.pool,
            frame_index: self.frame_index,
            output_framerate,
            current_pts: pts,
            output_base_pts: self.base_pts,
            audio: &mut self.audio,
        };
        let forward = ForwardDesc {
            target: &self.target_view,
            output_size: self.size,
            rt_generation: INVALID_GENERATION,
            depth: 1,
        };

        let rendered = arena.evaluate(upstream, &mut probe, &forward);
        if !rendered {
            return false;
        }

        // Pack RGBA to UYVY at half width.
        let table = probe.binding.bind_texture(&self.gfx, &self.target_view);
        {
            let mut pass = begin_pass(
                &mut probe.encoder,
                "NDI UYVY Pack",
                &self.uyvy_view,
                wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            );
            pass.set_pipeline(&self.uyvy_pipeline);
            pass.set_bind_group(0, &table, &[]);
            pass.draw(0..3, 0..1);
        }

        let mut encoder = probe.encoder;
        let slot = &mut self.staging[self.current_staging];
        slot.pts = pts;
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.uyvy_target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &slot.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.stride),
                    rows_per_image: Some(self.size.1),
                },
            },
            wgpu::Extent3d {
                width: self.size.0 / 2,
                height: self.size.1,
                depth_or_array_layers: 1,
            },
        );
        self.gfx.queue.submit(Some(encoder.finish()));

        // Kick off the async map of this frame's copy.
        let mapped = Arc::clone(&slot.mapped);
        slot.buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            if result.is_ok() {
                mapped.store(true, Ordering::Release);
            }
        });
        let _ = self.gfx.device.poll(wgpu::PollType::Poll);

        // Ship the previous frame while this one is in flight.
        self.send_previous();

        self.current_staging = 1 - self.current_staging;
        self.pool.swap_frame();
        self.frame_index = (self.frame_index + 1) % MAX_FRAMES_IN_FLIGHT;
        true
    }
}
