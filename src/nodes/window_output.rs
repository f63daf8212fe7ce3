//! Window output node: a host window with a swapchain, driving one
//! traversal per scheduled frame.

use std::sync::Arc;

use glam::UVec2;

use crate::define_properties;
use crate::errors::Result;
use crate::gfx::{
    GpuContext, RenderWindow, FENCE_TIMEOUT, MAX_FRAMES_IN_FLIGHT, MAX_SWAPCHAIN_IMAGES,
    RENDER_FORMAT,
};
use crate::graph::{
    EvaluationStrategy, Node, NodeArena, NodeContext, NodeKind, PortKind, Ports,
};
use crate::properties::{PropertyNotifier, PropertyRecord};
use crate::render::{BindingBroker, ForwardDesc, RenderProbe, TexturePool, INVALID_GENERATION};
use crate::sync::{Rational, INVALID_PTS};
use crate::utils::AudioBuffer;

use super::common::{default_info, node_boilerplate};

define_properties! {
    /// Properties of the window output.
    pub struct WindowOutputProps {
        title: String = "Prism Output".to_string(),
        window_size: UVec2 = UVec2::new(1280, 720),
        /// Output frame rate as `(num, den)`.
        framerate: UVec2 = UVec2::new(60, 1),
    }
}

/// On-screen output. Owns the window, surface, per-output texture pool and
/// binding broker; per frame it synthesizes the initial forward descriptor
/// from the current swapchain image, submits one command stream and
/// presents.
pub struct WindowOutput {
    gfx: Arc<GpuContext>,
    info: String,
    ports: Ports,
    props: WindowOutputProps,
    notifier: Option<PropertyNotifier>,

    window: Arc<dyn RenderWindow>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pool: TexturePool,
    broker: BindingBroker,
    audio: AudioBuffer,

    frame_index: usize,
    /// Submission of the frame that used each in-flight slot; waited on
    /// before the slot is reused.
    frame_submissions: [Option<wgpu::SubmissionIndex>; MAX_FRAMES_IN_FLIGHT],
    base_pts: i64,
}

impl WindowOutput {
    pub const TYPE_NAME: &'static str = "WindowOutput";

    pub fn create(ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let gfx = Arc::clone(ctx.require_gfx()?);

        let mut props = WindowOutputProps::default();
        props.deserialize(properties, false, None);
        let size = props.window_size();

        let provider = gfx
            .window_provider()
            .ok_or(crate::errors::PrismError::MissingResource("window provider"))?;
        let window = provider.create_window(&props.title(), size.x, size.y)?;
        let surface = gfx.create_surface(Arc::clone(&window))?;

        let (width, height) = window.pixel_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: RENDER_FORMAT,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: MAX_SWAPCHAIN_IMAGES,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&gfx.device, &config);

        let pool = TexturePool::new(&gfx, (config.width, config.height));
        let broker = BindingBroker::new(&gfx);

        Ok(Box::new(Self {
            gfx,
            info: default_info(Self::TYPE_NAME),
            ports: Ports::new(&[PortKind::RenderTexture], &[]),
            props,
            notifier: None,
            window,
            surface,
            config,
            pool,
            broker,
            audio: AudioBuffer::new(48_000),
            frame_index: 0,
            frame_submissions: std::array::from_fn(|_| None),
            base_pts: INVALID_PTS,
        }))
    }

    /// Waits for the slot's previous submission so at most
    /// `MAX_FRAMES_IN_FLIGHT` frames are recorded ahead of the GPU.
    fn throttle(&mut self) {
        if let Some(submission) = self.frame_submissions[self.frame_index].take() {
            let started = std::time::Instant::now();
            let result = self
                .gfx
                .device
                .poll(wgpu::PollType::WaitForSubmissionIndex(submission));
            if result.is_err() || started.elapsed() > FENCE_TIMEOUT {
                log::warn!(
                    "WindowOutput: timeout while waiting for frame completion; \
                     the GPU may be unresponsive."
                );
            }
        }
    }

    fn framerate(&self) -> Rational {
        let rate = self.props.framerate();
        Rational::new(rate.x as i32, rate.y.max(1) as i32)
    }
}

impl Node for WindowOutput {
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
        (self.config.width, self.config.height)
    }

    fn set_base_pts(&mut self, pts: i64) {
        self.base_pts = pts;
    }

    fn base_pts(&self) -> i64 {
        self.base_pts
    }

    fn update(&mut self) {
        // Track window resizes; the pool is rebuilt with the surface.
        let (width, height) = self.window.pixel_size();
        if width > 0
            && height > 0
            && (width != self.config.width || height != self.config.height)
        {
            self.throttle();
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.gfx.device, &self.config);
            self.pool = TexturePool::new(&self.gfx, (width, height));
        }
    }

    fn evaluate_output(&mut self, arena: &NodeArena, pts: i64) -> bool {
        let Some(upstream) = self.ports.sinks[0].source_node else {
            return false;
        };

        self.throttle();

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                log::warn!("WindowOutput: surface lost, reconfiguring");
                self.surface.configure(&self.gfx.device, &self.config);
                return false;
            }
            Err(err) => {
                log::warn!("WindowOutput: failed to acquire swapchain image: {err}");
                return false;
            }
        };
        let target_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("WindowOutput Encoder"),
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
            target: &target_view,
            output_size: (self.config.width, self.config.height),
            rt_generation: INVALID_GENERATION,
            depth: 1,
        };

        let rendered = arena.evaluate(upstream, &mut probe, &forward);
        if !rendered {
            // No content this frame; the unpresented image is recycled.
            return false;
        }

        let submission = self.gfx.queue.submit(Some(probe.encoder.finish()));
        self.frame_submissions[self.frame_index] = Some(submission);
        surface_texture.present();

        self.pool.swap_frame();
        self.frame_index = (self.frame_index + 1) % MAX_FRAMES_IN_FLIGHT;
        true
    }
}
