//! GPU context and the window-system boundary.
//!
//! The engine renders through wgpu; [`GpuContext`] holds the shared device
//! and queue. Window creation belongs to the host (the engine only needs a
//! handle it can wrap in a surface), so the window library is referenced
//! through the [`WindowProvider`] trait rather than linked directly.

use std::sync::Arc;
use std::time::Duration;

use crate::errors::{PrismError, Result};

/// Texture format used by render targets and transients throughout the
/// filter chain.
pub const RENDER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Frames the CPU may record ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Swapchain image count for window outputs.
pub const MAX_SWAPCHAIN_IMAGES: u32 = 2;

/// How long a submission wait may block before it is reported. The wait is
/// retried on the next frame rather than aborted.
pub const FENCE_TIMEOUT: Duration = Duration::from_secs(1);

/// A host-created window the engine can render into.
pub trait RenderWindow:
    raw_window_handle::HasWindowHandle + raw_window_handle::HasDisplayHandle + Send + Sync
{
    /// Current inner size in pixels.
    fn pixel_size(&self) -> (u32, u32);
}

/// Host-side window factory.
///
/// Outputs ask for a window at node creation; hosts back this with winit,
/// an offscreen stub, or whatever windowing stack they run.
pub trait WindowProvider: Send + Sync {
    fn create_window(&self, title: &str, width: u32, height: u32) -> Result<Arc<dyn RenderWindow>>;
}

/// Canonical bind group layouts shared by every pipeline and bind group in
/// the engine. Created once with the device; brokers and nodes clone the
/// handles, which keeps pipelines and per-draw tables compatible.
#[derive(Clone)]
pub struct SharedLayouts {
    /// `texture_2d`, `sampler` — single-texture filter draws.
    pub texture: wgpu::BindGroupLayout,
    /// `texture_2d` x2, `sampler` — bi-planar (NV12) and LUT draws.
    pub planar: wgpu::BindGroupLayout,
    /// One uniform buffer, visible to vertex and fragment stages.
    pub uniform: wgpu::BindGroupLayout,
}

impl SharedLayouts {
    fn new(device: &wgpu::Device) -> Self {
        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        let texture = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shared Texture Layout"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });
        let planar = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shared Planar Layout"),
            entries: &[texture_entry(0), texture_entry(1), sampler_entry(2)],
        });
        let uniform = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shared Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        Self {
            texture,
            planar,
            uniform,
        }
    }
}

/// Shared GPU core: instance, device and queue.
///
/// Constructed once by the host and passed by reference to every subsystem
/// that records GPU work.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub layouts: SharedLayouts,
    window_provider: Option<Arc<dyn WindowProvider>>,
}

impl GpuContext {
    /// Creates the device. Failure here is fatal for the host.
    pub async fn new(window_provider: Option<Arc<dyn WindowProvider>>) -> Result<Self> {
        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| PrismError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Prism Device"),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        let layouts = SharedLayouts::new(&device);
        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            layouts,
            window_provider,
        })
    }

    /// Blocking constructor for hosts without an async runtime.
    pub fn new_blocking(window_provider: Option<Arc<dyn WindowProvider>>) -> Result<Self> {
        pollster::block_on(Self::new(window_provider))
    }

    #[must_use]
    pub fn window_provider(&self) -> Option<&Arc<dyn WindowProvider>> {
        self.window_provider.as_ref()
    }

    /// Creates a surface over a host window.
    pub fn create_surface(
        &self,
        window: Arc<dyn RenderWindow>,
    ) -> Result<wgpu::Surface<'static>> {
        struct WindowHandles(Arc<dyn RenderWindow>);

        impl raw_window_handle::HasWindowHandle for WindowHandles {
            fn window_handle(
                &self,
            ) -> std::result::Result<raw_window_handle::WindowHandle<'_>, raw_window_handle::HandleError>
            {
                self.0.window_handle()
            }
        }
        impl raw_window_handle::HasDisplayHandle for WindowHandles {
            fn display_handle(
                &self,
            ) -> std::result::Result<raw_window_handle::DisplayHandle<'_>, raw_window_handle::HandleError>
            {
                self.0.display_handle()
            }
        }

        Ok(self
            .instance
            .create_surface(wgpu::SurfaceTarget::Window(Box::new(WindowHandles(window))))?)
    }

    /// Waits for all submitted work, reporting (but tolerating) a stall
    /// longer than [`FENCE_TIMEOUT`].
    pub fn wait_idle(&self) {
        let started = std::time::Instant::now();
        self.device.poll(wgpu::PollType::Wait).ok();
        if started.elapsed() > FENCE_TIMEOUT {
            log::warn!(
                "GpuContext: waited {:?} for the GPU; it may be unresponsive",
                started.elapsed()
            );
        }
    }
}
