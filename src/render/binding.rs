//! Bind group brokerage.
//!
//! Each output owns one broker. It distributes the device's canonical
//! layouts and a shared linear sampler, and hands out per-draw bind groups:
//! the tables are transient, rebuilt each frame against whatever transient
//! texture the traversal just leased.

use crate::gfx::{GpuContext, SharedLayouts};

/// Per-output binding broker.
pub struct BindingBroker {
    layouts: SharedLayouts,
    sampler_linear: wgpu::Sampler,
}

impl BindingBroker {
    #[must_use]
    pub fn new(gfx: &GpuContext) -> Self {
        let sampler_linear = gfx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Broker Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            layouts: gfx.layouts.clone(),
            sampler_linear,
        }
    }

    #[inline]
    #[must_use]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler_linear
    }

    /// Transient table for a single-texture draw.
    #[must_use]
    pub fn bind_texture(&self, gfx: &GpuContext, view: &wgpu::TextureView) -> wgpu::BindGroup {
        gfx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Broker Texture Table"),
            layout: &self.layouts.texture,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler_linear),
                },
            ],
        })
    }

    /// Transient table for a two-texture draw (NV12 planes, source + LUT).
    #[must_use]
    pub fn bind_planar(
        &self,
        gfx: &GpuContext,
        first: &wgpu::TextureView,
        second: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        gfx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Broker Planar Table"),
            layout: &self.layouts.planar,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(first),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(second),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler_linear),
                },
            ],
        })
    }
}
