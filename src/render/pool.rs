//! Transient render-target pool.
//!
//! Each output owns one pool. A traversal leases transient textures for the
//! duration of one parent `evaluate`; the lease is a RAII guard clearing the
//! in-use flag on drop. Per-frame slots (one per frame in flight) keep a
//! texture from being recycled while a previous frame's commands still
//! reference it.
//!
//! Every acquisition stamps the entry with a fresh generation and the
//! traversal depth. Callers forward the generation to children as the
//! "do not reuse" stamp: a child acquiring at the same depth skips the
//! texture its parent is currently writing, which is how a node avoids
//! reading and writing the same texture within one pass.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use crate::gfx::{GpuContext, MAX_FRAMES_IN_FLIGHT, RENDER_FORMAT};

/// Generation sentinel used for targets that never live in the pool (the
/// output's swapchain image).
pub const INVALID_GENERATION: u64 = u64::MAX;

const INITIAL_TEXTURE_COUNT: usize = 2;

struct PooledTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct PoolEntry {
    texture: Arc<PooledTexture>,
    in_use: Cell<bool>,
    generation: Cell<u64>,
    depth: Cell<u32>,
}

/// Fixed-size-descriptor texture pool with per-frame slots.
pub struct TexturePool {
    size: (u32, u32),
    slots: [RefCell<Vec<PoolEntry>>; MAX_FRAMES_IN_FLIGHT],
    current_slot: Cell<usize>,
    next_generation: Cell<u64>,
}

impl TexturePool {
    #[must_use]
    pub fn new(gfx: &GpuContext, size: (u32, u32)) -> Self {
        let pool = Self {
            size,
            slots: std::array::from_fn(|_| RefCell::new(Vec::new())),
            current_slot: Cell::new(0),
            next_generation: Cell::new(0),
        };
        for slot in &pool.slots {
            let mut entries = slot.borrow_mut();
            for _ in 0..INITIAL_TEXTURE_COUNT {
                entries.push(pool.create_entry(gfx));
            }
        }
        pool
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Total texture count across all slots.
    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.slots.iter().map(|s| s.borrow().len()).sum()
    }

    /// Leases a texture from the current frame's slot.
    ///
    /// Skips entries that are in use, and entries whose last acquisition
    /// carries `forbidden_generation` at the same `depth`. Grows the slot
    /// when nothing is available.
    pub fn acquire(
        &self,
        gfx: &GpuContext,
        depth: u32,
        forbidden_generation: u64,
    ) -> TextureLease<'_> {
        let slot_index = self.current_slot.get();
        let mut entries = self.slots[slot_index].borrow_mut();

        let found = entries.iter().position(|entry| {
            !entry.in_use.get()
                && (entry.generation.get() != forbidden_generation || entry.depth.get() != depth)
        });
        let index = match found {
            Some(index) => index,
            None => {
                entries.push(self.create_entry(gfx));
                entries.len() - 1
            }
        };

        let generation = self.next_generation.get();
        self.next_generation.set(generation + 1);

        let entry = &entries[index];
        entry.in_use.set(true);
        entry.generation.set(generation);
        entry.depth.set(depth);

        TextureLease {
            pool: self,
            slot: slot_index,
            index,
            texture: Arc::clone(&entry.texture),
            generation,
        }
    }

    /// Advances the per-frame slot pointer. Called by the output after
    /// submission.
    pub fn swap_frame(&self) {
        self.current_slot
            .set((self.current_slot.get() + 1) % MAX_FRAMES_IN_FLIGHT);
    }

    fn create_entry(&self, gfx: &GpuContext) -> PoolEntry {
        let texture = gfx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Transient Render Target"),
            size: wgpu::Extent3d {
                width: self.size.0,
                height: self.size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RENDER_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        PoolEntry {
            texture: Arc::new(PooledTexture { texture, view }),
            in_use: Cell::new(false),
            generation: Cell::new(INVALID_GENERATION),
            depth: Cell::new(0),
        }
    }

    fn release(&self, slot: usize, index: usize) {
        let entries = self.slots[slot].borrow();
        if let Some(entry) = entries.get(index) {
            entry.in_use.set(false);
        }
    }
}

/// RAII lease of a pooled texture; releases the in-use flag on drop.
pub struct TextureLease<'a> {
    pool: &'a TexturePool,
    slot: usize,
    index: usize,
    texture: Arc<PooledTexture>,
    generation: u64,
}

impl TextureLease<'_> {
    /// View usable both as a render attachment and as a sampled resource.
    #[inline]
    #[must_use]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.texture.view
    }

    /// Generation stamped at acquisition; forwarded to children as the
    /// reuse-suppression stamp.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for TextureLease<'_> {
    fn drop(&mut self) {
        self.pool.release(self.slot, self.index);
    }
}
