//! Render probe and forward descriptor: the records threaded through a
//! traversal.

use crate::sync::Rational;
use crate::utils::AudioBuffer;

use super::binding::BindingBroker;
use super::pool::TexturePool;

/// Per-frame resources handed to every node visited during one output's
/// traversal.
///
/// The probe owns the frame's command encoder; nodes open sequential render
/// passes on it in traversal order, producing a single command stream per
/// output.
pub struct RenderProbe<'a> {
    pub encoder: wgpu::CommandEncoder,
    pub binding: &'a BindingBroker,
    pub pool: &'a TexturePool,
    /// Frame-in-flight index of the output driving this traversal.
    pub frame_index: usize,
    pub output_framerate: Rational,
    /// Presentation timestamp of the frame being built (90 kHz).
    pub current_pts: i64,
    pub output_base_pts: i64,
    /// Upstream audio nodes accumulate decoded samples here.
    pub audio: &'a mut AudioBuffer,
}

/// Declares the target a child must render into, passed parent-to-child.
#[derive(Clone, Copy)]
pub struct ForwardDesc<'a> {
    /// Render-target view the child draws into.
    pub target: &'a wgpu::TextureView,
    pub output_size: (u32, u32),
    /// Pool generation that acquired `target`
    /// ([`INVALID_GENERATION`](super::INVALID_GENERATION) for the output's
    /// swapchain image). Children must not re-acquire this generation at
    /// the parent's depth.
    pub rt_generation: u64,
    /// Nesting level of the current traversal hop.
    pub depth: u32,
}

impl ForwardDesc<'_> {
    /// Descriptor for one hop deeper, pointing at a freshly leased
    /// transient.
    #[must_use]
    pub fn descend<'t>(
        &self,
        target: &'t wgpu::TextureView,
        rt_generation: u64,
    ) -> ForwardDesc<'t> {
        ForwardDesc {
            target,
            output_size: self.output_size,
            rt_generation,
            depth: self.depth + 1,
        }
    }
}
