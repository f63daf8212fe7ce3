//! Engine driver: owns the shared resources and runs the tick loop.

use std::sync::Arc;
use std::time::Duration;

use crate::codec::CodecBackend;
use crate::errors::Result;
use crate::gfx::{GpuContext, WindowProvider};
use crate::graph::{GraphModel, NodeContext, NodeRegistry};
use crate::nodes::NdiSenderFactory;
use crate::stream::StreamManager;

/// Longest sleep between idle ticks. Keeps the driver responsive to graph
/// mutations arriving from the host between frames.
const MAX_IDLE_SLEEP: Duration = Duration::from_millis(2);

/// Top-level engine: GPU context, stream manager, node registry and the
/// graph model, driven by [`Engine::tick`].
pub struct Engine {
    ctx: NodeContext,
    model: GraphModel,
}

impl Engine {
    /// Brings up the GPU device and worker threads. GPU failure here is
    /// fatal and propagates to the host.
    pub fn new(
        codec_backend: Arc<dyn CodecBackend>,
        window_provider: Option<Arc<dyn WindowProvider>>,
        ndi: Option<Arc<dyn NdiSenderFactory>>,
    ) -> Result<Self> {
        let gfx = Arc::new(GpuContext::new_blocking(window_provider)?);
        let streams = Arc::new(StreamManager::new(codec_backend));
        let registry = Arc::new(NodeRegistry::with_builtin_nodes());

        Ok(Self {
            ctx: NodeContext {
                gfx: Some(gfx),
                streams: Some(streams),
                ndi,
            },
            model: GraphModel::new(registry),
        })
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    #[inline]
    #[must_use]
    pub fn model_mut(&mut self) -> &mut GraphModel {
        &mut self.model
    }

    #[inline]
    #[must_use]
    pub fn node_context(&self) -> &NodeContext {
        &self.ctx
    }

    /// One driver tick; returns `true` when a frame was produced.
    pub fn tick(&mut self) -> bool {
        self.model.tick()
    }

    /// Ticks once, sleeping briefly when nothing is due. The sleep is
    /// bounded by the soonest scheduled frame so no output misses its
    /// window.
    pub fn tick_or_wait(&mut self) {
        if self.model.tick() {
            return;
        }
        let next_due = self.model.scheduler().next_due_pts();
        let sleep = if next_due < 0 {
            MAX_IDLE_SLEEP
        } else {
            self.model
                .scheduler()
                .master_clock()
                .time_until_pts(next_due as u64)
                .min(MAX_IDLE_SLEEP)
        };
        if !sleep.is_zero() {
            std::thread::sleep(sleep);
        }
    }

    /// Restarts playback: master clock, scheduled outputs and clips.
    pub fn play(&mut self) {
        self.model.play();
    }
}
