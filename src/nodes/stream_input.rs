//! Stream input node: live network video/audio through the stream manager.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::define_properties;
use crate::errors::Result;
use crate::gfx::GpuContext;
use crate::graph::{
    EvaluationStrategy, Node, NodeArena, NodeContext, NodeKind, PortKind, Ports,
};
use crate::codec::{AudioFrame, DecodedFrame, MediaKind, OpenOptions, VideoFrame};
use crate::properties::{PropertyNotifier, PropertyRecord};
use crate::render::{ForwardDesc, RenderProbe};
use crate::stream::{StreamHandle, StreamManager};
use crate::sync::Rational;

use super::common::{begin_pass, create_filter_pipeline, default_info, node_boilerplate};

/// Decoded frames buffered per side; oldest evicted beyond this.
const MAX_BUFFERED_FRAMES: usize = 32;

define_properties! {
    /// Properties of the stream input.
    pub struct StreamInputProps {
        stream_url: String = String::new(),
    }
}

/// Timing discovered from the opened container's first video/audio streams.
#[derive(Debug, Default)]
struct StreamTiming {
    video_timebase: Rational,
    video_framerate: Rational,
    audio_timebase: Rational,
    first_video_pts: Option<i64>,
    start_time: Option<Instant>,
}

/// GPU-side NV12 plane pair the decoded frames upload into.
struct PlaneTextures {
    size: (u32, u32),
    #[allow(dead_code)]
    luma: wgpu::Texture,
    luma_view: wgpu::TextureView,
    #[allow(dead_code)]
    chroma: wgpu::Texture,
    chroma_view: wgpu::TextureView,
}

/// Live stream source.
///
/// On `stream_url` change the container is opened with low-latency options
/// and registered with the stream manager, pinning the first video and
/// first audio channel. Each tick drains decoded frames into PTS-ordered
/// maps; each evaluate picks the frame closest to a target PTS derived from
/// wall-clock elapsed time converted through the stream's own timebase.
pub struct StreamInput {
    gfx: Arc<GpuContext>,
    streams: Arc<StreamManager>,
    info: String,
    ports: Ports,
    props: StreamInputProps,
    notifier: Option<PropertyNotifier>,
    pipeline: wgpu::RenderPipeline,

    opened_url: String,
    handle: StreamHandle,
    video_index: i32,
    audio_index: i32,
    timing: StreamTiming,
    video_frames: BTreeMap<i64, VideoFrame>,
    audio_frames: BTreeMap<i64, AudioFrame>,
    planes: Option<PlaneTextures>,
}

impl StreamInput {
    pub const TYPE_NAME: &'static str = "StreamInput";

    pub fn create(ctx: &NodeContext, properties: &str) -> Result<Box<dyn Node>> {
        let gfx = Arc::clone(ctx.require_gfx()?);
        let streams = Arc::clone(ctx.require_streams()?);
        let pipeline = create_filter_pipeline(
            &gfx,
            "StreamInput Pipeline",
            include_str!("shaders/nv12.wgsl"),
            &[&gfx.layouts.planar],
            None,
        );

        let mut props = StreamInputProps::default();
        props.deserialize(properties, false, None);

        Ok(Box::new(Self {
            gfx,
            streams,
            info: default_info(Self::TYPE_NAME),
            ports: Ports::new(&[], &[PortKind::RenderTexture, PortKind::Audio]),
            props,
            notifier: None,
            pipeline,
            opened_url: String::new(),
            handle: 0,
            video_index: -1,
            audio_index: -1,
            timing: StreamTiming::default(),
            video_frames: BTreeMap::new(),
            audio_frames: BTreeMap::new(),
            planes: None,
        }))
    }

    fn close_stream(&mut self) {
        if self.handle != 0 {
            self.streams.unregister_stream(self.handle);
            self.handle = 0;
        }
        self.video_index = -1;
        self.audio_index = -1;
        self.timing = StreamTiming::default();
        self.video_frames.clear();
        self.audio_frames.clear();
    }

    fn open_stream(&mut self) {
        let url = self.props.stream_url();
        self.opened_url = url.clone();
        self.close_stream();
        if url.is_empty() {
            return;
        }

        let demuxer = match self.streams.open_demuxer(&url, &OpenOptions::default()) {
            Ok(demuxer) => demuxer,
            Err(err) => {
                log::error!("Failed to open stream {url}: {err}");
                self.props
                    .set_stream_url(String::new(), true, self.notifier.as_ref());
                self.opened_url = String::new();
                return;
            }
        };

        // Pin the first video and first audio channel.
        let mut active = Vec::new();
        for desc in demuxer.streams() {
            match desc.kind {
                MediaKind::Video if self.video_index < 0 => {
                    self.video_index = desc.index;
                    self.timing.video_timebase = desc.timebase;
                    self.timing.video_framerate = if desc.frame_rate.num() > 0 {
                        desc.frame_rate
                    } else {
                        log::warn!("StreamInput: no video framerate found, using 30 FPS default");
                        Rational::new(30, 1)
                    };
                    active.push(desc.index);
                }
                MediaKind::Audio if self.audio_index < 0 => {
                    self.audio_index = desc.index;
                    self.timing.audio_timebase = desc.timebase;
                    active.push(desc.index);
                }
                _ => {}
            }
        }
        if active.is_empty() {
            log::error!("Stream {url} carries no usable video or audio channel");
            return;
        }

        self.handle = self.streams.register_stream(demuxer, &active);
        log::info!(
            "StreamInput: opened {url} (video {}, audio {})",
            self.video_index,
            self.audio_index
        );
    }

    fn drain_frames(&mut self) {
        if self.handle == 0 {
            return;
        }
        if self.video_index >= 0 {
            while let Some(frame) = self.streams.poll_frame(self.handle, self.video_index) {
                if let DecodedFrame::Video(frame) = frame {
                    if self.timing.first_video_pts.is_none() {
                        self.timing.first_video_pts = Some(frame.pts);
                        self.timing.start_time = Some(Instant::now());
                    }
                    self.video_frames.insert(frame.pts, frame);
                }
            }
            while self.video_frames.len() > MAX_BUFFERED_FRAMES {
                self.video_frames.pop_first();
            }
        }
        if self.audio_index >= 0 {
            while let Some(frame) = self.streams.poll_frame(self.handle, self.audio_index) {
                if let DecodedFrame::Audio(frame) = frame {
                    self.audio_frames.insert(frame.pts, frame);
                }
            }
            while self.audio_frames.len() > MAX_BUFFERED_FRAMES {
                self.audio_frames.pop_first();
            }
        }
    }

    /// Target video PTS in the stream's own timebase for "now".
    fn target_video_pts(&self) -> Option<i64> {
        let first_pts = self.timing.first_video_pts?;
        let start = self.timing.start_time?;
        let rate = self.timing.video_framerate;
        let tb = self.timing.video_timebase;
        if rate.num() <= 0 || tb.num() <= 0 {
            return Some(first_pts);
        }

        let elapsed_us = start.elapsed().as_micros() as i64;
        let frame_duration_us = 1_000_000 * i64::from(rate.den()) / i64::from(rate.num());
        if frame_duration_us <= 0 {
            return Some(first_pts);
        }
        let frames_elapsed = elapsed_us / frame_duration_us;

        // One frame expressed in stream timebase units.
        let frame_duration_pts = i64::from(rate.den()) * i64::from(tb.den())
            / (i64::from(rate.num()) * i64::from(tb.num())).max(1);
        Some(first_pts + frames_elapsed * frame_duration_pts.max(1))
    }

    /// Frame whose PTS is closest to the target.
    fn select_frame(&self) -> Option<&VideoFrame> {
        if self.video_frames.is_empty() {
            return None;
        }
        let Some(target) = self.target_video_pts() else {
            return self.video_frames.values().next();
        };

        let after = self.video_frames.range(target..).next();
        let before = self.video_frames.range(..target).next_back();
        match (before, after) {
            (Some((bp, bf)), Some((ap, af))) => {
                if (target - bp).abs() <= (ap - target).abs() {
                    Some(bf)
                } else {
                    Some(af)
                }
            }
            (Some((_, f)), None) | (None, Some((_, f))) => Some(f),
            (None, None) => None,
        }
    }

    fn ensure_planes(&mut self, width: u32, height: u32) {
        if self
            .planes
            .as_ref()
            .is_some_and(|p| p.size == (width, height))
        {
            return;
        }
        let make = |format: wgpu::TextureFormat, w: u32, h: u32, label: &str| {
            self.gfx.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        };
        let luma = make(wgpu::TextureFormat::R8Unorm, width, height, "Stream Luma");
        let chroma = make(
            wgpu::TextureFormat::Rg8Unorm,
            width.div_ceil(2),
            height.div_ceil(2),
            "Stream Chroma",
        );
        let luma_view = luma.create_view(&wgpu::TextureViewDescriptor::default());
        let chroma_view = chroma.create_view(&wgpu::TextureViewDescriptor::default());
        self.planes = Some(PlaneTextures {
            size: (width, height),
            luma,
            luma_view,
            chroma,
            chroma_view,
        });
    }

    fn upload_frame(&mut self, frame: &VideoFrame) {
        self.ensure_planes(frame.width, frame.height);
        let Some(planes) = &self.planes else {
            return;
        };
        if frame.planes.len() < 2 || frame.strides.len() < 2 {
            log::debug!("StreamInput: frame is missing NV12 planes, skipping upload");
            return;
        }

        let write = |texture: &wgpu::Texture, data: &[u8], stride: u32, w: u32, h: u32| {
            self.gfx.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(stride),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
        };
        write(
            &planes.luma,
            &frame.planes[0],
            frame.strides[0],
            frame.width,
            frame.height,
        );
        write(
            &planes.chroma,
            &frame.planes[1],
            frame.strides[1],
            frame.width.div_ceil(2),
            frame.height.div_ceil(2),
        );
    }

    /// Drains buffered audio frames in PTS order into the probe's planar
    /// accumulation buffer.
    fn feed_audio(&mut self, audio: &mut crate::utils::AudioBuffer) {
        while let Some((_, frame)) = self.audio_frames.pop_first() {
            for (channel, plane) in frame.planes.iter().enumerate().take(2) {
                audio.write_planar(channel, plane);
            }
        }
    }
}

impl Node for StreamInput {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn node_kind(&self) -> NodeKind {
        NodeKind::Input
    }

    fn evaluation_strategy(&self) -> EvaluationStrategy {
        EvaluationStrategy::Dynamic
    }

    node_boilerplate!();

    fn update(&mut self) {
        if self.props.stream_url() != self.opened_url {
            self.open_stream();
        }
        self.drain_frames();
    }

    fn evaluate(
        &mut self,
        _arena: &NodeArena,
        probe: &mut RenderProbe<'_>,
        forward: &ForwardDesc<'_>,
    ) -> bool {
        let Some(frame) = self.select_frame() else {
            return false;
        };
        let frame = frame.clone();
        self.upload_frame(&frame);
        let Some(planes) = &self.planes else {
            return false;
        };

        let table = probe
            .binding
            .bind_planar(&self.gfx, &planes.luma_view, &planes.chroma_view);
        let mut pass = begin_pass(
            &mut probe.encoder,
            "StreamInput Pass",
            forward.target,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
        );
        pass.set_pipeline(&self.pipeline);
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
        drop(pass);

        if !self.audio_frames.is_empty() {
            self.feed_audio(probe.audio);
        }
        true
    }
}

impl Drop for StreamInput {
    fn drop(&mut self) {
        self.close_stream();
    }
}
