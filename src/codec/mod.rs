//! Codec boundary.
//!
//! The concrete codec library is an external collaborator; the engine only
//! sees these traits and records. A backend supplies demuxers and decoders;
//! the stream manager owns the threading, queueing and backpressure around
//! them. Decoder flow control reuses the consolidated
//! [`ErrorCode`](crate::errors::ErrorCode) taxonomy: `Again` for
//! backpressure, `EndOfFile` for flush.

use bitflags::bitflags;

use crate::errors::ErrorCode;
use crate::sync::Rational;

/// Result alias for codec-boundary calls.
pub type CodecResult<T> = std::result::Result<T, ErrorCode>;

/// Media classification of one channel within a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Other,
}

/// GPU-visible pixel formats decoders emit.
///
/// Hardware video decoders are configured for bi-planar NV12 so downstream
/// rendering can wrap the planes as shader resources without conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Nv12,
    Uyvy,
    Rgba8,
}

/// Description of one stream (channel) inside an open container.
#[derive(Debug, Clone)]
pub struct StreamDesc {
    pub index: i32,
    pub kind: MediaKind,
    pub codec_name: String,
    /// Video geometry; zero for non-video.
    pub width: u32,
    pub height: u32,
    /// Audio parameters; zero for non-audio.
    pub sample_rate: u32,
    pub channels: u32,
    /// Timestamp unit of this stream's packets and frames.
    pub timebase: Rational,
    /// Best-known frame rate: average rate when the container carries one,
    /// else the real base rate, else the codec rate.
    pub frame_rate: Rational,
}

/// One demuxed packet.
#[derive(Debug, Clone)]
pub struct Packet {
    pub stream_index: i32,
    pub pts: i64,
    pub data: Vec<u8>,
    /// Flush sentinel: tells the decoder to drain its pipeline.
    pub flush: bool,
}

impl Packet {
    /// Flush sentinel addressed at one channel.
    #[must_use]
    pub fn flush(stream_index: i32) -> Self {
        Self {
            stream_index,
            pts: 0,
            data: Vec::new(),
            flush: true,
        }
    }
}

/// Decoded video frame: NV12 planes (Y then interleaved UV) with their row
/// strides. Timestamps stay in the stream's own timebase.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub pts: i64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub planes: Vec<Vec<u8>>,
    pub strides: Vec<u32>,
}

/// Decoded audio frame: planar f32 samples, one plane per channel.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub pts: i64,
    pub sample_rate: u32,
    pub planes: Vec<Vec<f32>>,
}

/// A decoded frame of either kind.
#[derive(Debug, Clone)]
pub enum DecodedFrame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl DecodedFrame {
    #[must_use]
    pub fn pts(&self) -> i64 {
        match self {
            DecodedFrame::Video(f) => f.pts,
            DecodedFrame::Audio(f) => f.pts,
        }
    }
}

bitflags! {
    /// Error-resilience switches for hardware video decoders.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResilienceFlags: u32 {
        /// Emit frames decoded from corrupted data instead of dropping.
        const OUTPUT_CORRUPT = 1 << 0;
        /// Prefer speed over strict conformance.
        const FAST = 1 << 1;
        /// Conceal errors by motion-vector guessing and deblocking.
        const CONCEAL = 1 << 2;
    }
}

/// Configuration for hardware video decoders.
#[derive(Debug, Clone)]
pub struct VideoDecoderConfig {
    /// Single-threaded, frame-level threading: hardware decode does the
    /// parallel work.
    pub thread_count: u32,
    pub resilience: ResilienceFlags,
    /// Queued decode operations in the hardware pipeline.
    pub async_depth: u32,
    /// Extra surfaces kept for reference frames.
    pub extra_hw_frames: u32,
    pub output_format: PixelFormat,
}

impl Default for VideoDecoderConfig {
    fn default() -> Self {
        Self {
            thread_count: 1,
            resilience: ResilienceFlags::OUTPUT_CORRUPT
                | ResilienceFlags::FAST
                | ResilienceFlags::CONCEAL,
            async_depth: 8,
            extra_hw_frames: 16,
            output_format: PixelFormat::Nv12,
        }
    }
}

/// Options for opening a container.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Abort threshold for the open and for blocking reads, enforced by the
    /// backend's interrupt callback.
    pub timeout_us: u64,
    /// Ask the demuxer for low-latency behavior (no reorder buffering).
    pub low_latency: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            timeout_us: 5_000_000,
            low_latency: true,
        }
    }
}

/// An open container performing non-blocking packet reads.
pub trait Demuxer: Send {
    fn streams(&self) -> &[StreamDesc];

    /// Non-blocking read. `Err(Again)` means no packet right now,
    /// `Err(EndOfFile)` means the container is drained.
    fn read_packet(&mut self) -> CodecResult<Packet>;
}

/// A decoder for one channel.
///
/// `send_packet` returning `Err(Again)` signals backpressure: the caller
/// must drain frames via `receive_frame` before retrying the same packet.
pub trait Decoder: Send {
    fn send_packet(&mut self, packet: &Packet) -> CodecResult<()>;

    fn receive_frame(&mut self) -> CodecResult<DecodedFrame>;
}

/// Factory surface of the codec library.
///
/// A backend carries whatever device access it needs (the hardware decode
/// context is created from the GPU device when the backend is constructed)
/// and is shared immutably across all decoders.
pub trait CodecBackend: Send + Sync {
    fn open_demuxer(&self, url: &str, options: &OpenOptions) -> CodecResult<Box<dyn Demuxer>>;

    fn create_video_decoder(
        &self,
        stream: &StreamDesc,
        config: &VideoDecoderConfig,
    ) -> CodecResult<Box<dyn Decoder>>;

    fn create_audio_decoder(&self, stream: &StreamDesc) -> CodecResult<Box<dyn Decoder>>;
}
