//! Stream Pipeline Tests
//!
//! Tests for:
//! - Channel backpressure semantics (queue on Again, drain on recovery)
//! - End-of-file flush clearing queued packets
//! - Overflow parking: a stalled decoder never accumulates more than the
//!   backpressure cap, and recovery drains everything
//! - Subscription updates applied on the processor thread

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use prism::codec::{
    CodecBackend, CodecResult, DecodedFrame, Decoder, Demuxer, MediaKind, OpenOptions, Packet,
    StreamDesc, VideoDecoderConfig, VideoFrame,
};
use prism::errors::ErrorCode;
use prism::stream::{ChannelStorage, StreamManager, MAX_PACKETS};
use prism::sync::Rational;

// ============================================================================
// Scripted codec mocks
// ============================================================================

fn video_desc(index: i32) -> StreamDesc {
    StreamDesc {
        index,
        kind: MediaKind::Video,
        codec_name: "mock".to_string(),
        width: 64,
        height: 64,
        sample_rate: 0,
        channels: 0,
        timebase: Rational::new(1, 90_000),
        frame_rate: Rational::new(30, 1),
    }
}

fn video_packet(pts: i64) -> Packet {
    Packet {
        stream_index: 0,
        pts,
        data: vec![0u8; 16],
        flush: false,
    }
}

fn mock_video_frame(pts: i64) -> DecodedFrame {
    DecodedFrame::Video(VideoFrame {
        pts,
        width: 64,
        height: 64,
        format: prism::codec::PixelFormat::Nv12,
        planes: vec![vec![0; 64 * 64], vec![0; 64 * 32]],
        strides: vec![64, 64],
    })
}

/// Shared decoder script: while `accepting` is false, every call answers
/// `Again`; once flipped, sends succeed and each accepted packet becomes
/// one frame.
#[derive(Default)]
struct DecoderScript {
    accepting: AtomicBool,
    flushed: AtomicBool,
    distinct_sends: Mutex<Vec<i64>>,
    pending: Mutex<VecDeque<i64>>,
}

struct MockDecoder {
    script: Arc<DecoderScript>,
}

impl Decoder for MockDecoder {
    fn send_packet(&mut self, packet: &Packet) -> CodecResult<()> {
        if packet.flush {
            self.script.flushed.store(true, Ordering::Release);
            return Ok(());
        }
        if !self.script.accepting.load(Ordering::Acquire) {
            let mut seen = self.script.distinct_sends.lock().unwrap();
            if !seen.contains(&packet.pts) {
                seen.push(packet.pts);
            }
            return Err(ErrorCode::Again);
        }
        self.script.pending.lock().unwrap().push_back(packet.pts);
        Ok(())
    }

    fn receive_frame(&mut self) -> CodecResult<DecodedFrame> {
        if let Some(pts) = self.script.pending.lock().unwrap().pop_front() {
            return Ok(mock_video_frame(pts));
        }
        if self.script.flushed.load(Ordering::Acquire) {
            return Err(ErrorCode::EndOfFile);
        }
        Err(ErrorCode::Again)
    }
}

/// Demuxer producing `total` video packets, then end-of-file.
struct MockDemuxer {
    descs: Vec<StreamDesc>,
    next_pts: AtomicI64,
    total: i64,
}

impl MockDemuxer {
    fn new(total: i64) -> Self {
        Self {
            descs: vec![video_desc(0)],
            next_pts: AtomicI64::new(0),
            total,
        }
    }
}

impl Demuxer for MockDemuxer {
    fn streams(&self) -> &[StreamDesc] {
        &self.descs
    }

    fn read_packet(&mut self) -> CodecResult<Packet> {
        let pts = self.next_pts.fetch_add(1, Ordering::Relaxed);
        if pts >= self.total {
            return Err(ErrorCode::EndOfFile);
        }
        Ok(video_packet(pts))
    }
}

struct MockBackend {
    script: Arc<DecoderScript>,
    packets: i64,
}

impl CodecBackend for MockBackend {
    fn open_demuxer(&self, _url: &str, _options: &OpenOptions) -> CodecResult<Box<dyn Demuxer>> {
        Ok(Box::new(MockDemuxer::new(self.packets)))
    }

    fn create_video_decoder(
        &self,
        _stream: &StreamDesc,
        _config: &VideoDecoderConfig,
    ) -> CodecResult<Box<dyn Decoder>> {
        Ok(Box::new(MockDecoder {
            script: Arc::clone(&self.script),
        }))
    }

    fn create_audio_decoder(&self, _stream: &StreamDesc) -> CodecResult<Box<dyn Decoder>> {
        Ok(Box::new(MockDecoder {
            script: Arc::clone(&self.script),
        }))
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// ============================================================================
// Channel storage semantics
// ============================================================================

#[test]
fn send_packet_queues_on_backpressure() {
    let script = Arc::new(DecoderScript::default());
    let channel = ChannelStorage::new(Box::new(MockDecoder {
        script: Arc::clone(&script),
    }));

    // Stalled decoder: the packet is accepted into the queue.
    assert!(channel.send_packet(video_packet(0)));
    assert!(channel.send_packet(video_packet(1)));
    assert_eq!(channel.queued_packet_count(), 2);

    // Still stalled: the retry makes no progress and reports false.
    assert!(!channel.send_queued_packets());
    assert_eq!(channel.queued_packet_count(), 2);

    // Recovery drains the queue in order and yields the frames.
    script.accepting.store(true, Ordering::Release);
    assert!(channel.send_queued_packets());
    assert_eq!(channel.queued_packet_count(), 0);
    while channel.try_decode_frame() {}
    assert_eq!(channel.decoded_frame().map(|f| f.pts()), Some(0));
    assert_eq!(channel.decoded_frame().map(|f| f.pts()), Some(1));
    assert!(channel.decoded_frame().is_none());
}

#[test]
fn flush_clears_queued_packets() {
    let script = Arc::new(DecoderScript::default());
    let channel = ChannelStorage::new(Box::new(MockDecoder {
        script: Arc::clone(&script),
    }));

    assert!(channel.send_packet(video_packet(0)));
    assert_eq!(channel.queued_packet_count(), 1);

    // The flush sentinel reaches the decoder; once drained to EOF the
    // queued packets are dropped.
    assert!(channel.send_packet(Packet::flush(0)));
    assert!(!channel.try_decode_frame());
    assert_eq!(channel.queued_packet_count(), 0);
}

// ============================================================================
// End-to-end pipeline
// ============================================================================

#[test]
fn overflow_parks_the_stream_and_recovery_drains_it() {
    let script = Arc::new(DecoderScript::default());
    let manager = StreamManager::new(Arc::new(MockBackend {
        script: Arc::clone(&script),
        packets: 500,
    }));

    let demuxer = manager
        .open_demuxer("mock://overflow", &OpenOptions::default())
        .unwrap();
    let handle = manager.register_stream(demuxer, &[0]);

    // The stalled decoder fills the backpressure queue and the stream
    // parks: the set of distinct packets offered stops growing at the cap.
    assert!(wait_until(Duration::from_secs(2), || {
        script.distinct_sends.lock().unwrap().len() >= MAX_PACKETS
    }));
    std::thread::sleep(Duration::from_millis(50));
    let resident = script.distinct_sends.lock().unwrap().len();
    assert!(
        resident <= MAX_PACKETS + 1,
        "stalled decoder saw {resident} distinct packets"
    );

    // Flip the decoder to accepting; queued packets drain and frames
    // arrive on the consumer side in order.
    script.accepting.store(true, Ordering::Release);
    let mut received = Vec::new();
    assert!(wait_until(Duration::from_secs(5), || {
        while let Some(frame) = manager.poll_frame(handle, 0) {
            received.push(frame.pts());
        }
        received.len() >= 64
    }));
    assert!(received.windows(2).all(|w| w[1] > w[0]), "out of order: {received:?}");

    manager.unregister_stream(handle);
}

#[test]
fn finite_stream_delivers_every_frame_then_flushes() {
    let script = Arc::new(DecoderScript::default());
    script.accepting.store(true, Ordering::Release);
    let total = 40;
    let manager = StreamManager::new(Arc::new(MockBackend {
        script: Arc::clone(&script),
        packets: total,
    }));

    let demuxer = manager
        .open_demuxer("mock://finite", &OpenOptions::default())
        .unwrap();
    let handle = manager.register_stream(demuxer, &[0]);

    let mut received = Vec::new();
    assert!(wait_until(Duration::from_secs(5), || {
        while let Some(frame) = manager.poll_frame(handle, 0) {
            received.push(frame.pts());
        }
        received.len() as i64 >= total
    }));
    assert_eq!(received.len() as i64, total);
    assert!(received.windows(2).all(|w| w[1] > w[0]));

    manager.unregister_stream(handle);
}

#[test]
fn channel_activation_is_applied_by_the_processor() {
    let script = Arc::new(DecoderScript::default());
    script.accepting.store(true, Ordering::Release);
    let manager = StreamManager::new(Arc::new(MockBackend {
        script: Arc::clone(&script),
        packets: 10_000,
    }));

    let demuxer = manager
        .open_demuxer("mock://subscribe", &OpenOptions::default())
        .unwrap();
    // Registered without channels: packets are discarded.
    let handle = manager.register_stream(demuxer, &[]);
    std::thread::sleep(Duration::from_millis(50));
    assert!(manager.poll_frame(handle, 0).is_none());

    // Activation is deferred to the processor and then frames flow.
    manager.activate_channels(handle, &[0]);
    assert!(wait_until(Duration::from_secs(2), || {
        manager.poll_frame(handle, 0).is_some()
    }));

    manager.unregister_stream(handle);
}
