//! Stream manager: registry, worker threads, subscription updates.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::codec::{
    CodecBackend, DecodedFrame, Demuxer, MediaKind, OpenOptions, Packet, StreamDesc,
    VideoDecoderConfig,
};
use crate::errors::{ErrorCode, PrismError, Result};
use crate::utils::SpscQueue;

use super::channel::ChannelStorage;

/// Depth of the per-stream reader-to-processor packet queue.
pub const READ_QUEUE_DEPTH: usize = 64;

/// Wire handle of a registered stream: a plain integer id.
pub type StreamHandle = u64;

const IDLE_SLEEP: Duration = Duration::from_millis(10);
const BUSY_SLEEP: Duration = Duration::from_millis(1);

/// One subscription change, applied by the processor on its next pass.
#[derive(Debug, Clone, Copy)]
struct UpdateRequest {
    stream_index: i32,
    active: bool,
}

/// A registered stream: open demuxer, per-channel decoder storage and the
/// reader-to-processor packet queue.
pub struct ManagedStream {
    demuxer: Mutex<Box<dyn Demuxer>>,
    stream_descs: Vec<StreamDesc>,
    channels: RwLock<FxHashMap<i32, Arc<ChannelStorage>>>,
    read_queue: SpscQueue<Packet>,
    update_pending: AtomicBool,
    updates: Mutex<Vec<UpdateRequest>>,
    /// Latched on end-of-file so flush sentinels are enqueued exactly once
    /// per EOF transition.
    at_eof: AtomicBool,
}

impl ManagedStream {
    fn new(demuxer: Box<dyn Demuxer>) -> Self {
        let stream_descs = demuxer.streams().to_vec();
        Self {
            demuxer: Mutex::new(demuxer),
            stream_descs,
            channels: RwLock::new(FxHashMap::default()),
            read_queue: SpscQueue::new(READ_QUEUE_DEPTH),
            update_pending: AtomicBool::new(false),
            updates: Mutex::new(Vec::new()),
            at_eof: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn stream_descs(&self) -> &[StreamDesc] {
        &self.stream_descs
    }

    #[must_use]
    pub fn channel(&self, stream_index: i32) -> Option<Arc<ChannelStorage>> {
        self.channels.read().get(&stream_index).cloned()
    }

    #[must_use]
    pub fn active_channel_indices(&self) -> Vec<i32> {
        self.channels.read().keys().copied().collect()
    }
}

struct SharedState {
    backend: Arc<dyn CodecBackend>,
    video_config: VideoDecoderConfig,
    streams: RwLock<FxHashMap<StreamHandle, Arc<ManagedStream>>>,
    generation: AtomicU64,
    next_handle: AtomicU64,
    stop: AtomicBool,
}

/// Owns the packet-reader and I/O-processor threads and the stream
/// registry.
///
/// Registration takes the writer lock; worker snapshot refreshes take the
/// reader lock, and the generation counter lets workers skip the lock
/// entirely on unchanged iterations.
pub struct StreamManager {
    shared: Arc<SharedState>,
    threads: Vec<std::thread::JoinHandle<()>>,
}

impl StreamManager {
    #[must_use]
    pub fn new(backend: Arc<dyn CodecBackend>) -> Self {
        let shared = Arc::new(SharedState {
            backend,
            video_config: VideoDecoderConfig::default(),
            streams: RwLock::new(FxHashMap::default()),
            generation: AtomicU64::new(1),
            next_handle: AtomicU64::new(1),
            stop: AtomicBool::new(false),
        });

        let reader = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name("prism-packet-reader".into())
                .spawn(move || packet_loop(&shared))
                .expect("failed to spawn packet reader thread")
        };
        let processor = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name("prism-io-processor".into())
                .spawn(move || io_loop(&shared))
                .expect("failed to spawn I/O processor thread")
        };

        Self {
            shared,
            threads: vec![reader, processor],
        }
    }

    // ── Subscription API ────────────────────────────────────────────────────

    /// Opens a container without registering it, so the caller can inspect
    /// the stream descriptions and pick channels first.
    pub fn open_demuxer(&self, url: &str, options: &OpenOptions) -> Result<Box<dyn Demuxer>> {
        self.shared
            .backend
            .open_demuxer(url, options)
            .map_err(PrismError::CodecError)
    }

    /// Opens a container and registers it in one step.
    pub fn open_and_register(
        &self,
        url: &str,
        options: &OpenOptions,
        active_channels: &[i32],
    ) -> Result<StreamHandle> {
        let demuxer = self
            .shared
            .backend
            .open_demuxer(url, options)
            .map_err(PrismError::CodecError)?;
        Ok(self.register_stream(demuxer, active_channels))
    }

    /// Registers an open demuxer, initializing decoders for the requested
    /// channels (all of them when the caller passes the single sentinel
    /// index `-1`).
    pub fn register_stream(
        &self,
        demuxer: Box<dyn Demuxer>,
        active_channels: &[i32],
    ) -> StreamHandle {
        let stream = Arc::new(ManagedStream::new(demuxer));

        let activate_all = active_channels.len() == 1 && active_channels[0] == -1;
        if activate_all {
            let indices: Vec<i32> = stream.stream_descs.iter().map(|d| d.index).collect();
            for index in indices {
                init_decoder(&self.shared, &stream, index);
            }
        } else {
            for &index in active_channels {
                init_decoder(&self.shared, &stream, index);
            }
        }

        let handle = self.shared.next_handle.fetch_add(1, Ordering::Relaxed);
        self.shared.streams.write().insert(handle, stream);
        self.shared.generation.fetch_add(1, Ordering::Release);
        handle
    }

    pub fn unregister_stream(&self, handle: StreamHandle) {
        if handle == 0 {
            return;
        }
        self.shared.streams.write().remove(&handle);
        self.shared.generation.fetch_add(1, Ordering::Release);
    }

    /// Defers a single channel (de)activation to the processor's next pass.
    pub fn set_channel_active(&self, handle: StreamHandle, stream_index: i32, active: bool) {
        let streams = self.shared.streams.read();
        if let Some(stream) = streams.get(&handle) {
            stream
                .updates
                .lock()
                .push(UpdateRequest {
                    stream_index,
                    active,
                });
            stream.update_pending.store(true, Ordering::Release);
        }
    }

    pub fn activate_channels(&self, handle: StreamHandle, stream_indices: &[i32]) {
        for &index in stream_indices {
            self.set_channel_active(handle, index, true);
        }
    }

    pub fn deactivate_channels(&self, handle: StreamHandle, stream_indices: &[i32]) {
        for &index in stream_indices {
            self.set_channel_active(handle, index, false);
        }
    }

    // ── Consumer API (driver thread) ────────────────────────────────────────

    /// Non-blocking pop of a decoded frame from a channel's ready queue.
    #[must_use]
    pub fn poll_frame(&self, handle: StreamHandle, stream_index: i32) -> Option<DecodedFrame> {
        let streams = self.shared.streams.read();
        let channel = streams.get(&handle)?.channel(stream_index)?;
        drop(streams);
        channel.decoded_frame()
    }

    /// Stream descriptions of a registered container.
    pub fn stream_descs(&self, handle: StreamHandle) -> Result<Vec<StreamDesc>> {
        let streams = self.shared.streams.read();
        streams
            .get(&handle)
            .map(|s| s.stream_descs.clone())
            .ok_or(PrismError::StreamNotFound(handle))
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

// ── Decoder initialization ──────────────────────────────────────────────────

fn init_decoder(shared: &SharedState, stream: &ManagedStream, stream_index: i32) {
    let Some(desc) = stream
        .stream_descs
        .iter()
        .find(|d| d.index == stream_index)
    else {
        log::error!("No such channel in stream: {stream_index}");
        return;
    };

    let decoder = match desc.kind {
        MediaKind::Video => shared
            .backend
            .create_video_decoder(desc, &shared.video_config),
        MediaKind::Audio => shared.backend.create_audio_decoder(desc),
        MediaKind::Other => {
            log::warn!("Unsupported codec type for stream {stream_index}");
            return;
        }
    };

    match decoder {
        Ok(decoder) => {
            log::info!(
                "Initialized decoder for stream {stream_index}: {}",
                desc.codec_name
            );
            stream
                .channels
                .write()
                .insert(stream_index, Arc::new(ChannelStorage::new(decoder)));
        }
        Err(err) => {
            log::error!("Failed to open decoder for stream {stream_index}: {err:?}");
            stream.channels.write().remove(&stream_index);
        }
    }
}

// ── Worker snapshots ────────────────────────────────────────────────────────

fn refresh_snapshot(
    shared: &SharedState,
    last_generation: &mut u64,
    snapshot: &mut Vec<Arc<ManagedStream>>,
) {
    let current = shared.generation.load(Ordering::Acquire);
    if current != *last_generation {
        let streams = shared.streams.read();
        snapshot.clear();
        snapshot.extend(streams.values().cloned());
        *last_generation = current;
    }
}

// ── Packet reader thread ────────────────────────────────────────────────────

fn packet_loop(shared: &SharedState) {
    log::info!("Packet thread started.");
    let mut snapshot: Vec<Arc<ManagedStream>> = Vec::new();
    let mut last_generation = 0u64;

    while !shared.stop.load(Ordering::Acquire) {
        refresh_snapshot(shared, &mut last_generation, &mut snapshot);

        if snapshot.is_empty() {
            std::thread::sleep(IDLE_SLEEP);
            continue;
        }

        let mut work_done = false;
        for stream in &snapshot {
            if shared.stop.load(Ordering::Acquire) {
                break;
            }
            work_done |= read_stream_packets(stream);
        }
        if !work_done {
            std::thread::sleep(BUSY_SLEEP);
        }
    }
    log::info!("Packet thread stopped.");
}

/// One non-blocking read from a stream's demuxer into its read queue.
fn read_stream_packets(stream: &ManagedStream) -> bool {
    let result = stream.demuxer.lock().read_packet();
    match result {
        Ok(packet) => {
            if stream.read_queue.is_full() {
                log::warn!(
                    "Read queue full, force pushing for stream index {}",
                    packet.stream_index
                );
            }
            stream.read_queue.force_push(packet);
            stream.at_eof.store(false, Ordering::Relaxed);
            true
        }
        Err(ErrorCode::Again) => false,
        Err(ErrorCode::EndOfFile) => {
            // Flush sentinels drain every channel's decoder pipeline,
            // enqueued once per EOF transition.
            if !stream.at_eof.swap(true, Ordering::Relaxed) {
                for index in stream.active_channel_indices() {
                    stream.read_queue.force_push(Packet::flush(index));
                }
            }
            false
        }
        Err(err) => {
            log::error!("Error reading frame from stream: {err:?}");
            false
        }
    }
}

// ── I/O processor thread ────────────────────────────────────────────────────

fn io_loop(shared: &SharedState) {
    log::info!("I/O thread started.");
    let mut snapshot: Vec<Arc<ManagedStream>> = Vec::new();
    let mut last_generation = 0u64;

    while !shared.stop.load(Ordering::Acquire) {
        refresh_snapshot(shared, &mut last_generation, &mut snapshot);

        if snapshot.is_empty() {
            std::thread::sleep(IDLE_SLEEP);
            continue;
        }

        let mut work_done = false;
        for stream in &snapshot {
            if shared.stop.load(Ordering::Acquire) {
                break;
            }
            if stream.update_pending.swap(false, Ordering::AcqRel) {
                let updates: Vec<UpdateRequest> = std::mem::take(&mut *stream.updates.lock());
                for update in updates {
                    if update.active {
                        init_decoder(shared, stream, update.stream_index);
                    } else {
                        stream.channels.write().remove(&update.stream_index);
                    }
                }
            }
            work_done |= io_process_stream(stream);
        }
        if !work_done {
            std::thread::sleep(BUSY_SLEEP);
        }
    }
    log::info!("I/O thread stopped.");
}

/// Drains a stream's read queue into its channel decoders.
///
/// Every pass first retries each channel's backpressure queue; a channel
/// that is both stalled and at capacity parks the whole stream until frames
/// are consumed downstream.
fn io_process_stream(stream: &ManagedStream) -> bool {
    let channels: Vec<(i32, Arc<ChannelStorage>)> = {
        let map = stream.channels.read();
        map.iter().map(|(&k, v)| (k, Arc::clone(v))).collect()
    };
    if channels.is_empty() {
        return false;
    }

    let mut work_done = false;
    loop {
        for (index, channel) in &channels {
            let ok = channel.send_queued_packets();
            if !ok && channel.is_overflown() {
                log::warn!(
                    "Decoder for stream {index} is overloaded and cannot send queued packets."
                );
                return work_done;
            }
            // Pump decoded frames into the ready queue while room remains.
            while channel.try_decode_frame() {
                work_done = true;
            }
        }

        let Some(packet) = stream.read_queue.try_pop() else {
            return work_done;
        };
        work_done = true;

        // Route by channel; packets without a subscriber are discarded.
        let Some((_, channel)) = channels.iter().find(|(i, _)| *i == packet.stream_index) else {
            continue;
        };
        channel.send_packet(packet);
    }
}
