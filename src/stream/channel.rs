//! Per-channel decoder storage.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::codec::{DecodedFrame, Decoder, Packet};
use crate::errors::ErrorCode;
use crate::utils::SpscQueue;

/// Max packets queued behind a backpressured decoder.
pub const MAX_PACKETS: usize = 32;

/// Max decoded frames buffered for the consumer.
pub const MAX_FRAMES: usize = 16;

/// Decoder plus its backpressure and output queues for one
/// `(stream, channel)` pair.
///
/// The decoder and the packet queue belong to the I/O processor thread;
/// the frame queue is SPSC from the processor to the driver thread (the
/// node's `update`). The mutexes exist to make the type `Sync` — they are
/// uncontended by construction.
pub struct ChannelStorage {
    decoder: Mutex<Box<dyn Decoder>>,
    packets: Mutex<VecDeque<Packet>>,
    frames: SpscQueue<DecodedFrame>,
}

impl ChannelStorage {
    #[must_use]
    pub fn new(decoder: Box<dyn Decoder>) -> Self {
        Self {
            decoder: Mutex::new(decoder),
            packets: Mutex::new(VecDeque::new()),
            frames: SpscQueue::new(MAX_FRAMES),
        }
    }

    /// Whether the backpressure queue has reached capacity.
    #[must_use]
    pub fn is_overflown(&self) -> bool {
        self.packets.lock().len() >= MAX_PACKETS
    }

    #[must_use]
    pub fn is_frame_queue_full(&self) -> bool {
        self.frames.is_full()
    }

    #[must_use]
    pub fn queued_packet_count(&self) -> usize {
        self.packets.lock().len()
    }

    /// Sends one packet to the decoder.
    ///
    /// `Again` queues the packet for a later retry and still counts as
    /// accepted. End-of-file clears the queue and reports `false`; other
    /// errors drop the packet.
    pub fn send_packet(&self, packet: Packet) -> bool {
        let result = self.decoder.lock().send_packet(&packet);
        match result {
            Ok(()) => true,
            Err(ErrorCode::Again) => {
                self.packets.lock().push_back(packet);
                true
            }
            Err(ErrorCode::EndOfFile) => {
                self.packets.lock().clear();
                log::info!("Decoder flushed, clearing queued packets.");
                false
            }
            Err(err) => {
                log::error!("Error sending packet to decoder: {err:?}");
                false
            }
        }
    }

    /// Retries queued packets in order until the queue drains or the
    /// decoder stalls.
    ///
    /// On `Again` with a full frame queue the caller gets `false` and tries
    /// again next iteration; with room available, frames are drained to
    /// make space and the same packet is resent. Returns `true` once the
    /// queue is empty.
    pub fn send_queued_packets(&self) -> bool {
        let mut packets = self.packets.lock();
        if packets.is_empty() {
            return true;
        }

        while let Some(front) = packets.front() {
            let result = self.decoder.lock().send_packet(front);
            match result {
                Ok(()) => {
                    packets.pop_front();
                }
                Err(ErrorCode::Again) => {
                    if self.is_frame_queue_full() {
                        return false;
                    }
                    let mut progressed = false;
                    while self.try_decode_frame_inner(&mut packets) {
                        progressed = true;
                    }
                    if !progressed {
                        // Decoder rejects input and yields no output; retry
                        // on a later pass instead of spinning here.
                        return false;
                    }
                    // Retry the same packet now that frames have drained.
                }
                Err(ErrorCode::EndOfFile) => {
                    packets.clear();
                    log::info!("Decoder flushed, clearing queued packets.");
                    return false;
                }
                Err(err) => {
                    log::error!("Error sending queued packet to decoder: {err:?}");
                    return false;
                }
            }
        }
        true
    }

    /// Pulls one decoded frame out of the decoder into the frame queue.
    pub fn try_decode_frame(&self) -> bool {
        let mut packets = self.packets.lock();
        self.try_decode_frame_inner(&mut packets)
    }

    fn try_decode_frame_inner(&self, packets: &mut VecDeque<Packet>) -> bool {
        if self.frames.is_full() {
            return false;
        }
        let result = self.decoder.lock().receive_frame();
        match result {
            Ok(frame) => self.frames.try_push(frame).is_ok(),
            Err(ErrorCode::Again) => false,
            Err(ErrorCode::EndOfFile) => {
                packets.clear();
                false
            }
            Err(err) => {
                log::debug!("Error during frame decode: {err:?}");
                false
            }
        }
    }

    /// Non-blocking pop of a decoded frame. Consumer side (driver thread).
    #[must_use]
    pub fn decoded_frame(&self) -> Option<DecodedFrame> {
        self.frames.try_pop()
    }
}
