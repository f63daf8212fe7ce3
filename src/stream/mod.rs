//! Stream ingestion pipeline.
//!
//! Two dedicated threads per manager: a packet reader owning demuxer I/O
//! and an I/O processor owning decoder sends and receives. Bounded SPSC
//! queues connect the stages; per-channel backpressure queues absorb
//! decoder `Again` rejections.

mod channel;
mod manager;

pub use channel::{ChannelStorage, MAX_PACKETS, MAX_FRAMES};
pub use manager::{ManagedStream, StreamHandle, StreamManager, READ_QUEUE_DEPTH};
