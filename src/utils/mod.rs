//! Small shared utilities: byte ring, SPSC queue, audio accumulation.

mod audio;
mod byte_ring;
mod spsc;

pub use audio::AudioBuffer;
pub use byte_ring::ByteRing;
pub use spsc::SpscQueue;
