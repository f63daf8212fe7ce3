//! Planar audio accumulation buffer.
//!
//! Upstream audio nodes write decoded stereo samples during traversal; the
//! output drains them after the frame. Two rings, one per channel, keep the
//! planes independent so partially drained channels never interleave.

use super::ByteRing;

pub const AUDIO_CHANNELS: usize = 2;

/// Stereo f32 planar accumulation buffer.
#[derive(Debug)]
pub struct AudioBuffer {
    planes: [ByteRing; AUDIO_CHANNELS],
    sample_rate: u32,
}

impl AudioBuffer {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            planes: [ByteRing::new(), ByteRing::new()],
            sample_rate,
        }
    }

    #[inline]
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples buffered in the fuller plane.
    #[must_use]
    pub fn buffered_samples(&self) -> usize {
        self.planes
            .iter()
            .map(|p| p.len() / std::mem::size_of::<f32>())
            .max()
            .unwrap_or(0)
    }

    /// Appends one plane's worth of samples.
    pub fn write_planar(&mut self, channel: usize, samples: &[f32]) {
        if channel < AUDIO_CHANNELS {
            self.planes[channel].write_as(samples);
        }
    }

    /// Drains up to `out.len()` samples from one plane; returns the number
    /// of samples read.
    pub fn read_planar(&mut self, channel: usize, out: &mut [f32]) -> usize {
        if channel >= AUDIO_CHANNELS {
            return 0;
        }
        self.planes[channel].read_as(out)
    }

    pub fn clear(&mut self) {
        for plane in &mut self.planes {
            plane.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_round_trip_reports_count() {
        let mut buf = AudioBuffer::new(48_000);
        buf.write_planar(0, &[0.1, 0.2, 0.3]);
        buf.write_planar(1, &[0.4, 0.5]);
        assert_eq!(buf.buffered_samples(), 3);

        let mut out = [0.0f32; 8];
        assert_eq!(buf.read_planar(0, &mut out), 3);
        assert_eq!(&out[..3], &[0.1, 0.2, 0.3]);
        assert_eq!(buf.read_planar(1, &mut out), 2);
        assert_eq!(&out[..2], &[0.4, 0.5]);
    }
}
