//! Wall clock and 90 kHz PTS clock.
//!
//! The PTS clock is the master time source for the output scheduler and the
//! animation engine. 90 kHz is the standard video timebase (MPEG), chosen so
//! that every common frame rate divides it into an integral tick count.

use std::time::{Duration, Instant};

use super::Rational;

/// Presentation timestamps are 90 kHz ticks.
pub const TIMEBASE_HZ: u64 = 90_000;

/// Sentinel for "no timestamp".
pub const INVALID_PTS: i64 = -1;

/// Monotonic wall clock reporting elapsed nanoseconds since its origin.
#[derive(Debug, Clone)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        self.origin = Instant::now();
    }

    #[must_use]
    pub fn elapsed_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Abstraction over the scheduler's time source.
///
/// Production code uses [`PtsClock`]; tests drive the scheduler with a
/// manually advanced clock.
pub trait MasterClock {
    /// Current PTS in 90 kHz ticks.
    fn current_pts(&self) -> u64;

    /// Restart counting from zero.
    fn reset(&mut self);
}

/// PTS clock deriving 90 kHz ticks from a monotonic wall clock.
#[derive(Debug, Clone, Default)]
pub struct PtsClock {
    wall: WallClock,
}

impl PtsClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// PTS for the frame after `current_pts` at the given frame rate.
    #[must_use]
    pub fn next_frame_pts(current_pts: u64, framerate: Rational) -> u64 {
        if framerate.num() <= 0 || framerate.den() <= 0 {
            return current_pts;
        }
        let ticks_per_frame = (TIMEBASE_HZ * framerate.den() as u64) / framerate.num() as u64;
        current_pts + ticks_per_frame
    }

    /// Wall-clock duration corresponding to a PTS value.
    #[must_use]
    pub fn pts_to_wall_time(pts: u64) -> Duration {
        Duration::from_nanos((pts * 1_000_000_000) / TIMEBASE_HZ)
    }

    /// How long to wait until `target_pts` comes due. Zero if already past.
    #[must_use]
    pub fn time_until_pts(&self, target_pts: u64) -> Duration {
        let current = self.current_pts();
        if target_pts <= current {
            return Duration::ZERO;
        }
        Self::pts_to_wall_time(target_pts - current)
    }
}

impl MasterClock for PtsClock {
    fn current_pts(&self) -> u64 {
        (self.wall.elapsed_nanos() * TIMEBASE_HZ) / 1_000_000_000
    }

    fn reset(&mut self) {
        self.wall.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_frame_pts_for_common_rates() {
        assert_eq!(PtsClock::next_frame_pts(0, Rational::new(60, 1)), 1500);
        assert_eq!(PtsClock::next_frame_pts(0, Rational::new(30, 1)), 3000);
        assert_eq!(PtsClock::next_frame_pts(0, Rational::new(25, 1)), 3600);
        // NTSC 29.97: 90000 * 1001 / 30000 = 3003
        assert_eq!(
            PtsClock::next_frame_pts(0, Rational::new(30000, 1001)),
            3003
        );
    }

    #[test]
    fn pts_wall_time_round_trip() {
        let d = PtsClock::pts_to_wall_time(90_000);
        assert_eq!(d, Duration::from_secs(1));
    }
}
