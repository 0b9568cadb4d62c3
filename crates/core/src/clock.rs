//! Wall-clock timing for animation and frame statistics.

use std::time::{Duration, Instant};

/// Monotonic clock tracking total run time and per-frame deltas.
///
/// Total elapsed time drives the model rotation; the per-frame delta feeds
/// the frame-rate log line.
#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    last_frame: Instant,
}

impl FrameClock {
    /// Create a new clock, starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
        }
    }

    /// Total time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Total time in seconds since the clock was created.
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed().as_secs_f32()
    }

    /// Time since the previous call to `frame_delta`, advancing the frame mark.
    pub fn frame_delta(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        delta
    }

    /// Per-frame delta in seconds.
    pub fn delta_secs(&mut self) -> f32 {
        self.frame_delta().as_secs_f32()
    }

    /// Reset both the start time and the frame mark to now.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last_frame = now;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
