//! Frame Timing
//!
//! [`FramePacer`] keeps the loop near its target frame rate and
//! [`TickTimer`] decides when the ~1 Hz background tick is due. Both take the
//! current [`Instant`] as an argument so tests can drive them with synthetic
//! clocks.
//!
//! The pacer's sleep is the only sleep in the runtime. Everything else waits
//! on input polls or channels.

use std::time::{Duration, Instant};

/// Paces the frame loop to a target interval
#[derive(Clone, Copy, Debug)]
pub struct FramePacer {
    frame_interval: Duration,
}

impl FramePacer {
    /// Pace at `fps` frames per second (clamped to at least 1)
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            frame_interval: Duration::from_secs(1) / fps.max(1),
        }
    }

    /// Target frame interval
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Time left in the frame that started at `frame_start`, never negative
    #[must_use]
    pub fn remaining(&self, frame_start: Instant, now: Instant) -> Duration {
        self.frame_interval
            .saturating_sub(now.saturating_duration_since(frame_start))
    }

    /// Sleep out the rest of the frame that started at `frame_start`
    pub fn wait(&self, frame_start: Instant) {
        let remaining = self.remaining(frame_start, Instant::now());
        if !remaining.is_zero() {
            // Frame rate limiting
            std::thread::sleep(remaining);
        }
    }
}

/// Fixed-cadence timer checked once per frame
///
/// The first check arms the timer. After that it fires at most once per
/// check, advancing by whole intervals so the cadence does not drift. After a
/// stall longer than one interval it fires once and resynchronises to `now`
/// instead of firing in a burst.
#[derive(Clone, Copy, Debug)]
pub struct TickTimer {
    interval: Duration,
    last: Option<Instant>,
}

impl TickTimer {
    /// Timer firing every `interval`
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Cadence
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm the timer at `now` without firing
    pub fn reset(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Whether the timer fires at `now`
    pub fn is_due(&mut self, now: Instant) -> bool {
        let Some(last) = self.last else {
            self.last = Some(now);
            return false;
        };

        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.interval {
            return false;
        }

        self.last = Some(if elapsed >= self.interval * 2 {
            now
        } else {
            last + self.interval
        });
        true
    }
}
