//! Frame time management

use std::time::{Duration, Instant};

/// Timestamp snapshot taken at the start of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTime {
    /// Monotonic timestamp of the frame start
    pub now: Instant,

    /// Time since the timer was created
    pub since_start: Duration,

    /// Index of this frame, starting at zero
    pub frame_index: u64,
}

impl FrameTime {
    /// Milliseconds since the timer was created, as animations expect them
    pub fn millis(&self) -> u64 {
        self.since_start.as_millis() as u64
    }
}

/// Monotonic timer ticked once per drawn frame
#[derive(Debug, Clone)]
pub struct FrameTimer {
    start: Instant,
    last: FrameTime,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: FrameTime {
                now,
                since_start: Duration::ZERO,
                frame_index: 0,
            },
            frame_count: 0,
        }
    }

    /// Record the start of a new frame and return its timestamp
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        self.last = FrameTime {
            now,
            since_start: now.saturating_duration_since(self.start),
            frame_index: self.frame_count,
        };
        self.frame_count = self.frame_count.wrapping_add(1);
        self.last
    }

    /// Timestamp of the most recent frame
    pub fn last(&self) -> FrameTime {
        self.last
    }

    /// Number of frames ticked so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_is_monotonic() {
        let mut timer = FrameTimer::new();
        let first = timer.tick();
        let second = timer.tick();

        assert_eq!(first.frame_index, 0);
        assert_eq!(second.frame_index, 1);
        assert!(second.now >= first.now);
        assert!(second.since_start >= first.since_start);
        assert_eq!(timer.frame_count(), 2);
        assert_eq!(timer.last(), second);
    }
}
