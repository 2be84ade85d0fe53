//! Halt-aware travel simulation of a single leg.

use std::time::Duration;
use tokio::time::Instant;

/// One leg of a flight. While running it counts down to a deadline; pausing
/// banks the remaining time and resuming sets a fresh deadline `now + remaining`.
#[derive(Clone, Copy, Debug)]
pub struct TravelSimulator {
    remaining: Duration,
    deadline: Option<Instant>,
}

impl TravelSimulator {
    /// A paused leg of `duration`.
    pub fn new(duration: Duration) -> Self { Self { remaining: duration, deadline: None } }

    pub fn is_paused(&self) -> bool { self.deadline.is_none() }

    /// No-op when already running.
    pub fn resume(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.remaining);
        }
    }

    /// No-op when already paused.
    pub fn pause(&mut self, now: Instant) {
        if let Some(deadline) = self.deadline.take() {
            self.remaining = deadline.saturating_duration_since(now);
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.map_or(self.remaining, |d| d.saturating_duration_since(now))
    }

    /// A paused leg never completes.
    pub fn is_complete(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}
