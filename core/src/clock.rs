//! Wall clock seam: owns "now" for decision dates and trailing windows.
//!
//! RULE: Nothing in the engine calls `Utc::now()` directly.
//! Time flows through a Clock so tests can pin it.

use crate::types::Timestamp;
use chrono::{Duration, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock pinned to a fixed instant. Advanced manually (tests, replay).
#[derive(Debug)]
pub struct FixedClock {
    current: Mutex<Timestamp>,
}

impl FixedClock {
    pub fn new(at: Timestamp) -> Self {
        Self { current: Mutex::new(at) }
    }

    /// Move the clock forward. Negative durations move it back.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
