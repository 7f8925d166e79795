//! Rate limiting on simulation time.
//!
//! Both primitives are polled against `Time::elapsed()` instead of owning a
//! thread or callback, so they are cancelled by dropping or resetting state.

use std::time::Duration;

/// Leading-edge throttle: the first call in a window fires, the rest of the
/// window is dropped (never queued).
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_fired: Option<Duration>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    /// Returns `true` and opens a new window if `now` is outside the current one.
    pub fn try_fire(&mut self, now: Duration) -> bool {
        match self.last_fired {
            Some(last) if now < last + self.interval => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }
}

/// Trailing-edge debounce: each `call` pushes the deadline out by `wait`;
/// `poll` reports the deadline exactly once.
#[derive(Debug, Clone)]
pub struct Debounce {
    wait: Duration,
    deadline: Option<Duration>,
}

impl Debounce {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            deadline: None,
        }
    }

    /// (Re)arm the deadline relative to `now`.
    pub fn call(&mut self, now: Duration) {
        self.deadline = Some(now + self.wait);
    }

    /// Drop the pending deadline, if any.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Returns `true` once when the deadline has passed, then disarms.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
