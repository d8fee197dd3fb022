//! Quiescence-window batching of raw events
//!
//! Events accumulate until no new event has arrived for a full window, then
//! the whole batch is released at once. The batcher is passive: a driver
//! polls [`Debouncer::try_emit`] and sleeps for
//! [`Debouncer::time_until_next_emission`] in between.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current time
///
/// Injected so tests can advance time without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests and benchmarks
///
/// Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move time forward by `by`
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// State guarded as one unit: the batch and its last-activity marker
struct Pending<E> {
    events: Vec<E>,
    last_activity: Option<Instant>,
}

/// Time-window event batcher
pub struct Debouncer<E, C = SystemClock> {
    window: Duration,
    clock: C,
    pending: Mutex<Pending<E>>,
}

impl<E> Debouncer<E, SystemClock> {
    /// Create a batcher driven by the system clock
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, SystemClock)
    }
}

impl<E, C: Clock> Debouncer<E, C> {
    /// Create a batcher with an explicit clock
    pub fn with_clock(window: Duration, clock: C) -> Self {
        Self {
            window,
            clock,
            pending: Mutex::new(Pending {
                events: Vec::new(),
                last_activity: None,
            }),
        }
    }

    /// Configured quiescence window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Append an event and restart the quiescence window
    pub fn add(&self, event: E) {
        let now = self.clock.now();
        let mut pending = self.pending.lock();
        pending.events.push(event);
        pending.last_activity = Some(now);
    }

    /// Take the pending batch if the window has elapsed since the last event
    ///
    /// The check, the swap with an empty buffer and the reset of the
    /// last-activity marker happen under one lock acquisition, so an event
    /// added concurrently lands either in the returned batch or in the next.
    pub fn try_emit(&self) -> Option<Vec<E>> {
        let now = self.clock.now();
        let mut pending = self.pending.lock();

        let last = pending.last_activity?;
        if pending.events.is_empty() || now.saturating_duration_since(last) < self.window {
            return None;
        }

        pending.last_activity = None;
        Some(std::mem::take(&mut pending.events))
    }

    /// Remaining time until the pending batch would be released
    ///
    /// `None` when nothing is pending. A hint only: a later `add` pushes the
    /// deadline forward.
    pub fn time_until_next_emission(&self) -> Option<Duration> {
        let now = self.clock.now();
        let pending = self.pending.lock();

        if pending.events.is_empty() {
            return None;
        }
        let last = pending.last_activity?;
        Some(self.window.saturating_sub(now.saturating_duration_since(last)))
    }

    /// Number of events waiting for emission
    pub fn pending_len(&self) -> usize {
        self.pending.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().events.is_empty()
    }
}
