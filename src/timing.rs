//! Sleeping and frame pacing
//!
//! [`FrameThrottle`] keeps a redraw loop on a fixed schedule. Each call moves
//! the deadline forward by one interval from the previous deadline, not from
//! "now", so oversleeping on one frame is paid back on the next and a loop
//! that falls behind catches up instead of drifting.

use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

use tracing::debug;

/// Monotonic time source with a sleep primitive
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time and a real thread sleep
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A clock that only moves when told to. Sleeping advances it exactly.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    elapsed: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    /// Let time pass without sleeping, as if doing work.
    pub fn advance(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    /// Every sleep requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

/// Drift-correcting frame pacer
#[derive(Debug)]
pub struct FrameThrottle<C: Clock = SystemClock> {
    clock: C,
    /// Next wake time; `None` until the first call
    deadline: Option<Instant>,
}

impl Default for FrameThrottle<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameThrottle<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> FrameThrottle<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            deadline: None,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Whether the baseline has been taken
    pub fn is_started(&self) -> bool {
        self.deadline.is_some()
    }

    /// Wait out the rest of the current frame and return how long that was.
    ///
    /// The first call only records the baseline. Later calls advance the
    /// deadline by `interval` and sleep until it; when the deadline has
    /// already passed they return at once and leave the schedule as is.
    pub fn throttle(&mut self, interval: Duration) -> Duration {
        let Some(previous) = self.deadline else {
            self.deadline = Some(self.clock.now());
            return Duration::ZERO;
        };

        let deadline = previous + interval;
        self.deadline = Some(deadline);

        let now = self.clock.now();
        if deadline > now {
            let remaining = deadline - now;
            self.clock.sleep(remaining);
            remaining
        } else {
            debug!("Frame behind schedule by {:?}", now - deadline);
            Duration::ZERO
        }
    }

    pub fn throttle_ms(&mut self, interval_ms: u64) -> Duration {
        self.throttle(Duration::from_millis(interval_ms))
    }
}
