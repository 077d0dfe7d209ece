//! The delay and sound timers, and the clock that drives them.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// The maximum value of a timer, as well as the timers' tick rate (in Hz).
pub const TIMER_CAP: u8 = 60;
/// The time between timer ticks.
pub const TICK_PERIOD: Duration = Duration::from_nanos(1_000_000_000 / TIMER_CAP as u64);

/// A source of the current time.
///
/// The timers decay based on wall-clock time, so tests (or anything that needs to control timing)
/// can substitute their own clock (e.g., [`ManualClock`]).
pub trait Clock: std::fmt::Debug + Send + Sync {
    /// The current time.
    fn now(&self) -> Instant;
}

/// A clock which reads the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock which only moves when it is advanced.
///
/// Clones of this clock share the same time.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use chip8_ensemble::sim::device::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let start = clock.now();
///
/// clock.clone().advance(Duration::from_millis(20));
/// assert_eq!(clock.now() - start, Duration::from_millis(20));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<RwLock<Instant>>);
impl ManualClock {
    /// Creates a new clock, starting at the current system time.
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(Instant::now())))
    }

    /// Moves the clock forward.
    pub fn advance(&self, d: Duration) {
        let mut now = self.0.write().unwrap_or_else(|e| e.into_inner());
        *now += d;
    }
}
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.0.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// The delay and sound timers.
///
/// Both timers count down at 60 Hz (see [`Timers::tick`]) and never leave `0..=TIMER_CAP`.
#[derive(Debug, Clone)]
pub struct Timers {
    /// The delay timer.
    pub delay: u8,
    /// The sound timer.
    pub sound: u8,
    /// Whether the timers are enabled.
    ///
    /// When disabled, timers still count down to zero,
    /// but the tick clock only runs while one of them is nonzero.
    pub enabled: bool,
    last_tick: Instant,
    clock: Arc<dyn Clock>,
}

impl Timers {
    /// Creates new timers, driven by the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let last_tick = clock.now();
        Self { delay: TIMER_CAP, sound: 0, enabled: true, last_tick, clock }
    }

    /// The time of the last tick.
    pub fn last_tick(&self) -> Instant {
        self.last_tick
    }

    /// Re-enables the timers, resetting the delay timer to the cap,
    /// clearing the sound timer, and restarting the tick clock.
    pub fn reset(&mut self) {
        self.delay = TIMER_CAP;
        self.sound = 0;
        self.enabled = true;
        self.last_tick = self.clock.now();
    }

    /// Decrements the timers once, if a tick period has passed since the last tick.
    ///
    /// The last tick time advances by exactly one period (rather than to the current time),
    /// so irregular calls do not accumulate drift. At most one tick happens per call.
    ///
    /// This returns whether a tick happened.
    pub fn tick(&mut self) -> bool {
        if !self.enabled && self.delay == 0 && self.sound == 0 {
            return false;
        }
        if self.clock.now().saturating_duration_since(self.last_tick) <= TICK_PERIOD {
            return false;
        }

        self.last_tick += TICK_PERIOD;
        self.delay = self.delay.saturating_sub(1).min(TIMER_CAP);
        self.sound = self.sound.saturating_sub(1).min(TIMER_CAP);
        true
    }
}
