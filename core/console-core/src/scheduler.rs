//! Refresh scheduling for the active view.
//!
//! The scheduler owns the single refresh timer slot. Arming always cancels
//! the previous timer first, so at most one timer is pending at any time.
//! Every activation, deactivation and timer-driven re-poll advances the
//! generation; work started under an older generation is stale.
//!
//! ```text
//! Idle ──activate──▶ Polling ──poll_completed──▶ Scheduled
//!  ▲                   ▲                            │
//!  │                   └──────── timer_fired ◀──────┘
//!  └──────────────── deactivate (from any state)
//! ```

use crate::view::Category;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Arms and cancels one-shot timers. A fired timer is reported back through
/// [`RefreshScheduler::timer_fired`] with its token.
pub trait TimerDriver {
    fn arm(&mut self, token: TimerToken, after: Duration);
    fn cancel(&mut self, token: TimerToken);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Polling,
    Scheduled,
}

#[derive(Debug)]
pub struct RefreshScheduler<D: TimerDriver> {
    driver: D,
    interval: Duration,
    state: SchedulerState,
    active: Option<Category>,
    generation: u64,
    pending: Option<TimerToken>,
    next_token: u64,
}

impl<D: TimerDriver> RefreshScheduler<D> {
    pub fn new(driver: D, interval: Duration) -> Self {
        Self {
            driver,
            interval,
            state: SchedulerState::Idle,
            active: None,
            generation: 0,
            pending: None,
            next_token: 0,
        }
    }

    /// Makes `category` the polled view. Returns the generation its poll
    /// runs under.
    pub fn activate(&mut self, category: Category) -> u64 {
        self.cancel_pending();
        self.generation += 1;
        self.active = Some(category);
        self.state = SchedulerState::Polling;
        tracing::info!(
            category = category.key(),
            generation = self.generation,
            "View activated"
        );
        self.generation
    }

    /// Stops recurring refresh. Returns the new generation, which one-shot
    /// detail fetches may run under.
    pub fn deactivate(&mut self) -> u64 {
        self.cancel_pending();
        self.generation += 1;
        self.active = None;
        self.state = SchedulerState::Idle;
        tracing::debug!(generation = self.generation, "Recurring refresh stopped");
        self.generation
    }

    /// Re-arms the refresh timer once the current poll has published.
    /// Completions from older generations are ignored.
    pub fn poll_completed(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.state != SchedulerState::Polling {
            return false;
        }
        self.cancel_pending();
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        self.driver.arm(token, self.interval);
        self.pending = Some(token);
        self.state = SchedulerState::Scheduled;
        tracing::debug!(
            timer = %token,
            generation,
            interval_ms = self.interval.as_millis() as u64,
            "Refresh timer armed"
        );
        true
    }

    /// Handles a fired timer. Returns the category to re-poll and the
    /// generation for that poll, or `None` for a cancelled timer.
    pub fn timer_fired(&mut self, token: TimerToken) -> Option<(Category, u64)> {
        if self.pending != Some(token) {
            tracing::debug!(timer = %token, "Cancelled timer fired; ignoring");
            return None;
        }
        self.pending = None;
        let category = self.active?;
        self.generation += 1;
        self.state = SchedulerState::Polling;
        Some((category, self.generation))
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn active(&self) -> Option<Category> {
        self.active
    }

    pub fn pending_timer(&self) -> Option<TimerToken> {
        self.pending
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            self.driver.cancel(token);
        }
    }
}
