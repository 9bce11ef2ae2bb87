//! Countdown scheduler.
//!
//! A pure state machine. It does not sleep or spawn anything; whoever owns
//! the clock (see [`CountdownDriver`](super::CountdownDriver)) calls `tick()`
//! once per second with the token it was handed by `start()`.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start(n > 0)--> Running --tick()* until 0--> Idle
//!            ^                |
//!            +--start(m)------+   (old token invalidated)
//! ```
//!
//! Every `start()` bumps the generation, so a tick carrying an older token is
//! dropped. Only one tick source can ever make progress.

use serde::{Deserialize, Serialize};

use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Proof of being the current tick source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickToken(u64);

impl TickToken {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct CountdownScheduler {
    state: SchedulerState,
    remaining_seconds: u64,
    generation: u64,
}

impl CountdownScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            remaining_seconds: 0,
            generation: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    /// Token of the running countdown, if any.
    pub fn current_token(&self) -> Option<TickToken> {
        match self.state {
            SchedulerState::Running => Some(TickToken(self.generation)),
            SchedulerState::Idle => None,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Bind the countdown to `seconds`, cancelling whatever was running.
    ///
    /// Returns the new token, or `None` if `seconds` is zero (stays Idle).
    pub fn start(&mut self, seconds: u64) -> Option<TickToken> {
        self.generation = self.generation.wrapping_add(1);
        self.remaining_seconds = seconds;
        if seconds == 0 {
            self.state = SchedulerState::Idle;
            return None;
        }
        self.state = SchedulerState::Running;
        tracing::debug!(seconds, generation = self.generation, "countdown started");
        Some(TickToken(self.generation))
    }

    /// One second passed. Stale tokens and ticks while Idle are ignored.
    ///
    /// Returns `Some(Event::CountdownFinished)` on the tick that reaches zero.
    pub fn tick(&mut self, token: TickToken) -> Option<Event> {
        if self.state != SchedulerState::Running || token.0 != self.generation {
            tracing::debug!(generation = token.0, "dropped stale tick");
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.state = SchedulerState::Idle;
            self.generation = self.generation.wrapping_add(1);
            return Some(Event::CountdownFinished);
        }
        None
    }

    /// Stop ticking. The remaining value is kept so it can be flushed.
    pub fn cancel(&mut self) {
        if self.state == SchedulerState::Running {
            self.generation = self.generation.wrapping_add(1);
        }
        self.state = SchedulerState::Idle;
    }
}

impl Default for CountdownScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_tick_finish() {
        let mut s = CountdownScheduler::new();
        assert_eq!(s.state(), SchedulerState::Idle);
        let token = s.start(2).unwrap();
        assert_eq!(s.state(), SchedulerState::Running);
        assert!(s.tick(token).is_none());
        assert_eq!(s.remaining_seconds(), 1);
        assert_eq!(s.tick(token), Some(Event::CountdownFinished));
        assert_eq!(s.state(), SchedulerState::Idle);
        assert_eq!(s.remaining_seconds(), 0);
        // Further ticks are no-ops.
        assert!(s.tick(token).is_none());
        assert_eq!(s.remaining_seconds(), 0);
    }

    #[test]
    fn start_with_zero_stays_idle() {
        let mut s = CountdownScheduler::new();
        assert!(s.start(0).is_none());
        assert_eq!(s.state(), SchedulerState::Idle);
        assert!(s.current_token().is_none());
    }

    #[test]
    fn restart_invalidates_previous_token() {
        let mut s = CountdownScheduler::new();
        let first = s.start(100).unwrap();
        let second = s.start(50).unwrap();
        assert_ne!(first, second);
        // Both tick sources fire in the same second; only one counts.
        s.tick(first);
        s.tick(second);
        assert_eq!(s.remaining_seconds(), 49);
        assert_eq!(s.current_token(), Some(second));
    }

    #[test]
    fn cancel_keeps_remaining() {
        let mut s = CountdownScheduler::new();
        let token = s.start(10).unwrap();
        s.tick(token);
        s.cancel();
        assert_eq!(s.state(), SchedulerState::Idle);
        assert_eq!(s.remaining_seconds(), 9);
        assert!(s.tick(token).is_none());
        assert_eq!(s.remaining_seconds(), 9);
    }
}
