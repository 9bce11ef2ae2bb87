use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::DayKey;
use crate::conversion::DurationBreakdown;
use crate::timer::SchedulerState;

/// Every state change in the session produces an Event.
/// The CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Active snapshot decayed on session open.
    Reconciled {
        elapsed_secs: u64,
        remaining_seconds: u64,
        amount: f64,
        at: DateTime<Utc>,
    },
    Registered {
        day_key: DayKey,
        amount: f64,
        seconds: u64,
        /// Snapshots with the same day key that were dropped.
        replaced: usize,
        at: DateTime<Utc>,
    },
    Deleted {
        day_key: DayKey,
        removed: usize,
    },
    /// Delete targeted the active snapshot and was ignored.
    DeleteRejected {
        day_key: DayKey,
    },
    CountdownStarted {
        seconds: u64,
        generation: u64,
    },
    /// One second of the live countdown elapsed.
    Tick {
        remaining_seconds: u64,
    },
    CountdownFinished,
    /// Live values written back into the active snapshot on teardown.
    Flushed {
        remaining_seconds: u64,
        amount: f64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SchedulerState,
        remaining_seconds: u64,
        amount: f64,
        breakdown: DurationBreakdown,
        display: String,
        active_day_key: Option<DayKey>,
        entries: usize,
        at: DateTime<Utc>,
    },
}
