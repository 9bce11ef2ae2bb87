//! Bring a loaded snapshot collection up to the current instant.
//!
//! Between visits the countdown keeps running in spirit: the active snapshot
//! loses one second of lifetime, and the matching slice of its balance, for
//! every wall-clock second that passed. Historical snapshots are frozen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversion::ConversionEngine;
use crate::snapshot::{truncate_to_secs, Snapshot, SnapshotBook};

/// What a reconciliation pass changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub elapsed_secs: u64,
    pub before: Snapshot,
    pub after: Snapshot,
}

/// Decays the active snapshot by real elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct ReconciliationService {
    engine: ConversionEngine,
}

impl ReconciliationService {
    pub fn new(engine: ConversionEngine) -> Self {
        Self { engine }
    }

    /// Decay `snapshot` as observed at `now`.
    ///
    /// Elapsed time is floored to whole seconds; a timestamp in the future
    /// (clock skew) counts as zero elapsed. Once the lifetime is exhausted the
    /// amount is forced to zero as well.
    pub fn decay(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> (u64, Snapshot) {
        let now = truncate_to_secs(now);
        let elapsed = u64::try_from((now - snapshot.timestamp).num_seconds()).unwrap_or(0);
        let remaining_seconds = snapshot.remaining_seconds.saturating_sub(elapsed);
        let amount = if remaining_seconds == 0 {
            0.0
        } else {
            snapshot.amount - elapsed as f64 * self.engine.amount_per_second()
        };
        let timestamp = now.max(snapshot.timestamp);
        (elapsed, snapshot.advanced(timestamp, remaining_seconds, amount))
    }

    /// Replace the active snapshot in `book` with its decayed form.
    ///
    /// Returns `None` when the book is empty.
    pub fn reconcile(&self, book: &mut SnapshotBook, now: DateTime<Utc>) -> Option<Reconciliation> {
        let active = book.active_mut()?;
        let before = active.clone();
        let (elapsed_secs, after) = self.decay(&before, now);
        *active = after.clone();
        tracing::info!(
            elapsed_secs,
            remaining_seconds = after.remaining_seconds,
            amount = after.amount,
            "reconciled active snapshot"
        );
        Some(Reconciliation {
            elapsed_secs,
            before,
            after,
        })
    }
}
