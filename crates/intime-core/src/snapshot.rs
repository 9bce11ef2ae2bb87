//! Balance/lifetime snapshots and the ordered collection that holds them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::DayKey;

/// A balance/lifetime pair registered for one day.
///
/// `day_key` and `registered_at` are fixed when the balance is entered.
/// `timestamp` is the instant `remaining_seconds` and `amount` hold for; it
/// advances on reconcile and flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub day_key: DayKey,
    pub registered_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
    pub remaining_seconds: u64,
    pub amount: f64,
}

impl Snapshot {
    /// Build a freshly registered snapshot, truncating the instant to whole
    /// seconds and clamping a negative or NaN amount to zero.
    pub fn new(
        day_key: DayKey,
        registered_at: DateTime<Utc>,
        remaining_seconds: u64,
        amount: f64,
    ) -> Self {
        let registered_at = truncate_to_secs(registered_at);
        Self {
            day_key,
            registered_at,
            timestamp: registered_at,
            remaining_seconds,
            amount: clamp_amount(amount),
        }
    }

    /// Same entry with new values observed at `at`.
    pub fn advanced(&self, at: DateTime<Utc>, remaining_seconds: u64, amount: f64) -> Self {
        Self {
            day_key: self.day_key.clone(),
            registered_at: self.registered_at,
            timestamp: truncate_to_secs(at),
            remaining_seconds,
            amount: clamp_amount(amount),
        }
    }
}

pub(crate) fn truncate_to_secs(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}

fn clamp_amount(amount: f64) -> f64 {
    if amount.is_nan() {
        0.0
    } else {
        amount.max(0.0)
    }
}

/// Outcome of [`SnapshotBook::remove_by_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed(usize),
    /// The active snapshot carries this key; nothing was removed.
    ActiveProtected,
    NotFound,
}

/// Ordered snapshot collection.
///
/// Order is insertion order. The active snapshot is the one with the latest
/// timestamp; on a tie the later one in order wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotBook {
    entries: Vec<Snapshot>,
}

impl SnapshotBook {
    pub fn new(entries: Vec<Snapshot>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, &Snapshot)>, (i, s)| match best {
                Some((_, b)) if b.timestamp > s.timestamp => best,
                _ => Some((i, s)),
            })
            .map(|(i, _)| i)
    }

    pub fn active(&self) -> Option<&Snapshot> {
        self.active_index().map(|i| &self.entries[i])
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut Snapshot> {
        let i = self.active_index()?;
        self.entries.get_mut(i)
    }

    /// Remove every snapshot sharing the new one's day key, then append it.
    /// Returns how many were replaced.
    pub fn upsert(&mut self, snapshot: Snapshot) -> usize {
        let before = self.entries.len();
        self.entries.retain(|s| s.day_key != snapshot.day_key);
        let replaced = before - self.entries.len();
        self.entries.push(snapshot);
        replaced
    }

    /// Remove every snapshot with `key`, unless the active one has it.
    pub fn remove_by_key(&mut self, key: &DayKey) -> Removal {
        if self.active().is_some_and(|active| active.day_key == *key) {
            return Removal::ActiveProtected;
        }
        let before = self.entries.len();
        self.entries.retain(|s| s.day_key != *key);
        match before - self.entries.len() {
            0 => Removal::NotFound,
            n => Removal::Removed(n),
        }
    }
}
