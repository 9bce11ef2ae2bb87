//! Load and save the snapshot collection.
//!
//! The whole collection is one JSON array under [`ENTRIES_KEY`]:
//!
//! ```json
//! [{ "date": "2025-06-21T10:00:00+09:00", "updated": "2025-06-22T08:30:00+09:00",
//!    "seconds": 115200, "amount": 106987 }]
//! ```
//!
//! `date` is the registration instant and decides the day key; `updated` is
//! when `seconds` and `amount` were last brought current.
//!
//! Reads never fail: a missing key, a storage error or malformed JSON fall
//! back to the built-in sample entries (or nothing, if seeding is off).

use serde::{Deserialize, Serialize};

use super::KvStore;
use crate::calendar::Calendar;
use crate::conversion::ConversionEngine;
use crate::error::{Result, ValidationError};
use crate::snapshot::Snapshot;

pub const ENTRIES_KEY: &str = "intimeEntries";

/// Sample entries shown before the first registration.
const DEFAULT_ENTRIES: [(&str, f64); 3] = [
    ("2025-06-20", 175_525.0),
    ("2025-06-21", 106_987.0),
    ("2025-06-22", 53_493.0),
];

/// On-disk shape of a snapshot.
///
/// `seconds` and `updated` are optional on read because early entries only
/// stored the date and amount; unknown fields such as the old display `text`
/// are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default)]
    pub seconds: Option<u64>,
    pub amount: f64,
}

pub fn default_snapshots(calendar: &Calendar, engine: &ConversionEngine) -> Vec<Snapshot> {
    DEFAULT_ENTRIES
        .iter()
        .filter_map(|(date, amount)| {
            let timestamp = calendar.parse_timestamp(date).ok()?;
            Some(Snapshot::new(
                calendar.day_key(timestamp),
                timestamp,
                engine.amount_to_seconds(*amount),
                *amount,
            ))
        })
        .collect()
}

pub struct PersistenceGateway<S> {
    store: S,
    calendar: Calendar,
    engine: ConversionEngine,
    seed_defaults: bool,
}

impl<S: KvStore> PersistenceGateway<S> {
    pub fn new(store: S, calendar: Calendar, engine: ConversionEngine, seed_defaults: bool) -> Self {
        Self {
            store,
            calendar,
            engine,
            seed_defaults,
        }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn engine(&self) -> &ConversionEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the persisted collection, falling back on any failure.
    pub fn load(&self) -> Vec<Snapshot> {
        let raw = match self.store.kv_get(ENTRIES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!("no persisted entries, using fallback");
                return self.fallback();
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted entries, using fallback");
                return self.fallback();
            }
        };

        let stored: Vec<StoredSnapshot> = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "persisted entries are not valid JSON, using fallback");
                return self.fallback();
            }
        };

        stored
            .into_iter()
            .filter_map(|entry| match self.decode(&entry) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping persisted entry");
                    None
                }
            })
            .collect()
    }

    fn decode(&self, entry: &StoredSnapshot) -> Result<Snapshot, ValidationError> {
        let registered_at = self.calendar.parse_timestamp(&entry.date)?;
        let timestamp = match entry.updated.as_deref() {
            Some(raw) => self.calendar.parse_timestamp(raw)?,
            None => registered_at,
        };
        let seconds = entry
            .seconds
            .unwrap_or_else(|| self.engine.amount_to_seconds(entry.amount));
        let snapshot = Snapshot::new(
            self.calendar.day_key(registered_at),
            registered_at,
            seconds,
            entry.amount,
        );
        Ok(snapshot.advanced(timestamp, seconds, entry.amount))
    }

    /// Replace the persisted collection with `snapshots`.
    ///
    /// # Errors
    /// Returns an error if serialization or the storage write fails.
    pub fn save(&mut self, snapshots: &[Snapshot]) -> Result<()> {
        let stored: Vec<StoredSnapshot> = snapshots
            .iter()
            .map(|s| StoredSnapshot {
                date: self.calendar.format_timestamp(s.registered_at),
                updated: Some(self.calendar.format_timestamp(s.timestamp)),
                seconds: Some(s.remaining_seconds),
                amount: s.amount,
            })
            .collect();
        let json = serde_json::to_string(&stored)?;
        self.store.kv_set(ENTRIES_KEY, &json)?;
        tracing::debug!(entries = stored.len(), "persisted entries");
        Ok(())
    }

    fn fallback(&self) -> Vec<Snapshot> {
        if self.seed_defaults {
            default_snapshots(&self.calendar, &self.engine)
        } else {
            Vec::new()
        }
    }
}
