//! The owned session state.
//!
//! A [`LifetimeSession`] holds the snapshot collection, the countdown and the
//! persistence gateway. Every mutation in the system goes through one of its
//! methods, one at a time.
//!
//! ## Lifecycle
//!
//! ```text
//! open(): load -> reconcile -> start countdown
//!   register() / delete() / tick()   (any order, any number)
//! teardown(): cancel countdown -> flush live value -> persist
//! ```
//!
//! `open()` reconciles before returning, so no caller can observe
//! pre-reconciliation values. Teardown runs at most once; if the owner never
//! calls it, `Drop` does it on a best-effort basis.

use chrono::{DateTime, Utc};

use crate::calendar::{Calendar, DayKey};
use crate::conversion::{format_duration, ConversionEngine, DurationBreakdown};
use crate::error::Result;
use crate::events::Event;
use crate::reconcile::{Reconciliation, ReconciliationService};
use crate::snapshot::{Removal, Snapshot, SnapshotBook};
use crate::storage::{KvStore, PersistenceGateway};
use crate::timer::{CountdownScheduler, TickToken};

pub struct LifetimeSession<S: KvStore> {
    gateway: PersistenceGateway<S>,
    snapshots: SnapshotBook,
    scheduler: CountdownScheduler,
    reconciliation: Option<Reconciliation>,
    torn_down: bool,
}

impl<S: KvStore> LifetimeSession<S> {
    /// Load persisted snapshots, reconcile the active one to `now` and start
    /// the countdown from its remaining seconds.
    pub fn open(gateway: PersistenceGateway<S>, now: DateTime<Utc>) -> Self {
        let mut snapshots = SnapshotBook::new(gateway.load());
        let reconciliation =
            ReconciliationService::new(*gateway.engine()).reconcile(&mut snapshots, now);
        let mut scheduler = CountdownScheduler::new();
        if let Some(active) = snapshots.active() {
            scheduler.start(active.remaining_seconds);
        }
        Self {
            gateway,
            snapshots,
            scheduler,
            reconciliation,
            torn_down: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &ConversionEngine {
        self.gateway.engine()
    }

    pub fn calendar(&self) -> &Calendar {
        self.gateway.calendar()
    }

    pub fn snapshots(&self) -> &SnapshotBook {
        &self.snapshots
    }

    pub fn active(&self) -> Option<&Snapshot> {
        self.snapshots.active()
    }

    pub fn scheduler(&self) -> &CountdownScheduler {
        &self.scheduler
    }

    pub fn live_seconds(&self) -> u64 {
        self.scheduler.remaining_seconds()
    }

    /// Balance matching the live seconds, never above what the active
    /// snapshot held.
    pub fn live_amount(&self) -> f64 {
        let derived = self.engine().seconds_to_amount(self.live_seconds());
        match self.active() {
            Some(active) => derived.min(active.amount),
            None => derived,
        }
    }

    pub fn live_breakdown(&self) -> DurationBreakdown {
        format_duration(self.live_seconds())
    }

    /// The `Reconciled` event from `open()`, if there was anything to
    /// reconcile.
    pub fn reconciled_event(&self) -> Option<Event> {
        self.reconciliation.as_ref().map(|r| Event::Reconciled {
            elapsed_secs: r.elapsed_secs,
            remaining_seconds: r.after.remaining_seconds,
            amount: r.after.amount,
            at: r.after.timestamp,
        })
    }

    pub fn status(&self, now: DateTime<Utc>) -> Event {
        let breakdown = self.live_breakdown();
        Event::StateSnapshot {
            state: self.scheduler.state(),
            remaining_seconds: self.live_seconds(),
            amount: self.live_amount(),
            breakdown,
            display: breakdown.to_string(),
            active_day_key: self.active().map(|s| s.day_key.clone()),
            entries: self.snapshots.len(),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Register a balance typed by the user.
    ///
    /// Replaces any snapshot with the same day key, makes the new one active,
    /// restarts the countdown and persists the collection. The new snapshot
    /// is never stamped earlier than the current active one, so it wins even
    /// when stored state is ahead of the local clock.
    ///
    /// # Errors
    /// Returns an error if persisting fails; the in-memory state is already
    /// updated in that case.
    pub fn register(&mut self, raw_amount: &str, now: DateTime<Utc>) -> Result<Event> {
        let engine = *self.engine();
        let amount = engine.sanitize_amount_input(raw_amount) as f64;
        let seconds = engine.amount_to_seconds(amount);
        let day_key = self.calendar().day_key(now);
        let mut snapshot = Snapshot::new(day_key.clone(), now, seconds, amount);
        if let Some(active) = self.active() {
            if active.timestamp > snapshot.timestamp {
                snapshot = snapshot.advanced(active.timestamp, seconds, amount);
            }
        }
        let at = snapshot.timestamp;

        let replaced = self.snapshots.upsert(snapshot);
        self.scheduler.start(seconds);
        tracing::info!(%day_key, amount, seconds, replaced, "registered balance");

        self.persist()?;
        Ok(Event::Registered {
            day_key,
            amount,
            seconds,
            replaced,
            at,
        })
    }

    /// Delete the snapshots with `key`.
    ///
    /// Deleting the active snapshot is refused with
    /// `Event::DeleteRejected`; an unknown key returns `None`.
    ///
    /// # Errors
    /// Returns an error if persisting fails.
    pub fn delete(&mut self, key: &DayKey) -> Result<Option<Event>> {
        match self.snapshots.remove_by_key(key) {
            Removal::Removed(removed) => {
                tracing::info!(day_key = %key, removed, "deleted entries");
                self.persist()?;
                Ok(Some(Event::Deleted {
                    day_key: key.clone(),
                    removed,
                }))
            }
            Removal::ActiveProtected => {
                tracing::info!(day_key = %key, "refused to delete active entry");
                Ok(Some(Event::DeleteRejected {
                    day_key: key.clone(),
                }))
            }
            Removal::NotFound => Ok(None),
        }
    }

    /// Token for the running countdown, if any.
    pub fn tick_token(&self) -> Option<TickToken> {
        self.scheduler.current_token()
    }

    pub fn tick(&mut self, token: TickToken) -> Option<Event> {
        self.scheduler.tick(token)
    }

    /// Stop the countdown, write the live value into the active snapshot and
    /// persist. Runs once; later calls return `Ok(None)`.
    ///
    /// The flushed value is the lower of the live countdown and the active
    /// snapshot decayed to `now`, so seconds the ticks missed (a late first
    /// tick, a suspended process) are still charged.
    ///
    /// # Errors
    /// Returns an error if persisting fails.
    pub fn teardown(&mut self, now: DateTime<Utc>) -> Result<Option<Event>> {
        if self.torn_down {
            return Ok(None);
        }
        self.torn_down = true;
        self.scheduler.cancel();

        let engine = *self.engine();
        let live_seconds = self.live_seconds();
        let Some(active) = self.snapshots.active_mut() else {
            self.persist()?;
            return Ok(None);
        };
        let (_, decayed) = ReconciliationService::new(engine).decay(active, now);
        let remaining_seconds = live_seconds.min(decayed.remaining_seconds);
        let amount = engine
            .seconds_to_amount(remaining_seconds)
            .min(active.amount);
        let flushed = active.advanced(decayed.timestamp, remaining_seconds, amount);
        let at = flushed.timestamp;
        let amount = flushed.amount;
        *active = flushed;
        tracing::info!(
            live_seconds,
            remaining_seconds,
            amount,
            "flushed live countdown"
        );

        self.persist()?;
        Ok(Some(Event::Flushed {
            remaining_seconds,
            amount,
            at,
        }))
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn store(&self) -> &S {
        self.gateway.store()
    }

    fn persist(&mut self) -> Result<()> {
        self.gateway.save(self.snapshots.as_slice())
    }
}

impl<S: KvStore> Drop for LifetimeSession<S> {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }
        if let Err(e) = self.teardown(Utc::now()) {
            tracing::warn!(error = %e, "teardown on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DayKeyPolicy;
    use crate::storage::{MemoryStore, ENTRIES_KEY};
    use crate::timer::SchedulerState;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        // 2025-06-21 12:00 at +9
        Utc.with_ymd_and_hms(2025, 6, 21, 3, 0, 0).unwrap()
    }

    fn gateway(store: MemoryStore) -> PersistenceGateway<MemoryStore> {
        PersistenceGateway::new(
            store,
            Calendar::new(9, DayKeyPolicy::FullDate).unwrap(),
            ConversionEngine::new(10030.0, 8.0, 1_000_000),
            false,
        )
    }

    fn persisted(store: &MemoryStore) -> serde_json::Value {
        serde_json::from_str(&store.kv_get(ENTRIES_KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn open_reconciles_before_anything_is_visible() {
        let store = MemoryStore::with_value(
            ENTRIES_KEY,
            r#"[{"date":"2025-06-21T12:00:00+09:00","seconds":115200,"amount":106987}]"#,
        );
        let session = LifetimeSession::open(gateway(store), t0() + Duration::hours(1));
        assert_eq!(session.live_seconds(), 115_200 - 3600);
        assert_eq!(session.scheduler().state(), SchedulerState::Running);
        match session.reconciled_event() {
            Some(Event::Reconciled { elapsed_secs, .. }) => assert_eq!(elapsed_secs, 3600),
            other => panic!("expected Reconciled, got {other:?}"),
        }
    }

    #[test]
    fn open_on_empty_store_is_idle() {
        let session = LifetimeSession::open(gateway(MemoryStore::new()), t0());
        assert!(session.active().is_none());
        assert_eq!(session.scheduler().state(), SchedulerState::Idle);
        assert!(session.reconciled_event().is_none());
        assert_eq!(session.live_seconds(), 0);
    }

    #[test]
    fn register_same_day_keeps_only_latest() {
        let mut session = LifetimeSession::open(gateway(MemoryStore::new()), t0());
        session.register("80,240", t0()).unwrap();
        let event = session.register("160480", t0() + Duration::minutes(5)).unwrap();
        match event {
            Event::Registered {
                replaced, seconds, ..
            } => {
                assert_eq!(replaced, 1);
                assert_eq!(seconds, 172_800);
            }
            other => panic!("expected Registered, got {other:?}"),
        }
        assert_eq!(session.snapshots().len(), 1);
        assert_eq!(session.live_seconds(), 172_800);
        assert_eq!(persisted(session.store()).as_array().unwrap().len(), 1);
    }

    #[test]
    fn register_clamps_and_treats_garbage_as_zero() {
        let mut session = LifetimeSession::open(gateway(MemoryStore::new()), t0());
        session.register("99999999", t0()).unwrap();
        assert_eq!(session.active().unwrap().amount, 1_000_000.0);

        session.register("hello", t0() + Duration::days(1)).unwrap();
        assert_eq!(session.active().unwrap().amount, 0.0);
        assert_eq!(session.scheduler().state(), SchedulerState::Idle);
        assert_eq!(session.snapshots().len(), 2);
    }

    #[test]
    fn delete_only_touches_history() {
        let mut session = LifetimeSession::open(gateway(MemoryStore::new()), t0());
        session.register("1000", t0()).unwrap();
        session.register("2000", t0() + Duration::days(1)).unwrap();

        let rejected = session.delete(&DayKey::new("2025-06-22")).unwrap();
        assert!(matches!(rejected, Some(Event::DeleteRejected { .. })));
        assert_eq!(session.snapshots().len(), 2);

        let deleted = session.delete(&DayKey::new("2025-06-21")).unwrap();
        assert!(matches!(deleted, Some(Event::Deleted { removed: 1, .. })));
        assert_eq!(persisted(session.store()).as_array().unwrap().len(), 1);

        assert!(session.delete(&DayKey::new("1999-01-01")).unwrap().is_none());
    }

    #[test]
    fn teardown_flushes_live_countdown_once() {
        let mut session = LifetimeSession::open(gateway(MemoryStore::new()), t0());
        session.register("80240", t0()).unwrap();
        let token = session.tick_token().unwrap();
        for _ in 0..10 {
            session.tick(token);
        }

        let later = t0() + Duration::seconds(10);
        match session.teardown(later).unwrap() {
            Some(Event::Flushed {
                remaining_seconds,
                amount,
                at,
            }) => {
                assert_eq!(remaining_seconds, 86_390);
                assert!((amount - session.engine().seconds_to_amount(86_390)).abs() < 1e-6);
                assert_eq!(at, later);
            }
            other => panic!("expected Flushed, got {other:?}"),
        }
        assert!(session.teardown(later).unwrap().is_none());
        assert_eq!(session.scheduler().state(), SchedulerState::Idle);

        let json = persisted(session.store());
        assert_eq!(json[0]["seconds"], 86_390);
        assert_eq!(json[0]["date"], "2025-06-21T12:00:00+09:00");
        assert_eq!(json[0]["updated"], "2025-06-21T12:00:10+09:00");
    }

    #[test]
    fn teardown_charges_wall_clock_time_the_ticks_missed() {
        let mut session = LifetimeSession::open(gateway(MemoryStore::new()), t0());
        session.register("80240", t0()).unwrap();
        let token = session.tick_token().unwrap();
        for _ in 0..3 {
            session.tick(token);
        }

        // Process was suspended for most of the hour.
        let later = t0() + Duration::hours(1);
        match session.teardown(later).unwrap() {
            Some(Event::Flushed {
                remaining_seconds,
                amount,
                ..
            }) => {
                assert_eq!(remaining_seconds, 86_400 - 3600);
                assert!((amount - session.engine().seconds_to_amount(86_400 - 3600)).abs() < 1e-6);
            }
            other => panic!("expected Flushed, got {other:?}"),
        }

        let raw = session.store().kv_get(ENTRIES_KEY).unwrap().unwrap();
        let reopened = LifetimeSession::open(gateway(MemoryStore::with_value(ENTRIES_KEY, &raw)), later);
        assert_eq!(reopened.live_seconds(), 86_400 - 3600);
    }

    #[test]
    fn registering_on_consecutive_days_keeps_both() {
        let mut session = LifetimeSession::open(gateway(MemoryStore::new()), t0());
        session.register("802400", t0()).unwrap();
        session.teardown(t0()).unwrap();
        let raw = session.store().kv_get(ENTRIES_KEY).unwrap().unwrap();

        let day2 = t0() + Duration::days(1);
        let mut session =
            LifetimeSession::open(gateway(MemoryStore::with_value(ENTRIES_KEY, &raw)), day2);
        match session.register("500000", day2).unwrap() {
            Event::Registered {
                day_key, replaced, ..
            } => {
                assert_eq!(day_key, DayKey::new("2025-06-22"));
                assert_eq!(replaced, 0);
            }
            other => panic!("expected Registered, got {other:?}"),
        }
        let keys: Vec<&str> = session
            .snapshots()
            .iter()
            .map(|s| s.day_key.as_str())
            .collect();
        assert_eq!(keys, ["2025-06-21", "2025-06-22"]);
        // The day-1 entry keeps its decayed value as history.
        assert_eq!(session.snapshots().as_slice()[0].remaining_seconds, 9 * 86_400);
    }

    #[test]
    fn registration_outranks_a_future_stamped_entry() {
        let store = MemoryStore::with_value(
            ENTRIES_KEY,
            r#"[{"date":"2025-06-20T12:00:00+09:00","updated":"2025-06-21T13:00:00+09:00",
                 "seconds":5000,"amount":4643}]"#,
        );
        let mut session = LifetimeSession::open(gateway(store), t0());
        match session.register("1000", t0()).unwrap() {
            Event::Registered { at, .. } => assert_eq!(at, t0() + Duration::hours(1)),
            other => panic!("expected Registered, got {other:?}"),
        }
        assert_eq!(session.active().unwrap().day_key, DayKey::new("2025-06-21"));

        session.teardown(t0() + Duration::seconds(10)).unwrap();
        let entries = session.snapshots().as_slice();
        assert_eq!(entries[0].remaining_seconds, 5000);
        // No wall-clock time has passed relative to the entry's stamp.
        assert_eq!(entries[1].remaining_seconds, 1076);
        assert!(entries[1].amount <= 1000.0);
    }

    #[test]
    fn flushed_state_reopens_without_double_decay() {
        let mut session = LifetimeSession::open(gateway(MemoryStore::new()), t0());
        session.register("80240", t0()).unwrap();
        session.teardown(t0() + Duration::seconds(100)).unwrap();
        let raw = session.store().kv_get(ENTRIES_KEY).unwrap().unwrap();

        let reopened = LifetimeSession::open(
            gateway(MemoryStore::with_value(ENTRIES_KEY, &raw)),
            t0() + Duration::seconds(160),
        );
        // Never ticked in-process; the flush still charged the first 100s.
        assert_eq!(reopened.live_seconds(), 86_400 - 160);
    }

    #[test]
    fn status_reports_live_values() {
        let mut session = LifetimeSession::open(gateway(MemoryStore::new()), t0());
        session.register("106987", t0()).unwrap();
        match session.status(t0()) {
            Event::StateSnapshot {
                state,
                remaining_seconds,
                display,
                active_day_key,
                entries,
                ..
            } => {
                assert_eq!(state, SchedulerState::Running);
                assert_eq!(remaining_seconds, 115_200);
                assert_eq!(display, "0년 0개월 1일 8시간 0분 0초");
                assert_eq!(active_day_key, Some(DayKey::new("2025-06-21")));
                assert_eq!(entries, 1);
            }
            other => panic!("expected StateSnapshot, got {other:?}"),
        }
    }
}
