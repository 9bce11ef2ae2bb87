//! # Intime Core Library
//!
//! Converts a bank balance into "remaining lifetime": how long the money
//! would last if every day cost one workday of minimum wage. The result is a
//! live countdown that keeps running between sessions.
//!
//! ## Architecture
//!
//! - **Conversion**: pure amount ↔ seconds math and the fixed-unit duration
//!   breakdown
//! - **Snapshots**: persisted (timestamp, seconds, amount) triples, keyed by
//!   calendar day
//! - **Reconciliation**: decays the latest snapshot by the wall-clock time
//!   that passed since it was saved
//! - **Timer**: a tick-token countdown state machine and the tokio task that
//!   drives it at 1 Hz
//! - **Storage**: SQLite key-value persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`LifetimeSession`]: owned session state; every operation goes through it
//! - [`ConversionEngine`]: wage-based conversion
//! - [`CountdownScheduler`] / [`CountdownDriver`]: the single live countdown
//! - [`PersistenceGateway`]: load/save of the snapshot collection
//! - [`Config`]: application configuration management

pub mod calendar;
pub mod conversion;
pub mod error;
pub mod events;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod storage;
pub mod timer;

pub use calendar::{Calendar, DayKey, DayKeyPolicy};
pub use conversion::{format_duration, group_thousands, ConversionEngine, DurationBreakdown};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use reconcile::{Reconciliation, ReconciliationService};
pub use session::LifetimeSession;
pub use snapshot::{Snapshot, SnapshotBook};
pub use storage::{Config, Database, KvStore, MemoryStore, PersistenceGateway};
pub use timer::{CountdownDriver, CountdownScheduler, DriverCommand, SchedulerState, TickToken};
