pub mod config;
pub mod entry;
pub mod status;
pub mod watch;

use chrono::{DateTime, Utc};
use intime_core::{Config, Database, LifetimeSession, PersistenceGateway};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the persisted session, reconciled to `now`.
pub fn open_session(
    now: DateTime<Utc>,
) -> Result<LifetimeSession<Database>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let gateway = PersistenceGateway::new(
        Database::open()?,
        config.calendar()?,
        config.engine(),
        config.seed_defaults,
    );
    let session = LifetimeSession::open(gateway, now);
    tracing::debug!(entries = session.snapshots().len(), "session opened");
    Ok(session)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
