//! Async owner of the one-second tick.
//!
//! The driver is a single task that waits on two sources, the 1 Hz interval
//! and a command channel, and applies whichever fires first to the session.
//! Exactly one `Interval` exists at a time: whenever the countdown is
//! restarted the old interval is dropped and a fresh one is created, so its
//! first tick lands a full second after the restart.

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};

use super::TickToken;
use crate::calendar::DayKey;
use crate::error::Result;
use crate::events::Event;
use crate::session::LifetimeSession;
use crate::storage::KvStore;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Input accepted by a running [`CountdownDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCommand {
    /// Raw balance text, sanitized by the session.
    Register(String),
    Delete(DayKey),
    /// End the session: flush and persist, then return.
    Shutdown,
}

pub struct CountdownDriver<S: KvStore> {
    session: LifetimeSession<S>,
    commands: mpsc::Receiver<DriverCommand>,
}

impl<S: KvStore> CountdownDriver<S> {
    pub fn new(session: LifetimeSession<S>, commands: mpsc::Receiver<DriverCommand>) -> Self {
        Self { session, commands }
    }

    /// Run until `Shutdown` or until every command sender is gone, then tear
    /// the session down and return it.
    ///
    /// # Errors
    /// Returns the first persistence error from a command or from teardown.
    pub async fn run<F>(self, mut on_event: F) -> Result<LifetimeSession<S>>
    where
        F: FnMut(&Event),
    {
        let Self {
            mut session,
            mut commands,
        } = self;
        let mut ticker = arm(&session, &mut on_event);

        loop {
            tokio::select! {
                token = next_tick(&mut ticker) => {
                    let finished = session.tick(token);
                    on_event(&Event::Tick {
                        remaining_seconds: session.live_seconds(),
                    });
                    if let Some(event) = finished {
                        on_event(&event);
                        ticker = None;
                    }
                }
                command = commands.recv() => match command {
                    Some(DriverCommand::Register(raw)) => {
                        let event = session.register(&raw, Utc::now())?;
                        on_event(&event);
                        ticker = arm(&session, &mut on_event);
                    }
                    Some(DriverCommand::Delete(key)) => {
                        if let Some(event) = session.delete(&key)? {
                            on_event(&event);
                        }
                    }
                    Some(DriverCommand::Shutdown) | None => break,
                },
            }
        }

        if let Some(event) = session.teardown(Utc::now())? {
            on_event(&event);
        }
        Ok(session)
    }
}

/// Fresh interval bound to the session's current token, if it is running.
fn arm<S, F>(session: &LifetimeSession<S>, on_event: &mut F) -> Option<(TickToken, Interval)>
where
    S: KvStore,
    F: FnMut(&Event),
{
    let token = session.tick_token()?;
    let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(generation = token.generation(), "armed tick interval");
    on_event(&Event::CountdownStarted {
        seconds: session.live_seconds(),
        generation: token.generation(),
    });
    Some((token, interval))
}

async fn next_tick(ticker: &mut Option<(TickToken, Interval)>) -> TickToken {
    match ticker {
        Some((token, interval)) => {
            interval.tick().await;
            *token
        }
        None => std::future::pending().await,
    }
}
