use chrono::Utc;
use intime_core::{format_duration, group_thousands, DayKey};
use serde::Serialize;

use super::{open_session, print_json, CliResult};

#[derive(Serialize)]
struct EntryView {
    day_key: DayKey,
    date: String,
    updated: String,
    seconds: u64,
    amount: f64,
    text: String,
    active: bool,
}

pub fn register(amount: &str) -> CliResult {
    let now = Utc::now();
    let mut session = open_session(now)?;
    let event = session.register(amount, now)?;
    print_json(&event)?;
    session.teardown(now)?;
    Ok(())
}

pub fn delete(key: &str) -> CliResult {
    let now = Utc::now();
    let mut session = open_session(now)?;
    match session.delete(&DayKey::new(key))? {
        Some(event) => print_json(&event)?,
        None => eprintln!("no entry for {key}"),
    }
    session.teardown(now)?;
    Ok(())
}

pub fn list(json: bool) -> CliResult {
    let now = Utc::now();
    let mut session = open_session(now)?;
    let active = session.snapshots().active_index();
    let calendar = *session.calendar();
    let entries: Vec<EntryView> = session
        .snapshots()
        .iter()
        .enumerate()
        .map(|(i, s)| EntryView {
            day_key: s.day_key.clone(),
            date: calendar.format_timestamp(s.registered_at),
            updated: calendar.format_timestamp(s.timestamp),
            seconds: s.remaining_seconds,
            amount: s.amount,
            text: format_duration(s.remaining_seconds).compact(),
            active: Some(i) == active,
        })
        .collect();

    if json {
        print_json(&entries)?;
    } else {
        for entry in &entries {
            let marker = if entry.active { "*" } else { " " };
            println!(
                "{marker} {} - {} (₩{})",
                entry.day_key,
                entry.text,
                group_thousands(entry.amount.floor() as u64)
            );
        }
    }
    session.teardown(now)?;
    Ok(())
}
