use chrono::Utc;
use intime_core::{format_duration, group_thousands, Config};
use serde_json::json;

use super::{open_session, print_json, CliResult};

pub fn status() -> CliResult {
    let now = Utc::now();
    let mut session = open_session(now)?;
    print_json(&session.status(now))?;
    session.teardown(now)?;
    Ok(())
}

pub fn convert(amount: &str) -> CliResult {
    let engine = Config::load()?.engine();
    let amount = engine.sanitize_amount_input(amount);
    let seconds = engine.amount_to_seconds(amount as f64);
    let breakdown = format_duration(seconds);
    print_json(&json!({
        "amount": amount,
        "formatted_amount": group_thousands(amount),
        "seconds": seconds,
        "breakdown": breakdown,
        "display": breakdown.to_string(),
        "compact": breakdown.compact(),
    }))
}
