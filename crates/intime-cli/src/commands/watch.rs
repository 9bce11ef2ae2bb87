//! Live countdown in the terminal.
//!
//! Three event sources feed one driver: stdin lines, the 1 Hz tick and
//! Ctrl-C. Closing stdin does not end the session; Ctrl-C or a `quit` line
//! does, after flushing the live value.

use std::io::Write;

use chrono::Utc;
use intime_core::{format_duration, CountdownDriver, DayKey, DriverCommand, Event};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::{open_session, CliResult};

pub fn run(json: bool) -> CliResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(watch(json));
    // The stdin reader may be parked in a blocking read.
    runtime.shutdown_background();
    result
}

async fn watch(json: bool) -> CliResult {
    let session = open_session(Utc::now())?;
    if let Some(event) = session.reconciled_event() {
        render(&event, json);
    }
    if !json {
        eprintln!("type an amount to register, \"delete <key>\" to delete, \"quit\" or Ctrl-C to exit");
    }

    let (tx, rx) = mpsc::channel(16);

    let input_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Some(command) = parse_line(&line) else {
                continue;
            };
            if input_tx.send(command).await.is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(DriverCommand::Shutdown).await;
        }
    });

    CountdownDriver::new(session, rx)
        .run(|event| render(event, json))
        .await?;
    Ok(())
}

fn parse_line(line: &str) -> Option<DriverCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if matches!(line, "quit" | "exit") {
        return Some(DriverCommand::Shutdown);
    }
    if let Some(key) = line.strip_prefix("delete ") {
        return Some(DriverCommand::Delete(DayKey::new(key.trim())));
    }
    Some(DriverCommand::Register(line.to_string()))
}

fn render(event: &Event, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{line}");
        }
        return;
    }
    match event {
        Event::Tick { remaining_seconds } => {
            print!("\r남은 수명: {}   ", format_duration(*remaining_seconds));
            let _ = std::io::stdout().flush();
        }
        other => {
            if let Ok(line) = serde_json::to_string(other) {
                println!("\n{line}");
            }
        }
    }
}
