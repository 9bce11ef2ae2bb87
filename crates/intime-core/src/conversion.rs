//! Amount ↔ lifetime conversion.
//!
//! A balance is turned into "lifetime" by asking how many workdays it pays
//! for at a fixed hourly wage, and stretching each workday to a full 24-hour
//! day. Everything here is pure; no clock, no storage.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::Config;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
/// Display month: always 30 days.
const SECS_PER_MONTH: u64 = 30 * SECS_PER_DAY;
/// Display year: always 365 days.
const SECS_PER_YEAR: u64 = 365 * SECS_PER_DAY;

/// Pure conversion functions bound to one wage configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionEngine {
    wage_per_hour: f64,
    hours_per_day: f64,
    max_amount: u64,
}

impl ConversionEngine {
    pub fn new(wage_per_hour: f64, hours_per_day: f64, max_amount: u64) -> Self {
        Self {
            wage_per_hour,
            hours_per_day,
            max_amount,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.wage.per_hour, config.wage.hours_per_day, config.max_amount)
    }

    pub fn wage_per_hour(&self) -> f64 {
        self.wage_per_hour
    }

    pub fn hours_per_day(&self) -> f64 {
        self.hours_per_day
    }

    pub fn max_amount(&self) -> u64 {
        self.max_amount
    }

    /// Money consumed by one second of lifetime.
    ///
    /// Exact inverse of [`amount_to_seconds`](Self::amount_to_seconds), so
    /// decaying an amount by this rate keeps it consistent with the decayed
    /// seconds.
    pub fn amount_per_second(&self) -> f64 {
        self.wage_per_hour * self.hours_per_day / SECS_PER_DAY as f64
    }

    /// `floor(amount / wage_per_hour / hours_per_day * 86400)`.
    ///
    /// Negative, NaN or infinite amounts yield 0.
    pub fn amount_to_seconds(&self, amount: f64) -> u64 {
        if !amount.is_finite() || amount <= 0.0 {
            return 0;
        }
        let work_hours = amount / self.wage_per_hour;
        let life_days = work_hours / self.hours_per_day;
        let secs = (life_days * SECS_PER_DAY as f64).floor();
        if secs.is_finite() && secs > 0.0 {
            secs as u64
        } else {
            0
        }
    }

    /// `seconds * hours_per_day / 86400 * wage_per_hour`, never negative.
    pub fn seconds_to_amount(&self, seconds: u64) -> f64 {
        let amount = seconds as f64 * self.hours_per_day / SECS_PER_DAY as f64 * self.wage_per_hour;
        amount.max(0.0)
    }

    /// Reduce raw text input to a whole amount.
    ///
    /// Non-digit characters (separators, currency signs, whitespace) are
    /// dropped. Empty input is 0; anything above the configured maximum,
    /// including digit strings too long for `u64`, is clamped to it.
    pub fn sanitize_amount_input(&self, raw: &str) -> u64 {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return 0;
        }
        match digits.parse::<u64>() {
            Ok(n) => n.min(self.max_amount),
            Err(_) => self.max_amount,
        }
    }
}

/// Split seconds into years, months, days, hours, minutes and seconds.
///
/// Years are 365 days and months are 30 days, applied largest-first by
/// successive division. This is a display approximation and intentionally
/// ignores real calendar lengths.
pub fn format_duration(seconds: u64) -> DurationBreakdown {
    let mut s = seconds;
    let years = s / SECS_PER_YEAR;
    s %= SECS_PER_YEAR;
    let months = s / SECS_PER_MONTH;
    s %= SECS_PER_MONTH;
    let days = s / SECS_PER_DAY;
    s %= SECS_PER_DAY;
    let hours = s / SECS_PER_HOUR;
    s %= SECS_PER_HOUR;
    let minutes = s / SECS_PER_MINUTE;
    s %= SECS_PER_MINUTE;
    DurationBreakdown {
        years,
        months,
        days,
        hours,
        minutes,
        seconds: s,
    }
}

/// Insert `,` every three digits: `1234567` → `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Fixed-unit breakdown of a duration. See [`format_duration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DurationBreakdown {
    pub years: u64,
    pub months: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl DurationBreakdown {
    /// Like `Display`, but leading zero years, months and days are dropped
    /// (in that order, stopping at the first non-zero one).
    pub fn compact(&self) -> String {
        let mut parts = Vec::with_capacity(6);
        let mut leading = true;
        for (value, unit) in [(self.years, "년"), (self.months, "개월"), (self.days, "일")] {
            if leading && value == 0 {
                continue;
            }
            leading = false;
            parts.push(format!("{value}{unit}"));
        }
        parts.push(format!("{}시간", self.hours));
        parts.push(format!("{}분", self.minutes));
        parts.push(format!("{}초", self.seconds));
        parts.join(" ")
    }
}

impl fmt::Display for DurationBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}년 {}개월 {}일 {}시간 {}분 {}초",
            self.years, self.months, self.days, self.hours, self.minutes, self.seconds
        )
    }
}
