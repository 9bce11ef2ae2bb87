//! Fixed-offset calendar: day keys and timestamp text.
//!
//! All instants are kept as UTC. The configured offset only decides which
//! calendar day an instant belongs to and how it is written out.

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfigError, ValidationError};

/// How a registration's calendar day is keyed for replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKeyPolicy {
    /// `YYYY-MM-DD`: one entry per calendar date.
    #[default]
    FullDate,
    /// `MM-DD`: one entry per day of the year; the same day in different
    /// years shares a key.
    MonthDay,
}

/// Calendar-day identifier used to dedupe registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
    policy: DayKeyPolicy,
}

impl Calendar {
    /// # Errors
    /// Returns an error if the offset is outside `-23..=23` hours.
    pub fn new(utc_offset_hours: i32, policy: DayKeyPolicy) -> Result<Self, ConfigError> {
        let offset = utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .filter(|_| (-23..=23).contains(&utc_offset_hours))
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "calendar.utc_offset_hours".into(),
                message: format!("{utc_offset_hours} is not within -23..=23"),
            })?;
        Ok(Self { offset, policy })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn policy(&self) -> DayKeyPolicy {
        self.policy
    }

    pub fn local(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset)
    }

    pub fn day_key(&self, at: DateTime<Utc>) -> DayKey {
        let local = self.local(at);
        match self.policy {
            DayKeyPolicy::FullDate => DayKey(local.format("%Y-%m-%d").to_string()),
            DayKeyPolicy::MonthDay => DayKey(local.format("%m-%d").to_string()),
        }
    }

    /// RFC 3339 at second precision, in the configured offset.
    pub fn format_timestamp(&self, at: DateTime<Utc>) -> String {
        self.local(at).to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (read in the
    /// configured offset) or a bare `YYYY-MM-DD` (local midnight).
    pub fn parse_timestamp(&self, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| ValidationError::InvalidTimestamp(raw.to_string()))?;
        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| ValidationError::InvalidTimestamp(raw.to_string()))
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(9 * 3600).unwrap_or_else(|| Utc.fix()),
            policy: DayKeyPolicy::FullDate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn day_key_follows_offset() {
        let cal = Calendar::new(9, DayKeyPolicy::FullDate).unwrap();
        // 16:00 UTC is already the next day at +9.
        assert_eq!(cal.day_key(utc("2025-06-20T16:00:00Z")).as_str(), "2025-06-21");
        let cal = Calendar::new(0, DayKeyPolicy::FullDate).unwrap();
        assert_eq!(cal.day_key(utc("2025-06-20T16:00:00Z")).as_str(), "2025-06-20");
    }

    #[test]
    fn month_day_ignores_year() {
        let cal = Calendar::new(9, DayKeyPolicy::MonthDay).unwrap();
        assert_eq!(
            cal.day_key(utc("2024-06-21T03:00:00Z")),
            cal.day_key(utc("2025-06-21T03:00:00Z"))
        );
        assert_eq!(cal.day_key(utc("2025-06-21T03:00:00Z")).as_str(), "06-21");
    }

    #[test]
    fn rejects_out_of_range_offset() {
        assert!(Calendar::new(24, DayKeyPolicy::FullDate).is_err());
        assert!(Calendar::new(-24, DayKeyPolicy::FullDate).is_err());
        assert!(Calendar::new(-23, DayKeyPolicy::FullDate).is_ok());
    }

    #[test]
    fn parses_supported_formats() {
        let cal = Calendar::new(9, DayKeyPolicy::FullDate).unwrap();
        assert_eq!(
            cal.parse_timestamp("2025-06-21T10:00:00+09:00").unwrap(),
            utc("2025-06-21T01:00:00Z")
        );
        assert_eq!(
            cal.parse_timestamp("2025-06-21T10:00:00").unwrap(),
            utc("2025-06-21T01:00:00Z")
        );
        assert_eq!(
            cal.parse_timestamp("2025-06-21").unwrap(),
            utc("2025-06-20T15:00:00Z")
        );
        assert!(cal.parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn formats_in_offset() {
        let cal = Calendar::new(9, DayKeyPolicy::FullDate).unwrap();
        let at = utc("2025-06-21T01:02:03Z");
        let text = cal.format_timestamp(at);
        assert_eq!(text, "2025-06-21T10:02:03+09:00");
        assert_eq!(cal.parse_timestamp(&text).unwrap(), at);
    }
}
