//! Timestamp normalization for pin records.
//!
//! Pinterest reports `created_at` as an RFC 2822 string
//! (`Mon, 19 Aug 2024 07:32:11 +0000`), but older payloads and embedded page
//! state also carry RFC 3339 strings or plain epoch numbers. All of them are
//! reduced to a UTC calendar date.
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use super::error::PinError;

/// Values above this are epoch milliseconds rather than seconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// The `date` block of a pin record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinDate {
    /// `YYYY-MM-DD` in UTC, or empty when no usable timestamp was found.
    pub formatted: String,
    /// The source timestamp exactly as it was found.
    pub initial: Option<String>,
}

impl PinDate {
    /// Builds the date block from the raw source text.
    ///
    /// A timestamp that can't be parsed is kept in `initial` and leaves `formatted` empty.
    pub fn from_initial(initial: Option<String>) -> Self {
        let Some(raw) = initial else {
            return Self::default();
        };

        match normalize_timestamp(&raw) {
            Ok(formatted) => Self {
                formatted,
                initial: Some(raw),
            },
            Err(err) => {
                warn!("{err}");
                Self {
                    formatted: String::new(),
                    initial: Some(raw),
                }
            }
        }
    }

    #[inline]
    pub fn is_formatted(&self) -> bool {
        !self.formatted.is_empty()
    }
}

/// Parses a raw timestamp and formats it as an ISO calendar date in UTC.
pub fn normalize_timestamp(raw: &str) -> Result<String, PinError> {
    parse_timestamp(raw)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .ok_or_else(|| PinError::DateParse {
            raw: raw.to_string(),
        })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(number) = text.parse::<f64>() {
        return from_epoch(number);
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[allow(clippy::cast_possible_truncation)]
fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let seconds = if value > EPOCH_MILLIS_THRESHOLD {
        value / 1000.0
    } else {
        value
    };

    DateTime::from_timestamp(seconds.trunc() as i64, 0)
}
