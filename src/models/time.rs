use crate::error::BackendError;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Closed time interval for range queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, BackendError> {
        if start > end {
            return Err(BackendError::configuration(format!(
                "Time range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// `[now - lookback, now]`
    pub fn last(lookback: Duration) -> Result<Self, BackendError> {
        let end = Utc::now();
        let lookback = chrono::Duration::from_std(lookback)
            .map_err(|_| BackendError::configuration("Lookback duration is too large"))?;
        let start = end.checked_sub_signed(lookback).ok_or_else(|| {
            BackendError::configuration("Lookback reaches before the earliest representable time")
        })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Parse a lookback like `30s`, `15m`, `1h` or `7d`
pub fn parse_lookback(value: &str) -> Result<Duration, BackendError> {
    let value = value.trim();
    let invalid = || {
        BackendError::configuration(format!(
            "Invalid time range '{}': expected <number><s|m|h|d>",
            value
        ))
    };

    let unit = value.chars().last().ok_or_else(invalid)?;
    let amount: u64 = value[..value.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;

    let multiplier: u64 = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 60 * 60 * 24,
        _ => return Err(invalid()),
    };

    let seconds = amount.checked_mul(multiplier).ok_or_else(invalid)?;
    Ok(Duration::from_secs(seconds))
}
