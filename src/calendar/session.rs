//! Market session times
//!
//! Equity options trade 09:30-16:00 local exchange time. Only the close
//! matters for expiration rules: a daily expiration selected after the close
//! belongs to the next session.

use chrono::NaiveTime;

use crate::error::{EngineError, EngineResult};

/// Regular session close (16:00)
pub const MARKET_CLOSE_HOUR: u32 = 16;

/// Default market close as a time of day
pub fn default_market_close() -> NaiveTime {
    NaiveTime::from_hms_opt(MARKET_CLOSE_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Parse time string "HH:MM" into a time of day
pub fn parse_time(time_str: &str) -> EngineResult<NaiveTime> {
    NaiveTime::parse_from_str(time_str.trim(), "%H:%M")
        .map_err(|e| EngineError::invalid_input(format!("invalid time '{}': {}", time_str, e)))
}

/// Format a time of day as "HH:MM"
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
