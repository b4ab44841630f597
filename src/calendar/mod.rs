//! Expiration Calendar
//!
//! Turns a user's timeframe selection into a concrete expiration date and a
//! year-fraction time to expiration for the pricing layer.
//!
//! Expiration rules (equity options, local exchange time):
//! - Daily: next trading day; today if before the 16:00 close
//! - Weekly: the next Friday strictly after today (a Friday rolls a week)
//! - Monthly: third Friday of the month, or of next month once it has passed
//!
//! Weekends are the only non-trading days; exchange holidays are not modelled.

pub mod session;

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Calendar days per year used for time to expiration
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Milliseconds in a 365.25-day year
pub const MS_PER_YEAR: f64 = DAYS_PER_YEAR * 24.0 * 60.0 * 60.0 * 1000.0;

/// Expiration cycle chosen in the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpirationTimeframe {
    Daily,
    Weekly,
    Monthly,
}

impl ExpirationTimeframe {
    pub const ALL: [ExpirationTimeframe; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpirationTimeframe::Daily => "daily",
            ExpirationTimeframe::Weekly => "weekly",
            ExpirationTimeframe::Monthly => "monthly",
        }
    }
}

impl fmt::Display for ExpirationTimeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpirationTimeframe {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::invalid_input(format!(
                "unknown expiration timeframe: {}",
                other
            ))),
        }
    }
}

/// Calendar holding the session times that expiration rules depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationCalendar {
    /// Daily selections at or after this time roll to the next day
    market_close: NaiveTime,
}

impl ExpirationCalendar {
    pub fn new(market_close: NaiveTime) -> Self {
        Self { market_close }
    }

    pub fn market_close(&self) -> NaiveTime {
        self.market_close
    }

    /// Check if a date is a trading day (Monday-Friday)
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Get the next trading day strictly after the given date
    pub fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        self.roll_to_trading_day(date + Duration::days(1))
    }

    /// The date itself if it trades, otherwise the following Monday
    fn roll_to_trading_day(&self, mut date: NaiveDate) -> NaiveDate {
        while !self.is_trading_day(date) {
            date += Duration::days(1);
        }
        date
    }

    /// Concrete expiration date for a timeframe, relative to `reference`
    pub fn expiration_date(
        &self,
        timeframe: ExpirationTimeframe,
        reference: NaiveDateTime,
    ) -> NaiveDate {
        let today = reference.date();
        let expiration = match timeframe {
            ExpirationTimeframe::Daily => {
                let candidate = if reference.time() < self.market_close {
                    today
                } else {
                    today + Duration::days(1)
                };
                self.roll_to_trading_day(candidate)
            }
            ExpirationTimeframe::Weekly => next_friday_after(today),
            ExpirationTimeframe::Monthly => {
                let this_month = third_friday_of_month(today);
                if this_month < today {
                    third_friday_of_month(first_of_next_month(today))
                } else {
                    this_month
                }
            }
        };

        tracing::trace!(%timeframe, %reference, %expiration, "resolved expiration date");
        expiration
    }

    /// Third Friday of the given month
    pub fn third_friday(&self, year: i32, month: u32) -> EngineResult<NaiveDate> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(third_friday_of_month)
            .ok_or_else(|| {
                EngineError::invalid_input(format!("invalid month {}-{:02}", year, month))
            })
    }

    /// Instant an expiration date settles: the market close on that date
    pub fn expiration_instant(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.market_close)
    }

    /// Year-fraction from `now` to the close on `date`
    pub fn time_to_expiry(&self, date: NaiveDate, now: NaiveDateTime) -> f64 {
        calculate_time_to_expiration(self.expiration_instant(date), now)
    }
}

impl Default for ExpirationCalendar {
    fn default() -> Self {
        Self::new(session::default_market_close())
    }
}

/// Expiration date for a timeframe using the default 16:00 close
pub fn get_expiration_date(timeframe: ExpirationTimeframe, reference: NaiveDateTime) -> NaiveDate {
    ExpirationCalendar::default().expiration_date(timeframe, reference)
}

/// Year-fraction between two instants, never negative
///
/// Measured in milliseconds over a 365.25-day year. Targets at or before
/// `now` give exactly 0.
pub fn calculate_time_to_expiration(target: NaiveDateTime, now: NaiveDateTime) -> f64 {
    let millis = (target - now).num_milliseconds().max(0);
    millis as f64 / MS_PER_YEAR
}

/// Year-fraction from the local wall clock to `target`
pub fn time_to_expiration_from_now(target: NaiveDateTime) -> f64 {
    calculate_time_to_expiration(target, Local::now().naive_local())
}

/// Next Friday strictly after `date`
fn next_friday_after(date: NaiveDate) -> NaiveDate {
    let day_of_week = date.weekday().num_days_from_sunday() as i64;
    let days_until = match (5 - day_of_week + 7) % 7 {
        0 => 7,
        n => n,
    };
    date + Duration::days(days_until)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    first_of_month(first_of_month(date) + Duration::days(32))
}

/// Third Friday of the month containing `date` (first Friday + 14 days)
fn third_friday_of_month(date: NaiveDate) -> NaiveDate {
    let first = first_of_month(date);
    let day_of_week = first.weekday().num_days_from_sunday() as i64;
    let first_friday = first + Duration::days((5 - day_of_week + 7) % 7);
    first_friday + Duration::days(14)
}
