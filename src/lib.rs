//! Spread Engine - Greeks and strike selection for option spreads
//!
//! Pure functions behind an options-strategy dashboard:
//! - Black-Scholes delta, gamma, theta and vega (European, flat volatility)
//! - Delta-targeted strike solver with $5 strike rounding
//! - Daily/weekly/monthly expiration dates and time to expiration
//! - Named delta presets and multi-leg strike configurations
//!
//! Every call is synchronous and side-effect free; nothing is shared between
//! calls, so the engine can be used from any number of threads.
//!
//! ```rust
//! use spread_engine::prelude::*;
//!
//! let t = 30.0 / 365.25;
//! let strike = find_strike_for_delta(100.0, 0.25, t, 0.05, 0.20, true).unwrap();
//! assert_eq!(strike % 5.0, 0.0);
//! ```

pub mod api;
pub mod calendar;
pub mod config;
pub mod error;
pub mod presets;
pub mod pricing;
pub mod solver;
pub mod strategy;
pub mod telemetry;

/// Prelude with commonly used types
pub mod prelude {
    pub use crate::calendar::{
        calculate_time_to_expiration, get_expiration_date, time_to_expiration_from_now,
        ExpirationCalendar, ExpirationTimeframe,
    };
    pub use crate::config::EngineConfig;
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::presets::{DeltaStrategy, PresetStrikes, DELTA_STRATEGIES};
    pub use crate::pricing::{norm_cdf, norm_pdf, BlackScholes, Greeks, OptionQuoteInputs};
    pub use crate::solver::{find_strike_for_delta, round_to_increment, StrikeSolver};
    pub use crate::strategy::{OptionLeg, OptionType, Side, StrategyKind, StrikeConfiguration};
}

pub use crate::error::{EngineError, EngineResult};
