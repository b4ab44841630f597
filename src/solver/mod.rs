//! Delta-targeted strike selection
//!
//! Inverts Black-Scholes delta by bisection over strike. Both call and put
//! delta fall monotonically as strike rises (a call from 1 toward 0, a put
//! from 0 toward -1), so a computed delta above target means the strike is
//! too low for either type.

use crate::config::{SolverConfig, StrikeConfig};
use crate::error::{EngineError, EngineResult};
use crate::pricing::OptionQuoteInputs;

/// Default number of bisection steps
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Listed strike spacing for the underlyings the dashboard trades
pub const DEFAULT_STRIKE_INCREMENT: f64 = 5.0;

/// Round a price to the nearest multiple of `increment`
pub fn round_to_increment(value: f64, increment: f64) -> f64 {
    (value / increment).round() * increment
}

/// Bisection strike solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeSolver {
    /// Lowest strike searched, as a fraction of spot
    pub lower_bound_ratio: f64,
    /// Highest strike searched, as a fraction of spot
    pub upper_bound_ratio: f64,
    /// Bisection steps when no tolerance is hit first
    pub max_iterations: usize,
    /// Stop early once |delta - target| falls below this
    pub tolerance: Option<f64>,
    /// Final strikes are rounded to this increment
    pub strike_increment: f64,
}

impl Default for StrikeSolver {
    fn default() -> Self {
        Self {
            lower_bound_ratio: 0.5,
            upper_bound_ratio: 1.5,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: None,
            strike_increment: DEFAULT_STRIKE_INCREMENT,
        }
    }
}

impl StrikeSolver {
    pub fn from_config(solver: &SolverConfig, strikes: &StrikeConfig) -> Self {
        Self {
            lower_bound_ratio: solver.lower_bound_ratio,
            upper_bound_ratio: solver.upper_bound_ratio,
            max_iterations: solver.max_iterations,
            tolerance: solver.tolerance,
            strike_increment: strikes.increment,
        }
    }

    /// Strike whose delta is closest to `target_delta`, rounded to the increment
    ///
    /// # Arguments
    /// * `spot` - Underlying price
    /// * `target_delta` - Signed target (0.25 for a 25Δ call, -0.25 for a 25Δ put)
    /// * `time_to_expiry` - Years to expiry
    /// * `risk_free_rate` - Annualized decimal rate
    /// * `volatility` - Annualized decimal volatility
    /// * `is_call` - true for call, false for put
    ///
    /// Targets outside what the strike bounds can produce converge onto the
    /// nearest bound instead of failing.
    pub fn solve(
        &self,
        spot: f64,
        target_delta: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
        is_call: bool,
    ) -> EngineResult<f64> {
        let strike =
            self.solve_unrounded(spot, target_delta, time_to_expiry, risk_free_rate, volatility, is_call)?;
        Ok(round_to_increment(strike, self.strike_increment))
    }

    /// Bisection result before rounding to the strike increment
    pub fn solve_unrounded(
        &self,
        spot: f64,
        target_delta: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
        is_call: bool,
    ) -> EngineResult<f64> {
        if !target_delta.is_finite() {
            return Err(EngineError::invalid_input(format!(
                "target delta must be finite, got {}",
                target_delta
            )));
        }
        self.validate()?;

        // Validates spot, volatility, time and rate once for every probe
        let quote = OptionQuoteInputs::new(spot, spot, time_to_expiry, risk_free_rate, volatility, is_call)?;

        let mut low = spot * self.lower_bound_ratio;
        let mut high = spot * self.upper_bound_ratio;
        if !(low > 0.0 && high.is_finite()) {
            return Err(EngineError::invalid_input(format!(
                "spot {} puts the strike search range [{}, {}] outside finite positive prices",
                spot, low, high
            )));
        }
        let mut strike = (low + high) / 2.0;
        let mut delta = f64::NAN;

        for _ in 0..self.max_iterations {
            strike = (low + high) / 2.0;
            delta = quote.with_strike(strike)?.delta();

            if let Some(tolerance) = self.tolerance {
                if (delta - target_delta).abs() < tolerance {
                    break;
                }
            }

            if delta > target_delta {
                low = strike;
            } else {
                high = strike;
            }
        }

        if (delta - target_delta).abs() > 0.01 {
            tracing::debug!(
                spot,
                target_delta,
                strike,
                delta,
                "target delta not reachable inside strike bounds"
            );
        } else {
            tracing::debug!(spot, target_delta, strike, delta, is_call, "solved strike for delta");
        }

        Ok(strike)
    }

    fn validate(&self) -> EngineResult<()> {
        if !(self.lower_bound_ratio > 0.0 && self.lower_bound_ratio < self.upper_bound_ratio) {
            return Err(EngineError::invalid_input(format!(
                "strike bounds must satisfy 0 < lower < upper, got {} and {}",
                self.lower_bound_ratio, self.upper_bound_ratio
            )));
        }
        if !(self.strike_increment.is_finite() && self.strike_increment > 0.0) {
            return Err(EngineError::invalid_input("strike increment must be positive"));
        }
        Ok(())
    }
}

/// Strike for a target delta with the default solver ($5 strikes, 50 steps)
pub fn find_strike_for_delta(
    spot: f64,
    target_delta: f64,
    time_to_expiry: f64,
    risk_free_rate: f64,
    volatility: f64,
    is_call: bool,
) -> EngineResult<f64> {
    StrikeSolver::default().solve(spot, target_delta, time_to_expiry, risk_free_rate, volatility, is_call)
}
