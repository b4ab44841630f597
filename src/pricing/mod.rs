//! Option Pricing Models
//!
//! Closed-form Black-Scholes Greeks for European equity options with a flat
//! volatility and no dividends.
//!
//! Conventions:
//! - Theta is quoted per calendar day and is never positive
//! - Vega is quoted per 1 volatility point (σ moving from 0.20 to 0.21)
//! - `time_to_expiration <= 0` is the expired boundary: delta collapses to
//!   0 or ±1, gamma/theta/vega are exactly 0

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Days used to turn annual theta into daily theta
const THETA_DAYS_PER_YEAR: f64 = 365.0;

/// Standard normal cumulative distribution function
///
/// Evaluated at `|x|` and reflected with the sign of `x`, so
/// `norm_cdf(x) + norm_cdf(-x) == 1`. Absolute error is below 7.5e-8.
pub fn norm_cdf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    0.5 * (1.0 + sign * erf(x.abs() / std::f64::consts::SQRT_2))
}

/// Error function approximation (Abramowitz and Stegun 7.1.26), for `x >= 0`
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let t = 1.0 / (1.0 + p * x);
    1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp()
}

/// Standard normal probability density function
pub fn norm_pdf(x: f64) -> f64 {
    (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Black-Scholes d1 term
pub fn d1(spot: f64, strike: f64, time_to_expiry: f64, risk_free_rate: f64, volatility: f64) -> f64 {
    ((spot / strike).ln() + (risk_free_rate + 0.5 * volatility.powi(2)) * time_to_expiry)
        / (volatility * time_to_expiry.sqrt())
}

/// Black-Scholes d2 term
pub fn d2(spot: f64, strike: f64, time_to_expiry: f64, risk_free_rate: f64, volatility: f64) -> f64 {
    d1(spot, strike, time_to_expiry, risk_free_rate, volatility) - volatility * time_to_expiry.sqrt()
}

/// Greeks for an option
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    /// Per calendar day
    pub theta: f64,
    /// Per volatility point
    pub vega: f64,
}

impl Greeks {
    /// Scale by a signed quantity (negative for short legs)
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            theta: self.theta * factor,
            vega: self.vega * factor,
        }
    }

    /// Sum two sets of Greeks (for multi-leg positions)
    pub fn add(&self, other: &Greeks) -> Self {
        Self {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            theta: self.theta + other.theta,
            vega: self.vega + other.vega,
        }
    }
}

/// Validated inputs for a single option quote
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionQuoteInputs {
    spot_price: f64,
    strike_price: f64,
    time_to_expiration: f64,
    risk_free_rate: f64,
    volatility: f64,
    is_call: bool,
}

impl OptionQuoteInputs {
    /// Validate and build quote inputs
    ///
    /// # Arguments
    /// * `spot_price` - Underlying price, must be positive
    /// * `strike_price` - Strike, must be positive
    /// * `time_to_expiration` - Years to expiry; zero or negative means expired
    /// * `risk_free_rate` - Annualized decimal rate (0.05 for 5%)
    /// * `volatility` - Annualized decimal volatility, must be positive
    /// * `is_call` - true for call, false for put
    pub fn new(
        spot_price: f64,
        strike_price: f64,
        time_to_expiration: f64,
        risk_free_rate: f64,
        volatility: f64,
        is_call: bool,
    ) -> EngineResult<Self> {
        ensure_positive(spot_price, "spot price")?;
        ensure_positive(strike_price, "strike price")?;
        ensure_positive(volatility, "volatility")?;
        ensure_finite(time_to_expiration, "time to expiration")?;
        ensure_finite(risk_free_rate, "risk-free rate")?;

        Ok(Self {
            spot_price,
            strike_price,
            time_to_expiration,
            risk_free_rate,
            volatility,
            is_call,
        })
    }

    /// Same quote at a different strike
    pub fn with_strike(&self, strike_price: f64) -> EngineResult<Self> {
        ensure_positive(strike_price, "strike price")?;
        Ok(Self { strike_price, ..*self })
    }

    pub fn spot_price(&self) -> f64 {
        self.spot_price
    }

    pub fn strike_price(&self) -> f64 {
        self.strike_price
    }

    pub fn time_to_expiration(&self) -> f64 {
        self.time_to_expiration
    }

    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    pub fn is_call(&self) -> bool {
        self.is_call
    }

    fn is_expired(&self) -> bool {
        self.time_to_expiration <= 0.0
    }

    fn d1(&self) -> f64 {
        d1(
            self.spot_price,
            self.strike_price,
            self.time_to_expiration,
            self.risk_free_rate,
            self.volatility,
        )
    }

    /// Delta in [0, 1] for calls, [-1, 0] for puts
    ///
    /// At expiry this is a step: a call is 1 only when strictly in the money,
    /// a put is -1 only when strictly in the money. At the money both are 0,
    /// not ±0.5. The jump against the continuous formula near T = 0 is
    /// deliberate.
    pub fn delta(&self) -> f64 {
        if self.is_expired() {
            return if self.is_call {
                if self.spot_price > self.strike_price { 1.0 } else { 0.0 }
            } else if self.spot_price < self.strike_price {
                -1.0
            } else {
                0.0
            };
        }

        let n_d1 = norm_cdf(self.d1());
        if self.is_call {
            n_d1
        } else {
            n_d1 - 1.0
        }
    }

    /// Gamma (same for calls and puts)
    pub fn gamma(&self) -> f64 {
        if self.is_expired() {
            return 0.0;
        }
        norm_pdf(self.d1())
            / (self.spot_price * self.volatility * self.time_to_expiration.sqrt())
    }

    /// Theta per calendar day, floored at zero
    pub fn theta(&self) -> f64 {
        if self.is_expired() {
            return 0.0;
        }

        let t = self.time_to_expiration;
        let d1 = self.d1();
        let d2 = d1 - self.volatility * t.sqrt();
        let discounted_strike = self.strike_price * (-self.risk_free_rate * t).exp();

        let decay = -self.spot_price * norm_pdf(d1) * self.volatility / (2.0 * t.sqrt());
        let carry = if self.is_call {
            -self.risk_free_rate * discounted_strike * norm_cdf(d2)
        } else {
            self.risk_free_rate * discounted_strike * norm_cdf(-d2)
        };

        // Deep ITM European puts accrete carry faster than they decay.
        ((decay + carry) / THETA_DAYS_PER_YEAR).min(0.0)
    }

    /// Vega per volatility point (same for calls and puts)
    pub fn vega(&self) -> f64 {
        if self.is_expired() {
            return 0.0;
        }
        self.spot_price * norm_pdf(self.d1()) * self.time_to_expiration.sqrt() / 100.0
    }

    /// Theoretical European value; intrinsic value at expiry
    pub fn price(&self) -> f64 {
        if self.is_expired() {
            return intrinsic(self.spot_price, self.strike_price, self.is_call);
        }

        let t = self.time_to_expiration;
        let d1 = self.d1();
        let d2 = d1 - self.volatility * t.sqrt();
        let discounted_strike = self.strike_price * (-self.risk_free_rate * t).exp();

        if self.is_call {
            self.spot_price * norm_cdf(d1) - discounted_strike * norm_cdf(d2)
        } else {
            discounted_strike * norm_cdf(-d2) - self.spot_price * norm_cdf(-d1)
        }
    }

    pub fn greeks(&self) -> Greeks {
        Greeks {
            delta: self.delta(),
            gamma: self.gamma(),
            theta: self.theta(),
            vega: self.vega(),
        }
    }
}

/// Black-Scholes for spot options (stocks), one call per Greek
pub struct BlackScholes;

impl BlackScholes {
    pub fn delta(
        spot_price: f64,
        strike: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
        is_call: bool,
    ) -> EngineResult<f64> {
        OptionQuoteInputs::new(spot_price, strike, time_to_expiry, risk_free_rate, volatility, is_call)
            .map(|q| q.delta())
    }

    pub fn gamma(
        spot_price: f64,
        strike: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
    ) -> EngineResult<f64> {
        OptionQuoteInputs::new(spot_price, strike, time_to_expiry, risk_free_rate, volatility, true)
            .map(|q| q.gamma())
    }

    pub fn theta(
        spot_price: f64,
        strike: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
        is_call: bool,
    ) -> EngineResult<f64> {
        OptionQuoteInputs::new(spot_price, strike, time_to_expiry, risk_free_rate, volatility, is_call)
            .map(|q| q.theta())
    }

    pub fn vega(
        spot_price: f64,
        strike: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
    ) -> EngineResult<f64> {
        OptionQuoteInputs::new(spot_price, strike, time_to_expiry, risk_free_rate, volatility, true)
            .map(|q| q.vega())
    }

    pub fn price(
        spot_price: f64,
        strike: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
        is_call: bool,
    ) -> EngineResult<f64> {
        OptionQuoteInputs::new(spot_price, strike, time_to_expiry, risk_free_rate, volatility, is_call)
            .map(|q| q.price())
    }

    pub fn greeks(
        spot_price: f64,
        strike: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
        is_call: bool,
    ) -> EngineResult<Greeks> {
        OptionQuoteInputs::new(spot_price, strike, time_to_expiry, risk_free_rate, volatility, is_call)
            .map(|q| q.greeks())
    }
}

/// Intrinsic value of a call or put
pub fn intrinsic(spot_price: f64, strike: f64, is_call: bool) -> f64 {
    if is_call {
        (spot_price - strike).max(0.0)
    } else {
        (strike - spot_price).max(0.0)
    }
}

fn ensure_positive(value: f64, name: &str) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::invalid_input(format!("{} must be positive, got {}", name, value)))
    }
}

fn ensure_finite(value: f64, name: &str) -> EngineResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::invalid_input(format!("{} must be finite, got {}", name, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T_30D: f64 = 30.0 / 365.25;

    #[test]
    fn test_norm_cdf_known_values() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((norm_cdf(1.96) - 0.9750021).abs() < 1e-6);
        assert!((norm_cdf(-1.96) - 0.0249979).abs() < 1e-6);
        assert!((norm_cdf(1.0) - 0.8413447).abs() < 1e-6);
    }

    #[test]
    fn test_norm_cdf_is_symmetric_and_bounded() {
        for i in -80..=80 {
            let x = i as f64 * 0.1;
            let sum = norm_cdf(x) + norm_cdf(-x);
            assert!((sum - 1.0).abs() < 1e-8, "asymmetric at {}", x);
            assert!((0.0..=1.0).contains(&norm_cdf(x)));
        }
        assert_eq!(norm_cdf(60.0), 1.0);
        assert_eq!(norm_cdf(-60.0), 0.0);
    }

    #[test]
    fn test_atm_delta_near_half() {
        let call = BlackScholes::delta(100.0, 100.0, T_30D, 0.05, 0.20, true).unwrap();
        let put = BlackScholes::delta(100.0, 100.0, T_30D, 0.05, 0.20, false).unwrap();
        assert!((call - 0.5).abs() < 0.1, "call delta {}", call);
        assert!((put + 0.5).abs() < 0.1, "put delta {}", put);
        assert!((call - put - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_deep_itm_and_otm_call_delta() {
        let itm = BlackScholes::delta(100.0, 80.0, T_30D, 0.05, 0.20, true).unwrap();
        let otm = BlackScholes::delta(100.0, 120.0, T_30D, 0.05, 0.20, true).unwrap();
        assert!(itm > 0.8, "ITM delta {}", itm);
        assert!(otm < 0.2, "OTM delta {}", otm);
    }

    #[test]
    fn test_expired_boundary_is_exact() {
        assert_eq!(BlackScholes::delta(110.0, 100.0, 0.0, 0.05, 0.2, true).unwrap(), 1.0);
        assert_eq!(BlackScholes::delta(90.0, 100.0, 0.0, 0.05, 0.2, true).unwrap(), 0.0);
        assert_eq!(BlackScholes::delta(100.0, 100.0, 0.0, 0.05, 0.2, true).unwrap(), 0.0);
        assert_eq!(BlackScholes::delta(90.0, 100.0, 0.0, 0.05, 0.2, false).unwrap(), -1.0);
        assert_eq!(BlackScholes::delta(110.0, 100.0, 0.0, 0.05, 0.2, false).unwrap(), 0.0);
        assert_eq!(BlackScholes::delta(100.0, 100.0, -0.5, 0.05, 0.2, false).unwrap(), 0.0);

        assert_eq!(BlackScholes::gamma(100.0, 100.0, 0.0, 0.05, 0.2).unwrap(), 0.0);
        assert_eq!(BlackScholes::theta(100.0, 100.0, 0.0, 0.05, 0.2, true).unwrap(), 0.0);
        assert_eq!(BlackScholes::theta(100.0, 100.0, 0.0, 0.05, 0.2, false).unwrap(), 0.0);
        assert_eq!(BlackScholes::vega(100.0, 100.0, 0.0, 0.05, 0.2).unwrap(), 0.0);
    }

    #[test]
    fn test_gamma_and_vega_peak_at_the_money() {
        let atm_gamma = BlackScholes::gamma(100.0, 100.0, T_30D, 0.05, 0.20).unwrap();
        let otm_gamma = BlackScholes::gamma(100.0, 110.0, T_30D, 0.05, 0.20).unwrap();
        let itm_gamma = BlackScholes::gamma(100.0, 90.0, T_30D, 0.05, 0.20).unwrap();
        assert!(atm_gamma > otm_gamma && atm_gamma > itm_gamma);

        let atm_vega = BlackScholes::vega(100.0, 100.0, T_30D, 0.05, 0.20).unwrap();
        let otm_vega = BlackScholes::vega(100.0, 110.0, T_30D, 0.05, 0.20).unwrap();
        assert!(atm_vega > otm_vega);
        assert!(otm_vega >= 0.0);
    }

    #[test]
    fn test_theta_conventions() {
        // 1y ATM call, 20% vol, 5% rate: annual theta is about -6.41
        let call = BlackScholes::theta(100.0, 100.0, 1.0, 0.05, 0.20, true).unwrap();
        assert!((call * 365.0 + 6.41).abs() < 0.05, "daily theta {}", call);

        let put = BlackScholes::theta(100.0, 100.0, 1.0, 0.05, 0.20, false).unwrap();
        assert!(put < 0.0 && put > call);

        // Carry would push this put's theta positive
        let deep_put = BlackScholes::theta(50.0, 100.0, 1.0, 0.10, 0.20, false).unwrap();
        assert_eq!(deep_put, 0.0);
    }

    #[test]
    fn test_vega_per_vol_point() {
        // 1y ATM, 20% vol, 5% rate: annual vega is about 37.52
        let vega = BlackScholes::vega(100.0, 100.0, 1.0, 0.05, 0.20).unwrap();
        assert!((vega - 0.3752).abs() < 0.001, "vega {}", vega);
    }

    #[test]
    fn test_price_put_call_parity() {
        let q = OptionQuoteInputs::new(100.0, 100.0, 1.0, 0.05, 0.20, true).unwrap();
        let call = q.price();
        let put = OptionQuoteInputs::new(100.0, 100.0, 1.0, 0.05, 0.20, false).unwrap().price();
        assert!((call - 10.45).abs() < 0.01, "call {}", call);
        let parity = call - put - (100.0 - 100.0 * (-0.05_f64).exp());
        assert!(parity.abs() < 1e-6);
    }

    #[test]
    fn test_price_at_expiry_is_intrinsic() {
        assert_eq!(BlackScholes::price(110.0, 100.0, 0.0, 0.05, 0.2, true).unwrap(), 10.0);
        assert_eq!(BlackScholes::price(110.0, 100.0, 0.0, 0.05, 0.2, false).unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let err = BlackScholes::delta(100.0, 100.0, T_30D, 0.05, 0.0, true).unwrap_err();
        assert!(err.to_string().contains("volatility must be positive"));

        assert!(BlackScholes::delta(0.0, 100.0, T_30D, 0.05, 0.2, true).is_err());
        assert!(BlackScholes::gamma(100.0, -5.0, T_30D, 0.05, 0.2).is_err());
        assert!(BlackScholes::vega(100.0, 100.0, f64::NAN, 0.05, 0.2).is_err());
        assert!(BlackScholes::theta(100.0, 100.0, T_30D, f64::INFINITY, 0.2, true).is_err());
        assert!(BlackScholes::delta(f64::NAN, 100.0, T_30D, 0.05, 0.2, true).is_err());
    }

    #[test]
    fn test_greeks_aggregate() {
        let q = OptionQuoteInputs::new(100.0, 100.0, T_30D, 0.05, 0.20, true).unwrap();
        let g = q.greeks();
        let straddle = g.add(&q.with_strike(100.0).unwrap().greeks());
        assert!((straddle.delta - 2.0 * g.delta).abs() < 1e-12);

        let short = g.scale(-1.0);
        assert_eq!(short.delta, -g.delta);
        assert_eq!(g.add(&short).gamma, 0.0);
    }
}
