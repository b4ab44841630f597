//! Multi-leg strike configurations
//!
//! Builds the strike configuration for a bull call spread, iron condor or
//! butterfly (the structure handed to the analytics backend) and the payoff
//! arithmetic behind the P/L chart.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::presets::DeltaStrategy;
use crate::pricing::{intrinsic, Greeks, OptionQuoteInputs};
use crate::solver::{round_to_increment, StrikeSolver};

/// Option type (Put or Call)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Put,
    Call,
}

impl OptionType {
    pub fn is_call(&self) -> bool {
        matches!(self, OptionType::Call)
    }
}

/// Side of a trade (Long or Short)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// One leg of a strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    pub option_type: OptionType,
    pub side: Side,
    pub strike: f64,
    pub quantity: u32,
}

impl OptionLeg {
    pub fn new(option_type: OptionType, side: Side, strike: f64, quantity: u32) -> Self {
        Self {
            option_type,
            side,
            strike,
            quantity,
        }
    }

    fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity as f64
    }

    /// Signed value of the leg at expiry
    pub fn payoff_at_expiry(&self, underlying: f64) -> f64 {
        self.signed_quantity() * intrinsic(underlying, self.strike, self.option_type.is_call())
    }

    fn quote(
        &self,
        spot: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
    ) -> EngineResult<OptionQuoteInputs> {
        OptionQuoteInputs::new(
            spot,
            self.strike,
            time_to_expiry,
            risk_free_rate,
            volatility,
            self.option_type.is_call(),
        )
    }

    /// Signed theoretical value of the leg
    pub fn value(
        &self,
        spot: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
    ) -> EngineResult<f64> {
        let quote = self.quote(spot, time_to_expiry, risk_free_rate, volatility)?;
        Ok(self.signed_quantity() * quote.price())
    }

    /// Signed Greeks of the leg
    pub fn greeks(
        &self,
        spot: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
    ) -> EngineResult<Greeks> {
        let quote = self.quote(spot, time_to_expiry, risk_free_rate, volatility)?;
        Ok(quote.greeks().scale(self.signed_quantity()))
    }
}

/// Supported spread types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    BullCallSpread,
    IronCondor,
    Butterfly,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::BullCallSpread => "bull_call_spread",
            StrategyKind::IronCondor => "iron_condor",
            StrategyKind::Butterfly => "butterfly",
        };
        f.write_str(name)
    }
}

impl FromStr for StrategyKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bull_call_spread" | "bull_call" => Ok(Self::BullCallSpread),
            "iron_condor" => Ok(Self::IronCondor),
            "butterfly" => Ok(Self::Butterfly),
            other => Err(EngineError::invalid_input(format!("unknown strategy: {}", other))),
        }
    }
}

/// Upper limit on P/L chart points
pub const MAX_PNL_POINTS: usize = 10_000;

/// One point of the P/L chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PnlPoint {
    /// Underlying price
    pub price: f64,
    /// P/L if held to expiration
    pub expiry_pnl: f64,
    /// Theoretical P/L at the entry time to expiration
    pub current_pnl: f64,
}

/// Legs of a multi-leg strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeConfiguration {
    pub kind: StrategyKind,
    pub legs: Vec<OptionLeg>,
}

impl StrikeConfiguration {
    /// Long the lower call, short the higher call
    pub fn bull_call_spread(long_strike: f64, short_strike: f64) -> EngineResult<Self> {
        ensure_ascending(&[long_strike, short_strike], "bull call spread")?;
        Ok(Self {
            kind: StrategyKind::BullCallSpread,
            legs: vec![
                OptionLeg::new(OptionType::Call, Side::Long, long_strike, 1),
                OptionLeg::new(OptionType::Call, Side::Short, short_strike, 1),
            ],
        })
    }

    /// Short put spread below spot plus short call spread above it
    ///
    /// Short strikes may coincide (an iron butterfly); wings must be outside.
    pub fn iron_condor(
        long_put: f64,
        short_put: f64,
        short_call: f64,
        long_call: f64,
    ) -> EngineResult<Self> {
        ensure_ascending(&[long_put, short_put], "iron condor put wing")?;
        ensure_ascending(&[short_call, long_call], "iron condor call wing")?;
        if short_put > short_call {
            return Err(EngineError::invalid_input(format!(
                "iron condor short put {} is above short call {}",
                short_put, short_call
            )));
        }
        Ok(Self {
            kind: StrategyKind::IronCondor,
            legs: vec![
                OptionLeg::new(OptionType::Put, Side::Long, long_put, 1),
                OptionLeg::new(OptionType::Put, Side::Short, short_put, 1),
                OptionLeg::new(OptionType::Call, Side::Short, short_call, 1),
                OptionLeg::new(OptionType::Call, Side::Long, long_call, 1),
            ],
        })
    }

    /// Long call butterfly: +1 lower, -2 middle, +1 upper
    pub fn butterfly(lower: f64, middle: f64, upper: f64) -> EngineResult<Self> {
        ensure_ascending(&[lower, middle, upper], "butterfly")?;
        Ok(Self {
            kind: StrategyKind::Butterfly,
            legs: vec![
                OptionLeg::new(OptionType::Call, Side::Long, lower, 1),
                OptionLeg::new(OptionType::Call, Side::Short, middle, 2),
                OptionLeg::new(OptionType::Call, Side::Long, upper, 1),
            ],
        })
    }

    /// Populate strikes for `kind` from a delta preset
    ///
    /// - Iron condor: shorts at the preset's put/call deltas, longs one wing out
    /// - Bull call spread: long at the money, short at the call delta (at least
    ///   one increment above the long)
    /// - Butterfly: body at the money, wings as far as the call delta strike
    ///   (or `wing_width` when that is inside one increment)
    #[allow(clippy::too_many_arguments)]
    pub fn from_preset(
        kind: StrategyKind,
        preset: &DeltaStrategy,
        spot: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
        solver: &StrikeSolver,
        wing_width: f64,
    ) -> EngineResult<Self> {
        if !(wing_width.is_finite() && wing_width > 0.0) {
            return Err(EngineError::invalid_input("wing width must be positive"));
        }

        let increment = solver.strike_increment;
        let call_strike = |delta: Option<f64>| -> EngineResult<f64> {
            let delta = delta.ok_or_else(|| {
                EngineError::invalid_input(format!("preset {} has no call delta", preset.name))
            })?;
            solver.solve(spot, delta, time_to_expiry, risk_free_rate, volatility, true)
        };

        let configuration = match kind {
            StrategyKind::IronCondor => {
                let put_delta = preset.put_delta.ok_or_else(|| {
                    EngineError::invalid_input(format!("preset {} has no put delta", preset.name))
                })?;
                let short_put =
                    solver.solve(spot, put_delta, time_to_expiry, risk_free_rate, volatility, false)?;
                let short_call = call_strike(preset.call_delta)?;
                ensure_wing_fits(short_put, wing_width)?;
                Self::iron_condor(
                    short_put - wing_width,
                    short_put,
                    short_call,
                    short_call + wing_width,
                )?
            }
            StrategyKind::BullCallSpread => {
                let long_strike = round_to_increment(spot, increment);
                let short_strike = call_strike(preset.call_delta)?.max(long_strike + increment);
                Self::bull_call_spread(long_strike, short_strike)?
            }
            StrategyKind::Butterfly => {
                let middle = round_to_increment(spot, increment);
                let distance = call_strike(preset.call_delta)? - middle;
                let wing = if distance >= increment { distance } else { wing_width };
                ensure_wing_fits(middle, wing)?;
                Self::butterfly(middle - wing, middle, middle + wing)?
            }
        };

        tracing::debug!(
            %kind,
            preset = preset.name,
            strikes = ?configuration.strikes(),
            "built strike configuration"
        );
        Ok(configuration)
    }

    /// Strikes in leg order
    pub fn strikes(&self) -> Vec<f64> {
        self.legs.iter().map(|leg| leg.strike).collect()
    }

    /// Net premium paid per share (negative for a credit)
    pub fn entry_cost(
        &self,
        spot: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
    ) -> EngineResult<f64> {
        self.value(spot, time_to_expiry, risk_free_rate, volatility)
    }

    fn value(
        &self,
        spot: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
    ) -> EngineResult<f64> {
        self.legs.iter().try_fold(0.0, |total, leg| -> EngineResult<f64> {
            Ok(total + leg.value(spot, time_to_expiry, risk_free_rate, volatility)?)
        })
    }

    /// P/L per share at expiry for a given entry cost
    pub fn pnl_at_expiry(&self, underlying: f64, entry_cost: f64) -> f64 {
        let payoff: f64 = self.legs.iter().map(|leg| leg.payoff_at_expiry(underlying)).sum();
        payoff - entry_cost
    }

    /// Net position Greeks
    pub fn greeks(
        &self,
        spot: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
    ) -> EngineResult<Greeks> {
        self.legs.iter().try_fold(Greeks::default(), |total, leg| -> EngineResult<Greeks> {
            Ok(total.add(&leg.greeks(spot, time_to_expiry, risk_free_rate, volatility)?))
        })
    }

    /// P/L chart series over `[low, high]`, in dollars per contract
    ///
    /// The position is entered at `spot` with `time_to_expiry` remaining.
    /// `current_pnl` re-prices it at each underlying price with the same time
    /// remaining; `expiry_pnl` uses intrinsic values.
    #[allow(clippy::too_many_arguments)]
    pub fn pnl_curve(
        &self,
        spot: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
        low: f64,
        high: f64,
        steps: usize,
        multiplier: f64,
    ) -> EngineResult<Vec<PnlPoint>> {
        if steps < 2 {
            return Err(EngineError::invalid_input("P/L curve needs at least 2 points"));
        }
        if steps > MAX_PNL_POINTS {
            return Err(EngineError::invalid_input(format!(
                "P/L curve supports at most {} points, got {}",
                MAX_PNL_POINTS, steps
            )));
        }
        if !(low > 0.0 && low < high && high.is_finite()) {
            return Err(EngineError::invalid_input(format!(
                "P/L range must satisfy 0 < low < high, got {} and {}",
                low, high
            )));
        }

        let entry_cost = self.entry_cost(spot, time_to_expiry, risk_free_rate, volatility)?;
        let step = (high - low) / (steps - 1) as f64;

        (0..steps)
            .map(|i| -> EngineResult<PnlPoint> {
                let price = low + step * i as f64;
                let current = self.value(price, time_to_expiry, risk_free_rate, volatility)?;
                Ok(PnlPoint {
                    price,
                    expiry_pnl: self.pnl_at_expiry(price, entry_cost) * multiplier,
                    current_pnl: (current - entry_cost) * multiplier,
                })
            })
            .collect()
    }
}

/// The lower wing must stay above zero
fn ensure_wing_fits(inner_strike: f64, wing: f64) -> EngineResult<()> {
    if inner_strike - wing <= 0.0 {
        return Err(EngineError::invalid_input(format!(
            "wing width {} pushes a strike below zero from {}",
            wing, inner_strike
        )));
    }
    Ok(())
}

fn ensure_ascending(strikes: &[f64], what: &str) -> EngineResult<()> {
    if strikes.iter().any(|strike| !(strike.is_finite() && *strike > 0.0)) {
        return Err(EngineError::invalid_input(format!(
            "{} strikes must be positive, got {:?}",
            what, strikes
        )));
    }
    if strikes.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(EngineError::invalid_input(format!(
            "{} strikes must be strictly ascending, got {:?}",
            what, strikes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const T_30D: f64 = 30.0 / 365.25;

    #[test]
    fn test_bull_call_spread_payoff() {
        let spread = StrikeConfiguration::bull_call_spread(100.0, 110.0).unwrap();
        let cost = spread.entry_cost(100.0, T_30D, 0.05, 0.20).unwrap();
        assert!(cost > 0.0 && cost < 10.0, "debit {}", cost);

        assert!((spread.pnl_at_expiry(120.0, cost) - (10.0 - cost)).abs() < 1e-12);
        assert!((spread.pnl_at_expiry(90.0, cost) + cost).abs() < 1e-12);
        assert!((spread.pnl_at_expiry(105.0, cost) - (5.0 - cost)).abs() < 1e-12);
    }

    #[test]
    fn test_iron_condor_is_a_credit() {
        let condor = StrikeConfiguration::iron_condor(85.0, 90.0, 110.0, 115.0).unwrap();
        let cost = condor.entry_cost(100.0, T_30D, 0.05, 0.20).unwrap();
        assert!(cost < 0.0, "expected credit, got {}", cost);

        // Max profit between the shorts, max loss past a wing
        assert!((condor.pnl_at_expiry(100.0, cost) + cost).abs() < 1e-12);
        assert!((condor.pnl_at_expiry(130.0, cost) - (-5.0 - cost)).abs() < 1e-12);
        assert!((condor.pnl_at_expiry(70.0, cost) - (-5.0 - cost)).abs() < 1e-12);
    }

    #[test]
    fn test_butterfly_peaks_at_body() {
        let fly = StrikeConfiguration::butterfly(90.0, 100.0, 110.0).unwrap();
        assert_eq!(fly.legs[1].quantity, 2);
        let cost = fly.entry_cost(100.0, T_30D, 0.05, 0.20).unwrap();
        assert!(cost > 0.0);

        assert!((fly.pnl_at_expiry(100.0, cost) - (10.0 - cost)).abs() < 1e-12);
        assert!((fly.pnl_at_expiry(80.0, cost) + cost).abs() < 1e-12);
        assert!((fly.pnl_at_expiry(120.0, cost) + cost).abs() < 1e-12);
    }

    #[test]
    fn test_strike_ordering_enforced() {
        assert!(StrikeConfiguration::bull_call_spread(110.0, 100.0).is_err());
        assert!(StrikeConfiguration::bull_call_spread(100.0, 100.0).is_err());
        assert!(StrikeConfiguration::iron_condor(90.0, 85.0, 110.0, 115.0).is_err());
        assert!(StrikeConfiguration::iron_condor(85.0, 112.0, 110.0, 115.0).is_err());
        assert!(StrikeConfiguration::iron_condor(85.0, 100.0, 100.0, 115.0).is_ok());
        assert!(StrikeConfiguration::butterfly(90.0, 110.0, 100.0).is_err());
        assert!(StrikeConfiguration::butterfly(-10.0, 0.0, 10.0).is_err());
    }

    #[test]
    fn test_iron_condor_from_preset() {
        let preset = DeltaStrategy::find("Conservative").unwrap();
        let condor = StrikeConfiguration::from_preset(
            StrategyKind::IronCondor,
            preset,
            100.0,
            T_30D,
            0.05,
            0.20,
            &StrikeSolver::default(),
            10.0,
        )
        .unwrap();

        let strikes = condor.strikes();
        assert_eq!(strikes.len(), 4);
        assert!(strikes[1] < 100.0 && strikes[2] > 100.0);
        assert_eq!(strikes[1] - strikes[0], 10.0);
        assert_eq!(strikes[3] - strikes[2], 10.0);
    }

    #[test]
    fn test_bull_call_from_atm_preset_keeps_width() {
        let preset = DeltaStrategy::find("ATM").unwrap();
        let spread = StrikeConfiguration::from_preset(
            StrategyKind::BullCallSpread,
            preset,
            100.0,
            T_30D,
            0.05,
            0.20,
            &StrikeSolver::default(),
            10.0,
        )
        .unwrap();
        assert_eq!(spread.strikes(), vec![100.0, 105.0]);
    }

    #[test]
    fn test_butterfly_from_preset() {
        let preset = DeltaStrategy::find("Moderate").unwrap();
        let fly = StrikeConfiguration::from_preset(
            StrategyKind::Butterfly,
            preset,
            100.0,
            T_30D,
            0.05,
            0.20,
            &StrikeSolver::default(),
            10.0,
        )
        .unwrap();
        assert_eq!(fly.strikes(), vec![95.0, 100.0, 105.0]);
    }

    #[test]
    fn test_oversized_wing_rejected() {
        let preset = DeltaStrategy::find("Moderate").unwrap();
        let result = StrikeConfiguration::from_preset(
            StrategyKind::IronCondor,
            preset,
            20.0,
            T_30D,
            0.05,
            0.20,
            &StrikeSolver::default(),
            50.0,
        );
        match result {
            Err(EngineError::InvalidInput(msg)) => {
                assert!(msg.contains("pushes a strike below zero"), "{}", msg)
            }
            other => panic!("expected wing error, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_butterfly_wing_rejected() {
        // An ATM preset leaves the call strike on the body, so the fallback wing is used
        let preset = DeltaStrategy::find("ATM").unwrap();
        let result = StrikeConfiguration::from_preset(
            StrategyKind::Butterfly,
            preset,
            20.0,
            T_30D,
            0.05,
            0.20,
            &StrikeSolver::default(),
            25.0,
        );
        match result {
            Err(EngineError::InvalidInput(msg)) => {
                assert!(msg.contains("pushes a strike below zero"), "{}", msg)
            }
            other => panic!("expected wing error, got {:?}", other),
        }
    }

    #[test]
    fn test_pnl_curve_shape() {
        let spread = StrikeConfiguration::bull_call_spread(100.0, 110.0).unwrap();
        let curve = spread.pnl_curve(100.0, T_30D, 0.05, 0.20, 80.0, 120.0, 41, 100.0).unwrap();

        assert_eq!(curve.len(), 41);
        assert_eq!(curve[0].price, 80.0);
        assert!((curve[40].price - 120.0).abs() < 1e-9);

        let at_spot = curve[20];
        assert!((at_spot.price - 100.0).abs() < 1e-9);
        assert!(at_spot.current_pnl.abs() < 1e-9);

        // Expiry P/L is flat beyond the short strike
        assert!((curve[35].expiry_pnl - curve[40].expiry_pnl).abs() < 1e-9);
        assert!(curve[0].expiry_pnl < 0.0 && curve[40].expiry_pnl > 0.0);
    }

    #[test]
    fn test_pnl_curve_rejects_bad_range() {
        let fly = StrikeConfiguration::butterfly(90.0, 100.0, 110.0).unwrap();
        assert!(fly.pnl_curve(100.0, T_30D, 0.05, 0.20, 120.0, 80.0, 10, 100.0).is_err());
        assert!(fly.pnl_curve(100.0, T_30D, 0.05, 0.20, 80.0, 120.0, 1, 100.0).is_err());
    }

    #[test]
    fn test_pnl_curve_caps_point_count() {
        let spread = StrikeConfiguration::bull_call_spread(100.0, 110.0).unwrap();
        let err = spread
            .pnl_curve(100.0, T_30D, 0.05, 0.20, 80.0, 120.0, usize::MAX, 100.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(ref msg) if msg.contains("at most 10000")));

        let curve = spread
            .pnl_curve(100.0, T_30D, 0.05, 0.20, 80.0, 120.0, MAX_PNL_POINTS, 100.0)
            .unwrap();
        assert_eq!(curve.len(), MAX_PNL_POINTS);
    }

    #[test]
    fn test_position_greeks_net_legs() {
        let spread = StrikeConfiguration::bull_call_spread(100.0, 110.0).unwrap();
        let greeks = spread.greeks(100.0, T_30D, 0.05, 0.20).unwrap();
        let long = OptionQuoteInputs::new(100.0, 100.0, T_30D, 0.05, 0.20, true).unwrap().greeks();
        let short = OptionQuoteInputs::new(100.0, 110.0, T_30D, 0.05, 0.20, true).unwrap().greeks();
        assert!((greeks.delta - (long.delta - short.delta)).abs() < 1e-12);
        assert!(greeks.delta > 0.0);
    }

    #[test]
    fn test_strategy_kind_parsing() {
        assert_eq!("iron-condor".parse::<StrategyKind>().unwrap(), StrategyKind::IronCondor);
        assert_eq!("bull_call".parse::<StrategyKind>().unwrap(), StrategyKind::BullCallSpread);
        assert!("strangle".parse::<StrategyKind>().is_err());
        assert_eq!(StrategyKind::Butterfly.to_string(), "butterfly");
    }
}
