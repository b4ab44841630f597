//! Delta strategy presets
//!
//! Named put/call delta targets behind the dashboard's preset buttons. Each
//! selection runs the strike solver once per leg.

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::solver::StrikeSolver;

/// A named pair of delta targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeltaStrategy {
    pub name: &'static str,
    /// Signed put delta target in [-1, 0]
    pub put_delta: Option<f64>,
    /// Call delta target in [0, 1]
    pub call_delta: Option<f64>,
    pub description: &'static str,
}

/// Built-in presets, widest to tightest
pub const DELTA_STRATEGIES: [DeltaStrategy; 4] = [
    DeltaStrategy {
        name: "Conservative",
        put_delta: Some(-0.16),
        call_delta: Some(0.16),
        description: "16Δ: about one standard deviation out, roughly 84% chance each side expires OTM",
    },
    DeltaStrategy {
        name: "Moderate",
        put_delta: Some(-0.25),
        call_delta: Some(0.25),
        description: "25Δ: balance of premium collected and distance from spot",
    },
    DeltaStrategy {
        name: "Aggressive",
        put_delta: Some(-0.35),
        call_delta: Some(0.35),
        description: "35Δ: strikes close to spot for higher premium and higher risk",
    },
    DeltaStrategy {
        name: "ATM",
        put_delta: Some(-0.50),
        call_delta: Some(0.50),
        description: "50Δ: at-the-money strikes",
    },
];

/// Strikes produced for one preset selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PresetStrikes {
    pub put_strike: Option<f64>,
    pub call_strike: Option<f64>,
}

impl DeltaStrategy {
    /// All built-in presets
    pub fn all() -> &'static [DeltaStrategy] {
        &DELTA_STRATEGIES
    }

    /// Look up a preset by name (case-insensitive)
    pub fn find(name: &str) -> EngineResult<&'static DeltaStrategy> {
        let name = name.trim();
        DELTA_STRATEGIES
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownPreset(name.to_string()))
    }

    /// Solve the put and call strikes this preset targets
    pub fn strikes(
        &self,
        spot: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        volatility: f64,
        solver: &StrikeSolver,
    ) -> EngineResult<PresetStrikes> {
        let put_strike = self
            .put_delta
            .map(|delta| solver.solve(spot, delta, time_to_expiry, risk_free_rate, volatility, false))
            .transpose()?;
        let call_strike = self
            .call_delta
            .map(|delta| solver.solve(spot, delta, time_to_expiry, risk_free_rate, volatility, true))
            .transpose()?;

        tracing::debug!(preset = self.name, spot, ?put_strike, ?call_strike, "applied delta preset");

        Ok(PresetStrikes {
            put_strike,
            call_strike,
        })
    }
}
