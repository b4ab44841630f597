//! YAML Configuration for the strike engine
//!
//! Holds the flat market assumptions, solver bounds, strike grid and session
//! close. Every field has a default so a partial file (or none) works.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::calendar::session::parse_time;
use crate::calendar::ExpirationCalendar;
use crate::solver::StrikeSolver;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Flat rate and volatility fed to every pricing call
    #[serde(default)]
    pub market: MarketConfig,
    /// Strike solver search settings
    #[serde(default)]
    pub solver: SolverConfig,
    /// Strike grid and strategy wing settings
    #[serde(default)]
    pub strikes: StrikeConfig,
    /// Session times used by expiration rules
    #[serde(default)]
    pub calendar: CalendarConfig,
}

/// Market assumptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Risk-free rate (e.g., 0.05 for 5%)
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    /// Annual volatility (σ), e.g., 0.20 for 20%
    #[serde(default = "default_volatility")]
    pub volatility: f64,
}

/// Solver parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Lowest searched strike as a fraction of spot
    #[serde(default = "default_lower_bound_ratio")]
    pub lower_bound_ratio: f64,
    /// Highest searched strike as a fraction of spot
    #[serde(default = "default_upper_bound_ratio")]
    pub upper_bound_ratio: f64,
    /// Bisection steps
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Optional early exit on |delta - target|
    #[serde(default)]
    pub tolerance: Option<f64>,
}

/// Strike configuration for the underlying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeConfig {
    /// Strike tick size (5.0 for the dashboard's underlyings)
    #[serde(default = "default_strike_increment")]
    pub increment: f64,
    /// Distance from short to long strikes in spreads
    #[serde(default = "default_wing_width")]
    pub wing_width: f64,
    /// Contract multiplier (100 for equity options)
    #[serde(default = "default_contract_multiplier")]
    pub contract_multiplier: f64,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Market close in HH:MM format
    #[serde(default = "default_market_close")]
    pub market_close: String,
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&contents)?;
        tracing::info!(path = %path.as_ref().display(), "loaded engine configuration");
        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or fall back to defaults with a warning
    pub fn load_or_default(path: Option<&str>) -> Self {
        match path {
            Some(path) => Self::from_file(path).unwrap_or_else(|e| {
                tracing::warn!(path, error = %e, "failed to load config, using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.market.volatility.is_finite() && self.market.volatility > 0.0) {
            return Err(ConfigError::Validation(
                "Volatility must be positive".to_string(),
            ));
        }

        if !self.market.risk_free_rate.is_finite() {
            return Err(ConfigError::Validation(
                "Risk-free rate must be finite".to_string(),
            ));
        }

        let lower = self.solver.lower_bound_ratio;
        let upper = self.solver.upper_bound_ratio;
        if !(lower > 0.0 && lower < 1.0 && upper > 1.0 && upper.is_finite()) {
            return Err(ConfigError::Validation(format!(
                "Strike bounds must satisfy 0 < lower < 1 < upper, got {} and {}",
                lower, upper
            )));
        }

        if self.solver.max_iterations == 0 || self.solver.max_iterations > 10000 {
            return Err(ConfigError::Validation(
                "Solver iterations must be between 1 and 10000".to_string(),
            ));
        }

        if let Some(tolerance) = self.solver.tolerance {
            if !(tolerance > 0.0 && tolerance < 1.0) {
                return Err(ConfigError::Validation(format!(
                    "Solver tolerance must be in (0, 1), got {}",
                    tolerance
                )));
            }
        }

        if !(self.strikes.increment.is_finite() && self.strikes.increment > 0.0) {
            return Err(ConfigError::Validation(
                "Strike increment must be positive".to_string(),
            ));
        }

        if !(self.strikes.wing_width.is_finite() && self.strikes.wing_width > 0.0) {
            return Err(ConfigError::Validation(
                "Wing width must be positive".to_string(),
            ));
        }

        if !(self.strikes.contract_multiplier.is_finite() && self.strikes.contract_multiplier > 0.0) {
            return Err(ConfigError::Validation(
                "Contract multiplier must be positive".to_string(),
            ));
        }

        parse_time(&self.calendar.market_close)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        Ok(())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Strike solver configured from this file
    pub fn strike_solver(&self) -> StrikeSolver {
        StrikeSolver::from_config(&self.solver, &self.strikes)
    }

    /// Expiration calendar configured from this file
    pub fn expiration_calendar(&self) -> ExpirationCalendar {
        parse_time(&self.calendar.market_close)
            .map(ExpirationCalendar::new)
            .unwrap_or_default()
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            volatility: default_volatility(),
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            lower_bound_ratio: default_lower_bound_ratio(),
            upper_bound_ratio: default_upper_bound_ratio(),
            max_iterations: default_max_iterations(),
            tolerance: None,
        }
    }
}

impl Default for StrikeConfig {
    fn default() -> Self {
        Self {
            increment: default_strike_increment(),
            wing_width: default_wing_width(),
            contract_multiplier: default_contract_multiplier(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            market_close: default_market_close(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

// Default value functions
fn default_risk_free_rate() -> f64 {
    0.05
}

fn default_volatility() -> f64 {
    0.20
}

fn default_lower_bound_ratio() -> f64 {
    0.5
}

fn default_upper_bound_ratio() -> f64 {
    1.5
}

fn default_max_iterations() -> usize {
    crate::solver::DEFAULT_MAX_ITERATIONS
}

fn default_strike_increment() -> f64 {
    crate::solver::DEFAULT_STRIKE_INCREMENT
}

fn default_wing_width() -> f64 {
    10.0
}

fn default_contract_multiplier() -> f64 {
    100.0
}

fn default_market_close() -> String {
    "16:00".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.market.risk_free_rate, 0.05);
        assert_eq!(config.solver.max_iterations, 50);
        assert_eq!(config.strikes.increment, 5.0);
        assert!(config.validate().is_ok());
        assert_eq!(config.strike_solver(), StrikeSolver::default());
        assert_eq!(config.expiration_calendar(), ExpirationCalendar::default());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = EngineConfig::from_yaml("market:\n  volatility: 0.35\n").unwrap();
        assert_eq!(config.market.volatility, 0.35);
        assert_eq!(config.market.risk_free_rate, 0.05);
        assert_eq!(config.calendar.market_close, "16:00");
        assert_eq!(config.solver.tolerance, None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.market.volatility = -0.1;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.solver.lower_bound_ratio = 1.2;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.solver.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.calendar.market_close = "4pm".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_bad_yaml_is_parse_error() {
        let err = EngineConfig::from_yaml("market: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = EngineConfig::default();
        config.solver.tolerance = Some(1e-3);
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = EngineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let err = EngineConfig::from_file("/nonexistent/engine.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
        assert_eq!(EngineConfig::load_or_default(Some("/nonexistent/engine.yaml")), EngineConfig::default());
    }

    #[test]
    fn test_custom_close_feeds_calendar() {
        let config = EngineConfig::from_yaml("calendar:\n  market_close: \"13:00\"\n").unwrap();
        assert_eq!(
            config.expiration_calendar().market_close(),
            chrono::NaiveTime::from_hms_opt(13, 0, 0).unwrap()
        );
    }
}
