//! JSON API for the dashboard
//!
//! Thin actix-web handlers over the engine. Market assumptions default to the
//! configured flat rate and volatility; requests may override them.

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::ExpirationTimeframe;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::presets::DeltaStrategy;
use crate::pricing::{Greeks, OptionQuoteInputs};
use crate::strategy::{PnlPoint, StrategyKind, StrikeConfiguration};

/// Default number of points on the P/L chart
const DEFAULT_CHART_POINTS: usize = 81;

/// Chart spans spot ± this fraction
const CHART_RANGE: f64 = 0.2;

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::InvalidInput(_) | EngineError::UnknownPreset(_) => StatusCode::BAD_REQUEST,
            EngineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": self.to_string() }))
    }
}

/// Expiration selection shared by several requests
///
/// An explicit `expiration` date wins over `timeframe`; with neither, the
/// weekly expiration is used. `reference` defaults to the local clock.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpirationSelection {
    #[serde(default)]
    pub timeframe: Option<ExpirationTimeframe>,
    #[serde(default)]
    pub expiration: Option<NaiveDate>,
    #[serde(default)]
    pub reference: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpirationQuery {
    pub timeframe: ExpirationTimeframe,
    #[serde(default)]
    pub reference: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpirationResponse {
    pub expiration: NaiveDate,
    pub time_to_expiration: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GreeksRequest {
    pub spot: f64,
    pub strike: f64,
    pub time_to_expiration: f64,
    pub is_call: bool,
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
    #[serde(default)]
    pub volatility: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GreeksResponse {
    pub greeks: Greeks,
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrikesRequest {
    pub spot: f64,
    pub preset: String,
    #[serde(flatten)]
    pub selection: ExpirationSelection,
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
    #[serde(default)]
    pub volatility: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrikesResponse {
    pub preset: &'static str,
    pub expiration: NaiveDate,
    pub time_to_expiration: f64,
    pub put_strike: Option<f64>,
    pub call_strike: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyRequest {
    pub kind: StrategyKind,
    pub spot: f64,
    pub preset: String,
    #[serde(flatten)]
    pub selection: ExpirationSelection,
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
    #[serde(default)]
    pub volatility: Option<f64>,
    #[serde(default)]
    pub wing_width: Option<f64>,
    #[serde(default)]
    pub points: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyResponse {
    pub configuration: StrikeConfiguration,
    pub expiration: NaiveDate,
    pub time_to_expiration: f64,
    /// Net premium per share, negative for a credit
    pub entry_cost: f64,
    pub greeks: Greeks,
    pub pnl: Vec<PnlPoint>,
}

/// Register all routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/presets", web::get().to(presets))
        .route("/expiration", web::get().to(expiration))
        .route("/greeks", web::post().to(greeks))
        .route("/strikes", web::post().to(strikes))
        .route("/strategy", web::post().to(strategy));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn presets() -> web::Json<&'static [DeltaStrategy]> {
    web::Json(DeltaStrategy::all())
}

async fn expiration(
    config: web::Data<EngineConfig>,
    query: web::Query<ExpirationQuery>,
) -> web::Json<ExpirationResponse> {
    let calendar = config.expiration_calendar();
    let reference = query.reference.unwrap_or_else(|| Local::now().naive_local());
    let expiration = calendar.expiration_date(query.timeframe, reference);

    web::Json(ExpirationResponse {
        expiration,
        time_to_expiration: calendar.time_to_expiry(expiration, reference),
    })
}

async fn greeks(
    config: web::Data<EngineConfig>,
    req: web::Json<GreeksRequest>,
) -> EngineResult<web::Json<GreeksResponse>> {
    let quote = OptionQuoteInputs::new(
        req.spot,
        req.strike,
        req.time_to_expiration,
        req.risk_free_rate.unwrap_or(config.market.risk_free_rate),
        req.volatility.unwrap_or(config.market.volatility),
        req.is_call,
    )?;

    Ok(web::Json(GreeksResponse {
        greeks: quote.greeks(),
        price: quote.price(),
    }))
}

async fn strikes(
    config: web::Data<EngineConfig>,
    req: web::Json<StrikesRequest>,
) -> EngineResult<web::Json<StrikesResponse>> {
    let preset = DeltaStrategy::find(&req.preset)?;
    let (expiration, time_to_expiration) = resolve_expiration(&config, &req.selection);
    let rate = req.risk_free_rate.unwrap_or(config.market.risk_free_rate);
    let volatility = req.volatility.unwrap_or(config.market.volatility);

    let strikes = preset.strikes(
        req.spot,
        time_to_expiration,
        rate,
        volatility,
        &config.strike_solver(),
    )?;

    tracing::info!(
        preset = preset.name,
        spot = req.spot,
        %expiration,
        ?strikes,
        "strike request"
    );

    Ok(web::Json(StrikesResponse {
        preset: preset.name,
        expiration,
        time_to_expiration,
        put_strike: strikes.put_strike,
        call_strike: strikes.call_strike,
    }))
}

async fn strategy(
    config: web::Data<EngineConfig>,
    req: web::Json<StrategyRequest>,
) -> EngineResult<web::Json<StrategyResponse>> {
    let preset = DeltaStrategy::find(&req.preset)?;
    let (expiration, time_to_expiration) = resolve_expiration(&config, &req.selection);
    let rate = req.risk_free_rate.unwrap_or(config.market.risk_free_rate);
    let volatility = req.volatility.unwrap_or(config.market.volatility);

    let configuration = StrikeConfiguration::from_preset(
        req.kind,
        preset,
        req.spot,
        time_to_expiration,
        rate,
        volatility,
        &config.strike_solver(),
        req.wing_width.unwrap_or(config.strikes.wing_width),
    )?;

    let entry_cost = configuration.entry_cost(req.spot, time_to_expiration, rate, volatility)?;
    let greeks = configuration.greeks(req.spot, time_to_expiration, rate, volatility)?;
    let pnl = configuration.pnl_curve(
        req.spot,
        time_to_expiration,
        rate,
        volatility,
        req.spot * (1.0 - CHART_RANGE),
        req.spot * (1.0 + CHART_RANGE),
        req.points.unwrap_or(DEFAULT_CHART_POINTS),
        config.strikes.contract_multiplier,
    )?;

    Ok(web::Json(StrategyResponse {
        configuration,
        expiration,
        time_to_expiration,
        entry_cost,
        greeks,
        pnl,
    }))
}

fn resolve_expiration(config: &EngineConfig, selection: &ExpirationSelection) -> (NaiveDate, f64) {
    let calendar = config.expiration_calendar();
    let reference = selection.reference.unwrap_or_else(|| Local::now().naive_local());
    let expiration = selection.expiration.unwrap_or_else(|| {
        calendar.expiration_date(
            selection.timeframe.unwrap_or(ExpirationTimeframe::Weekly),
            reference,
        )
    });
    (expiration, calendar.time_to_expiry(expiration, reference))
}
