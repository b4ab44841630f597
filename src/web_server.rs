//! Web server for the strategy dashboard
//!
//! Serves the JSON API on 127.0.0.1:3000 (override the port with `PORT`).
//!
//! Usage:
//!   cargo run --bin web-server
//!   cargo run --bin web-server -- config/engine.yaml

use actix_web::{web, App, HttpServer};
use spread_engine::api;
use spread_engine::config::EngineConfig;
use spread_engine::telemetry;
use std::env;

const DEFAULT_PORT: u16 = 3000;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init();

    let config = EngineConfig::load_or_default(env::args().nth(1).as_deref());
    let port = env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    tracing::info!(port, "spread engine web server starting");
    tracing::info!("open http://localhost:{} in your browser", port);

    let state = web::Data::new(config);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
        .bind(("127.0.0.1", port))?
        .run()
        .await
}
