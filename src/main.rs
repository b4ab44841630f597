//! Spread Engine CLI
//!
//! Prints the next expiration and the strikes each delta preset selects.
//!
//! Usage:
//!   cargo run -- 450
//!   cargo run -- 450 monthly
//!   cargo run -- 450 daily config/engine.yaml

use chrono::Local;
use spread_engine::calendar::session::format_time;
use spread_engine::prelude::*;
use spread_engine::telemetry;
use std::env;
use std::process;

fn usage() -> ! {
    eprintln!("Usage: spread-engine <spot> [daily|weekly|monthly] [config.yaml]");
    process::exit(2);
}

fn main() {
    telemetry::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let spot: f64 = match args.first().map(|s| s.parse::<f64>()) {
        Some(Ok(spot)) => spot,
        Some(Err(_)) | None => usage(),
    };
    let timeframe = match args.get(1).map(|s| s.parse::<ExpirationTimeframe>()) {
        Some(Ok(timeframe)) => timeframe,
        Some(Err(e)) => {
            eprintln!("✗ {}", e);
            usage();
        }
        None => ExpirationTimeframe::Weekly,
    };
    let config = EngineConfig::load_or_default(args.get(2).map(String::as_str));

    if let Err(e) = run(spot, timeframe, &config) {
        eprintln!("✗ {}", e);
        process::exit(1);
    }
}

fn run(spot: f64, timeframe: ExpirationTimeframe, config: &EngineConfig) -> EngineResult<()> {
    let calendar = config.expiration_calendar();
    let solver = config.strike_solver();
    let rate = config.market.risk_free_rate;
    let volatility = config.market.volatility;

    let now = Local::now().naive_local();
    let expiration = calendar.expiration_date(timeframe, now);
    let t = calendar.time_to_expiry(expiration, now);

    println!("Spread Engine\n");
    println!("Market:");
    println!("  Spot: ${:.2}", spot);
    println!("  Risk-free rate: {:.1}%", rate * 100.0);
    println!("  Volatility: {:.0}%", volatility * 100.0);
    println!();
    println!("Expiration ({}):", timeframe);
    println!("  Date: {}", expiration.format("%a %Y-%m-%d"));
    println!("  Settles: {} close", format_time(calendar.market_close()));
    println!("  Time to expiration: {:.5} years ({:.2} days)", t, t * 365.25);
    println!();

    for preset in DeltaStrategy::all() {
        let strikes = preset.strikes(spot, t, rate, volatility, &solver)?;
        println!("{} - {}", preset.name, preset.description);

        if let Some(strike) = strikes.put_strike {
            print_leg("Put", strike, OptionQuoteInputs::new(spot, strike, t, rate, volatility, false)?);
        }
        if let Some(strike) = strikes.call_strike {
            print_leg("Call", strike, OptionQuoteInputs::new(spot, strike, t, rate, volatility, true)?);
        }
        println!();
    }

    Ok(())
}

fn print_leg(label: &str, strike: f64, quote: OptionQuoteInputs) {
    let greeks = quote.greeks();
    println!(
        "  {:<4} ${:>8.2}  price ${:>7.2}  Δ {:>6.3}  Γ {:.4}  Θ {:>7.3}  V {:.3}",
        label,
        strike,
        quote.price(),
        greeks.delta,
        greeks.gamma,
        greeks.theta,
        greeks.vega
    );
}
