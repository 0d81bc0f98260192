//! Weatherloop host binary.
//!
//! - `run`: start both coordinators and log every cycle until Ctrl+C
//! - `once`: run one cycle of each and print the sensor table
//! - `check`: load and validate a configuration file

use argh::FromArgs;
use chrono::Utc;
use tokio::sync::watch;
use weatherloop::{Config, Service};

#[derive(FromArgs)]
/// Weatherloop - multi-source weather coordinator
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunArgs),
    Once(OnceArgs),
    Check(CheckArgs),
}

#[derive(FromArgs)]
/// Run the coordinators until interrupted
#[argh(subcommand, name = "run")]
struct RunArgs {
    /// path to the configuration file
    #[argh(option, short = 'c')]
    config: String,
}

#[derive(FromArgs)]
/// Run one refresh cycle and print the sensors
#[argh(subcommand, name = "once")]
struct OnceArgs {
    /// path to the configuration file
    #[argh(option, short = 'c')]
    config: String,

    /// print the full snapshot as JSON
    #[argh(switch)]
    json: bool,
}

#[derive(FromArgs)]
/// Validate a configuration file
#[argh(subcommand, name = "check")]
struct CheckArgs {
    /// path to the configuration file
    #[argh(option, short = 'c')]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let args: Args = argh::from_env();

    match args.command {
        Command::Run(args) => run(&args.config).await,
        Command::Once(args) => once(&args.config, args.json).await,
        Command::Check(args) => check(&args.config),
    }
}

fn load(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config = Config::from_file(path).map_err(|e| {
        log::error!("Failed to load config from '{}': {}", path, e);
        e
    })?;
    Ok(config)
}

async fn run(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(path)?;
    let service = Service::from_config(&config)?;

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    // Set up Ctrl+C handler
    ctrlc::set_handler({
        let shutdown_tx = shutdown_tx.clone();
        move || {
            log::info!("Received Ctrl+C, shutting down gracefully...");
            shutdown_tx.send(()).ok();
        }
    })?;

    service.run(shutdown_rx).await;
    log::info!("Weatherloop shut down, exiting");
    Ok(())
}

async fn once(path: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(path)?;
    let service = Service::from_config(&config)?;

    let (forecast, observation) = service.refresh_once().await;
    if let Err(e) = &forecast {
        log::warn!("Forecast cycle failed: {}", e);
    }
    if let Err(e) = &observation {
        log::warn!("Observation cycle failed: {}", e);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&service.store().current())?);
        return Ok(());
    }

    for (kind, value) in service.sensors(Utc::now()) {
        let unit = kind.unit().map(|u| format!(" {}", u)).unwrap_or_default();
        println!("{:<22} {}{}", kind.name(), value, unit);
    }
    if let Some(snapshot) = service.store().forecast() {
        if let Some(best) = &snapshot.best_time {
            println!("\n{}", best.reason);
        }
        for day in &snapshot.daily {
            println!(
                "{}  {:<16} {:>5.1} / {:>5.1} °C  rain {:>3.0} %",
                day.date,
                day.condition.as_str(),
                day.temperature_high,
                day.temperature_low,
                day.precipitation_probability_max
            );
        }
        for (kind, failure) in &snapshot.source_errors {
            println!("{} unavailable: {}", kind, failure.error);
        }
    }
    Ok(())
}

fn check(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(path)?;
    config.validate()?;
    println!(
        "Configuration OK: {} (lightning {}, mareograph {})",
        config.location.display_name(),
        if config.lightning.enabled { "on" } else { "off" },
        if config.mareograph.enabled { "on" } else { "off" }
    );
    Ok(())
}
