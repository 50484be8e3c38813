//! Pool sensor telemetry simulator - Main Entry Point
//!
//! Publishes synthetic pool readings to an MQTT broker until interrupted.

use clap::{Parser, Subcommand};
use poolsim::config::SimulatorConfig;
use poolsim::observability::init_default_logging;
use poolsim::publisher::PublisherLoop;
use poolsim::sensor::{GeneratorState, ReadingGenerator};
use poolsim::transport::MqttTransport;
use std::path::PathBuf;
use std::process;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Pool sensor MQTT telemetry simulator
#[derive(Parser)]
#[command(name = "poolsim")]
#[command(about = "Publishes simulated pool sensor readings over MQTT")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override its values
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the broker and publish readings until interrupted
    Run,
    /// Validate configuration
    Config {
        /// Print the effective configuration as TOML
        #[arg(long)]
        show: bool,
    },
    /// Print generated payloads without connecting to a broker
    Preview {
        /// Number of readings to print
        #[arg(short = 'n', long, default_value_t = 5)]
        count: u32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    let config = match load_configuration(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_simulator(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
        Commands::Preview { count } => preview_readings(&config, count),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(
    config_path: Option<&PathBuf>,
) -> Result<SimulatorConfig, poolsim::config::ConfigError> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            SimulatorConfig::load_from_file(path)?.with_env_overrides()
        }
        None => SimulatorConfig::from_env(),
    }
}

async fn run_simulator(config: SimulatorConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Starting pool simulator v{} against {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.mqtt.host,
        config.mqtt.port
    );

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
        let _ = shutdown_tx.send(true);
    });

    let broker = MqttTransport::new(config.mqtt.clone());
    let mut publisher = PublisherLoop::new(broker, &config);
    publisher.execute(shutdown_rx).await?;

    info!(
        "Application shutdown complete after {} readings",
        publisher.published_count()
    );
    Ok(())
}

fn handle_config_command(
    config: &SimulatorConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Configuration is valid");

    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    Ok(())
}

fn preview_readings(
    config: &SimulatorConfig,
    count: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let baseline = config.simulation.baseline();
    let generator = ReadingGenerator::new(baseline);
    let mut state = GeneratorState::new(&baseline);

    for _ in 0..count {
        let angle = state.advance();
        let (reading, raw_ph) = generator.generate(state.previous_ph, angle);
        state.previous_ph = raw_ph;
        println!("{}", serde_json::to_string(&reading.to_payload())?);
    }

    Ok(())
}
