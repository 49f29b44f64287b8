use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use gridwatch_config::GridwatchConfig;
use gridwatch_engine::Supervisor;
use gridwatch_telemetry::EventLogger;

#[derive(Parser)]
#[command(name = "gridwatch", version, about)]
pub struct Cli {
    /// Configuration file (defaults to config/gridwatch.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the intrusion prevention pipeline
    Run(RunArgs),
    /// Load and validate the configuration, then print the effective document
    CheckConfig,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Override the dashboard JSON output path
    #[arg(long)]
    pub dashboard: Option<String>,

    /// Keep the in-memory block model but install no firewall rules
    #[arg(long)]
    pub no_enforce: bool,
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    EventLogger::init();

    let config = match &cli.config {
        Some(path) => GridwatchConfig::load_from(path)?,
        None => GridwatchConfig::load()?,
    };

    match cli.command {
        Commands::Run(args) => {
            let mut config = config;
            if let Some(dashboard) = args.dashboard {
                config.dashboard.path = dashboard;
            }
            if args.no_enforce {
                config.prevention.enforce = false;
            }
            Supervisor::new(config).run()?;
            Ok(())
        }
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
