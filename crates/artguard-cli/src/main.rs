use anyhow::Result;
use artguard_core::capture::MatrixPreset;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod context;
mod synthetic;

#[derive(Parser)]
#[command(name = "artguard")]
#[command(version, about = "Artguard CLI - multi-layer watermark protection for VR artwork", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Protection service base URL, overriding config and environment
    #[arg(long, global = true)]
    service_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the protection service and print its batch capability
    Health,
    /// Run one synthetic session end to end
    Protect {
        /// Layer matrix preset
        #[arg(long)]
        matrix: Option<MatrixPreset>,
        /// Brush strokes to record before ending the session
        #[arg(long, default_value_t = 120)]
        strokes: u32,
    },
    /// Check one image for a watermark
    Verify {
        /// Image file to submit
        file: PathBuf,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = context::load_config(cli.config.as_deref(), cli.service_url.as_deref())?;

    match cli.command {
        Commands::Health => commands::health::run(&config).await?,
        Commands::Protect { matrix, strokes } => {
            commands::protect::run(config, matrix, strokes).await?
        }
        Commands::Verify { file } => commands::verify::run(config, &file).await?,
        Commands::ShowConfig => commands::show_config::run(&config)?,
    }

    Ok(())
}
