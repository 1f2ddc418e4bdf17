use std::path::PathBuf;

use clap::Parser;
use clawbot_teleop::config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Clawbot teleop runtime
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON config file (defaults apply for anything missing)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control loop period in milliseconds, overrides the config file
    #[arg(long)]
    tick_ms: Option<u64>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            match Config::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => Config::default(),
    };

    if let Some(tick_ms) = args.tick_ms {
        config.tick_interval_ms = tick_ms;
        if let Err(e) = config.validate() {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    }

    if let Err(e) = clawbot_teleop::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
