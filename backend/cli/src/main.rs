mod check_config_cmd;
mod config;
mod describe_cmd;
mod sequence_cmd;
mod sessions;
mod upload;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blindspot")]
#[command(about = "BlindSpot: spoken-style scene descriptions for blind and low-vision users")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.blindspot/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe a single image
    Describe {
        image: PathBuf,
        /// Session whose saved history this image joins
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Forget the saved history of a session
    ClearHistory {
        #[arg(short, long)]
        session: String,
    },
    /// Describe images in order, sharing one history
    Sequence {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Print the effective config (secrets redacted) and its validation report
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = config::resolve_path(cli.config);

    match cli.command {
        Commands::Describe { image, session } => {
            let config = config::load(&config_path).await?;
            describe_cmd::run(&config, &image, session).await
        }
        Commands::ClearHistory { session } => {
            let config = config::load_unchecked(&config_path).await?;
            sessions::run_clear(&config, &session).await
        }
        Commands::Sequence { images } => {
            let config = config::load(&config_path).await?;
            sequence_cmd::run(&config, &images).await
        }
        Commands::CheckConfig => check_config_cmd::run(&config_path).await,
    }
}
