use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use leo_cli::{smoke, LocalTest};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leo")]
#[command(about = "Deployment checks for the Leo backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a deployed backend: performance endpoint, chat and chat latency
    Smoke {
        /// Base URL of the deployment
        #[arg(env = "LEO_BASE_URL")]
        base_url: String,
    },

    /// Build the Docker image, run it and check it answers
    LocalTest(LocalTest),
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Smoke { base_url } => smoke::run(&base_url).await.map(|_| ()),
        Commands::LocalTest(options) => options.run().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "Check failed:".red());
            ExitCode::FAILURE
        }
    }
}
