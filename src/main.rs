use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod db;
mod diary;
mod models;

use commands::{ConfigCommand, DiaryCommand, FoodCommand};
use config::Config;
use db::{init_db, FoodRepository};

#[derive(Parser)]
#[command(name = "fitdiary")]
#[command(version)]
#[command(about = "A food and body-weight diary", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and edit the daily diary
    Diary(DiaryCommand),

    /// Manage the food catalog
    Food(FoodCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so they never mix with command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitdiary=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;
    tracing::debug!("Using database {}", config.database_path.value.display());

    match cli.command {
        Some(Commands::Diary(cmd)) => {
            let pool = init_db(config.database_path.value.clone()).await?;
            cmd.run(pool, &config).await?;
        }
        Some(Commands::Food(cmd)) => {
            let pool = init_db(config.database_path.value.clone()).await?;
            let repo = FoodRepository::new(pool);
            cmd.run(&repo).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
