//! Elysia - virtual companion chat and weather panel
//!
#![doc = "Elysia - virtual companion chat and weather panel"]
#![doc = "Main entry point for the elysia command-line application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use elysia::cli::{Cli, Commands};
use elysia::commands::{self, AppContext};
use elysia::config::Config;
use elysia::widget::RefreshOutcome;

/// Exit status asking a scheduler to retry the widget refresh later
const EXIT_RETRY: i32 = 75;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let ctx = AppContext::open(config)?;
    if let Err(e) = ctx
        .preferences
        .record_last_open(chrono::Utc::now().timestamp_millis())
    {
        tracing::warn!("Failed to record last open time: {}", e);
    }

    // Execute command
    match cli.command {
        Commands::Weather { command } => {
            tracing::info!("Running weather command");
            commands::weather::handle_weather(&ctx, command).await?;
        }
        Commands::Widget { once } => {
            tracing::info!("Running widget refresher (once={})", once);
            let outcome = commands::widget::handle_widget(&ctx, once).await?;
            if outcome == RefreshOutcome::Retry {
                std::process::exit(EXIT_RETRY);
            }
        }
        Commands::Chat { command } => {
            commands::chat::handle_chat(&ctx, command)?;
        }
        Commands::History { command } => {
            tracing::info!("Running history command");
            commands::history::handle_history(&ctx, command)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "elysia=debug" } else { "elysia=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
