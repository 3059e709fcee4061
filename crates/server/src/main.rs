mod bootstrap;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vireo_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "vireo-bot",
    about = "Vireo campaign bot for Discord",
    long_about = "Publishes campaign announcements, enrolls members through the join button and keeps campaign state in a JSON file.",
    after_help = "Examples:\n  vireo-bot\n  vireo-bot --config config/vireo.toml\n  vireo-bot --data-file /var/lib/vireo/campaigns.json"
)]
struct Args {
    #[arg(long, short, help = "Config file (defaults to ./vireo.toml, then ./config/vireo.toml)")]
    config: Option<PathBuf>,
    #[arg(long, help = "Campaign state file, overriding storage.data_file")]
    data_file: Option<PathBuf>,
    #[arg(long, help = "Log level filter, overriding logging.level")]
    log_level: Option<String>,
    #[arg(long, value_parser = parse_log_format, help = "Log format: compact, pretty or json")]
    log_format: Option<LogFormat>,
}

fn parse_log_format(raw: &str) -> Result<LogFormat, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "compact" => Ok(LogFormat::Compact),
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => Err(format!("unsupported log format `{other}`")),
    }
}

fn init_logging(config: &AppConfig) {
    use LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| EnvFilter::try_new(&config.logging.level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run(Args::parse()).await
}

async fn run(args: Args) -> Result<()> {
    // Config errors surface before logging exists, so they go to stderr via anyhow.
    let config = AppConfig::load(LoadOptions {
        require_file: args.config.is_some(),
        config_path: args.config,
        overrides: ConfigOverrides {
            data_file: args.data_file,
            log_level: args.log_level,
            log_format: args.log_format,
            ..ConfigOverrides::default()
        },
    })
    .context("failed to load configuration")?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        campaigns = app.registry.len().await,
        scope = ?app.scope,
        "vireo-bot starting gateway"
    );

    vireo_discord::gateway::run(app.config.bot_token(), app.dispatcher, app.scope).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "vireo-bot stopped"
    );
    Ok(())
}
