mod logging;
mod shutdown;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use prompt_gateway::GatewayConfig;

/// Environment variables with this prefix override file settings; `__` separates
/// nesting levels, e.g. `PROMPT_GATEWAY__CONTINUATION__KEY`.
const ENV_PREFIX: &str = "PROMPT_GATEWAY__";

/// Prompt Gateway - metered, authenticated access to generative-model prompts
#[derive(Parser)]
#[command(name = "prompt-gateway-server")]
#[command(about = "Prompt Gateway - metered, authenticated access to generative-model prompts")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (JSON, secrets redacted) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config
        && !path.is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    let config = load_config(cli.config.as_deref())?;
    logging::init(&config.logging, cli.verbose)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(&config).await,
        Commands::Check => check_config(&config),
    }
}

/// Layered config: YAML file (if given), then `PROMPT_GATEWAY__*` environment.
fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    let mut figment = Figment::new();
    if let Some(path) = path {
        figment = figment.merge(Yaml::file(path));
    }
    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("failed to load configuration")
}

fn check_config(config: &GatewayConfig) -> Result<()> {
    prompt_gateway::build_router(config)?;
    println!("Configuration is valid ({} prompts)", config.prompts.len());
    Ok(())
}

async fn run_server(config: &GatewayConfig) -> Result<()> {
    let router = prompt_gateway::build_router(config)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    tracing::info!(addr = %config.server.bind_addr, "prompt gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown::wait_for_shutdown())
        .await?;

    tracing::info!("prompt gateway stopped");
    Ok(())
}
