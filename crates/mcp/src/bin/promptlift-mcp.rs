// Promptlift MCP bridge binary

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use promptlift_core::{ApiKey, ConfigStore, ConfigUpdate};
use promptlift_mcp::startup::{self, Overrides};
use promptlift_mcp::tools::{OptimizePromptTool, ToolRegistry};
use promptlift_mcp::McpServer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "promptlift-mcp")]
#[command(about = "Prompt optimization for MCP hosts over stdio", version, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// API key (takes precedence over the stored key)
    #[arg(long, global = true, env = "PROMPTLIFT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the optimization service
    #[arg(long, global = true, env = "PROMPTLIFT_API_URL")]
    api_url: Option<String>,

    /// Timeout for each remote call, in seconds
    #[arg(
        long,
        global = true,
        env = "PROMPTLIFT_TIMEOUT_SECS",
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: u64,

    /// Path to the configuration file (defaults to ~/.promptlift/config.json)
    #[arg(long, global = true, env = "PROMPTLIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Write logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve MCP on stdin/stdout (default)
    Serve,

    /// Validate an API key and store it
    ///
    /// Example:
    ///
    ///  $ promptlift-mcp setup sk-... --api-url https://api.promptlift.dev
    ///
    Setup {
        /// The key to store
        key: String,
    },

    /// Show stored configuration and key status
    Status,

    /// Check that the optimization service is up
    Health,

    /// Remove the stored configuration
    Clear,
}

/// How long blocked I/O threads get to finish once serving has stopped.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(run(args));
    // Tokio reads stdin on a blocking thread that cannot be interrupted,
    // so dropping the runtime normally could wait for the host's next line.
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    result
}

async fn run(args: Args) -> Result<()> {
    let store = match &args.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_location().context("Could not determine home directory")?,
    };
    let overrides = Overrides {
        api_key: args.api_key.clone(),
        api_url: args.api_url.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&store, &overrides).await,
        Command::Setup { key } => setup(&store, &key, &overrides).await,
        Command::Status => status(&store, &overrides).await,
        Command::Health => health(&store, &overrides).await,
        Command::Clear => clear(&store),
    }
}

/// Logs go to stderr; stdout is reserved for protocol frames.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "promptlift=info".into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(store: &ConfigStore, overrides: &Overrides) -> Result<()> {
    let settings = startup::resolve(overrides, store.load())?;
    let client = startup::build_client(&settings)?;

    tracing::info!(
        key = %settings.api_key,
        backend = %client.config().base_url,
        "Starting Promptlift MCP bridge"
    );

    startup::verify_credential(&client).await?;

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(OptimizePromptTool::new(Arc::new(client))));
    let server = McpServer::new(registry);

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            shutdown.cancel();
        }
    });

    server.serve_stdio().await
}

async fn setup(store: &ConfigStore, key: &str, overrides: &Overrides) -> Result<()> {
    let api_key = ApiKey::parse(key).context("Invalid API key")?;
    let overrides = Overrides {
        api_key: Some(api_key.expose().to_string()),
        ..overrides.clone()
    };
    let settings = startup::resolve(&overrides, store.load())?;
    let client = startup::build_client(&settings)?;

    let status = client
        .keys()
        .validate()
        .await
        .context("Failed to validate API key")?;

    let mut update = ConfigUpdate::default().api_key(api_key.expose());
    if let Some(url) = &overrides.api_url {
        update = update.backend_url(url.trim());
    }
    if !store.save(update) {
        bail!("Failed to save configuration to {}", store.path().display());
    }

    println!("API key {} saved to {}", api_key, store.path().display());
    println!("Tier:   {}", status.tier);
    println!("Quota:  {}", describe_quota(status.quota_used, status.quota_limit));
    Ok(())
}

async fn status(store: &ConfigStore, overrides: &Overrides) -> Result<()> {
    println!("Config file: {}", store.path().display());
    match store.load() {
        Some(stored) => {
            let key = match stored.api_key.as_deref().map(ApiKey::parse) {
                Some(Ok(key)) => key.masked(),
                Some(Err(_)) => "(malformed)".to_string(),
                None => "(none)".to_string(),
            };
            println!("Stored key:  {}", key);
            println!(
                "Backend:     {}",
                stored.backend_url.as_deref().unwrap_or("(default)")
            );
            if let Some(updated_at) = stored.updated_at {
                println!("Updated:     {}", updated_at.to_rfc3339());
            }
        }
        None => println!("No stored configuration"),
    }

    let settings = startup::resolve(overrides, store.load())?;
    let client = startup::build_client(&settings)?;
    let status = client
        .keys()
        .validate()
        .await
        .context("Failed to validate API key")?;

    println!("Key status:  {}", status.status);
    println!("Tier:        {}", status.tier);
    println!("Quota:       {}", describe_quota(status.quota_used, status.quota_limit));
    Ok(())
}

async fn health(store: &ConfigStore, overrides: &Overrides) -> Result<()> {
    let settings = startup::resolve(overrides, store.load())?;
    let client = startup::build_client(&settings)?;

    let health = client.health().check().await.context("Health check failed")?;
    match &health.version {
        Some(version) => println!("{}: {} (version {})", settings.base_url, health.status, version),
        None => println!("{}: {}", settings.base_url, health.status),
    }

    if !health.is_healthy() {
        bail!("Service reports status {}", health.status);
    }
    Ok(())
}

fn clear(store: &ConfigStore) -> Result<()> {
    if !store.clear() {
        bail!("Failed to remove {}", store.path().display());
    }
    println!("Removed {}", store.path().display());
    Ok(())
}

fn describe_quota(used: u64, limit: Option<u64>) -> String {
    match limit {
        Some(limit) => format!("{} of {} used", used, limit),
        None => format!("{} used (unlimited)", used),
    }
}
