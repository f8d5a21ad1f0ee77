//! Album Messaging Node
//!
//! Hosts the Album messaging service: login, session tokens, and end-to-end
//! encrypted direct messages between registered users.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

use album_core::{AlbumService, CoreConfig, CoreError};

/// Album Messaging Node
///
/// Authenticated, end-to-end encrypted direct messaging.
#[derive(Parser, Debug)]
#[command(name = "album-node")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON configuration file (missing fields take defaults)
    #[arg(short, long, env = "ALBUM_CONFIG")]
    config: Option<PathBuf>,

    /// Path to data directory
    #[arg(short, long, env = "ALBUM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Keep envelopes in memory only
    #[arg(long, env = "ALBUM_IN_MEMORY", default_value = "false")]
    in_memory: bool,

    /// Session token lifetime in seconds
    #[arg(long, env = "ALBUM_TOKEN_TTL")]
    token_ttl: Option<u64>,

    /// Disable token revocation
    #[arg(long, env = "ALBUM_DISABLE_REVOCATION", default_value = "false")]
    disable_revocation: bool,

    /// Seconds between expired token sweeps
    #[arg(long, env = "ALBUM_PURGE_INTERVAL", default_value = "300")]
    purge_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ALBUM_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (plain, json)
    #[arg(long, env = "ALBUM_LOG_FORMAT", default_value = "plain")]
    log_format: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the service until interrupted (default)
    Serve,
    /// Run a two-user exchange against an in-memory service
    Demo,
    /// Print the effective configuration as JSON
    PrintConfig,
}

fn setup_logging(log_level: &str, log_format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("sled=warn".parse()?);

    match log_format.to_lowercase().as_str() {
        "json" => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
        _ => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
    }

    Ok(())
}

/// Build service configuration from the config file and CLI overrides.
fn build_config(args: &Args) -> Result<CoreConfig> {
    let mut config = match &args.config {
        Some(path) => CoreConfig::from_json_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => CoreConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if args.in_memory {
        config.storage.in_memory = true;
    }
    if let Some(ttl) = args.token_ttl {
        config.auth.ttl_secs = ttl;
    }
    if args.disable_revocation {
        config.auth.revocation_enabled = false;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn serve(config: CoreConfig, purge_interval: Duration) -> Result<()> {
    if !config.storage.in_memory && !config.storage.data_dir.exists() {
        std::fs::create_dir_all(&config.storage.data_dir)
            .context("Failed to create data directory")?;
        info!(path = %config.storage.data_dir.display(), "Created data directory");
    }

    info!("Initializing Album service...");
    let service = AlbumService::new(config).context("Failed to initialize Album service")?;
    info!(
        token_ttl_secs = service.config().auth.ttl_secs,
        revocation = service.config().auth.revocation_enabled,
        "Album service ready"
    );

    let mut sweep = tokio::time::interval(purge_interval);
    sweep.tick().await;

    info!("Press Ctrl+C to stop the node");
    loop {
        tokio::select! {
            _ = sweep.tick() => {
                if let Err(e) = service.purge_expired_tokens().await {
                    warn!(error = %e, "Token sweep failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    info!("Shutting down Album node...");
    service.flush().await.context("Failed to flush envelope store")?;
    info!("Album node stopped");
    Ok(())
}

/// Register two users and pass a message between them.
async fn demo(mut config: CoreConfig) -> Result<()> {
    config.storage.in_memory = true;
    let service = AlbumService::new(config).context("Failed to initialize Album service")?;

    service.register_user("alice", b"correct horse").await?;
    service.register_user("bob", b"battery staple").await?;

    match service.login("alice", b"wrong").await {
        Err(CoreError::InvalidCredential) => info!("Wrong secret rejected"),
        other => anyhow::bail!("unexpected login outcome: {:?}", other.map(|_| ())),
    }

    let alice = service.login("alice", b"correct horse").await?;
    let envelope = service
        .send_message(&alice, "bob", b"hello from alice")
        .await?;
    info!(
        envelope = %envelope.id(),
        ciphertext_len = envelope.ciphertext_len(),
        "Alice sent a message"
    );

    let bob = service.login("bob", b"battery staple").await?;
    for envelope in service.receive_messages(&bob).await? {
        let plaintext = service.open_message(&bob, &envelope).await?;
        info!(
            from = %envelope.sender(),
            text = %String::from_utf8_lossy(&plaintext),
            "Bob opened a message"
        );
    }

    service.revoke_token(&alice).await?;
    match service.send_message(&alice, "bob", b"again").await {
        Err(CoreError::TokenRevoked) => info!("Revoked token rejected"),
        other => anyhow::bail!("unexpected send outcome: {:?}", other.map(|_| ())),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Serve);

    if command == Command::PrintConfig {
        let config = build_config(&args)?;
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    setup_logging(&args.log_level, &args.log_format)?;

    let config = build_config(&args)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.storage.data_dir.display(),
        in_memory = config.storage.in_memory,
        ?command,
        "Starting Album node"
    );

    match command {
        Command::Serve => serve(config, Duration::from_secs(args.purge_interval.max(1))).await,
        Command::Demo => demo(config).await,
        Command::PrintConfig => Ok(()),
    }
}
