//! todobot - conversational task manager
//!
//! CLI entry point: runs the bot loop, or takes one-shot backup and
//! cleanup actions.

use clap::Parser;
use eyre::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use todobot::cli::{Cli, Command};
use todobot::config::Config;
use todobot::transport::{ConsoleTransport, Transport};
use todobot::{BackupManager, Dispatcher, Store};

/// Chat id used for the single console session
const CONSOLE_CHAT_ID: i64 = 1;

fn setup_logging(verbose: bool) -> Result<()> {
    // stdout belongs to the console transport; log to stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    match cli.command {
        None | Some(Command::Run) => run_bot(&config).await,
        Some(Command::Backup) => cmd_backup(&config),
        Some(Command::Cleanup { keep }) => cmd_cleanup(&config, keep),
    }
}

/// Take one backup now
fn cmd_backup(config: &Config) -> Result<()> {
    let manager = BackupManager::new(&config.storage.database_path, &config.backup)?;
    let path = manager.create_backup()?;
    println!("Backup written to {}", path.display());
    Ok(())
}

/// Prune old backups
fn cmd_cleanup(config: &Config, keep: Option<usize>) -> Result<()> {
    let manager = BackupManager::new(&config.storage.database_path, &config.backup)?;
    let removed = manager.cleanup_old_backups(keep.unwrap_or(config.backup.keep))?;
    println!("Removed {} old backup(s)", removed);
    Ok(())
}

/// Run the event loop with the backup scheduler alongside
async fn run_bot(config: &Config) -> Result<()> {
    if std::env::var(&config.bot.token_env).is_err() {
        warn!(
            "{} not set; no chat platform configured, serving the console only",
            config.bot.token_env
        );
    }

    let store = Store::open(&config.storage.database_path).context("Failed to open database")?;
    info!(path = %config.storage.database_path.display(), "Database ready");

    let dispatcher = Dispatcher::new(store, config.ui.page_size);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let backup_manager = BackupManager::new(&config.storage.database_path, &config.backup)?;
    let backup_handle = tokio::spawn(backup_manager.run(shutdown_rx));
    info!("Backup scheduler spawned");

    let mut transport = ConsoleTransport::new(CONSOLE_CHAT_ID);
    info!("Ready. Type /start to begin, Ctrl+C to stop.");

    loop {
        tokio::select! {
            event = transport.next_event() => {
                match event? {
                    Some(incoming) => {
                        if let Some(reply) = dispatcher.handle(&incoming) {
                            transport.send(incoming.sender.chat_id, &reply).await?;
                        }
                    }
                    None => {
                        info!("Input exhausted");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }
        }
    }

    info!("Shutting down...");
    let _ = shutdown_tx.send(true);
    let _ = backup_handle.await;

    Ok(())
}
