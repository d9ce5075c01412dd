//! mtchat: conversational terminal client for the entity API.

mod command;
mod helper;
mod render;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use mtchat_application::ReloadOnExpiry;
use mtchat_core::notice::Notifier;
use mtchat_core::session::TokenStore;
use mtchat_infrastructure::config_service::load_config;
use mtchat_infrastructure::paths::MtchatPaths;
use mtchat_infrastructure::storage::MemoryTokenStore;
use mtchat_infrastructure::telemetry::{DEFAULT_CLIENT_FILTER, init_with_activity};
use mtchat_infrastructure::{ApiGateway, RemoteEntityApi};
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use crate::helper::CliHelper;
use crate::session::{Flow, Repl, Session, TerminalNotifier};

#[derive(Parser, Debug)]
#[command(name = "mtchat", version, about = "Browse entities and contact their owners")]
struct Args {
    /// Remote API base URL, overriding config and environment.
    #[arg(long)]
    api_url: Option<String>,

    /// Path to config.toml.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut activity = init_with_activity(DEFAULT_CLIENT_FILTER);
    let args = Args::parse();

    let mut config = load_config(args.config).context("failed to load configuration")?;
    if let Some(url) = args.api_url {
        config.api_base_url = url;
    }

    // ===== Backend Initialization =====
    let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier);
    let (expired_tx, mut expired_rx) = mpsc::unbounded_channel::<()>();
    let expiry = ReloadOnExpiry::new(Arc::clone(&notifier), move || {
        let _ = expired_tx.send(());
    });
    let gateway = ApiGateway::new(&config, Arc::clone(&tokens), Arc::new(expiry))
        .context("failed to build API gateway")?;
    let api = Arc::new(RemoteEntityApi::new(gateway, config.tenant_id.clone()));

    let mut session = Session::new(config, api, tokens, notifier);
    session.restore().await;

    // ===== REPL Setup =====
    let mut rl: Repl = Repl::new()?;
    rl.set_helper(Some(CliHelper::new()));
    let history = MtchatPaths::history_file().ok();
    if let Some(path) = &history {
        let _ = rl.load_history(path);
    }

    println!("{}", "=== mtchat ===".bright_magenta().bold());
    println!(
        "{}",
        "Type '/login' to sign in, '/help' for commands, or 'quit' to exit.".bright_black()
    );
    println!();

    // ===== Main REPL Loop =====
    loop {
        while let Ok(event) = activity.try_recv() {
            session.record_activity(event);
        }
        if expired_rx.try_recv().is_ok() {
            while expired_rx.try_recv().is_ok() {}
            session.on_session_expired().await;
        }

        match rl.readline(&session.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);
                if session.handle(trimmed, &mut rl).await == Flow::Quit {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    if let Some(path) = &history {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        let _ = rl.save_history(path);
    }
    Ok(())
}
