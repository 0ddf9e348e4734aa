//! CLI entry point for newschat

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use newschat_client::{BackendClient, ChatController};
use newschat_core::config::{Config, ConfigLoader};
use newschat_core::logging::init_logging;
use newschat_core::{FileSessionStore, Message, Sender};

mod tui;

#[derive(Parser)]
#[command(name = "newschat")]
#[command(about = "A terminal client for the newschat session backend")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the interactive chat TUI
    Chat,
    /// Send a single message and print the reply
    Send {
        /// Message to send
        #[arg(short, long)]
        message: String,
    },
    /// Print the stored session's conversation
    History,
    /// Start a fresh session, discarding the current conversation
    Reset,
    /// Show configuration and backend health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };
    let config = config_loader.load()?;

    // The TUI owns the terminal, so its logs go to file only
    let with_stdout = !matches!(cli.command, Commands::Chat);
    let _guard = init_logging(&config.logging, with_stdout);

    match cli.command {
        Commands::Chat => {
            info!("Starting chat TUI");
            tui::run(&config_loader, &config).await?;
        }
        Commands::Send { message } => {
            info!("Sending one-shot message");
            run_send(&config_loader, &config, &message).await?;
        }
        Commands::History => run_history(&config_loader, &config).await?,
        Commands::Reset => run_reset(&config_loader, &config).await?,
        Commands::Status => run_status(&config_loader, &config).await?,
    }

    Ok(())
}

fn build_client(config: &Config) -> BackendClient {
    BackendClient::new(
        config.backend.base_url.clone(),
        Duration::from_secs(config.backend.request_timeout_s),
    )
}

fn build_controller(loader: &ConfigLoader, config: &Config) -> ChatController {
    let store = FileSessionStore::new(loader.config_dir());
    ChatController::new(build_client(config), Box::new(store))
}

fn print_message(message: &Message) {
    let label = match message.sender {
        Sender::User => style("[you]").cyan(),
        Sender::Bot => style("[bot]").green(),
    };
    println!("{} {}", label, message.text);
    for item in &message.context {
        println!("      {} {}", style(&item.title).bold(), style(&item.url).dim());
        if !item.description.is_empty() {
            println!("      {}", style(&item.description).dim());
        }
    }
}

/// Send one message against the stored (or a fresh) session
async fn run_send(loader: &ConfigLoader, config: &Config, message: &str) -> Result<()> {
    let mut controller = build_controller(loader, config);
    controller.initialize().await;

    if controller.session().is_none() {
        anyhow::bail!(
            "No session could be established; is the backend at {} running?",
            config.backend.base_url
        );
    }

    let before = controller.state().messages().len();
    controller.send(message).await;

    let appended = &controller.state().messages()[before..];
    let mut replied = false;
    for entry in appended {
        if entry.sender == Sender::Bot {
            print_message(entry);
            replied = true;
        }
    }
    if !replied {
        println!("{}", style("No reply received; see the logs.").yellow());
    }

    Ok(())
}

/// Print the conversation restored from the stored session
async fn run_history(loader: &ConfigLoader, config: &Config) -> Result<()> {
    let mut controller = build_controller(loader, config);
    controller.initialize().await;

    match controller.session() {
        Some(session) => println!("{} {}\n", style("Session:").bold(), session),
        None => println!("{}\n", style("No session established.").yellow()),
    }

    for message in controller.state().messages() {
        print_message(message);
    }

    Ok(())
}

/// Discard the current conversation and start a fresh session
async fn run_reset(loader: &ConfigLoader, config: &Config) -> Result<()> {
    let mut controller = build_controller(loader, config);
    controller.initialize().await;

    if controller.session().is_none() {
        anyhow::bail!(
            "No session to reset; is the backend at {} running?",
            config.backend.base_url
        );
    }

    let old = controller.session().map(str::to_string);
    controller.reset().await;

    match controller.session() {
        Some(session) if old.as_deref() != Some(session) => {
            println!(
                "{} New session: {}",
                style("✓").green().bold(),
                session
            );
        }
        _ => println!(
            "{} Conversation cleared, but no fresh session was issued; see the logs.",
            style("!").yellow().bold()
        ),
    }

    Ok(())
}

/// Show configuration and backend health
async fn run_status(loader: &ConfigLoader, config: &Config) -> Result<()> {
    println!("{}", style("Newschat Status").bold().cyan());
    println!();

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!("  Backend URL: {}", config.backend.base_url);
    println!("  Request timeout: {}s", config.backend.request_timeout_s);
    println!("  Ping interval: {}s", config.backend.ping_interval_s);
    println!();

    use newschat_core::SessionStore;
    let store = FileSessionStore::new(loader.config_dir());
    println!("{}", style("Session:").bold());
    match store.load() {
        Some(id) => println!("  Stored id: {}", id),
        None => println!("  Stored id: {}", style("none").dim()),
    }
    println!();

    println!("{}", style("Backend:").bold());
    match build_client(config).ping().await {
        Ok(()) => println!("  Health: {}", style("ready").green()),
        Err(e) => println!("  Health: {} ({})", style("not responding").red(), e),
    }

    Ok(())
}
