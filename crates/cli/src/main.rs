use anyhow::Context;
use chatter::dispatcher::Intent;
use clap::{Parser, Subcommand};
use input::InputMode;
use std::sync::Arc;
use tokio::sync::mpsc;

mod input;
mod render;

#[derive(Parser)]
#[command(name = "chatter")]
#[command(about = "Chatter CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: CHATTER_CONFIG_PATH or ~/.chatter/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Join the chat room (interactive). The first line is your nickname; later lines are messages.
    Chat {
        /// Config file path (default: CHATTER_CONFIG_PATH or ~/.chatter/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Page origin of the chat server, e.g. https://chat.example.org (default from config or CHATTER_ORIGIN)
        #[arg(long, value_name = "URL")]
        origin: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("chatter {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config, origin }) => {
            if let Err(e) = run_chat(config, origin).await {
                log::error!("chat failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(chatter::config::default_config_path);
    let dir = chatter::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    origin: Option<String>,
) -> anyhow::Result<()> {
    let (config, _) = chatter::config::load_config(config_path)?;
    let origin = origin
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .unwrap_or_else(|| chatter::config::resolve_origin(&config));
    let mut handle = chatter::client::spawn(&origin).context("starting chat client")?;
    log::info!("connecting to {}", origin);

    let input = Arc::new(InputMode::default());
    let (quit_tx, mut quit_rx) = mpsc::unbounded_channel::<()>();
    spawn_stdin_adapter(handle.intents.clone(), input.clone(), quit_tx);

    println!("nickname:");
    let mut terminal = render::Terminal::new(config.ui.sound, config.ui.time_format, input);
    loop {
        tokio::select! {
            effect = handle.effects.recv() => {
                let Some(effect) = effect else { break };
                if !terminal.render(effect) {
                    break;
                }
            }
            _ = quit_rx.recv() => break,
        }
    }
    Ok(())
}

/// Read stdin lines on a plain thread: a join intent until the chat view is shown, send intents after.
/// Lines typed while a join is unanswered are dropped with a notice.
fn spawn_stdin_adapter(
    intents: mpsc::UnboundedSender<Intent>,
    input: Arc<InputMode>,
    quit: mpsc::UnboundedSender<()>,
) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            if line.trim().eq_ignore_ascii_case("/quit") {
                break;
            }
            let Some(intent) = input.intent_for(&line) else {
                if !line.trim().is_empty() {
                    eprintln!("still joining, line not sent");
                }
                continue;
            };
            if intents.send(intent).is_err() {
                break;
            }
        }
        let _ = quit.send(());
    });
}
