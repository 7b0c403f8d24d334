//! CLI binary for kunna.

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kunna::audio::playback::CpalSink;
use kunna::handlers::meeting::HttpTranscriber;
use kunna::speech::HttpSynthesizer;
use kunna::{Assistant, AssistantConfig, ChatServer, Notification, Notifier, Speaker, VoiceInput};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Kunna: a natural-language personal assistant.
#[derive(Parser)]
#[command(name = "kunna", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Interactive chat session (default).
    Chat {
        /// Take commands from the microphone and speak every reply.
        #[arg(long)]
        voice: bool,
    },

    /// Answer a single request and exit.
    Ask {
        /// What to ask, e.g. "remind me in 5 minutes to stretch".
        #[arg(required = true, num_args = 1..)]
        utterance: Vec<String>,

        /// Also print the routed action as JSON.
        #[arg(long)]
        show_route: bool,
    },

    /// Serve the HTTP chat API.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:8765")]
        addr: SocketAddr,
    },

    /// Write a default config file and print its path.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = kunna::logging::init(&kunna::paths::logs_dir());

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Chat { voice: false });

    if let Command::InitConfig { force } = command {
        return init_config(cli.config, force);
    }

    let config = AssistantConfig::load(cli.config.as_deref()).context("failed to load config")?;
    let assistant = Assistant::from_config(&config).context("failed to start assistant")?;

    match command {
        Command::Chat { voice } => run_chat(assistant, &config, voice).await,
        Command::Ask {
            utterance,
            show_route,
        } => run_ask(assistant, &utterance.join(" "), show_route).await,
        Command::Serve { addr } => run_serve(assistant, addr).await,
        Command::InitConfig { .. } => Ok(()),
    }
}

async fn run_chat(
    assistant: Assistant,
    config: &AssistantConfig,
    voice: bool,
) -> anyhow::Result<()> {
    let speaker = if voice || config.voice.speak_replies {
        Some(Speaker::new(
            Arc::new(HttpSynthesizer::new(&config.voice)?),
            Arc::new(CpalSink::new(config.voice.output_device.clone())),
        ))
    } else {
        None
    };
    let voice_input = if voice {
        Some(VoiceInput::new(
            Arc::new(HttpTranscriber::new(&config.meeting)?),
            &config.meeting,
            &config.voice,
        ))
    } else {
        None
    };

    println!("Kunna v{}", env!("CARGO_PKG_VERSION"));
    if voice_input.is_some() {
        println!("Speak a request. Say 'stop' to cut a reply short, 'exit' to quit.");
    } else {
        println!("Type a request, 'stop' to silence a spoken reply, or 'exit' to quit.");
    }

    spawn_notification_printer(assistant.notifier());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let utterance = match &voice_input {
            Some(input) => {
                println!("\nListening...");
                match input.listen().await.context("voice input failed")? {
                    Some(text) => {
                        println!("You: {text}");
                        text
                    }
                    None => {
                        println!("No command heard.");
                        continue;
                    }
                }
            }
            None => {
                print!("\nYou: ");
                std::io::stdout().flush()?;
                let Some(line) = lines.next_line().await? else {
                    break;
                };
                line
            }
        };
        let utterance = utterance.trim();
        if utterance.is_empty() {
            continue;
        }
        match utterance.to_lowercase().as_str() {
            "exit" | "quit" => break,
            "stop" => {
                if speaker.as_ref().is_some_and(Speaker::stop) {
                    println!("Playback stopped.");
                } else {
                    println!("Nothing is playing.");
                }
                continue;
            }
            _ => {}
        }

        let turn = assistant.respond(utterance).await;
        println!("Kunna: {}", turn.response);
        if let Some(speaker) = &speaker
            && let Err(e) = speaker.speak(&turn.response).await
        {
            warn!("cannot speak reply: {e}");
        }
    }
    println!("Goodbye!");
    if let Some(speaker) = &speaker {
        speaker.stop();
        if let Err(e) = speaker.speak_and_wait("Shutting down. Goodbye!").await {
            warn!("cannot speak farewell: {e}");
        }
    }
    Ok(())
}

fn spawn_notification_printer(notifier: &Notifier) {
    let mut rx = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notification) => {
                    println!();
                    print_notification(&notification);
                    print!("You: ");
                    let _ = std::io::stdout().flush();
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "notifications dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn print_notification(notification: &Notification) {
    println!("[{}] {}", notification.at.format("%H:%M"), notification.message);
}

async fn run_ask(assistant: Assistant, utterance: &str, show_route: bool) -> anyhow::Result<()> {
    let turn = assistant.respond(utterance).await;
    if show_route {
        println!("{}", serde_json::to_string_pretty(&turn.descriptor)?);
    }
    println!("{}", turn.response);

    if assistant.has_background_work() {
        eprintln!(
            "Reminders, price alerts and recordings only run while kunna is running. \
             Waiting for them here; press Ctrl-C to quit, or use `kunna chat` or `kunna serve` \
             to keep working alongside them."
        );
        tokio::select! {
            () = assistant.drain_background_work(|n| print_notification(&n)) => {}
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for Ctrl-C")?;
                warn!("exiting with background work still pending");
            }
        }
    }
    Ok(())
}

async fn run_serve(assistant: Assistant, addr: SocketAddr) -> anyhow::Result<()> {
    let server = ChatServer::start(assistant, addr).await?;
    println!("Listening on http://{}", server.addr());

    tokio::select! {
        () = server.wait() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("shutting down");
        }
    }
    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(kunna::paths::config_file);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    AssistantConfig::default().save_to_file(&path)?;
    println!("{}", path.display());
    Ok(())
}
