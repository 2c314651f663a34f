#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use motherhive::engine::{ChatEngine, TurnRequest};
use motherhive::{Config, gateway};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "motherhive", about = "Multi-persona AI teammate orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Send one message to a persona and print the reply; with no message,
    /// start an interactive session.
    Chat {
        /// Persona name (e.g. dexter, hunter, soshie).
        persona: String,
        /// The message text. Omit to chat interactively.
        message: Vec<String>,
        #[arg(long, default_value = "local")]
        user: String,
        /// Treat calendar/mail authorization as active.
        #[arg(long)]
        authorized: bool,
    },
    /// List the available personas.
    Personas,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = Config::load_or_init()?;

    match cli.command {
        Command::Serve { host, port } => {
            let engine = Arc::new(ChatEngine::from_config(&config).await?);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            gateway::run_gateway(&host, port, engine).await
        }
        Command::Chat {
            persona,
            message,
            user,
            authorized,
        } => {
            let engine = ChatEngine::from_config(&config).await?;
            if message.is_empty() {
                return repl(&engine, &persona, &user, authorized).await;
            }
            let outcome = engine
                .handle_turn(TurnRequest {
                    user,
                    persona,
                    message: message.join(" "),
                    authorized,
                })
                .await?;
            println!("{}", outcome.reply);
            Ok(())
        }
        Command::Personas => {
            let engine = ChatEngine::from_config(&config).await?;
            for persona in engine.personas().all() {
                let domain = persona.domain.to_string();
                println!("{:<8} {:<14} {}", persona.name, domain, persona.role);
            }
            Ok(())
        }
    }
}

/// Line-based interactive session. Empty line or EOF ends it.
async fn repl(engine: &ChatEngine, persona: &str, user: &str, authorized: bool) -> Result<()> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() || message == "exit" {
            break;
        }

        let outcome = engine
            .handle_turn(TurnRequest {
                user: user.to_string(),
                persona: persona.to_string(),
                message: message.to_string(),
                authorized,
            })
            .await?;
        println!("{}\n", outcome.reply);
    }
    Ok(())
}
