use clap::Parser;
use colored::*;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use remo_chat::cli::{Args, Command};
use remo_chat::render::{render_document, TerminalRenderer};
use remo_chat::{client, server, transport, ChatClient, ChatError};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn alert(text: &str) {
    eprintln!("\n{}", format!("  {}  ", text).white().on_red().bold());
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    if let Some(Command::Serve { port }) = &args.command {
        server::serve(*port).await?;
        return Ok(());
    }

    let config = args.resolve_config()?;
    if !config.color {
        colored::control::set_override(false);
    }

    let ws = match transport::connect(&config.endpoint()).await {
        Ok(ws) => ws,
        Err(e) => {
            alert(&format!("Cannot connect to {}: {}", config.endpoint(), e));
            std::process::exit(1);
        }
    };

    let mut chat = ChatClient::new(TerminalRenderer::new(std::io::stdout(), &config));
    let result = client::run(&mut chat, ws, BufReader::new(tokio::io::stdin())).await;
    chat.finish()?;

    if let Some(path) = &args.html {
        std::fs::write(path, render_document(chat.conversation()))?;
    }

    match result {
        Ok(()) => Ok(()),
        Err(ChatError::ConnectionClosed) => {
            alert(&ChatError::ConnectionClosed.to_string());
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
