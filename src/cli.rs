use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ClientConfig;
use crate::error::ChatError;

#[derive(Parser)]
#[command(name = "remo-chat")]
#[command(version)]
#[command(about = "Terminal chat front-end that streams responses over a WebSocket")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server host (overrides the config file)
    #[arg(long)]
    pub host: Option<String>,

    /// Server port (overrides the config file)
    #[arg(long)]
    pub port: Option<u16>,

    /// TOML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Write an HTML transcript of the conversation here on exit
    #[arg(long)]
    pub html: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run the local echo server that streams replies word by word
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

impl Args {
    /// Layer CLI flags over the config file (if any) over defaults.
    pub fn resolve_config(&self) -> Result<ClientConfig, ChatError> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.no_color {
            config.color = false;
        }
        Ok(config)
    }
}
