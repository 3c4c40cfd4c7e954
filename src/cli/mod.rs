pub mod chat;
pub mod config;
pub mod serve;

use clap::{Parser, Subcommand};

/// A3S Chat - Streaming chat sessions for LLM providers
#[derive(Debug, Parser)]
#[command(name = "a3s-chat", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host address to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one chat turn locally and print each chunk as a JSON line
    Chat {
        /// User message
        #[arg(long, short)]
        message: String,

        /// Provider family (defaults to the first configured provider)
        #[arg(long)]
        provider: Option<String>,

        /// Model name
        #[arg(long)]
        model: Option<String>,

        /// Instruction template, may use {{question}}
        #[arg(long)]
        template: Option<String>,

        /// Conversation id
        #[arg(long, default_value = "cli")]
        conversation: String,
    },

    /// Print the effective configuration as TOML
    Config,
}
