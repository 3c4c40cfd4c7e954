use clap::Parser;
use tracing_subscriber::EnvFilter;

use a3s_chat::cli::{Cli, Commands};
use a3s_chat::config::ChatConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Configuration is read once and never changes afterwards
    let config = ChatConfig::load()?;

    match cli.command {
        Commands::Serve { host, port } => {
            a3s_chat::cli::serve::execute(config, host, port).await?;
        }
        Commands::Chat {
            message,
            provider,
            model,
            template,
            conversation,
        } => {
            a3s_chat::cli::chat::execute(config, &message, provider, model, template, &conversation)
                .await?;
        }
        Commands::Config => {
            a3s_chat::cli::config::execute(&config)?;
        }
    }

    Ok(())
}
