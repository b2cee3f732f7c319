mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gita_match::config::GitaConfig;

#[derive(Parser)]
#[command(name = "gita-match", version, about = "Match how you feel to a verse of the Gita")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio, or HTTP when `server.transport = "http"`)
    Serve,
    /// Match one statement and print the verse
    Match {
        /// What the user is feeling or facing
        query: String,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect assets and report problems
    Doctor,
    /// Embed every verse with the configured provider and write the embeddings file
    EmbedCorpus,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = GitaConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => match config.server.transport.as_str() {
            "http" => server::serve_http(config).await?,
            _ => server::serve_stdio(config).await?,
        },
        Command::Match { query, json } => {
            cli::match_cmd::match_query(&config, &query, json).await?;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config)?;
        }
        Command::EmbedCorpus => {
            cli::embed_corpus::embed_corpus(&config).await?;
        }
    }

    Ok(())
}
