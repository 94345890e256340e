//! CLI entry point for docent

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use docent_channels::ChannelManager;
use docent_core::config::ConfigLoader;
use docent_core::events::TurnEvent;
use docent_core::logging::init_logging;
use docent_engine::{run_turn, ChatEngine, EngineConfig};
use docent_index::{build_index, ChunkingConfig};
use docent_providers::{EmbeddingProvider, LLMProvider, OpenAIClient};

#[derive(Parser)]
#[command(name = "docent")]
#[command(about = "A retrieval-grounded chat assistant over a fixed document collection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat gateway
    Gateway,
    /// Ask a one-shot question from the command line
    Ask {
        /// Question to ask
        #[arg(short, long)]
        message: String,
    },
    /// Show status information
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Create config loader
    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Gateway => {
            run_gateway(&config_loader).await?;
        }
        Commands::Ask { message } => {
            tracing_subscriber::fmt::init();
            run_ask(&config_loader, message).await?;
        }
        Commands::Status => {
            run_status(&config_loader)?;
        }
    }

    Ok(())
}

/// Run the gateway until interrupted
async fn run_gateway(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;
    let _guard = init_logging(&config.logging);

    info!("Starting docent gateway");
    let manager = ChannelManager::new(config);
    manager.initialize().await?;
    manager.start_all().await?;

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");
    manager.stop_all().await?;

    Ok(())
}

/// Answer a single question on stdout, streaming tokens as they arrive
async fn run_ask(loader: &ConfigLoader, message: String) -> Result<()> {
    let config = loader.load()?;

    let api_key = if config.providers.openai.api_key.is_empty() {
        None
    } else {
        Some(config.providers.openai.api_key.clone())
    };
    let client = Arc::new(OpenAIClient::new(
        api_key,
        config.providers.openai.api_base.clone(),
        config.assistant.defaults.model.clone(),
        config.assistant.defaults.embed_model.clone(),
    ));

    eprintln!("{}", style("Building knowledge index...").dim());
    let chunking = ChunkingConfig {
        chunk_size: config.knowledge.chunk_size,
        chunk_overlap: config.knowledge.chunk_overlap,
    };
    let index = build_index(client.as_ref(), &config.knowledge.dir, chunking)
        .await
        .map_err(|e| docent_core::Error::Index(e.to_string()))?;

    let provider: Arc<dyn LLMProvider> = client.clone();
    let embedder: Arc<dyn EmbeddingProvider> = client.clone();
    let engine = Arc::new(ChatEngine::new(
        provider,
        embedder,
        index,
        EngineConfig::from(&config.assistant.defaults),
    ));

    let docs_dir = PathBuf::from(&config.knowledge.dir);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let turn = async move {
        let result = run_turn(engine, docs_dir, message, &tx).await;
        drop(tx);
        result
    };

    let print = async {
        use std::io::Write;
        while let Some(event) = rx.recv().await {
            match event {
                TurnEvent::Delta { text } => {
                    print!("{}", text);
                    let _ = std::io::stdout().flush();
                }
                TurnEvent::Completed { .. } => println!(),
                TurnEvent::Sources { message } => {
                    println!("{}", message.content.trim_end());
                    for attachment in &message.attachments {
                        println!("  {} {}", style("[preview]").cyan(), attachment.path);
                    }
                }
            }
        }
    };

    let (result, ()) = tokio::join!(turn, print);
    result?;

    Ok(())
}

/// Print configuration and corpus status
fn run_status(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;

    println!("{}", style("docent status").bold().cyan());
    println!("Config directory: {}", loader.config_dir().display());
    println!("Model: {}", config.assistant.defaults.model);
    println!("Embedding model: {}", config.assistant.defaults.embed_model);
    println!(
        "Retrieval depth: {} passages per query",
        config.assistant.defaults.top_k
    );

    let docs_dir = PathBuf::from(&config.knowledge.dir);
    let file_count = std::fs::read_dir(&docs_dir)
        .map(|entries| entries.flatten().filter(|e| e.path().is_file()).count())
        .ok();
    match file_count {
        Some(count) => println!("Documents: {} files under {}", count, docs_dir.display()),
        None => println!(
            "Documents: {} {}",
            docs_dir.display(),
            style("(unreadable)").red()
        ),
    }

    let credentials = if config.auth.username.is_empty() || config.auth.password.is_empty() {
        style("not configured").red().to_string()
    } else {
        style("configured").green().to_string()
    };
    println!("Credentials: {}", credentials);

    if config.gateway.enabled {
        println!(
            "Gateway: ws://{}:{}",
            config.gateway.host, config.gateway.port
        );
    } else {
        println!("Gateway: {}", style("disabled").yellow());
    }

    Ok(())
}
