//! Chatstore command line
//!
//! Inspects the chat schema, validates a configuration file and runs a
//! round trip against the in-memory driver.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chatstore::ChatStore;
use chatstore_adapter::{chat_schema, CreateOptions, FindManyOptions};
use chatstore_common::config::{LoggingConfig, StoreConfig};
use chatstore_common::{record, SortBy, Where};

#[derive(Parser, Debug)]
#[command(name = "chatstore")]
#[command(about = "Schema-driven chat record store", long_about = None)]
struct Args {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "CHATSTORE_CONFIG", default_value = "chatstore.toml")]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the chat schema registry as JSON
    Schema,
    /// Load the configuration and build an adapter from it
    Check,
    /// Create, read, update and delete a chat in memory
    Smoke,
}

fn init_logging(logging: &LoggingConfig, level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(&logging.level)));

    if logging.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

async fn load_config(path: &Path) -> anyhow::Result<StoreConfig> {
    if path.exists() {
        Ok(StoreConfig::load(path).await?)
    } else {
        Ok(StoreConfig::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config).await?;

    init_logging(&config.logging, args.log_level.as_deref());
    info!("Chatstore v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&chat_schema())?);
        }
        Command::Check => {
            let store = ChatStore::in_memory(config)?;
            info!(
                adapter = %store.config().adapter.adapter_id,
                models = store.adapter().schema().len(),
                "Configuration is valid"
            );
        }
        Command::Smoke => smoke(config).await?,
    }

    Ok(())
}

async fn smoke(config: StoreConfig) -> anyhow::Result<()> {
    let store = ChatStore::in_memory(config)?;
    let adapter = store.adapter();

    let user = adapter
        .create(
            "user",
            record! { "email" => "smoke@example.com" },
            CreateOptions::default(),
        )
        .await?;
    let user_id = user
        .get("id")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("created user has no id"))?;
    println!("{}", serde_json::to_string_pretty(&user)?);

    let chat = adapter
        .create(
            "chat",
            record! { "title" => "Smoke test", "userId" => user_id.clone() },
            CreateOptions::default(),
        )
        .await?;
    let chat_id = chat
        .get("id")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("created chat has no id"))?;

    adapter
        .update(
            "chat",
            &[Where::eq("id", chat_id.clone())],
            record! { "visibility" => "public" },
        )
        .await?;

    let chats = adapter
        .find_many(
            "chat",
            FindManyOptions {
                where_clause: vec![Where::eq("userId", user_id)],
                sort_by: Some(SortBy::desc("createdAt")),
                ..FindManyOptions::default()
            },
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&chats)?);

    adapter.delete("chat", &[Where::eq("id", chat_id)]).await?;
    info!(remaining = adapter.count("chat", &[]).await?, "Smoke test complete");

    Ok(())
}
