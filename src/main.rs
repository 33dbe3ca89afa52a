//! MCP server for MongoDB.
//!
//! Run with `mongo-mcp --mongodb-url mongodb://host/db` or `mongo-mcp --memory` for an
//! in-process store.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mongo_mcp::{seed_sample_data, Connection, McpServer, ToolRegistry, DEFAULT_DATABASE};
use tracing_subscriber::EnvFilter;

/// MCP server for MongoDB.
///
/// Exposes MongoDB operations as MCP tools for AI agents.
/// Communicates via JSON-RPC 2.0 over stdin/stdout.
#[derive(Parser)]
#[command(name = "mongo-mcp")]
#[command(version, about, long_about = None)]
struct Args {
    /// MongoDB connection string.
    #[arg(
        long,
        env = "MONGODB_URL",
        value_name = "URL",
        default_value = "mongodb://localhost:27017/admin",
        hide_env_values = true
    )]
    mongodb_url: String,

    /// Database to use instead of the one named in the URL.
    #[arg(long, env = "MONGODB_DB", value_name = "NAME")]
    mongodb_db: Option<String>,

    /// Use an in-memory document store instead of a server.
    /// Data is not persisted.
    #[arg(long)]
    memory: bool,

    /// Drop and recreate the sample `users`, `products` and `orders`
    /// collections before serving.
    #[arg(long)]
    seed: bool,

    /// Per-call deadline in seconds. 0 disables it.
    #[arg(long, env = "MCP_CALL_TIMEOUT_SECS", value_name = "SECS", default_value_t = 30)]
    call_timeout_secs: u64,

    /// Enable debug logging to stderr.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Set up logging; stdout belongs to the protocol.
    let default_level = if args.verbose { "mongo_mcp=debug" } else { "mongo_mcp=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Open the connection
    let connection = if args.memory {
        Connection::in_memory(Some(args.mongodb_db.as_deref().unwrap_or(DEFAULT_DATABASE)))
    } else {
        match Connection::connect(&args.mongodb_url, args.mongodb_db.as_deref()).await {
            Ok(connection) => connection,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    };
    let connection = Arc::new(connection);

    if args.seed {
        match seed_sample_data(connection.store().as_ref()).await {
            Ok(seeded) => {
                for collection in seeded {
                    tracing::info!(
                        collection = collection.name,
                        documents = collection.documents,
                        indexes = collection.indexes,
                        "Seeded collection"
                    );
                }
            }
            Err(e) => {
                eprintln!("Error: Failed to seed sample data: {}", e);
                connection.close().await;
                std::process::exit(1);
            }
        }
    }

    // Create registry and server
    let call_timeout = (args.call_timeout_secs > 0).then(|| Duration::from_secs(args.call_timeout_secs));
    let registry = ToolRegistry::new(Arc::clone(&connection)).with_call_timeout(call_timeout);
    let server = McpServer::new(registry);

    // Run the server until stdin closes or we are interrupted
    let outcome = tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(())
        }
    };

    connection.close().await;

    if let Err(e) = outcome {
        eprintln!("Error: Server error: {}", e);
        std::process::exit(1);
    }
}
