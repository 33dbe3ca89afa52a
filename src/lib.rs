//! # mongo-mcp
//!
//! MCP (Model Context Protocol) server for MongoDB.
//!
//! This crate exposes MongoDB collection, document, index and schema operations as tools
//! for AI agents. It implements the MCP protocol over stdin/stdout using JSON-RPC 2.0.
//!
//! ## Features
//!
//! - **9 tools**: listCollections, find, insertOne, updateOne, deleteOne, createIndex,
//!   dropIndex, indexes, collectionSchema
//! - **Uniform results**: every call returns `{content, isError, _meta}`; tool failures never
//!   surface as transport errors
//! - **Schema inference**: field paths, type unions and required flags from a document sample
//! - **Sample data**: `--seed` recreates `users`, `products` and `orders` to explore with
//! - **Masked credentials**: connection strings are only ever logged with user info hidden
//!
//! ## Usage
//!
//! The server is typically run as an executable and configured in AI tools like Claude Desktop:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "mongodb": {
//!       "command": "/path/to/mongo-mcp",
//!       "args": ["--mongodb-url", "mongodb://localhost:27017/app"]
//!     }
//!   }
//! }
//! ```
//!
//! ## Library Usage
//!
//! For testing or embedding, you can use the library API with the in-memory store:
//!
//! ```no_run
//! use std::sync::Arc;
//! use mongo_mcp::{Connection, McpServer, ToolRegistry};
//!
//! # async fn demo() -> mongo_mcp::Result<()> {
//! let connection = Arc::new(Connection::in_memory(Some("test")));
//! let server = McpServer::new(ToolRegistry::new(connection));
//!
//! // Run the server (reads from stdin, writes to stdout)
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod connection;
pub mod convert;
mod error;
pub mod schema;
pub mod seed;
mod server;
pub mod store;
pub mod tools;

pub use connection::{mask_credentials, Connection, DEFAULT_DATABASE};
pub use convert::{bson_to_json, document_to_json, json_to_document};
pub use error::{rpc_codes, McpError, Result};
pub use schema::{CollectionSchema, FieldSchema};
pub use seed::{seed_sample_data, SeededCollection};
pub use server::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpServer};
pub use store::{DocumentStore, MemoryStore, MongoStore};
pub use tools::{Content, Payload, Tool, ToolDef, ToolRegistry, ToolResult};
