//! Error types for the MCP server.
//!
//! Maps MongoDB driver errors to MCP-friendly error responses.

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use serde::{Deserialize, Serialize};

/// Server error code for duplicate keys on unique indexes.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// MCP server errors.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum McpError {
    /// The database rejected or failed an operation.
    #[error("database error ({code}): {message}")]
    Operation {
        /// Stable upper-snake error code
        code: String,
        /// Human-readable error message
        message: String,
    },

    /// The database could not be reached at startup.
    ///
    /// `target` is always the credential-masked connection string.
    #[error("failed to connect to {target}: {message}")]
    Connection {
        /// Masked connection target
        target: String,
        /// Human-readable error message
        message: String,
    },

    /// Unknown tool requested.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArg(String),

    /// Invalid argument value.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArg {
        /// Argument name
        name: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// JSON-RPC protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Shorthand for an [`McpError::InvalidArg`].
    pub fn invalid_arg(name: impl Into<String>, reason: impl Into<String>) -> Self {
        McpError::InvalidArg {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`McpError::Operation`].
    pub fn operation(code: impl Into<String>, message: impl Into<String>) -> Self {
        McpError::Operation {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Stable tag naming the error class, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            McpError::MissingArg(_) | McpError::InvalidArg { .. } => "validation",
            McpError::Operation { .. } => "operation",
            McpError::Connection { .. } => "connection",
            McpError::UnknownTool(_) => "unknown_tool",
            McpError::Protocol(_) => "protocol",
            McpError::Io(_) => "io",
            McpError::Internal(_) => "internal",
        }
    }
}

impl From<MongoError> for McpError {
    fn from(err: MongoError) -> Self {
        let code = match err.kind.as_ref() {
            ErrorKind::Command(cmd) => upper_snake(&cmd.code_name),
            ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY_CODE => {
                "DUPLICATE_KEY".to_string()
            }
            ErrorKind::Write(WriteFailure::WriteError(we)) => we
                .code_name
                .as_deref()
                .map(upper_snake)
                .unwrap_or_else(|| "WRITE_ERROR".to_string()),
            ErrorKind::Write(_) => "WRITE_CONCERN_ERROR".to_string(),
            ErrorKind::Authentication { .. } => "AUTHENTICATION_FAILED".to_string(),
            ErrorKind::ServerSelection { .. } => "SERVER_SELECTION".to_string(),
            ErrorKind::InvalidArgument { .. } => "INVALID_ARGUMENT".to_string(),
            ErrorKind::Io(_) => "IO_ERROR".to_string(),
            ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
                "SERIALIZATION_ERROR".to_string()
            }
            _ => "DATABASE_ERROR".to_string(),
        };

        McpError::Operation {
            code,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for McpError {
    fn from(err: std::io::Error) -> Self {
        McpError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        McpError::Protocol(format!("JSON error: {}", err))
    }
}

/// Turn a server code name such as `IndexNotFound` into `INDEX_NOT_FOUND`.
fn upper_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        out.push(c.to_ascii_uppercase());
    }
    if out.is_empty() {
        "DATABASE_ERROR".to_string()
    } else {
        out
    }
}

/// JSON-RPC error codes.
pub mod rpc_codes {
    /// Parse error - Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl McpError {
    /// Convert to JSON-RPC error code.
    pub fn rpc_code(&self) -> i32 {
        match self {
            McpError::UnknownTool(_) => rpc_codes::METHOD_NOT_FOUND,
            McpError::MissingArg(_) | McpError::InvalidArg { .. } => rpc_codes::INVALID_PARAMS,
            McpError::Protocol(_) => rpc_codes::INVALID_REQUEST,
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;
