//! Tool definitions, result envelope and registry.
//!
//! Every tool is a variant of [`Tool`]. The registry maps names to tools,
//! publishes their descriptors, and runs calls against the shared
//! connection. `Tool::execute` is total: failures come back as a
//! [`ToolResult`] with `is_error` set, never as an `Err`.

pub mod collection;
pub mod documents;
pub mod indexes;
pub mod schema;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{McpError, Result};
use crate::store::DocumentStore;

/// A tool definition for the MCP tools/list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool name (e.g., "find")
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonValue,
}

impl ToolDef {
    /// Create a new tool definition.
    pub fn new(name: &str, description: &str, input_schema: JsonValue) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// A block of tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text; structured results are pretty-printed JSON
    Text {
        /// Block text
        text: String,
    },
}

/// What a tool produced on success.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured value, serialized as pretty JSON
    Json(JsonValue),
    /// Human-readable confirmation
    Text(String),
}

/// The uniform envelope returned by every tool call.
///
/// `is_error` decides how `content` must be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Exactly one text block
    pub content: Vec<Content>,
    /// Whether the block carries an error message
    #[serde(rename = "isError")]
    pub is_error: bool,
    /// Auxiliary key/value pairs
    #[serde(rename = "_meta", default)]
    pub meta: Map<String, JsonValue>,
}

impl ToolResult {
    /// Wrap a successful payload.
    pub fn success(payload: Payload) -> Self {
        let text = match payload {
            Payload::Text(text) => text,
            Payload::Json(value) => {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
        };
        Self {
            content: vec![Content::Text { text }],
            is_error: false,
            meta: Map::new(),
        }
    }

    /// Wrap a failure.
    pub fn error(err: &McpError) -> Self {
        Self {
            content: vec![Content::Text {
                text: err.to_string(),
            }],
            is_error: true,
            meta: Map::new(),
        }
    }

    /// Text of the first content block.
    pub fn text(&self) -> &str {
        match self.content.first() {
            Some(Content::Text { text }) => text,
            None => "",
        }
    }

    /// Parse the first content block as JSON.
    pub fn json(&self) -> Option<JsonValue> {
        serde_json::from_str(self.text()).ok()
    }
}

/// The fixed set of tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// `listCollections`
    ListCollections,
    /// `find`
    Find,
    /// `insertOne`
    InsertOne,
    /// `updateOne`
    UpdateOne,
    /// `deleteOne`
    DeleteOne,
    /// `createIndex`
    CreateIndex,
    /// `dropIndex`
    DropIndex,
    /// `indexes`
    ListIndexes,
    /// `collectionSchema`
    CollectionSchema,
}

impl Tool {
    /// Every tool, in publication order.
    pub const ALL: [Tool; 9] = [
        Tool::ListCollections,
        Tool::Find,
        Tool::InsertOne,
        Tool::UpdateOne,
        Tool::DeleteOne,
        Tool::CreateIndex,
        Tool::DropIndex,
        Tool::ListIndexes,
        Tool::CollectionSchema,
    ];

    /// Stable routing name. Never change a published name.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::ListCollections => "listCollections",
            Tool::Find => "find",
            Tool::InsertOne => "insertOne",
            Tool::UpdateOne => "updateOne",
            Tool::DeleteOne => "deleteOne",
            Tool::CreateIndex => "createIndex",
            Tool::DropIndex => "dropIndex",
            Tool::ListIndexes => "indexes",
            Tool::CollectionSchema => "collectionSchema",
        }
    }

    /// Name, description and input schema.
    pub fn definition(&self) -> ToolDef {
        match self {
            Tool::ListCollections => collection::list_collections_def(),
            Tool::Find => documents::find_def(),
            Tool::InsertOne => documents::insert_one_def(),
            Tool::UpdateOne => documents::update_one_def(),
            Tool::DeleteOne => documents::delete_one_def(),
            Tool::CreateIndex => indexes::create_index_def(),
            Tool::DropIndex => indexes::drop_index_def(),
            Tool::ListIndexes => indexes::list_indexes_def(),
            Tool::CollectionSchema => schema::collection_schema_def(),
        }
    }

    async fn run(&self, store: &dyn DocumentStore, args: Map<String, JsonValue>) -> Result<Payload> {
        match self {
            Tool::ListCollections => collection::list_collections(store, args).await,
            Tool::Find => documents::find(store, args).await,
            Tool::InsertOne => documents::insert_one(store, args).await,
            Tool::UpdateOne => documents::update_one(store, args).await,
            Tool::DeleteOne => documents::delete_one(store, args).await,
            Tool::CreateIndex => indexes::create_index(store, args).await,
            Tool::DropIndex => indexes::drop_index(store, args).await,
            Tool::ListIndexes => indexes::list_indexes(store, args).await,
            Tool::CollectionSchema => schema::collection_schema(store, args).await,
        }
    }

    /// Run the tool. Never fails: errors become an `is_error` envelope.
    pub async fn execute(&self, store: &dyn DocumentStore, args: Map<String, JsonValue>) -> ToolResult {
        debug!(tool = self.name(), "Executing tool");
        let outcome = AssertUnwindSafe(self.run(store, args)).catch_unwind().await;
        match outcome {
            Ok(Ok(payload)) => ToolResult::success(payload),
            Ok(Err(err)) => self.handle_error(err),
            Err(_) => self.handle_error(McpError::Internal(format!(
                "tool '{}' panicked",
                self.name()
            ))),
        }
    }

    /// Like [`Tool::execute`], giving up after `deadline`.
    pub async fn execute_within(
        &self,
        store: &dyn DocumentStore,
        args: Map<String, JsonValue>,
        deadline: Duration,
    ) -> ToolResult {
        match tokio::time::timeout(deadline, self.execute(store, args)).await {
            Ok(result) => result,
            Err(_) => self.handle_error(McpError::operation(
                "TIMEOUT",
                format!("{} did not complete within {:?}", self.name(), deadline),
            )),
        }
    }

    fn handle_error(&self, err: McpError) -> ToolResult {
        warn!(tool = self.name(), kind = err.kind(), error = %err, "Tool call failed");
        ToolResult::error(&err)
    }
}

/// Registry of all available tools.
pub struct ToolRegistry {
    connection: Arc<Connection>,
    tools: Vec<Tool>,
    call_timeout: Option<Duration>,
}

impl ToolRegistry {
    /// Create a new registry with all tools registered.
    pub fn new(connection: Arc<Connection>) -> Self {
        let mut registry = Self::empty(connection);
        for tool in Tool::ALL {
            registry.register(tool);
        }
        registry
    }

    /// Create a registry with no tools.
    pub fn empty(connection: Arc<Connection>) -> Self {
        Self {
            connection,
            tools: Vec::new(),
            call_timeout: None,
        }
    }

    /// Bound every call by `timeout`; `None` waits indefinitely.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Register a tool. A tool with the same name is replaced in place.
    pub fn register(&mut self, tool: Tool) {
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(slot) => *slot = tool,
            None => self.tools.push(tool),
        }
    }

    /// Look a tool up by its exact name.
    pub fn resolve(&self, name: &str) -> Result<Tool> {
        self.tools
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))
    }

    /// All registered tools in registration order.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Descriptors for capability discovery, built from the live registry.
    pub fn describe_all(&self) -> Vec<ToolDef> {
        self.tools.iter().map(Tool::definition).collect()
    }

    /// The shared connection.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Resolve `name` and run it.
    ///
    /// The only `Err` is [`McpError::UnknownTool`]; tool failures are
    /// reported inside the returned envelope.
    pub async fn call(&self, name: &str, args: Map<String, JsonValue>) -> Result<ToolResult> {
        let tool = self.resolve(name)?;
        let store = self.connection.store().as_ref();
        Ok(match self.call_timeout {
            Some(deadline) => tool.execute_within(store, args, deadline).await,
            None => tool.execute(store, args).await,
        })
    }
}

/// Helper macro for creating JSON Schema for tool input parameters.
///
/// Each property is `"name": type "description"`, optionally followed by a
/// brace block of extra JSON Schema keywords.
#[macro_export]
macro_rules! schema {
    (object {
        $(required: {
            $($req:literal : $req_ty:ident $req_desc:literal $({ $($req_extra:tt)* })?),* $(,)?
        } $(,)?)?
        $(optional: {
            $($opt:literal : $opt_ty:ident $opt_desc:literal $({ $($opt_extra:tt)* })?),* $(,)?
        } $(,)?)?
    }) => {{
        #[allow(unused_mut)]
        let mut required: Vec<&str> = Vec::new();
        #[allow(unused_mut)]
        let mut props = serde_json::Map::new();
        $($(
            required.push($req);
            props.insert(
                $req.to_string(),
                $crate::schema!(@prop $req_ty $req_desc $({ $($req_extra)* })?),
            );
        )*)?
        $($(
            props.insert(
                $opt.to_string(),
                $crate::schema!(@prop $opt_ty $opt_desc $({ $($opt_extra)* })?),
            );
        )*)?

        serde_json::json!({
            "type": "object",
            "properties": props,
            "required": required
        })
    }};

    (@prop $ty:ident $desc:literal $({ $($extra:tt)* })?) => {{
        let mut prop = $crate::schema!(@type $ty);
        if let Some(obj) = prop.as_object_mut() {
            obj.insert("description".to_string(), serde_json::Value::from($desc));
            $(
                if let serde_json::Value::Object(extra) = serde_json::json!({ $($extra)* }) {
                    obj.extend(extra);
                }
            )?
        }
        prop
    }};

    // Type mappings
    (@type string) => { serde_json::json!({"type": "string"}) };
    (@type number) => { serde_json::json!({"type": "number"}) };
    (@type integer) => { serde_json::json!({"type": "integer"}) };
    (@type boolean) => { serde_json::json!({"type": "boolean"}) };
    (@type object) => { serde_json::json!({"type": "object"}) };
    (@type any) => { serde_json::json!({}) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(Connection::in_memory(Some("test"))))
    }

    #[test]
    fn test_schema_macro() {
        let schema = crate::schema!(object {
            required: { "collection": string "Collection name" },
            optional: { "limit": integer "Max rows" { "default": 10, "maximum": 1000 } }
        });
        assert_eq!(schema["required"], serde_json::json!(["collection"]));
        assert_eq!(schema["properties"]["collection"]["type"], "string");
        assert_eq!(schema["properties"]["limit"]["default"], 10);
        assert_eq!(schema["properties"]["limit"]["description"], "Max rows");
    }

    #[test]
    fn test_all_tools_registered_once() {
        let registry = registry();
        let names: HashSet<&str> = registry.tools().iter().map(Tool::name).collect();
        assert_eq!(names.len(), Tool::ALL.len());
        assert_eq!(registry.describe_all().len(), Tool::ALL.len());
    }

    #[test]
    fn test_definitions_use_routing_name() {
        for tool in Tool::ALL {
            let def = tool.definition();
            assert_eq!(def.name, tool.name());
            assert!(!def.description.is_empty());
            assert_eq!(def.input_schema["type"], "object");
        }
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut registry = registry();
        registry.register(Tool::Find);
        assert_eq!(registry.tools().len(), Tool::ALL.len());
        assert_eq!(registry.tools()[1], Tool::Find);
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = registry();
        assert!(matches!(
            registry.resolve("doesNotExist"),
            Err(McpError::UnknownTool(_))
        ));
        assert!(registry.resolve("Find").is_err());
    }

    #[test]
    fn test_envelope_serialization() {
        let ok = ToolResult::success(Payload::Json(serde_json::json!({"a": 1})));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["isError"], false);
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["_meta"], serde_json::json!({}));

        let err = ToolResult::error(&McpError::MissingArg("collection".into()));
        assert!(err.is_error);
        assert!(err.text().contains("collection"));
    }
}
