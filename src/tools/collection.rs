//! Collection-level tools.
//!
//! Tools: listCollections

use serde_json::{json, Map, Value as JsonValue};

use crate::error::Result;
use crate::schema;
use crate::store::DocumentStore;
use crate::tools::{Payload, Tool, ToolDef};

/// Most collections a single listing returns.
pub const MAX_COLLECTIONS: usize = 100;

/// Definition of `listCollections`.
pub fn list_collections_def() -> ToolDef {
    ToolDef::new(
        Tool::ListCollections.name(),
        "List all available collections in the database. Returns an array of \
         {name, type} objects (at most 100).",
        schema!(object {}),
    )
}

/// Enumerate collections in the selected database.
pub async fn list_collections(
    store: &dyn DocumentStore,
    _args: Map<String, JsonValue>,
) -> Result<Payload> {
    let collections = store.list_collections(MAX_COLLECTIONS).await?;
    let items: Vec<JsonValue> = collections
        .into_iter()
        .map(|c| json!({ "name": c.name, "type": c.kind }))
        .collect();
    Ok(Payload::Json(JsonValue::Array(items)))
}
