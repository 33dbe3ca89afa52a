//! Schema introspection tool.
//!
//! Tools: collectionSchema

use serde_json::{Map, Value as JsonValue};

use crate::convert::{get_optional_i64, validate_collection_name};
use crate::error::{McpError, Result};
use crate::schema;
use crate::schema::{build_collection_schema, DEFAULT_SAMPLE_SIZE};
use crate::store::DocumentStore;
use crate::tools::{Payload, Tool, ToolDef};

/// Largest sample a caller may request.
pub const MAX_SAMPLE_SIZE: i64 = 1000;

/// Definition of `collectionSchema`.
pub fn collection_schema_def() -> ToolDef {
    ToolDef::new(
        Tool::CollectionSchema.name(),
        "Infer the schema of a collection from a sample of its documents. Returns field paths \
         with type tags (unions joined by '|'), required flags, the document count and indexes.",
        schema!(object {
            required: { "collection": string "Name of the collection to inspect" },
            optional: {
                "sampleSize": integer "Number of documents to sample" {
                    "default": 100, "minimum": 1, "maximum": 1000
                }
            }
        }),
    )
}

/// Sample a collection and report its inferred schema.
pub async fn collection_schema(
    store: &dyn DocumentStore,
    args: Map<String, JsonValue>,
) -> Result<Payload> {
    let collection = validate_collection_name(&args)?;
    let sample_size = match get_optional_i64(&args, "sampleSize")? {
        None => DEFAULT_SAMPLE_SIZE,
        Some(n) if (1..=MAX_SAMPLE_SIZE).contains(&n) => n as usize,
        Some(n) => {
            return Err(McpError::invalid_arg(
                "sampleSize",
                format!("must be between 1 and {}, got {}", MAX_SAMPLE_SIZE, n),
            ))
        }
    };

    let schema = build_collection_schema(store, &collection, sample_size).await?;
    let value = serde_json::to_value(&schema).map_err(|e| McpError::Internal(e.to_string()))?;
    Ok(Payload::Json(value))
}
