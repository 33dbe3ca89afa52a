//! Index management tools.
//!
//! Tools: createIndex, dropIndex, indexes

use mongodb::bson::Bson;
use serde_json::{Map, Value as JsonValue};

use crate::convert::{
    bson_to_json, get_optional_bool, get_optional_i64, get_optional_string, get_string_arg,
    validate_collection_name,
};
use crate::error::{McpError, Result};
use crate::schema;
use crate::store::{DocumentStore, IndexSpec};
use crate::tools::{Payload, Tool, ToolDef};

/// Definition of `createIndex`.
pub fn create_index_def() -> ToolDef {
    ToolDef::new(
        Tool::CreateIndex.name(),
        "Create a new single-field index on a collection. Returns the name of the created index.",
        schema!(object {
            required: {
                "collection": string "Name of the collection to create an index on",
                "field": string "Field name to index"
            },
            optional: {
                "order": integer "Index order (1 for ascending, -1 for descending)" {
                    "enum": [1, -1], "default": 1
                },
                "unique": boolean "Whether the index should be unique" { "default": false },
                "name": string "Optional name for the index"
            }
        }),
    )
}

/// Definition of `dropIndex`.
pub fn drop_index_def() -> ToolDef {
    ToolDef::new(
        Tool::DropIndex.name(),
        "Drop an index from a collection.",
        schema!(object {
            required: {
                "collection": string "Name of the collection to drop an index from",
                "indexName": string "Name of the index to drop"
            }
        }),
    )
}

/// Definition of `indexes`.
pub fn list_indexes_def() -> ToolDef {
    ToolDef::new(
        Tool::ListIndexes.name(),
        "List all indexes for a collection as a mapping from index name to its key \
         specification and options.",
        schema!(object {
            required: { "collection": string "Name of the collection to get indexes for" }
        }),
    )
}

fn index_spec(args: &Map<String, JsonValue>) -> Result<IndexSpec> {
    let field = get_string_arg(args, "field")?;
    let order = match get_optional_i64(args, "order")?.unwrap_or(1) {
        1 => 1,
        -1 => -1,
        other => {
            return Err(McpError::invalid_arg(
                "order",
                format!("must be 1 (ascending) or -1 (descending), got {}", other),
            ))
        }
    };
    let unique = get_optional_bool(args, "unique")?.unwrap_or(false);
    let name = get_optional_string(args, "name")?.filter(|n| !n.is_empty());

    Ok(IndexSpec {
        field,
        order,
        unique,
        name,
    })
}

/// Create an index.
pub async fn create_index(store: &dyn DocumentStore, args: Map<String, JsonValue>) -> Result<Payload> {
    let collection = validate_collection_name(&args)?;
    let spec = index_spec(&args)?;

    let name = store.create_index(&collection, spec).await?;
    Ok(Payload::Text(format!(
        "Created index '{}' on collection '{}'",
        name, collection
    )))
}

/// Drop a named index.
pub async fn drop_index(store: &dyn DocumentStore, args: Map<String, JsonValue>) -> Result<Payload> {
    let collection = validate_collection_name(&args)?;
    let index_name = get_string_arg(&args, "indexName")?;

    store.drop_index(&collection, &index_name).await?;
    Ok(Payload::Text(format!(
        "Dropped index '{}' from collection '{}'",
        index_name, collection
    )))
}

/// Describe every index on a collection, keyed by index name.
pub async fn list_indexes(store: &dyn DocumentStore, args: Map<String, JsonValue>) -> Result<Payload> {
    let collection = validate_collection_name(&args)?;

    let mut info = Map::new();
    for (position, mut index) in store.list_indexes(&collection).await?.into_iter().enumerate() {
        let name = match index.remove("name") {
            Some(Bson::String(name)) => name,
            _ => format!("index_{}", position),
        };
        info.insert(name, bson_to_json(Bson::Document(index)));
    }
    Ok(Payload::Json(JsonValue::Object(info)))
}
