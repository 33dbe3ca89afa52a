//! Document tools.
//!
//! Tools: find, insertOne, updateOne, deleteOne

use serde_json::{json, Map, Value as JsonValue};

use crate::convert::{
    document_to_json, get_optional_bool, get_optional_i64, get_optional_object, identity_string,
    validate_collection_name, validate_required_object,
};
use crate::error::{McpError, Result};
use crate::schema;
use crate::store::DocumentStore;
use crate::tools::{Payload, Tool, ToolDef};

/// Documents returned by `find` when no limit is given.
pub const DEFAULT_FIND_LIMIT: i64 = 10;

/// Hard ceiling on documents returned by `find`, whatever the caller asks.
pub const MAX_FIND_LIMIT: i64 = 1000;

/// Definition of `find`.
pub fn find_def() -> ToolDef {
    ToolDef::new(
        Tool::Find.name(),
        "Query documents in a collection using MongoDB query syntax. Returns an array of \
         documents with _id rendered as a string. At most 1000 documents are returned. \
         ObjectId values in the filter must be given as {\"$oid\": \"<hex>\"}.",
        schema!(object {
            required: { "collection": string "Name of the collection to query" },
            optional: {
                "filter": object "MongoDB query filter; match ObjectIds with {\"$oid\": \"<hex>\"}" { "default": {} },
                "limit": integer "Maximum documents to return" {
                    "default": 10, "minimum": 1, "maximum": 1000
                },
                "projection": object "Fields to include/exclude" { "default": {} }
            }
        }),
    )
}

/// Definition of `insertOne`.
pub fn insert_one_def() -> ToolDef {
    ToolDef::new(
        Tool::InsertOne.name(),
        "Insert a single document into a collection. Returns {insertedId, acknowledged}.",
        schema!(object {
            required: {
                "collection": string "Name of the collection to insert into",
                "document": object "Document to insert"
            }
        }),
    )
}

/// Definition of `updateOne`.
pub fn update_one_def() -> ToolDef {
    ToolDef::new(
        Tool::UpdateOne.name(),
        "Update a single document in a collection. Returns {matchedCount, modifiedCount, \
         upsertedId, acknowledged}. ObjectId values in the filter must be given as \
         {\"$oid\": \"<hex>\"}.",
        schema!(object {
            required: {
                "collection": string "Name of the collection to update in",
                "filter": object "Filter to select the document to update",
                "update": object "Update operations to apply to the document (MongoDB update operators)"
            },
            optional: {
                "upsert": boolean "Create a new document if no document matches the filter" {
                    "default": false
                }
            }
        }),
    )
}

/// Definition of `deleteOne`.
pub fn delete_one_def() -> ToolDef {
    ToolDef::new(
        Tool::DeleteOne.name(),
        "Delete a single document from a collection. Returns {deletedCount, acknowledged}. \
         ObjectId values in the filter must be given as {\"$oid\": \"<hex>\"}.",
        schema!(object {
            required: {
                "collection": string "Name of the collection to delete from",
                "filter": object "Filter to select the document to delete"
            }
        }),
    )
}

/// Clamp the requested limit to `1..=MAX_FIND_LIMIT`.
fn find_limit(args: &Map<String, JsonValue>) -> Result<usize> {
    match get_optional_i64(args, "limit")? {
        None => Ok(DEFAULT_FIND_LIMIT as usize),
        Some(n) if n < 1 => Err(McpError::invalid_arg(
            "limit",
            format!("must be at least 1, got {}", n),
        )),
        Some(n) => Ok(n.min(MAX_FIND_LIMIT) as usize),
    }
}

/// Query a collection.
pub async fn find(store: &dyn DocumentStore, args: Map<String, JsonValue>) -> Result<Payload> {
    let collection = validate_collection_name(&args)?;
    let filter = get_optional_object(&args, "filter")?.unwrap_or_default();
    let projection = get_optional_object(&args, "projection")?.filter(|p| !p.is_empty());
    let limit = find_limit(&args)?;

    let docs = store.find(&collection, filter, projection, limit).await?;
    Ok(Payload::Json(JsonValue::Array(
        docs.into_iter().map(document_to_json).collect(),
    )))
}

/// Insert one document.
pub async fn insert_one(store: &dyn DocumentStore, args: Map<String, JsonValue>) -> Result<Payload> {
    let collection = validate_collection_name(&args)?;
    let document = validate_required_object(args.get("document"), "document")?;

    let outcome = store.insert_one(&collection, document).await?;
    Ok(Payload::Json(json!({
        "insertedId": identity_string(&outcome.inserted_id),
        "acknowledged": outcome.acknowledged,
    })))
}

/// Update the first matching document.
pub async fn update_one(store: &dyn DocumentStore, args: Map<String, JsonValue>) -> Result<Payload> {
    let collection = validate_collection_name(&args)?;
    let filter = validate_required_object(args.get("filter"), "filter")?;
    let update = validate_required_object(args.get("update"), "update")?;
    let upsert = get_optional_bool(&args, "upsert")?.unwrap_or(false);

    if let Some(key) = update.keys().find(|k| !k.starts_with('$')) {
        return Err(McpError::invalid_arg(
            "update",
            format!(
                "must contain only update operators such as $set, found '{}'",
                key
            ),
        ));
    }

    let outcome = store.update_one(&collection, filter, update, upsert).await?;
    Ok(Payload::Json(json!({
        "matchedCount": outcome.matched_count,
        "modifiedCount": outcome.modified_count,
        "upsertedId": outcome.upserted_id.as_ref().map(identity_string),
        "acknowledged": outcome.acknowledged,
    })))
}

/// Delete the first matching document.
pub async fn delete_one(store: &dyn DocumentStore, args: Map<String, JsonValue>) -> Result<Payload> {
    let collection = validate_collection_name(&args)?;
    let filter = validate_required_object(args.get("filter"), "filter")?;

    let outcome = store.delete_one(&collection, filter).await?;
    Ok(Payload::Json(json!({
        "deletedCount": outcome.deleted_count,
        "acknowledged": outcome.acknowledged,
    })))
}
