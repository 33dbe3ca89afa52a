//! Conversion utilities between JSON and BSON.
//!
//! Tool arguments arrive as `serde_json` values and are turned into BSON
//! documents (canonical extended JSON such as `{"$oid": "..."}` is honoured).
//! Result documents go the other way, with identity values rendered as strings.
//! The shared argument validation helpers live here as well.

use mongodb::bson::{Bson, Document};
use serde_json::{Map, Value as JsonValue};

use crate::error::{McpError, Result};

/// Convert a JSON object to a BSON document.
pub fn json_to_document(json: JsonValue, name: &str) -> Result<Document> {
    match json {
        JsonValue::Object(map) => {
            Document::try_from(map).map_err(|e| McpError::invalid_arg(name, e.to_string()))
        }
        other => Err(McpError::invalid_arg(
            name,
            format!("must be an object, got {}", json_type_name(&other)),
        )),
    }
}

/// Convert a BSON value to relaxed extended JSON.
pub fn bson_to_json(value: Bson) -> JsonValue {
    value.into_relaxed_extjson()
}

/// Convert a result document to JSON for an MCP response.
///
/// `_id` always becomes a string and every nested `ObjectId` is rendered as
/// its hex form.
pub fn document_to_json(doc: Document) -> JsonValue {
    bson_to_json(Bson::Document(stringify_identities(doc)))
}

/// Render a document's identity values as strings.
pub fn stringify_identities(doc: Document) -> Document {
    doc.into_iter()
        .map(|(key, value)| {
            let value = if key == "_id" {
                Bson::String(identity_string(&value))
            } else {
                stringify_object_ids(value)
            };
            (key, value)
        })
        .collect()
}

/// Canonical string form of an identity value.
pub fn identity_string(value: &Bson) -> String {
    match value {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => bson_to_json(other.clone()).to_string(),
    }
}

fn stringify_object_ids(value: Bson) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::Document(doc) => Bson::Document(
            doc.into_iter()
                .map(|(k, v)| (k, stringify_object_ids(v)))
                .collect(),
        ),
        Bson::Array(items) => Bson::Array(items.into_iter().map(stringify_object_ids).collect()),
        other => other,
    }
}

/// Name of a JSON value's type, for error messages.
pub fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Validate and return the `collection` argument.
///
/// The value must be a non-empty string.
pub fn validate_collection_name(args: &Map<String, JsonValue>) -> Result<String> {
    match args.get("collection") {
        None | Some(JsonValue::Null) => Err(McpError::MissingArg("collection".to_string())),
        Some(JsonValue::String(s)) if s.is_empty() => Err(McpError::invalid_arg(
            "collection",
            "collection name must not be empty",
        )),
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(other) => Err(McpError::invalid_arg(
            "collection",
            format!(
                "collection name must be a string, got {}",
                json_type_name(other)
            ),
        )),
    }
}

/// Validate a required, non-empty object argument and convert it to BSON.
pub fn validate_required_object(value: Option<&JsonValue>, label: &str) -> Result<Document> {
    match value {
        Some(JsonValue::Object(map)) if !map.is_empty() => {
            json_to_document(JsonValue::Object(map.clone()), label)
        }
        Some(JsonValue::Object(_)) => Err(McpError::invalid_arg(
            label,
            "must be a non-empty object",
        )),
        None | Some(JsonValue::Null) => Err(McpError::MissingArg(label.to_string())),
        Some(other) => Err(McpError::invalid_arg(
            label,
            format!("must be a non-empty object, got {}", json_type_name(other)),
        )),
    }
}

/// Optional object argument; `null` counts as absent.
pub fn get_optional_object(args: &Map<String, JsonValue>, name: &str) -> Result<Option<Document>> {
    match args.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => json_to_document(value.clone(), name).map(Some),
    }
}

/// Helper to get a required string argument from JSON arguments.
pub fn get_string_arg(args: &Map<String, JsonValue>, name: &str) -> Result<String> {
    match args.get(name) {
        None | Some(JsonValue::Null) => Err(McpError::MissingArg(name.to_string())),
        Some(JsonValue::String(s)) if s.is_empty() => {
            Err(McpError::invalid_arg(name, "must not be empty"))
        }
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(other) => Err(McpError::invalid_arg(
            name,
            format!("must be a string, got {}", json_type_name(other)),
        )),
    }
}

/// Helper to get an optional string argument from JSON arguments.
pub fn get_optional_string(args: &Map<String, JsonValue>, name: &str) -> Result<Option<String>> {
    match args.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(McpError::invalid_arg(
            name,
            format!("must be a string, got {}", json_type_name(other)),
        )),
    }
}

/// Helper to get an optional integer argument.
///
/// Fractional numbers are rejected rather than truncated.
pub fn get_optional_i64(args: &Map<String, JsonValue>, name: &str) -> Result<Option<i64>> {
    match args.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| McpError::invalid_arg(name, format!("must be an integer, got {}", n))),
        Some(other) => Err(McpError::invalid_arg(
            name,
            format!("must be an integer, got {}", json_type_name(other)),
        )),
    }
}

/// Helper to get an optional boolean argument.
pub fn get_optional_bool(args: &Map<String, JsonValue>, name: &str) -> Result<Option<bool>> {
    match args.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(McpError::invalid_arg(
            name,
            format!("must be a boolean, got {}", json_type_name(other)),
        )),
    }
}
