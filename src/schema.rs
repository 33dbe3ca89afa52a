//! Schema inference over a sample of documents.
//!
//! Derives a field tree with type tags from up to N documents of a
//! collection. Types observed for the same path are unioned into a
//! `|`-joined tag. A path is required only if every sampled document has it.

use std::collections::{BTreeSet, HashMap, HashSet};

use mongodb::bson::{Bson, Document};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::convert::bson_to_json;
use crate::error::Result;
use crate::store::DocumentStore;

/// Default number of documents sampled per collection.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Inferred shape of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    /// Dot-notation path; `[]` marks a descent into array elements
    pub field: String,
    /// Type tag, or a `|`-joined union of tags
    #[serde(rename = "type")]
    pub field_type: String,
    /// Present in every sampled document
    pub is_required: bool,
    /// Children of object fields and arrays of objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_fields: Option<Vec<FieldSchema>>,
}

/// Inferred shape of a collection plus live statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSchema {
    /// Collection name
    pub collection: String,
    /// Top-level fields
    pub fields: Vec<FieldSchema>,
    /// Exact document count (not the sample size)
    pub count: u64,
    /// Index descriptions as reported by the server
    pub indexes: Vec<JsonValue>,
}

/// Type tag of a single value.
///
/// Checked in order: null, array, object, boolean, integer, number, string,
/// binary. Anything else reports its BSON element type name.
pub fn infer_value_type(value: &Bson) -> String {
    match value {
        Bson::Null => "null".to_string(),
        Bson::Array(_) => "array".to_string(),
        Bson::Document(_) => "object".to_string(),
        Bson::Boolean(_) => "boolean".to_string(),
        Bson::Int32(_) | Bson::Int64(_) => "integer".to_string(),
        Bson::Double(_) => "number".to_string(),
        Bson::String(_) => "string".to_string(),
        Bson::Binary(_) => "binary".to_string(),
        other => format!("{:?}", other.element_type()),
    }
}

/// Field schemas of one document.
///
/// Arrays are described by their first element only, and only when that
/// element is an object.
pub fn infer_document_schema(doc: &Document, parent_path: &str) -> Vec<FieldSchema> {
    doc.iter()
        .map(|(key, value)| {
            let field = if parent_path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", parent_path, key)
            };
            let sub_fields = match value {
                Bson::Document(sub) => Some(infer_document_schema(sub, &field)),
                Bson::Array(items) => match items.first() {
                    Some(Bson::Document(first)) => {
                        Some(infer_document_schema(first, &format!("{}[]", field)))
                    }
                    _ => None,
                },
                _ => None,
            };
            FieldSchema {
                field_type: infer_value_type(value),
                field,
                is_required: true,
                sub_fields,
            }
        })
        .collect()
}

#[derive(Default)]
struct PathStats {
    types: BTreeSet<String>,
    seen_in: usize,
    parent: Option<String>,
}

/// Merge per-document schemas into one tree.
pub fn merge_document_schemas(docs: &[Document]) -> Vec<FieldSchema> {
    let mut order: Vec<String> = Vec::new();
    let mut stats: HashMap<String, PathStats> = HashMap::new();

    for doc in docs {
        let mut seen_here = HashSet::new();
        let mut stack: Vec<(FieldSchema, Option<String>)> = infer_document_schema(doc, "")
            .into_iter()
            .rev()
            .map(|f| (f, None))
            .collect();

        while let Some((field, parent)) = stack.pop() {
            let entry = stats.entry(field.field.clone()).or_insert_with(|| {
                order.push(field.field.clone());
                PathStats {
                    parent,
                    ..PathStats::default()
                }
            });
            entry.types.insert(field.field_type);
            if seen_here.insert(field.field.clone()) {
                entry.seen_in += 1;
            }
            if let Some(children) = field.sub_fields {
                let path = field.field;
                stack.extend(
                    children
                        .into_iter()
                        .rev()
                        .map(|child| (child, Some(path.clone()))),
                );
            }
        }
    }

    build_tree(None, &order, &stats, docs.len())
}

fn build_tree(
    parent: Option<&str>,
    order: &[String],
    stats: &HashMap<String, PathStats>,
    total: usize,
) -> Vec<FieldSchema> {
    order
        .iter()
        .filter_map(|path| {
            let s = stats.get(path)?;
            if s.parent.as_deref() != parent {
                return None;
            }
            let children = build_tree(Some(path), order, stats, total);
            Some(FieldSchema {
                field: path.clone(),
                field_type: s.types.iter().cloned().collect::<Vec<_>>().join("|"),
                is_required: s.seen_in == total,
                sub_fields: (!children.is_empty()).then_some(children),
            })
        })
        .collect()
}

/// Sample a collection and infer its schema.
///
/// Count and indexes come from dedicated calls, not from the sample.
pub async fn build_collection_schema(
    store: &dyn DocumentStore,
    collection: &str,
    sample_size: usize,
) -> Result<CollectionSchema> {
    let docs = store.sample(collection, sample_size).await?;
    let count = store.count_documents(collection).await?;
    let indexes = store
        .list_indexes(collection)
        .await?
        .into_iter()
        .map(|index| bson_to_json(Bson::Document(index)))
        .collect();

    Ok(CollectionSchema {
        collection: collection.to_string(),
        fields: merge_document_schemas(&docs),
        count,
        indexes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId, spec::BinarySubtype, Binary};

    fn find<'a>(fields: &'a [FieldSchema], path: &str) -> &'a FieldSchema {
        fields
            .iter()
            .find(|f| f.field == path)
            .unwrap_or_else(|| panic!("no field {}", path))
    }

    #[test]
    fn test_value_type_order() {
        assert_eq!(infer_value_type(&Bson::Null), "null");
        assert_eq!(infer_value_type(&Bson::Array(vec![])), "array");
        assert_eq!(infer_value_type(&Bson::Document(doc! {})), "object");
        assert_eq!(infer_value_type(&Bson::Boolean(true)), "boolean");
        assert_eq!(infer_value_type(&Bson::Int64(1)), "integer");
        assert_eq!(infer_value_type(&Bson::Double(1.5)), "number");
        assert_eq!(infer_value_type(&Bson::String("x".into())), "string");
        let bin = Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: vec![1, 2],
        });
        assert_eq!(infer_value_type(&bin), "binary");
        assert_eq!(infer_value_type(&Bson::ObjectId(ObjectId::new())), "ObjectId");
    }

    #[test]
    fn test_nested_and_array_paths() {
        let fields = infer_document_schema(
            &doc! { "address": { "city": "Seoul" }, "items": [{ "sku": "A1" }], "tags": ["x"] },
            "",
        );
        let address = find(&fields, "address");
        assert_eq!(address.sub_fields.as_ref().unwrap()[0].field, "address.city");
        let items = find(&fields, "items");
        assert_eq!(items.sub_fields.as_ref().unwrap()[0].field, "items[].sku");
        assert!(find(&fields, "tags").sub_fields.is_none());
    }

    #[test]
    fn test_conflicting_types_are_unioned() {
        let merged = merge_document_schemas(&[doc! { "age": 30 }, doc! { "age": "thirty" }]);
        let age = find(&merged, "age");
        let tags: BTreeSet<&str> = age.field_type.split('|').collect();
        assert_eq!(tags, BTreeSet::from(["integer", "string"]));
        assert!(age.is_required);
    }

    #[test]
    fn test_required_uses_deep_presence() {
        let merged = merge_document_schemas(&[
            doc! { "name": "a", "profile": { "city": "Seoul", "zip": "1" } },
            doc! { "name": "b", "profile": { "city": "Busan" } },
            doc! { "name": "c", "profile": { "city": "Daegu" }, "extra": true },
        ]);
        assert!(find(&merged, "name").is_required);
        assert!(!find(&merged, "extra").is_required);

        let profile = find(&merged, "profile");
        let subs = profile.sub_fields.as_ref().unwrap();
        assert!(find(subs, "profile.city").is_required);
        assert!(!find(subs, "profile.zip").is_required);
    }

    #[test]
    fn test_empty_sample() {
        assert!(merge_document_schemas(&[]).is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let merged = merge_document_schemas(&[doc! { "a": { "b": 1 } }]);
        let json = serde_json::to_value(&merged).unwrap();
        assert_eq!(json[0]["field"], "a");
        assert_eq!(json[0]["type"], "object");
        assert_eq!(json[0]["isRequired"], true);
        assert_eq!(json[0]["subFields"][0]["field"], "a.b");
    }
}
