//! In-process document store.
//!
//! Keeps collections in memory behind a single lock. Used for `--memory`
//! mode and as the backend of the test suite.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use super::matcher::{apply_update, get_path, matches, project, upsert_seed, validate_update};
use super::{
    CollectionInfo, DeleteOutcome, DocumentStore, IndexSpec, InsertOutcome, UpdateOutcome,
};
use crate::error::{McpError, Result};

const ID_INDEX: &str = "_id_";

#[derive(Debug, Clone)]
struct IndexDef {
    name: String,
    keys: Document,
    unique: bool,
}

impl IndexDef {
    fn id_index() -> Self {
        Self {
            name: ID_INDEX.to_string(),
            keys: doc! { "_id": 1 },
            unique: true,
        }
    }

    fn key_of(&self, doc: &Document) -> Vec<Bson> {
        self.keys
            .keys()
            .map(|field| get_path(doc, field).cloned().unwrap_or(Bson::Null))
            .collect()
    }

    fn describe(&self) -> Document {
        let mut info = doc! { "v": 2, "key": self.keys.clone(), "name": self.name.clone() };
        if self.unique && self.name != ID_INDEX {
            info.insert("unique", true);
        }
        info
    }
}

#[derive(Debug)]
struct MemCollection {
    docs: Vec<Document>,
    indexes: Vec<IndexDef>,
}

impl MemCollection {
    fn new() -> Self {
        Self {
            docs: Vec::new(),
            indexes: vec![IndexDef::id_index()],
        }
    }

    /// Check `candidate` against every unique index, ignoring slot `skip`.
    fn check_unique(&self, ns: &str, candidate: &Document, skip: Option<usize>) -> Result<()> {
        for index in self.indexes.iter().filter(|i| i.unique) {
            let key = index.key_of(candidate);
            let clash = self
                .docs
                .iter()
                .enumerate()
                .any(|(pos, existing)| Some(pos) != skip && index.key_of(existing) == key);
            if clash {
                return Err(duplicate_key(ns, &index.name, &key));
            }
        }
        Ok(())
    }

    fn position(&self, filter: &Document) -> Result<Option<usize>> {
        for (pos, doc) in self.docs.iter().enumerate() {
            if matches(doc, filter)? {
                return Ok(Some(pos));
            }
        }
        Ok(None)
    }
}

fn duplicate_key(ns: &str, index: &str, key: &[Bson]) -> McpError {
    let rendered: Vec<String> = key.iter().map(|k| k.to_string()).collect();
    McpError::operation(
        "DUPLICATE_KEY",
        format!(
            "E11000 duplicate key error collection: {} index: {} dup key: {{ {} }}",
            ns,
            index,
            rendered.join(", ")
        ),
    )
}

/// Put an `_id` first, generating an `ObjectId` when absent.
fn with_id(document: Document) -> (Document, Bson) {
    if let Some(id) = document.get("_id") {
        let id = id.clone();
        return (document, id);
    }
    let id = Bson::ObjectId(ObjectId::new());
    let mut out = Document::new();
    out.insert("_id", id.clone());
    out.extend(document);
    (out, id)
}

/// In-memory document store.
pub struct MemoryStore {
    database: String,
    collections: RwLock<BTreeMap<String, MemCollection>>,
    started: Instant,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store presenting itself as `database`.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: RwLock::new(BTreeMap::new()),
            started: Instant::now(),
            closed: AtomicBool::new(false),
        }
    }

    fn namespace(&self, collection: &str) -> String {
        format!("{}.{}", self.database, collection)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("test")
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(McpError::operation("CLIENT_CLOSED", "store has been shut down"));
        }
        Ok(())
    }

    async fn server_status(&self) -> Result<Document> {
        let collections = self.collections.read().await;
        Ok(doc! {
            "version": "memory",
            "uptime": self.started.elapsed().as_secs() as i64,
            "collections": collections.len() as i64
        })
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    async fn list_collections(&self, limit: usize) -> Result<Vec<CollectionInfo>> {
        let collections = self.collections.read().await;
        Ok(collections
            .keys()
            .take(limit)
            .map(|name| CollectionInfo {
                name: name.clone(),
                kind: "collection".to_string(),
            })
            .collect())
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for doc in &coll.docs {
            if out.len() >= limit {
                break;
            }
            if matches(doc, &filter)? {
                out.push(match &projection {
                    Some(p) => project(doc, p)?,
                    None => doc.clone(),
                });
            }
        }
        Ok(out)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<InsertOutcome> {
        let ns = self.namespace(collection);
        let mut collections = self.collections.write().await;
        let coll = collections
            .entry(collection.to_string())
            .or_insert_with(MemCollection::new);

        let (document, inserted_id) = with_id(document);
        coll.check_unique(&ns, &document, None)?;
        coll.docs.push(document);

        Ok(InsertOutcome {
            inserted_id,
            acknowledged: true,
        })
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        validate_update(&update)?;
        let ns = self.namespace(collection);
        let mut collections = self.collections.write().await;

        let existing = match collections.get(collection) {
            Some(coll) => coll.position(&filter)?,
            None => None,
        };

        if let Some(pos) = existing {
            if let Some(coll) = collections.get_mut(collection) {
                let mut updated = coll.docs[pos].clone();
                apply_update(&mut updated, &update, false)?;
                let modified = updated != coll.docs[pos];
                if modified {
                    coll.check_unique(&ns, &updated, Some(pos))?;
                    coll.docs[pos] = updated;
                }
                return Ok(UpdateOutcome {
                    matched_count: 1,
                    modified_count: u64::from(modified),
                    upserted_id: None,
                    acknowledged: true,
                });
            }
        }

        if !upsert {
            return Ok(UpdateOutcome {
                matched_count: 0,
                modified_count: 0,
                upserted_id: None,
                acknowledged: true,
            });
        }

        let mut seed = upsert_seed(&filter)?;
        apply_update(&mut seed, &update, true)?;
        let (document, upserted_id) = with_id(seed);

        let coll = collections
            .entry(collection.to_string())
            .or_insert_with(MemCollection::new);
        coll.check_unique(&ns, &document, None)?;
        coll.docs.push(document);

        Ok(UpdateOutcome {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(upserted_id),
            acknowledged: true,
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<DeleteOutcome> {
        let mut collections = self.collections.write().await;
        let deleted_count = match collections.get_mut(collection) {
            Some(coll) => match coll.position(&filter)? {
                Some(pos) => {
                    coll.docs.remove(pos);
                    1
                }
                None => 0,
            },
            None => 0,
        };
        Ok(DeleteOutcome {
            deleted_count,
            acknowledged: true,
        })
    }

    async fn create_index(&self, collection: &str, spec: IndexSpec) -> Result<String> {
        let ns = self.namespace(collection);
        let name = spec.resolved_name();
        let mut keys = Document::new();
        keys.insert(spec.field.clone(), Bson::Int32(spec.order));

        let mut collections = self.collections.write().await;
        let coll = collections
            .entry(collection.to_string())
            .or_insert_with(MemCollection::new);

        if let Some(existing) = coll.indexes.iter().find(|i| i.name == name) {
            if existing.keys == keys && existing.unique == spec.unique {
                return Ok(name);
            }
            return Err(McpError::operation(
                "INDEX_KEY_SPECS_CONFLICT",
                format!("an existing index has the same name as the requested index: {}", name),
            ));
        }
        if let Some(existing) = coll.indexes.iter().find(|i| i.keys == keys) {
            return Err(McpError::operation(
                "INDEX_OPTIONS_CONFLICT",
                format!("index already exists with a different name: {}", existing.name),
            ));
        }

        let index = IndexDef {
            name: name.clone(),
            keys,
            unique: spec.unique,
        };
        if index.unique {
            let mut seen: Vec<Vec<Bson>> = Vec::with_capacity(coll.docs.len());
            for doc in &coll.docs {
                let key = index.key_of(doc);
                if seen.contains(&key) {
                    return Err(duplicate_key(&ns, &index.name, &key));
                }
                seen.push(key);
            }
        }
        coll.indexes.push(index);
        Ok(name)
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        let ns = self.namespace(collection);
        let mut collections = self.collections.write().await;
        let coll = collections.get_mut(collection).ok_or_else(|| {
            McpError::operation("NAMESPACE_NOT_FOUND", format!("ns not found {}", ns))
        })?;

        if name == ID_INDEX {
            return Err(McpError::operation(
                "INVALID_OPTIONS",
                "cannot drop _id index",
            ));
        }
        let before = coll.indexes.len();
        coll.indexes.retain(|i| i.name != name);
        if coll.indexes.len() == before {
            return Err(McpError::operation(
                "INDEX_NOT_FOUND",
                format!("index not found with name [{}]", name),
            ));
        }
        Ok(())
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|coll| coll.indexes.iter().map(IndexDef::describe).collect())
            .unwrap_or_default())
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collections.write().await.remove(collection);
        Ok(())
    }

    async fn count_documents(&self, collection: &str) -> Result<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map_or(0, |coll| coll.docs.len() as u64))
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
