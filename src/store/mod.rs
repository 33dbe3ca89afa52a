//! Document store interface and implementations.
//!
//! Tools never talk to a driver directly. They go through [`DocumentStore`],
//! which has one MongoDB-backed implementation and one in-process
//! implementation used for `--memory` mode and tests.

mod matcher;
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use serde::Serialize;

use crate::error::Result;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Name and kind of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    /// Collection name
    pub name: String,
    /// `collection`, `view` or `timeseries`
    #[serde(rename = "type")]
    pub kind: String,
}

/// Result of a single-document insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    /// `_id` of the stored document
    pub inserted_id: Bson,
    /// Whether the write was acknowledged
    pub acknowledged: bool,
}

/// Result of a single-document update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// Number of documents matching the filter (0 or 1)
    pub matched_count: u64,
    /// Number of documents changed (0 or 1)
    pub modified_count: u64,
    /// `_id` of the document created by an upsert
    pub upserted_id: Option<Bson>,
    /// Whether the write was acknowledged
    pub acknowledged: bool,
}

/// Result of a single-document delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    /// Number of documents removed (0 or 1)
    pub deleted_count: u64,
    /// Whether the write was acknowledged
    pub acknowledged: bool,
}

/// A single-field index to create.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    /// Indexed field (dot notation allowed)
    pub field: String,
    /// `1` ascending, `-1` descending
    pub order: i32,
    /// Reject duplicate values
    pub unique: bool,
    /// Explicit index name; defaults to `<field>_<order>`
    pub name: Option<String>,
}

impl IndexSpec {
    /// Name the server will use for this index.
    pub fn resolved_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.field, self.order))
    }
}

/// Abstract interface for document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Liveness probe.
    async fn ping(&self) -> Result<()>;

    /// Short server description for startup logs.
    async fn server_status(&self) -> Result<Document>;

    /// Name of the selected database.
    fn database_name(&self) -> &str;

    /// List up to `limit` collections.
    async fn list_collections(&self, limit: usize) -> Result<Vec<CollectionInfo>>;

    /// Query documents.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
        limit: usize,
    ) -> Result<Vec<Document>>;

    /// Insert exactly one document.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<InsertOutcome>;

    /// Apply update operators to the first matching document.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome>;

    /// Remove the first matching document.
    async fn delete_one(&self, collection: &str, filter: Document) -> Result<DeleteOutcome>;

    /// Create an index and return its name.
    async fn create_index(&self, collection: &str, spec: IndexSpec) -> Result<String>;

    /// Drop a named index.
    async fn drop_index(&self, collection: &str, name: &str) -> Result<()>;

    /// Describe every index on a collection as `{key, name, ...options}`.
    async fn list_indexes(&self, collection: &str) -> Result<Vec<Document>>;

    /// Drop a collection and its indexes. Dropping a missing collection is a no-op.
    async fn drop_collection(&self, collection: &str) -> Result<()>;

    /// Exact document count.
    async fn count_documents(&self, collection: &str) -> Result<u64>;

    /// Up to `size` documents in natural order.
    async fn sample(&self, collection: &str, size: usize) -> Result<Vec<Document>> {
        self.find(collection, Document::new(), None, size).await
    }

    /// Release client resources.
    async fn shutdown(&self);
}
