//! MongoDB-backed document store.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{FindOptions, IndexOptions, UpdateOptions};
use mongodb::results::CollectionType;
use mongodb::{Client, Collection, Database, IndexModel};

use super::{
    CollectionInfo, DeleteOutcome, DocumentStore, IndexSpec, InsertOutcome, UpdateOutcome,
};
use crate::error::{McpError, Result};

/// Document store on top of the official MongoDB driver.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Wrap a client and select `database`.
    pub fn new(client: Client, database: &str) -> Self {
        let db = client.database(database);
        Self { client, db }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn server_status(&self) -> Result<Document> {
        let status = self
            .client
            .database("admin")
            .run_command(doc! { "serverStatus": 1 })
            .await?;

        let mut summary = Document::new();
        for key in ["version", "uptime", "connections"] {
            if let Some(value) = status.get(key) {
                summary.insert(key, value.clone());
            }
        }
        Ok(summary)
    }

    fn database_name(&self) -> &str {
        self.db.name()
    }

    async fn list_collections(&self, limit: usize) -> Result<Vec<CollectionInfo>> {
        let specs: Vec<_> = self
            .db
            .list_collections()
            .await?
            .take(limit)
            .try_collect()
            .await?;

        Ok(specs
            .into_iter()
            .map(|spec| CollectionInfo {
                name: spec.name,
                kind: match spec.collection_type {
                    CollectionType::View => "view",
                    CollectionType::Timeseries => "timeseries",
                    _ => "collection",
                }
                .to_string(),
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
        let mut options = FindOptions::default();
        options.projection = projection;
        options.limit = Some(limit as i64);

        let docs = self
            .collection(collection)
            .find(filter)
            .with_options(options)
            .await?
            .try_collect()
            .await?;
        Ok(docs)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<InsertOutcome> {
        let result = self.collection(collection).insert_one(document).await?;
        Ok(InsertOutcome {
            inserted_id: result.inserted_id,
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
        let mut options = UpdateOptions::default();
        options.upsert = Some(upsert);

        let result = self
            .collection(collection)
            .update_one(filter, update)
            .with_options(options)
            .await?;
        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
            acknowledged: true,
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<DeleteOutcome> {
        let result = self.collection(collection).delete_one(filter).await?;
        Ok(DeleteOutcome {
            deleted_count: result.deleted_count,
            acknowledged: true,
        })
    }

    async fn create_index(&self, collection: &str, spec: IndexSpec) -> Result<String> {
        let options = IndexOptions::builder()
            .unique(spec.unique)
            .name(spec.resolved_name())
            .build();
        let mut keys = Document::new();
        keys.insert(spec.field.clone(), Bson::Int32(spec.order));
        let model = IndexModel::builder().keys(keys).options(options).build();

        let result = self.collection(collection).create_index(model).await?;
        Ok(result.index_name)
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        self.collection(collection).drop_index(name).await?;
        Ok(())
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<Document>> {
        let models: Vec<IndexModel> = self
            .collection(collection)
            .list_indexes()
            .await?
            .try_collect()
            .await?;

        models
            .iter()
            .map(|model| {
                mongodb::bson::to_document(model)
                    .map_err(|e| McpError::operation("SERIALIZATION_ERROR", e.to_string()))
            })
            .collect()
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collection(collection).drop().await?;
        Ok(())
    }

    async fn count_documents(&self, collection: &str) -> Result<u64> {
        Ok(self.collection(collection).count_documents(doc! {}).await?)
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }
}
