use anyhow::{Context, Result};
use futures::TryStreamExt;
use mongodb::bson::Document;
use mongodb::{Client, Collection};

use crate::store::{DocumentStore, QueryResults, StoreConnector};

/// Connects to MongoDB through the official driver
pub struct MongoConnector {
    /// Database used when the connection string names none
    default_database: String,
}

impl MongoConnector {
    pub fn new(default_database: impl Into<String>) -> Self {
        Self {
            default_database: default_database.into(),
        }
    }

    /// Build a client for `url` and bind it to `collection`
    ///
    /// The database named in the url wins over the configured default.
    #[tracing::instrument(skip(self, url))]
    pub async fn open(&self, url: &str, collection: &str) -> Result<MongoStore> {
        let client = Client::with_uri_str(url)
            .await
            .context("Failed to connect to document store")?;

        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(&self.default_database));
        tracing::debug!(database = %database.name(), "Connected to document store");

        Ok(MongoStore::new(client, database.collection(collection)))
    }
}

#[async_trait::async_trait]
impl StoreConnector for MongoConnector {
    async fn connect(&self, url: &str, collection: &str) -> Result<Box<dyn DocumentStore>> {
        Ok(Box::new(self.open(url, collection).await?))
    }
}

/// One collection on a live MongoDB connection
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoStore {
    pub fn new(client: Client, collection: Collection<Document>) -> Self {
        Self { client, collection }
    }

    pub fn database_name(&self) -> String {
        self.collection.namespace().db
    }
}

#[async_trait::async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, doc: Document) -> Result<()> {
        self.collection
            .insert_one(doc)
            .await
            .context("insert_one failed")?;
        Ok(())
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<()> {
        self.collection
            .insert_many(docs)
            .await
            .context("insert_many failed")?;
        Ok(())
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>> {
        self.collection
            .find_one(filter)
            .await
            .context("find_one failed")
    }

    async fn find(&self, filter: Document) -> Result<QueryResults> {
        let cursor = self.collection.find(filter).await.context("find failed")?;
        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .context("Failed to read query cursor")?;
        Ok(QueryResults::new(docs))
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<u64> {
        let result = self
            .collection
            .update_one(filter, update)
            .await
            .context("update_one failed")?;
        Ok(result.modified_count)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64> {
        let result = self
            .collection
            .delete_many(filter)
            .await
            .context("delete_many failed")?;
        Ok(result.deleted_count)
    }

    async fn drop_collection(&self) -> Result<()> {
        self.collection
            .drop()
            .await
            .context("Failed to drop collection")
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        tracing::debug!("Document store connection closed");
        Ok(())
    }

    fn collection_name(&self) -> &str {
        self.collection.name()
    }
}
