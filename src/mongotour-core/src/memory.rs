use anyhow::Result;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::store::{DocumentStore, QueryResults, StoreConnector};

type Collections = Arc<Mutex<HashMap<String, Vec<Document>>>>;

/// In-process document store
///
/// Collections live in a map shared by every handle the connector hands out,
/// so data survives between connections the same way it would on a server.
/// Filters match on equality of top-level fields; updates support `$set`.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    collections: Collections,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store handle for `collection` without going through `connect`
    pub fn store(&self, collection: &str) -> MemoryStore {
        MemoryStore {
            collections: self.collections.clone(),
            name: collection.to_string(),
        }
    }

    pub async fn collection_exists(&self, collection: &str) -> bool {
        self.collections.lock().await.contains_key(collection)
    }

    /// Snapshot of a collection's documents in insertion order
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self, url: &str, collection: &str) -> Result<Box<dyn DocumentStore>> {
        tracing::debug!(url = %url, collection = %collection, "Opening in-memory store");
        Ok(Box::new(self.store(collection)))
    }
}

pub struct MemoryStore {
    collections: Collections,
    name: String,
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| doc.get(key) == Some(expected))
}

/// Give the document an `_id` when it has none
fn with_id(mut doc: Document) -> Document {
    if !doc.contains_key("_id") {
        let mut identified = Document::new();
        identified.insert("_id", ObjectId::new());
        identified.extend(doc);
        doc = identified;
    }
    doc
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryConnector::new().store("default")
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, doc: Document) -> Result<()> {
        let mut collections = self.collections.lock().await;
        collections
            .entry(self.name.clone())
            .or_default()
            .push(with_id(doc));
        Ok(())
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<()> {
        let mut collections = self.collections.lock().await;
        let collection = collections.entry(self.name.clone()).or_default();
        collection.extend(docs.into_iter().map(with_id));
        Ok(())
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(&self.name)
            .and_then(|docs| docs.iter().find(|d| matches(d, &filter)).cloned()))
    }

    async fn find(&self, filter: Document) -> Result<QueryResults> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(&self.name)
            .map(|docs| {
                docs.iter()
                    .filter(|d| matches(d, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<u64> {
        let set = match update.get("$set") {
            Some(Bson::Document(set)) => set.clone(),
            _ => anyhow::bail!("Unsupported update document: {}", update),
        };

        let mut collections = self.collections.lock().await;
        let Some(doc) = collections
            .get_mut(&self.name)
            .and_then(|docs| docs.iter_mut().find(|d| matches(d, &filter)))
        else {
            return Ok(0);
        };

        let mut modified = false;
        for (key, value) in set {
            if doc.get(&key) != Some(&value) {
                doc.insert(key, value);
                modified = true;
            }
        }

        Ok(modified as u64)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64> {
        let mut collections = self.collections.lock().await;
        let Some(docs) = collections.get_mut(&self.name) else {
            return Ok(0);
        };

        let before = docs.len();
        docs.retain(|d| !matches(d, &filter));
        Ok((before - docs.len()) as u64)
    }

    async fn drop_collection(&self) -> Result<()> {
        self.collections.lock().await.remove(&self.name);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn collection_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_document;
    use mongodb::bson::doc;

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let connector = MemoryConnector::new();
        let store = connector.store("things");

        store.insert_one(sample_document("a", 1)).await.unwrap();
        store
            .insert_many(vec![sample_document("b", 2), sample_document("c", 3)])
            .await
            .unwrap();

        let docs = connector.documents("things").await;
        assert_eq!(docs.len(), 3);
        assert!(docs.iter().all(|d| d.get_object_id("_id").is_ok()));
    }

    #[tokio::test]
    async fn test_filters_and_updates() {
        let store = MemoryStore::new();
        store
            .insert_many(vec![
                sample_document("a", 1),
                sample_document("a", 2),
                sample_document("b", 3),
            ])
            .await
            .unwrap();

        let found = store.find(doc! { "name": "a" }).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(store.find(doc! {}).await.unwrap().len(), 3);

        let first = store.find_one(doc! { "name": "a" }).await.unwrap().unwrap();
        assert_eq!(first.get_i32("value").unwrap(), 1);
        assert!(store.find_one(doc! { "name": "z" }).await.unwrap().is_none());

        // Only the first match is updated
        let modified = store
            .update_one(doc! { "name": "a" }, doc! { "$set": { "value": 9 } })
            .await
            .unwrap();
        assert_eq!(modified, 1);
        let values: Vec<i32> = store
            .find(doc! { "name": "a" })
            .await
            .unwrap()
            .iter()
            .map(|d| d.get_i32("value").unwrap())
            .collect();
        assert_eq!(values, vec![9, 2]);

        assert_eq!(store.delete_many(doc! { "name": "a" }).await.unwrap(), 2);
        assert_eq!(store.find(doc! {}).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_rejects_non_set_operators() {
        let store = MemoryStore::new();
        store.insert_one(sample_document("a", 1)).await.unwrap();

        let result = store
            .update_one(doc! { "name": "a" }, doc! { "$inc": { "value": 1 } })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_drop_removes_collection() {
        let connector = MemoryConnector::new();
        let store = connector.connect("memory://", "gone").await.unwrap();
        store.insert_one(sample_document("a", 1)).await.unwrap();
        assert!(connector.collection_exists("gone").await);

        store.drop_collection().await.unwrap();
        assert!(!connector.collection_exists("gone").await);
        assert!(store.find(doc! {}).await.unwrap().is_empty());
    }
}
