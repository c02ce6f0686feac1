//! Sequential operation runner
//!
//! Runs the tour of document-store operations in a fixed order on a single
//! task. Each step awaits its database call before the next one starts; the
//! first failure stops the run.

use anyhow::Result;
use mongodb::bson::doc;
use std::fmt;
use tracing::Instrument;
use uuid::Uuid;

use crate::log::OperationLog;
use crate::models::{document_json, optional_document_json, sample_document};
use crate::store::DocumentStore;

/// One operation of the tour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    InsertOne,
    InsertMany,
    FindOne,
    FindByName,
    FindAll,
    Update,
    Delete,
    Drop,
}

impl Step {
    /// Every step in execution order
    pub const ALL: [Step; 8] = [
        Step::InsertOne,
        Step::InsertMany,
        Step::FindOne,
        Step::FindByName,
        Step::FindAll,
        Step::Update,
        Step::Delete,
        Step::Drop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::InsertOne => "insert one",
            Step::InsertMany => "insert many",
            Step::FindOne => "find one",
            Step::FindByName => "find by name",
            Step::FindAll => "find all",
            Step::Update => "update",
            Step::Delete => "delete",
            Step::Drop => "drop collection",
        }
    }

    async fn execute(self, store: &dyn DocumentStore, log: &mut OperationLog) -> Result<()> {
        match self {
            Step::InsertOne => {
                store.insert_one(sample_document("test1", 1)).await?;
                log.push("#1 Inserts");
                log.push("\n#1.1 Insert a single document into a collection");
                log.push("Inserted \n{name : \"test1\", value : 1}");
            }
            Step::InsertMany => {
                log.push("#1.2 Insert documents into a collection");
                store
                    .insert_many(vec![
                        sample_document("test1", 11),
                        sample_document("test2", 2),
                        sample_document("test3", 3),
                    ])
                    .await?;
                log.push(
                    "Inserted \n{name : \"test1\", value : 11}\n{name : \"test2\", value : 2}\n{name : \"test3\", value : 3}",
                );
            }
            Step::FindOne => {
                let found = store.find_one(doc! { "name": "test1" }).await?;
                log.push("#2 Queries");
                log.push("#2.1 Find one document in a collection that matches a query condition");
                log.push("Query result for find one of name test1:");
                log.push(optional_document_json(found.as_ref()));
            }
            Step::FindByName => {
                let results = store.find(doc! { "name": "test1" }).await?;
                log.push("#2.2 Find documents in a collection that matches query condition");
                log.push("Query result for find all of name test1:");
                for doc in &results {
                    log.push(format!("Docs -> {}", document_json(doc)));
                }
            }
            Step::FindAll => {
                let results = store.find(doc! {}).await?;
                log.push("#2.3 Find all documents in a collection");
                log.push("Query result for find:");
                for doc in &results {
                    log.push(format!("Docs -> {}", document_json(doc)));
                }
            }
            Step::Update => {
                log.push("#3 Update documents in a collection");
                let modified = store
                    .update_one(doc! { "name": "test2" }, doc! { "$set": { "value": 9 } })
                    .await?;
                tracing::debug!(modified, "Updated test2");
                log.push("Updated test2 with value 9");
            }
            Step::Delete => {
                log.push("#4 Delete documents in a collection");
                let deleted = store.delete_many(doc! { "name": "test3" }).await?;
                tracing::debug!(deleted, "Removed test3");
                log.push("Removed test3 from collection");
            }
            Step::Drop => {
                log.push("#5 Drop a collection");
                store.drop_collection().await?;
                log.push("Collection dropped");
            }
        }

        Ok(())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A step failed; the run stopped there
#[derive(Debug, thiserror::Error)]
#[error("step '{step}' failed: {source}")]
pub struct SequenceError {
    pub step: Step,
    /// Entries recorded before the failure
    pub log: OperationLog,
    #[source]
    pub source: anyhow::Error,
}

/// Run the full tour against `store`
pub async fn run_sequence(store: &dyn DocumentStore) -> Result<OperationLog, SequenceError> {
    run_steps(store, &Step::ALL).await
}

/// Run `steps` in order, stopping at the first failure
///
/// The store is closed once the steps finish, whether or not they succeeded.
pub async fn run_steps(
    store: &dyn DocumentStore,
    steps: &[Step],
) -> Result<OperationLog, SequenceError> {
    let span = tracing::info_span!(
        "run_sequence",
        run_id = %Uuid::new_v4(),
        collection = %store.collection_name()
    );

    async move {
        let mut log = OperationLog::new();
        let mut outcome = Ok(());

        for &step in steps {
            tracing::debug!(step = %step, "Running step");
            if let Err(source) = step.execute(store, &mut log).await {
                tracing::error!(step = %step, "Step failed: {:#}", source);
                outcome = Err((step, source));
                break;
            }
        }

        if let Err(e) = store.close().await {
            tracing::warn!("Failed to close store: {:#}", e);
        }

        match outcome {
            Ok(()) => {
                tracing::info!(entries = log.len(), "Sequence complete");
                Ok(log)
            }
            Err((step, source)) => Err(SequenceError { step, log, source }),
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryConnector, MemoryStore};
    use crate::store::QueryResults;
    use mongodb::bson::Document;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const COLLECTION: &str = "nodeMongo";

    #[tokio::test]
    async fn test_full_sequence_log() {
        let connector = MemoryConnector::new();
        let store = connector.store(COLLECTION);

        let log = run_sequence(&store).await.unwrap();
        let entries = log.entries();

        let headings = [
            "#1 Inserts",
            "#2 Queries",
            "#3 Update documents in a collection",
            "#4 Delete documents in a collection",
            "#5 Drop a collection",
        ];
        let positions: Vec<usize> = headings
            .iter()
            .map(|h| entries.iter().position(|e| e == *h).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        // find by name sees both test1 documents, find all sees all four
        let docs: Vec<&String> = entries.iter().filter(|e| e.starts_with("Docs -> ")).collect();
        assert_eq!(docs.len(), 2 + 4);
        assert!(docs[..2].iter().all(|e| e.contains(r#""name":"test1""#)));

        assert_eq!(entries.last().unwrap(), "Collection dropped");
        assert!(!connector.collection_exists(COLLECTION).await);
    }

    #[tokio::test]
    async fn test_store_state_between_steps() {
        let connector = MemoryConnector::new();
        let store = connector.store(COLLECTION);

        run_steps(&store, &Step::ALL[..1]).await.unwrap();
        assert_eq!(connector.documents(COLLECTION).await.len(), 1);

        run_steps(&store, &Step::ALL[1..2]).await.unwrap();
        assert_eq!(connector.documents(COLLECTION).await.len(), 4);

        run_steps(&store, &Step::ALL[2..6]).await.unwrap();
        let docs = connector.documents(COLLECTION).await;
        let test2 = docs
            .iter()
            .find(|d| matches!(d.get_str("name"), Ok("test2")))
            .unwrap();
        assert_eq!(test2.get_i32("value").unwrap(), 9);

        run_steps(&store, &Step::ALL[6..7]).await.unwrap();
        let docs = connector.documents(COLLECTION).await;
        assert_eq!(docs.len(), 3);
        assert!(!docs.iter().any(|d| matches!(d.get_str("name"), Ok("test3"))));

        run_steps(&store, &Step::ALL[7..]).await.unwrap();
        assert!(!connector.collection_exists(COLLECTION).await);
    }

    #[tokio::test]
    async fn test_find_one_logs_first_match() {
        let store = MemoryStore::new();
        let log = run_steps(&store, &Step::ALL[..3]).await.unwrap();

        let json = log.entries().last().unwrap();
        assert!(json.contains(r#""value":1"#));
        assert!(json.contains(r#""$oid""#));
    }

    /// Delegates to a memory store, failing one chosen step
    struct FailingStore {
        inner: MemoryStore,
        fail_on: Step,
        closed: Arc<AtomicBool>,
    }

    impl FailingStore {
        fn check(&self, step: Step) -> Result<()> {
            if self.fail_on == step {
                anyhow::bail!("injected failure");
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl DocumentStore for FailingStore {
        async fn insert_one(&self, doc: Document) -> Result<()> {
            self.check(Step::InsertOne)?;
            self.inner.insert_one(doc).await
        }

        async fn insert_many(&self, docs: Vec<Document>) -> Result<()> {
            self.check(Step::InsertMany)?;
            self.inner.insert_many(docs).await
        }

        async fn find_one(&self, filter: Document) -> Result<Option<Document>> {
            self.check(Step::FindOne)?;
            self.inner.find_one(filter).await
        }

        async fn find(&self, filter: Document) -> Result<QueryResults> {
            self.check(if filter.is_empty() { Step::FindAll } else { Step::FindByName })?;
            self.inner.find(filter).await
        }

        async fn update_one(&self, filter: Document, update: Document) -> Result<u64> {
            self.check(Step::Update)?;
            self.inner.update_one(filter, update).await
        }

        async fn delete_many(&self, filter: Document) -> Result<u64> {
            self.check(Step::Delete)?;
            self.inner.delete_many(filter).await
        }

        async fn drop_collection(&self) -> Result<()> {
            self.check(Step::Drop)?;
            self.inner.drop_collection().await
        }

        async fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn collection_name(&self) -> &str {
            self.inner.collection_name()
        }
    }

    #[tokio::test]
    async fn test_failure_stops_chain_and_closes() {
        let closed = Arc::new(AtomicBool::new(false));
        let store = FailingStore {
            inner: MemoryStore::new(),
            fail_on: Step::Update,
            closed: closed.clone(),
        };

        let err = run_sequence(&store).await.unwrap_err();
        assert_eq!(err.step, Step::Update);
        assert!(err.to_string().contains("injected failure"));
        assert!(closed.load(Ordering::SeqCst));

        // Nothing after the failing step ran
        let entries = err.log.entries();
        assert!(entries.iter().any(|e| e == "#2.3 Find all documents in a collection"));
        assert!(!entries.iter().any(|e| e == "#4 Delete documents in a collection"));
        assert!(!entries.iter().any(|e| e == "Updated test2 with value 9"));

        // test3 was never deleted
        let remaining = store.inner.find(doc! { "name": "test3" }).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn test_first_step_failure_logs_nothing() {
        let store = FailingStore {
            inner: MemoryStore::new(),
            fail_on: Step::InsertOne,
            closed: Arc::new(AtomicBool::new(false)),
        };

        let err = run_sequence(&store).await.unwrap_err();
        assert_eq!(err.step, Step::InsertOne);
        assert!(err.log.is_empty());
    }

    #[test]
    fn test_step_order() {
        assert_eq!(Step::ALL.first(), Some(&Step::InsertOne));
        assert_eq!(Step::ALL.last(), Some(&Step::Drop));
        assert_eq!(Step::FindByName.to_string(), "find by name");
    }
}
