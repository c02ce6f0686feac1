use anyhow::Result;
use mongodb::bson::Document;

/// Operations the runner performs against a single collection
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, doc: Document) -> Result<()>;
    async fn insert_many(&self, docs: Vec<Document>) -> Result<()>;

    /// First document matching `filter`, if any
    async fn find_one(&self, filter: Document) -> Result<Option<Document>>;

    /// Every document matching `filter`; an empty filter matches all
    async fn find(&self, filter: Document) -> Result<QueryResults>;

    /// Apply `update` (`$set`) to the first match, returning the modified count
    async fn update_one(&self, filter: Document, update: Document) -> Result<u64>;

    /// Remove every match, returning the deleted count
    async fn delete_many(&self, filter: Document) -> Result<u64>;

    async fn drop_collection(&self) -> Result<()>;

    /// Release the underlying connection
    async fn close(&self) -> Result<()>;

    fn collection_name(&self) -> &str;
}

/// Opens a fresh store handle bound to one collection
#[async_trait::async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, url: &str, collection: &str) -> Result<Box<dyn DocumentStore>>;
}

/// Finite result set of a query
///
/// Results are fully materialised, so iteration can be restarted and ends
/// with `None` rather than a sentinel document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResults {
    docs: Vec<Document>,
}

impl QueryResults {
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.docs.iter()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl<'a> IntoIterator for &'a QueryResults {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.iter()
    }
}

impl IntoIterator for QueryResults {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.into_iter()
    }
}

impl FromIterator<Document> for QueryResults {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
