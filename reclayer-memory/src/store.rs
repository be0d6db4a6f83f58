//! In-memory storage implementation for record stores.
//!
//! Records live in an ordered list per collection, guarded by an async-safe read-write lock.
//! Ids are allocated locally, one counter per collection.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;

use reclayer_core::{
    backend::{RecordBackend, RecordBackendBuilder},
    error::{RecordStoreError, RecordStoreResult},
    evaluator::DocumentEvaluator,
    id::{IdPolicy, LocalIdAllocator, RecordId},
    query::Expr,
    record::{ID_FIELD, document_id},
};

/// The records of one collection, in insertion order, with their id counter.
#[derive(Debug, Default)]
struct MemoryCollection {
    records: Vec<Bson>,
    allocator: LocalIdAllocator,
}

impl MemoryCollection {
    fn position(&self, id: &RecordId) -> Option<usize> {
        self.records
            .iter()
            .position(|record| document_id(record).as_ref() == Some(id))
    }
}

type StoreMap = HashMap<String, MemoryCollection>;

/// Thread-safe in-memory record storage backend.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Ordering
///
/// Records are returned in insertion order. Replacing a record keeps its position.
///
/// # Example
///
/// ```ignore
/// use reclayer_memory::InMemoryStore;
/// use reclayer::backend::RecordBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let id = store.put_record(None, doc! { "username": "ker" }.into(), "customers").await?;
/// assert_eq!(id, RecordId::Int(1));
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> records
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory record store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    ///
    /// ```ignore
    /// use reclayer_memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::builder().build().await?;
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }
}

fn into_document(document: Bson) -> RecordStoreResult<Document> {
    match document {
        Bson::Document(document) => Ok(document),
        Bson::Null => Ok(Document::new()),
        other => Err(RecordStoreError::InvalidRecord(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}

fn with_id(mut document: Document, id: &RecordId) -> Bson {
    document.insert(ID_FIELD, Bson::from(id));

    Bson::Document(document)
}

#[async_trait]
impl RecordBackend for InMemoryStore {
    fn id_policy(&self) -> IdPolicy {
        IdPolicy::Local
    }

    async fn put_record(
        &self,
        id: Option<RecordId>,
        document: Bson,
        collection: &str,
    ) -> RecordStoreResult<RecordId> {
        let document = into_document(document)?;

        let mut store = self.store.write().await;
        let records = store.entry(collection.to_string()).or_default();

        match id {
            None => {
                let id = records.allocator.next().await;
                tracing::debug!(collection, %id, "allocated local id");
                records.records.push(with_id(document, &id));

                Ok(id)
            }
            Some(id) => {
                let Some(position) = records.position(&id) else {
                    return Err(RecordStoreError::RecordNotFound(
                        id.to_string(),
                        collection.to_string(),
                    ));
                };

                records.records[position] = with_id(document, &id);

                Ok(id)
            }
        }
    }

    async fn get_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<Option<Bson>> {
        let store = self.store.read().await;

        Ok(store
            .get(collection)
            .and_then(|records| records.position(id).map(|at| records.records[at].clone())))
    }

    async fn delete_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<()> {
        let mut store = self.store.write().await;

        if let Some(records) = store.get_mut(collection) {
            records
                .records
                .retain(|record| document_id(record).as_ref() != Some(id));
        }

        Ok(())
    }

    async fn all_records(&self, collection: &str) -> RecordStoreResult<Vec<Bson>> {
        let store = self.store.read().await;

        Ok(store
            .get(collection)
            .map(|records| records.records.clone())
            .unwrap_or_default())
    }

    async fn query_records(&self, filter: &Expr, collection: &str) -> RecordStoreResult<Vec<Bson>> {
        let store = self.store.read().await;

        match store.get(collection) {
            Some(records) => DocumentEvaluator::filter_documents(&records.records, filter),
            None => Ok(vec![]),
        }
    }

    async fn reset(&self, collection: &str) -> RecordStoreResult<()> {
        let mut store = self.store.write().await;

        if let Some(records) = store.get_mut(collection) {
            records.records.clear();
            records.allocator.reset().await;
        }

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl RecordBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Always succeeds with a freshly initialized store.
    async fn build(self) -> RecordStoreResult<Self::Backend> {
        tracing::info!("in-memory record store initialized");
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use reclayer_core::query::Filter;

    use super::*;

    const CUSTOMERS: &str = "customers";

    fn body(username: &str, address: &str) -> Bson {
        doc! { "username": username, "address": address, "active": true }.into()
    }

    fn ids(documents: &[Bson]) -> Vec<RecordId> {
        documents.iter().filter_map(document_id).collect()
    }

    #[tokio::test]
    async fn allocates_sequential_ids_per_collection() {
        let store = InMemoryStore::new();

        let first = store.put_record(None, body("a", "NY"), CUSTOMERS).await.unwrap();
        let second = store.put_record(None, body("b", "NY"), CUSTOMERS).await.unwrap();
        let other = store.put_record(None, body("c", "NY"), "vendors").await.unwrap();

        assert_eq!(first, RecordId::Int(1));
        assert_eq!(second, RecordId::Int(2));
        assert_eq!(other, RecordId::Int(1));
    }

    #[tokio::test]
    async fn replacing_keeps_position_and_count() {
        let store = InMemoryStore::new();
        store.put_record(None, body("a", "NY"), CUSTOMERS).await.unwrap();
        store.put_record(None, body("b", "NY"), CUSTOMERS).await.unwrap();

        let id = store
            .put_record(Some(RecordId::Int(1)), body("a", "LA"), CUSTOMERS)
            .await
            .unwrap();
        assert_eq!(id, RecordId::Int(1));

        let all = store.all_records(CUSTOMERS).await.unwrap();
        assert_eq!(ids(&all), vec![RecordId::Int(1), RecordId::Int(2)]);
        assert_eq!(all[0].as_document().unwrap().get_str("address").unwrap(), "LA");
    }

    #[tokio::test]
    async fn replacing_an_unknown_id_fails() {
        let store = InMemoryStore::new();

        let result = store
            .put_record(Some(RecordId::Int(7)), body("a", "NY"), CUSTOMERS)
            .await;
        assert!(matches!(result, Err(RecordStoreError::RecordNotFound(..))));

        let result = store
            .put_record(Some(RecordId::from("abc")), body("a", "NY"), CUSTOMERS)
            .await;
        assert!(matches!(result, Err(RecordStoreError::RecordNotFound(..))));
    }

    #[tokio::test]
    async fn rejected_bodies_do_not_consume_ids() {
        let store = InMemoryStore::new();

        let result = store
            .put_record(None, Bson::String("ker".into()), CUSTOMERS)
            .await;
        assert!(matches!(result, Err(RecordStoreError::InvalidRecord(_))));

        let id = store.put_record(None, body("a", "NY"), CUSTOMERS).await.unwrap();
        assert_eq!(id, RecordId::Int(1));
    }

    #[tokio::test]
    async fn deleted_ids_are_not_reused() {
        let store = InMemoryStore::new();
        store.put_record(None, body("a", "NY"), CUSTOMERS).await.unwrap();
        store.put_record(None, body("b", "NY"), CUSTOMERS).await.unwrap();

        store.delete_record(&RecordId::Int(2), CUSTOMERS).await.unwrap();
        store.delete_record(&RecordId::Int(2), CUSTOMERS).await.unwrap();
        store.delete_record(&RecordId::Int(1), "missing").await.unwrap();

        let next = store.put_record(None, body("c", "NY"), CUSTOMERS).await.unwrap();
        assert_eq!(next, RecordId::Int(3));
        assert_eq!(store.get_record(&RecordId::Int(2), CUSTOMERS).await.unwrap(), None);
    }

    #[tokio::test]
    async fn query_evaluates_in_insertion_order() {
        let store = InMemoryStore::new();
        store.put_record(None, body("ker", "NY"), CUSTOMERS).await.unwrap();
        store.put_record(None, body("kim", "LA"), CUSTOMERS).await.unwrap();
        store.put_record(None, body("lee", "ny"), CUSTOMERS).await.unwrap();

        let matched = store
            .query_records(&Filter::matching("address", "Ny"), CUSTOMERS)
            .await
            .unwrap();
        assert_eq!(ids(&matched), vec![RecordId::Int(1), RecordId::Int(3)]);

        let matched = store
            .query_records(&Filter::matching("address", "NY"), "missing")
            .await
            .unwrap();
        assert!(matched.is_empty());
    }

    #[tokio::test]
    async fn reset_restarts_allocation() {
        let store = InMemoryStore::builder().build().await.unwrap();
        store.put_record(None, body("a", "NY"), CUSTOMERS).await.unwrap();
        store.put_record(None, body("b", "NY"), CUSTOMERS).await.unwrap();

        store.reset(CUSTOMERS).await.unwrap();
        assert!(store.all_records(CUSTOMERS).await.unwrap().is_empty());

        let id = store.put_record(None, body("c", "NY"), CUSTOMERS).await.unwrap();
        assert_eq!(id, RecordId::Int(1));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryStore::new();
        let handle = store.clone();

        store.put_record(None, body("a", "NY"), CUSTOMERS).await.unwrap();

        assert_eq!(handle.all_records(CUSTOMERS).await.unwrap().len(), 1);
    }
}
