//! Main record store interface.
//!
//! A [`RecordStore`] owns exactly one backend and the validator configuration. It is built
//! once per process and shared by handle (for example behind an `Arc`) with every request
//! handler. Per record type it hands out a [`RecordCollection`], which runs the save path
//! (validator → id allocation on first save → backend) and the query engine.
//!
//! # Example
//!
//! ```ignore
//! use reclayer::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! let store = RecordStore::new(InMemoryStore::new());
//! let customers = store.records::<Customer>();
//!
//! let created = customers.create(&payload).await?;
//! let found = customers.find_by(Filters::new().with("username", "ker")).await?;
//! ```

use std::{collections::HashSet, marker::PhantomData};

use serde_json::Value;

use crate::{
    backend::{DynRecordBackend, RecordBackend},
    customer::Customer,
    error::{RecordStoreError, RecordStoreResult},
    id::{IdPolicy, RecordId},
    query::Filters,
    record::{Record, RecordExt, document_id},
    validate::{SchemaVariant, Validator},
};

/// A record store bound to a specific backend implementation.
#[derive(Debug)]
pub struct RecordStore<B: RecordBackend> {
    backend: B,
    validator: Validator,
}

/// A record store whose backend was selected at runtime.
pub type DynRecordStore = RecordStore<Box<dyn DynRecordBackend>>;

impl<B: RecordBackend> RecordStore<B> {
    /// Creates a new record store with the given backend and the strict schema variant.
    pub fn new(backend: B) -> Self {
        Self { backend, validator: Validator::default() }
    }

    /// Sets which schema fields incoming payloads must carry.
    pub fn with_schema_variant(mut self, variant: SchemaVariant) -> Self {
        self.validator = Validator::new(variant);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn id_policy(&self) -> IdPolicy {
        self.backend.id_policy()
    }

    /// Gets the collection of records of type `R`.
    pub fn records<R: Record>(&self) -> RecordCollection<'_, B, R> {
        RecordCollection {
            backend: &self.backend,
            validator: self.validator,
            _record: PhantomData,
        }
    }

    /// Shorthand for `records::<Customer>()`.
    pub fn customers(&self) -> RecordCollection<'_, B, Customer> {
        self.records::<Customer>()
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> RecordStoreResult<()> {
        self.backend.shutdown().await
    }
}

impl RecordStore<Box<dyn DynRecordBackend>> {
    /// Creates a store over a backend trait object.
    pub fn from_dyn(backend: Box<dyn DynRecordBackend>) -> Self {
        RecordStore::new(backend)
    }
}

/// Typed access to the records of one type.
#[derive(Debug)]
pub struct RecordCollection<'a, B: RecordBackend, R: Record> {
    backend: &'a B,
    validator: Validator,
    _record: PhantomData<R>,
}

impl<'a, B: RecordBackend, R: Record> RecordCollection<'a, B, R> {
    /// Returns the name of this collection.
    pub fn name(&self) -> &'static str {
        R::collection_name()
    }

    /// Validates a payload into a transient record without storing it.
    pub fn validate(&self, payload: &Value) -> RecordStoreResult<R> {
        self.validator.validate(payload)
    }

    /// Validates a payload and stores it as a new record.
    ///
    /// Any id-like field in the payload is ignored; the returned record carries the
    /// store-assigned id.
    pub async fn create(&self, payload: &Value) -> RecordStoreResult<R> {
        let record = self.validate(payload)?;
        self.save(record).await
    }

    /// Inserts a transient record or replaces a saved one.
    ///
    /// The record is checked before any id is allocated. Saving a record whose id is
    /// not stored fails with [`RecordStoreError::RecordNotFound`].
    pub async fn save(&self, mut record: R) -> RecordStoreResult<R> {
        self.validator.check_record(&record)?;

        let id = self
            .backend
            .put_record(record.id().cloned(), record.to_body()?, self.name())
            .await?;

        tracing::debug!(collection = self.name(), %id, "record saved");
        record.set_id(id);

        Ok(record)
    }

    /// Finds a record by id.
    pub async fn find(&self, id: &RecordId) -> RecordStoreResult<Option<R>> {
        self.backend
            .get_record(id, self.name())
            .await?
            .map(R::from_bson)
            .transpose()
    }

    /// Replaces the record stored under `id` with a validated payload.
    ///
    /// The id always stays `id`, whatever the payload says. Returns `Ok(None)` when no
    /// record is stored under `id`.
    pub async fn update(&self, id: &RecordId, payload: &Value) -> RecordStoreResult<Option<R>> {
        if self.find(id).await?.is_none() {
            return Ok(None);
        }

        let mut record = self.validate(payload)?;
        record.set_id(id.clone());

        match self.save(record).await {
            Ok(record) => Ok(Some(record)),
            Err(RecordStoreError::RecordNotFound(..)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Deletes a record. Deleting an id that is not stored succeeds.
    pub async fn delete(&self, id: &RecordId) -> RecordStoreResult<()> {
        self.backend.delete_record(id, self.name()).await?;
        tracing::debug!(collection = self.name(), %id, "record deleted");

        Ok(())
    }

    /// Returns every stored record.
    pub async fn all(&self) -> RecordStoreResult<Vec<R>> {
        self.backend
            .all_records(self.name())
            .await?
            .into_iter()
            .map(R::from_bson)
            .collect()
    }

    /// Returns the records matching every filter.
    ///
    /// Each filter produces its own candidate set and the result is their intersection,
    /// in the order of the first set. No filters means every record.
    pub async fn find_by(&self, filters: Filters) -> RecordStoreResult<Vec<R>> {
        if filters.is_empty() {
            return self.all().await;
        }

        let mut exprs = filters.exprs().into_iter();
        let mut matched = match exprs.next() {
            Some(expr) => self.backend.query_records(&expr, self.name()).await?,
            None => Vec::new(),
        };

        for expr in exprs {
            if matched.is_empty() {
                break;
            }

            let candidates = self
                .backend
                .query_records(&expr, self.name())
                .await?
                .iter()
                .filter_map(document_id)
                .collect::<HashSet<_>>();

            matched.retain(|document| {
                document_id(document).is_some_and(|id| candidates.contains(&id))
            });
        }

        matched.into_iter().map(R::from_bson).collect()
    }

    /// Finds the records whose `field` matches `value`.
    pub async fn find_by_field(
        &self,
        field: &str,
        value: impl Into<bson::Bson>,
    ) -> RecordStoreResult<Vec<R>> {
        self.find_by(Filters::new().with(field, value)).await
    }

    /// Removes every record and resets id allocation. Administrative use only.
    pub async fn reset(&self) -> RecordStoreResult<()> {
        self.backend.reset(self.name()).await?;
        tracing::info!(collection = self.name(), "collection reset");

        Ok(())
    }
}

impl<'a, B: RecordBackend> RecordCollection<'a, B, Customer> {
    pub async fn find_by_name(&self, username: &str) -> RecordStoreResult<Vec<Customer>> {
        self.find_by_field("username", username).await
    }

    pub async fn find_by_address(&self, address: &str) -> RecordStoreResult<Vec<Customer>> {
        self.find_by_field("address", address).await
    }

    /// Marks a customer inactive. Returns `Ok(None)` when no customer has this id.
    pub async fn disable(&self, id: &RecordId) -> RecordStoreResult<Option<Customer>> {
        let Some(mut customer) = self.find(id).await? else {
            return Ok(None);
        };

        customer.active = false;

        match self.save(customer).await {
            Ok(customer) => Ok(Some(customer)),
            Err(RecordStoreError::RecordNotFound(..)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

