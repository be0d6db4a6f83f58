//! Persistence adapter abstraction for the record store.
//!
//! This module defines the traits that abstract over the interchangeable storage strategies
//! (in-memory list, document store, key-value store). Exactly one strategy backs a store; it
//! is chosen once at construction and the store never branches on backend identity afterwards.
//!
//! # Traits
//!
//! - [`RecordBackend`]: The core trait for storage backends
//! - [`DynRecordBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`RecordBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Documents
//!
//! Backends exchange records as BSON documents. Documents handed to
//! [`put_record`](RecordBackend::put_record) never carry an id; documents returned by a
//! backend always carry the client-visible `id` field and never a backend-internal key.

use async_trait::async_trait;
use bson::Bson;
use std::fmt::Debug;

use crate::{error::RecordStoreResult, id::{IdPolicy, RecordId}, query::Expr};

/// Abstract interface for record storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. Beyond local id allocation, backends rely on their own consistency
/// guarantees; no additional locking is imposed.
///
/// # Error Handling
///
/// A missing record is never an error: [`get_record`](Self::get_record) returns `Ok(None)`
/// and [`delete_record`](Self::delete_record) succeeds. Failed backend calls are logged and
/// returned as [`RecordStoreError::Backend`](crate::error::RecordStoreError::Backend).
#[async_trait]
pub trait RecordBackend: Send + Sync + Debug {
    /// Which party assigns ids for records stored here.
    fn id_policy(&self) -> IdPolicy;

    /// Inserts or replaces a record.
    ///
    /// With `id` set to `None` the backend assigns a fresh id according to its
    /// [`IdPolicy`] and inserts. With `Some(id)` the stored record is replaced in place;
    /// replacing an id that is not stored fails with
    /// [`RecordStoreError::RecordNotFound`](crate::error::RecordStoreError::RecordNotFound).
    ///
    /// # Returns
    ///
    /// The id the record is stored under.
    async fn put_record(
        &self,
        id: Option<RecordId>,
        document: Bson,
        collection: &str,
    ) -> RecordStoreResult<RecordId>;

    /// Retrieves a record by id, or `None` if it is not stored.
    async fn get_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<Option<Bson>>;

    /// Removes a record. Removing an id that is not stored is a no-op.
    async fn delete_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<()>;

    /// Returns every record in the collection.
    ///
    /// Ordering is backend-specific; see each implementation.
    async fn all_records(&self, collection: &str) -> RecordStoreResult<Vec<Bson>>;

    /// Returns the records matching a filter expression.
    async fn query_records(&self, filter: &Expr, collection: &str) -> RecordStoreResult<Vec<Bson>>;

    /// Removes every record in the collection and returns id allocation to its
    /// initial state. Administrative use only.
    async fn reset(&self, collection: &str) -> RecordStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with external connections
    /// should override this.
    async fn shutdown(self) -> RecordStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait DynRecordBackend: Send + Sync + Debug {
    fn id_policy(&self) -> IdPolicy;
    async fn put_record(
        &self,
        id: Option<RecordId>,
        document: Bson,
        collection: &str,
    ) -> RecordStoreResult<RecordId>;
    async fn get_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<Option<Bson>>;
    async fn delete_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<()>;
    async fn all_records(&self, collection: &str) -> RecordStoreResult<Vec<Bson>>;
    async fn query_records(&self, filter: &Expr, collection: &str) -> RecordStoreResult<Vec<Bson>>;
    async fn reset(&self, collection: &str) -> RecordStoreResult<()>;
    async fn shutdown_boxed(self: Box<Self>) -> RecordStoreResult<()>;
}

#[async_trait]
impl<B: RecordBackend + 'static> DynRecordBackend for B {
    fn id_policy(&self) -> IdPolicy {
        RecordBackend::id_policy(self)
    }

    async fn put_record(
        &self,
        id: Option<RecordId>,
        document: Bson,
        collection: &str,
    ) -> RecordStoreResult<RecordId> {
        RecordBackend::put_record(self, id, document, collection).await
    }

    async fn get_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<Option<Bson>> {
        RecordBackend::get_record(self, id, collection).await
    }

    async fn delete_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<()> {
        RecordBackend::delete_record(self, id, collection).await
    }

    async fn all_records(&self, collection: &str) -> RecordStoreResult<Vec<Bson>> {
        RecordBackend::all_records(self, collection).await
    }

    async fn query_records(&self, filter: &Expr, collection: &str) -> RecordStoreResult<Vec<Bson>> {
        RecordBackend::query_records(self, filter, collection).await
    }

    async fn reset(&self, collection: &str) -> RecordStoreResult<()> {
        RecordBackend::reset(self, collection).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> RecordStoreResult<()> {
        RecordBackend::shutdown(*self).await
    }
}

/// Lets a boxed trait object stand wherever a concrete backend is expected.
#[async_trait]
impl RecordBackend for Box<dyn DynRecordBackend> {
    fn id_policy(&self) -> IdPolicy {
        DynRecordBackend::id_policy(&**self)
    }

    async fn put_record(
        &self,
        id: Option<RecordId>,
        document: Bson,
        collection: &str,
    ) -> RecordStoreResult<RecordId> {
        DynRecordBackend::put_record(&**self, id, document, collection).await
    }

    async fn get_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<Option<Bson>> {
        DynRecordBackend::get_record(&**self, id, collection).await
    }

    async fn delete_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<()> {
        DynRecordBackend::delete_record(&**self, id, collection).await
    }

    async fn all_records(&self, collection: &str) -> RecordStoreResult<Vec<Bson>> {
        DynRecordBackend::all_records(&**self, collection).await
    }

    async fn query_records(&self, filter: &Expr, collection: &str) -> RecordStoreResult<Vec<Bson>> {
        DynRecordBackend::query_records(&**self, filter, collection).await
    }

    async fn reset(&self, collection: &str) -> RecordStoreResult<()> {
        DynRecordBackend::reset(&**self, collection).await
    }

    async fn shutdown(self) -> RecordStoreResult<()> {
        self.shutdown_boxed().await
    }
}

#[async_trait]
pub trait RecordBackendBuilder {
    type Backend: RecordBackend;

    async fn build(self) -> RecordStoreResult<Self::Backend>;
}
