//! Main reclayer crate: a customer record store over interchangeable persistence backends.
//!
//! This crate is the primary entry point. It re-exports the core types from the sub-crates,
//! gives access to each storage backend and opens a store from configuration.
//!
//! # Features
//!
//! - **Validated records** - Raw payloads are checked against a schema before anything is stored
//! - **Store-assigned ids** - Ids come from a local counter or from the backend, never from clients
//! - **Multiple backends** - In-memory, MongoDB (`mongodb` feature) and Redis (`redis` feature)
//! - **Attribute lookups** - Case-insensitive filters combined with AND
//!
//! # Quick Start
//!
//! ```ignore
//! use reclayer::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> RecordStoreResult<()> {
//!     let store = RecordStore::new(InMemoryStore::builder().build().await?);
//!     let customers = store.customers();
//!
//!     customers.create(&json!({ "username": "ker", "address": "NY", /* ... */ })).await?;
//!
//!     let found = customers.find_by_name("KER").await?;
//!     assert_eq!(found.len(), 1);
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Choosing a backend at startup
//!
//! [`open_store`] builds whichever backend a [`StoreConfig`](config::StoreConfig) names and
//! returns a [`DynRecordStore`](store::DynRecordStore). The configuration is usually read
//! from the environment:
//!
//! ```ignore
//! use reclayer::{config::StoreConfig, open_store};
//!
//! let store = open_store(&StoreConfig::from_env()?).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB document store (requires `mongodb` feature)
//! - [`redis`] - Redis key-value store (requires `redis` feature)

pub mod prelude;

pub use reclayer_core::{
    backend, config, customer, error, evaluator, id, query, record, store, validate,
};

// Re-export BSON types for convenience
pub use bson;

use reclayer_core::{
    backend::{DynRecordBackend, RecordBackendBuilder},
    config::{BackendConfig, StoreConfig},
    error::{RecordStoreError, RecordStoreResult},
    store::{DynRecordStore, RecordStore},
};

/// In-memory storage backend implementations.
pub mod memory {
    pub use reclayer_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use reclayer_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}

/// Redis storage backend implementations.
///
/// This module is only available when the `redis` feature is enabled.
#[cfg(feature = "redis")]
pub mod redis {
    pub use reclayer_redis::{RedisStore, RedisStoreBuilder};
}

/// Builds the backend named by `config` and wraps it in a store.
///
/// Fails with [`RecordStoreError::StorageUnavailable`] when the backend cannot be reached and
/// with [`RecordStoreError::Configuration`] when it names a backend this build left out.
pub async fn open_store(config: &StoreConfig) -> RecordStoreResult<DynRecordStore> {
    let backend: Box<dyn DynRecordBackend> = match &config.backend {
        BackendConfig::Memory => Box::new(memory::InMemoryStore::builder().build().await?),
        #[cfg(feature = "mongodb")]
        BackendConfig::MongoDb { uri, database } => {
            Box::new(mongodb::MongoDbStore::builder(uri, database).build().await?)
        }
        #[cfg(feature = "redis")]
        BackendConfig::Redis { url } => Box::new(redis::RedisStore::builder(url).build().await?),
        #[allow(unreachable_patterns)]
        other => {
            return Err(RecordStoreError::Configuration(format!(
                "backend {} requires the `{}` feature",
                other.name(),
                other.name()
            )));
        }
    };

    tracing::info!(backend = config.backend.name(), schema = ?config.schema, "record store opened");

    Ok(RecordStore::from_dyn(backend).with_schema_variant(config.schema))
}

/// Resolves the configuration from the environment and opens the store it names.
pub async fn open_store_from_env() -> RecordStoreResult<DynRecordStore> {
    open_store(&StoreConfig::from_env()?).await
}
