//! In-memory record storage backend for reclayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `RecordBackend` trait.
//! Records are kept in insertion order and ids come from a local counter per collection.
//! Nothing survives a restart, which makes it the backend for development and tests.
//!
//! # Quick Start
//!
//! ```ignore
//! use reclayer::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let store = RecordStore::new(backend);
//!
//!     let customer = store.customers().save(Customer::new("ker")).await?;
//!     assert_eq!(customer.id, Some(RecordId::Int(1)));
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as reclayer_memory;

pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
