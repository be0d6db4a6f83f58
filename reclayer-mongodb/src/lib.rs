//! MongoDB backend implementation for reclayer.
//!
//! This crate provides a MongoDB-based implementation of the `RecordBackend` trait. It is the
//! document-store strategy: the database assigns record ids and attribute lookups run in
//! MongoDB's query engine.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! reclayer = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The builder takes a connection string and a database name, connects and pings the
//! server. An unreachable server fails the build with `StorageUnavailable`.
//!
//! # Example
//!
//! ```ignore
//! use reclayer::{backend::RecordBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "customers")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as reclayer_mongodb;

pub mod query;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
