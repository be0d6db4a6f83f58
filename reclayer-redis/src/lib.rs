//! Redis backend implementation for reclayer.
//!
//! This crate provides the key-value strategy for the `RecordBackend` trait. Records are
//! stored as JSON strings under per-record keys, ids come from an atomic counter in Redis,
//! and attribute lookups are evaluated in-process over the stored records.
//!
//! ```toml
//! [dependencies]
//! reclayer = { version = "x.y.z", features = ["redis"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use reclayer::{backend::RecordBackendBuilder, redis::RedisStore};
//!
//! let store = RedisStore::builder("redis://127.0.0.1:6379").build().await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as reclayer_redis;

pub mod store;

pub use store::{RedisStore, RedisStoreBuilder};
