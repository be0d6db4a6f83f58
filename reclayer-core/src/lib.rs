//! A small record store that keeps customer records behind one of several interchangeable
//! persistence strategies.
//!
//! This crate is the core of the reclayer project and provides:
//!
//! - **Record traits** ([`record`]) - Core traits for defining and serializing records
//! - **Identifiers** ([`id`]) - Record ids and the local id allocator
//! - **Validation** ([`validate`]) - Schema-driven checks that turn raw payloads into records
//! - **Backend abstraction** ([`backend`]) - Traits for implementing storage strategies
//! - **Query and filtering API** ([`query`]) - Attribute filters combined with AND
//! - **Query evaluation** ([`evaluator`]) - In-process matching for backends without a query language
//! - **Record store** ([`store`]) - Main interface for creating, finding and querying records
//! - **Configuration** ([`config`]) - Backend selection from the environment
//! - **Error handling** ([`error`]) - Error and result types
//! - **Customers** ([`customer`]) - The customer record and its schema
//!
//! # Example
//!
//! ```ignore
//! use reclayer::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! let store = RecordStore::new(InMemoryStore::new());
//! let customers = store.customers();
//!
//! let created = customers
//!     .create(&json!({
//!         "first_name": "Kim",
//!         "last_name": "Lee",
//!         "address": "NY",
//!         "email": "kim@example.com",
//!         "username": "ker",
//!         "password": "secret",
//!         "phone_number": "555-0100",
//!         "active": true,
//!     }))
//!     .await?;
//!
//! assert_eq!(created.id, Some(RecordId::Int(1)));
//! ```

#[allow(unused_extern_crates)]
extern crate self as reclayer_core;

pub mod backend;
pub mod config;
pub mod customer;
pub mod error;
pub mod evaluator;
pub mod id;
pub mod query;
pub mod record;
pub mod store;
pub mod validate;
