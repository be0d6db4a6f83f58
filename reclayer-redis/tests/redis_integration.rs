//! Redis integration tests.
//!
//! These tests need a running Redis server. Set `RECLAYER_TEST_REDIS_URL` to enable them:
//!
//! ```bash
//! export RECLAYER_TEST_REDIS_URL="redis://localhost:6379"
//! cargo test -p reclayer-redis --test redis_integration
//! ```
//!
//! Each test writes to its own collection so tests can share one server.

use std::{
    env,
    sync::atomic::{AtomicUsize, Ordering},
};

use bson::{Bson, doc};
use reclayer_core::{
    backend::{RecordBackend, RecordBackendBuilder},
    error::RecordStoreError,
    id::{IdPolicy, RecordId},
    query::Filter,
    record::document_id,
};
use reclayer_redis::{RedisStore, RedisStoreBuilder};

const REDIS_URL_ENV: &str = "RECLAYER_TEST_REDIS_URL";

fn get_redis_url() -> Option<String> {
    env::var(REDIS_URL_ENV).ok()
}

macro_rules! require_redis {
    () => {
        match get_redis_url() {
            Some(url) => url,
            None => {
                eprintln!(
                    "Skipping test: {} not set. Set this environment variable to run Redis tests.",
                    REDIS_URL_ENV
                );
                return;
            }
        }
    };
}

fn unique_collection() -> String {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    format!(
        "reclayer_test_{}_{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

async fn open(url: &str) -> (RedisStore, String) {
    let store = RedisStore::builder(url).build().await.unwrap();
    let collection = unique_collection();
    store.reset(&collection).await.unwrap();

    (store, collection)
}

fn body(username: &str, address: &str, active: bool) -> Bson {
    doc! { "username": username, "address": address, "active": active }.into()
}

fn ids(documents: &[Bson]) -> Vec<RecordId> {
    documents.iter().filter_map(document_id).collect()
}

#[tokio::test]
async fn ids_come_from_the_server_counter() {
    let url = require_redis!();
    let (store, collection) = open(&url).await;

    assert_eq!(store.id_policy(), IdPolicy::Delegated);

    let first = store.put_record(None, body("ker", "NY", true), &collection).await.unwrap();
    let second = store.put_record(None, body("kim", "NY", true), &collection).await.unwrap();
    assert_eq!(first, RecordId::Int(1));
    assert_eq!(second, RecordId::Int(2));

    store.delete_record(&second, &collection).await.unwrap();
    let third = store.put_record(None, body("lee", "LA", true), &collection).await.unwrap();
    assert_eq!(third, RecordId::Int(3));

    store.reset(&collection).await.unwrap();
    let after_reset = store.put_record(None, body("ker", "NY", true), &collection).await.unwrap();
    assert_eq!(after_reset, RecordId::Int(1));

    store.reset(&collection).await.unwrap();
}

#[tokio::test]
async fn records_round_trip_with_their_id() {
    let url = require_redis!();
    let (store, collection) = open(&url).await;

    let id = store.put_record(None, body("ker", "NY", true), &collection).await.unwrap();
    let stored = store.get_record(&id, &collection).await.unwrap().unwrap();

    assert_eq!(document_id(&stored), Some(id.clone()));
    assert_eq!(stored.as_document().unwrap().get_str("username").unwrap(), "ker");

    store.put_record(Some(id.clone()), body("ker", "LA", false), &collection).await.unwrap();
    let stored = store.get_record(&id, &collection).await.unwrap().unwrap();
    assert_eq!(stored.as_document().unwrap().get_str("address").unwrap(), "LA");
    assert_eq!(store.all_records(&collection).await.unwrap().len(), 1);

    store.reset(&collection).await.unwrap();
}

#[tokio::test]
async fn missing_ids_are_handled_quietly() {
    let url = require_redis!();
    let (store, collection) = open(&url).await;

    assert!(store.get_record(&RecordId::Int(42), &collection).await.unwrap().is_none());
    assert!(store.get_record(&RecordId::from("abc"), &collection).await.unwrap().is_none());
    store.delete_record(&RecordId::Int(42), &collection).await.unwrap();

    let result = store
        .put_record(Some(RecordId::Int(42)), body("ker", "NY", true), &collection)
        .await;
    assert!(matches!(result, Err(RecordStoreError::RecordNotFound(..))));
    assert!(store.all_records(&collection).await.unwrap().is_empty());
}

#[tokio::test]
async fn queries_evaluate_in_id_order() {
    let url = require_redis!();
    let (store, collection) = open(&url).await;

    for (username, address) in [("ker", "NY"), ("kim", "LA"), ("lee", "ny")] {
        store.put_record(None, body(username, address, true), &collection).await.unwrap();
    }

    let matched = store
        .query_records(&Filter::matching("address", "NY"), &collection)
        .await
        .unwrap();
    assert_eq!(ids(&matched), vec![RecordId::Int(1), RecordId::Int(3)]);

    store.reset(&collection).await.unwrap();
}

#[tokio::test]
async fn unreachable_server_is_storage_unavailable() {
    let _url = require_redis!();

    let result = RedisStoreBuilder::new("redis://127.0.0.1:1").build().await;

    assert!(matches!(result, Err(RecordStoreError::StorageUnavailable(_))));
}
