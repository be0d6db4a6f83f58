//! Key-value storage of records in Redis.
//!
//! Each collection uses three kinds of keys:
//!
//! - `<collection>:<id>` holds one record body as a JSON string
//! - `<collection>:ids` is the set of stored ids
//! - `<collection>:next_id` is the counter `INCR` draws ids from

use std::fmt;

use async_trait::async_trait;
use bson::{Bson, Document};
use redis::{Client, RedisError, aio::ConnectionManager};
use reclayer_core::{
    backend::{RecordBackend, RecordBackendBuilder},
    error::{RecordStoreError, RecordStoreResult},
    evaluator::DocumentEvaluator,
    id::{IdPolicy, RecordId},
    query::Expr,
    record::ID_FIELD,
};

fn record_key(collection: &str, id: i64) -> String {
    format!("{collection}:{id}")
}

fn ids_key(collection: &str) -> String {
    format!("{collection}:ids")
}

fn counter_key(collection: &str) -> String {
    format!("{collection}:next_id")
}

/// Logs a failed command and turns it into a backend error.
fn backend_error(action: &str, collection: &str, error: RedisError) -> RecordStoreError {
    tracing::warn!(collection, error = %error, "redis {action} failed");
    RecordStoreError::Backend(format!("redis {action} failed: {error}"))
}

fn encode(document: Bson) -> RecordStoreResult<String> {
    match document {
        Bson::Document(mut document) => {
            document.remove(ID_FIELD);
            Ok(serde_json::to_string(&Bson::Document(document))?)
        }
        other => Err(RecordStoreError::InvalidRecord(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Parses a stored body and attaches the id it is stored under.
fn decode(raw: &str, id: i64) -> RecordStoreResult<Bson> {
    let mut document = match serde_json::from_str::<Bson>(raw)? {
        Bson::Document(document) => document,
        _ => Document::new(),
    };

    document.insert(ID_FIELD, Bson::Int64(id));

    Ok(Bson::Document(document))
}

/// Record storage backed by Redis.
///
/// Ids are delegated to an atomic `INCR`, so several processes sharing one Redis never
/// hand out the same id. Records come back in ascending id order.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    url: String,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore").field("url", &self.url).finish_non_exhaustive()
    }
}

impl RedisStore {
    pub fn builder(url: &str) -> RedisStoreBuilder {
        RedisStoreBuilder::new(url)
    }

    fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    async fn stored_ids(&self, collection: &str) -> RecordStoreResult<Vec<i64>> {
        let mut ids: Vec<i64> = redis::cmd("SMEMBERS")
            .arg(ids_key(collection))
            .query_async(&mut self.connection())
            .await
            .map_err(|e| backend_error("read", collection, e))?;

        ids.sort_unstable();

        Ok(ids)
    }
}

#[async_trait]
impl RecordBackend for RedisStore {
    fn id_policy(&self) -> IdPolicy {
        IdPolicy::Delegated
    }

    async fn put_record(
        &self,
        id: Option<RecordId>,
        document: Bson,
        collection: &str,
    ) -> RecordStoreResult<RecordId> {
        let body = encode(document)?;
        let mut connection = self.connection();

        match id {
            None => {
                let id: i64 = redis::cmd("INCR")
                    .arg(counter_key(collection))
                    .query_async(&mut connection)
                    .await
                    .map_err(|e| backend_error("increment", collection, e))?;
                tracing::debug!(collection, id, "allocated redis id");

                redis::pipe()
                    .atomic()
                    .cmd("SET").arg(record_key(collection, id)).arg(body).ignore()
                    .cmd("SADD").arg(ids_key(collection)).arg(id).ignore()
                    .query_async::<()>(&mut connection)
                    .await
                    .map_err(|e| backend_error("write", collection, e))?;

                Ok(RecordId::Int(id))
            }
            Some(id) => {
                let not_found = || RecordStoreError::RecordNotFound(id.to_string(), collection.to_string());
                let key = id.as_int().ok_or_else(not_found)?;

                // XX only overwrites an existing key.
                let replaced: Option<String> = redis::cmd("SET")
                    .arg(record_key(collection, key))
                    .arg(body)
                    .arg("XX")
                    .query_async(&mut connection)
                    .await
                    .map_err(|e| backend_error("write", collection, e))?;

                if replaced.is_none() {
                    return Err(not_found());
                }

                Ok(id)
            }
        }
    }

    async fn get_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<Option<Bson>> {
        let Some(id) = id.as_int() else {
            return Ok(None);
        };

        let raw: Option<String> = redis::cmd("GET")
            .arg(record_key(collection, id))
            .query_async(&mut self.connection())
            .await
            .map_err(|e| backend_error("read", collection, e))?;

        raw.map(|raw| decode(&raw, id)).transpose()
    }

    async fn delete_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<()> {
        let Some(id) = id.as_int() else {
            return Ok(());
        };

        redis::pipe()
            .atomic()
            .cmd("DEL").arg(record_key(collection, id)).ignore()
            .cmd("SREM").arg(ids_key(collection)).arg(id).ignore()
            .query_async::<()>(&mut self.connection())
            .await
            .map_err(|e| backend_error("delete", collection, e))?;

        Ok(())
    }

    async fn all_records(&self, collection: &str) -> RecordStoreResult<Vec<Bson>> {
        let ids = self.stored_ids(collection).await?;

        if ids.is_empty() {
            return Ok(vec![]);
        }

        let bodies: Vec<Option<String>> = redis::cmd("MGET")
            .arg(ids.iter().map(|id| record_key(collection, *id)).collect::<Vec<_>>())
            .query_async(&mut self.connection())
            .await
            .map_err(|e| backend_error("read", collection, e))?;

        // A body can vanish between SMEMBERS and MGET; skip it.
        ids.into_iter()
            .zip(bodies)
            .filter_map(|(id, raw)| raw.map(|raw| decode(&raw, id)))
            .collect()
    }

    async fn query_records(&self, filter: &Expr, collection: &str) -> RecordStoreResult<Vec<Bson>> {
        let records = self.all_records(collection).await?;

        DocumentEvaluator::filter_documents(&records, filter)
    }

    async fn reset(&self, collection: &str) -> RecordStoreResult<()> {
        let keys = self
            .stored_ids(collection)
            .await?
            .into_iter()
            .map(|id| record_key(collection, id))
            .chain([ids_key(collection), counter_key(collection)])
            .collect::<Vec<_>>();

        redis::cmd("DEL")
            .arg(keys)
            .query_async::<()>(&mut self.connection())
            .await
            .map_err(|e| backend_error("delete", collection, e))?;

        Ok(())
    }
}

#[derive(Debug)]
pub struct RedisStoreBuilder {
    url: String,
}

impl RedisStoreBuilder {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string() }
    }
}

#[async_trait]
impl RecordBackendBuilder for RedisStoreBuilder {
    type Backend = RedisStore;

    /// Connects and pings the server, so an unreachable Redis fails here and not on
    /// the first request.
    async fn build(self) -> RecordStoreResult<Self::Backend> {
        let unavailable = |e: RedisError| {
            tracing::warn!(error = %e, "redis is unavailable");
            RecordStoreError::StorageUnavailable(e.to_string())
        };

        let client = Client::open(self.url.as_str()).map_err(unavailable)?;
        let mut connection = client.get_connection_manager().await.map_err(unavailable)?;

        redis::cmd("PING")
            .query_async::<String>(&mut connection)
            .await
            .map_err(unavailable)?;

        tracing::info!("redis record store initialized");

        Ok(RedisStore { connection, url: self.url })
    }
}
