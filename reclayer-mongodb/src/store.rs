use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{Client, Collection as MongoCollection, options::ClientOptions};
use reclayer_core::{
    backend::{RecordBackend, RecordBackendBuilder},
    error::{RecordStoreError, RecordStoreResult},
    id::{IdPolicy, RecordId},
    query::Expr,
    record::ID_FIELD,
};

use crate::query::{MONGO_ID_FIELD, MongoQueryTranslator};

/// Logs a failed driver call and turns it into a backend error.
fn backend_error(action: &str, collection: &str, error: mongodb::error::Error) -> RecordStoreError {
    tracing::warn!(collection, error = %error, "mongodb {action} failed");
    RecordStoreError::Backend(format!("mongodb {action} failed: {error}"))
}

/// Record storage backed by a MongoDB database.
///
/// Ids are delegated: MongoDB generates an ObjectId on insert and its hex form becomes the
/// record id. Records come back in `_id` order, which follows insertion order.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(uri: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(uri, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn prepare_document(document: Bson) -> RecordStoreResult<Document> {
        match document {
            Bson::Document(mut document) => {
                document.remove(ID_FIELD);
                document.remove(MONGO_ID_FIELD);
                Ok(document)
            }
            other => Err(RecordStoreError::InvalidRecord(format!(
                "expected a document, got {:?}",
                other.element_type()
            ))),
        }
    }

    /// Swaps the internal `_id` for the client-visible `id`.
    fn restore_document(mut document: Document) -> Bson {
        if let Some(Bson::ObjectId(oid)) = document.remove(MONGO_ID_FIELD) {
            document.insert(ID_FIELD, oid.to_hex());
        }

        Bson::Document(document)
    }

    /// Integer ids and malformed keys can never name a MongoDB record.
    fn object_id(id: &RecordId) -> Option<ObjectId> {
        id.as_key().and_then(|key| ObjectId::parse_str(key).ok())
    }

    async fn find_documents(&self, filter: Document, collection: &str) -> RecordStoreResult<Vec<Bson>> {
        Ok(self
            .get_collection(collection)
            .find(filter)
            .sort(doc! { MONGO_ID_FIELD: 1 })
            .await
            .map_err(|e| backend_error("find", collection, e))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| backend_error("find", collection, e))?
            .into_iter()
            .map(Self::restore_document)
            .collect())
    }
}

#[async_trait]
impl RecordBackend for MongoDbStore {
    fn id_policy(&self) -> IdPolicy {
        IdPolicy::Delegated
    }

    async fn put_record(
        &self,
        id: Option<RecordId>,
        document: Bson,
        collection: &str,
    ) -> RecordStoreResult<RecordId> {
        let document = Self::prepare_document(document)?;

        match id {
            None => {
                let result = self
                    .get_collection(collection)
                    .insert_one(document)
                    .await
                    .map_err(|e| backend_error("insert", collection, e))?;

                match result.inserted_id {
                    Bson::ObjectId(oid) => Ok(RecordId::Key(oid.to_hex())),
                    other => RecordId::try_from(&other).map_err(|_| {
                        RecordStoreError::Backend(format!("unexpected inserted id {other}"))
                    }),
                }
            }
            Some(id) => {
                let not_found = || RecordStoreError::RecordNotFound(id.to_string(), collection.to_string());
                let oid = Self::object_id(&id).ok_or_else(not_found)?;

                let result = self
                    .get_collection(collection)
                    .replace_one(doc! { MONGO_ID_FIELD: oid }, document)
                    .await
                    .map_err(|e| backend_error("replace", collection, e))?;

                if result.matched_count == 0 {
                    return Err(not_found());
                }

                Ok(id)
            }
        }
    }

    async fn get_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<Option<Bson>> {
        let Some(oid) = Self::object_id(id) else {
            return Ok(None);
        };

        Ok(self
            .get_collection(collection)
            .find_one(doc! { MONGO_ID_FIELD: oid })
            .await
            .map_err(|e| backend_error("find", collection, e))?
            .map(Self::restore_document))
    }

    async fn delete_record(&self, id: &RecordId, collection: &str) -> RecordStoreResult<()> {
        let Some(oid) = Self::object_id(id) else {
            return Ok(());
        };

        self.get_collection(collection)
            .delete_one(doc! { MONGO_ID_FIELD: oid })
            .await
            .map_err(|e| backend_error("delete", collection, e))?;

        Ok(())
    }

    async fn all_records(&self, collection: &str) -> RecordStoreResult<Vec<Bson>> {
        self.find_documents(doc! {}, collection).await
    }

    async fn query_records(&self, filter: &Expr, collection: &str) -> RecordStoreResult<Vec<Bson>> {
        self.find_documents(MongoQueryTranslator::translate(filter)?, collection)
            .await
    }

    async fn reset(&self, collection: &str) -> RecordStoreResult<()> {
        self.get_collection(collection)
            .delete_many(doc! {})
            .await
            .map_err(|e| backend_error("delete", collection, e))?;

        Ok(())
    }

    async fn shutdown(self) -> RecordStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[derive(Debug)]
pub struct MongoDbStoreBuilder {
    uri: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(uri: &str, database: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl RecordBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    /// Connects and pings the server, so an unreachable database fails here and not on
    /// the first request.
    async fn build(self) -> RecordStoreResult<Self::Backend> {
        let unavailable = |e: mongodb::error::Error| {
            tracing::warn!(error = %e, "mongodb is unavailable");
            RecordStoreError::StorageUnavailable(e.to_string())
        };

        let client = Client::with_options(ClientOptions::parse(&self.uri).await.map_err(unavailable)?)
            .map_err(unavailable)?;

        client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(unavailable)?;

        tracing::info!(database = %self.database, "mongodb record store initialized");

        Ok(MongoDbStore::new(client, self.database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepared_documents_never_carry_ids() {
        let prepared = MongoDbStore::prepare_document(
            doc! { "id": 999, "_id": "spoofed", "username": "ker" }.into(),
        )
        .unwrap();

        assert_eq!(prepared, doc! { "username": "ker" });
    }

    #[test]
    fn restored_documents_expose_hex_id() {
        let oid = ObjectId::new();
        let restored = MongoDbStore::restore_document(doc! { "_id": oid, "username": "ker" });

        assert_eq!(restored, Bson::Document(doc! { "username": "ker", "id": oid.to_hex() }));
    }

    #[test]
    fn only_object_id_keys_address_records() {
        let oid = ObjectId::new();

        assert_eq!(MongoDbStore::object_id(&RecordId::Key(oid.to_hex())), Some(oid));
        assert_eq!(MongoDbStore::object_id(&RecordId::Int(1)), None);
        assert_eq!(MongoDbStore::object_id(&RecordId::from("nope")), None);
    }
}
