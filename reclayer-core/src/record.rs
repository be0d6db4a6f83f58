//! Core traits for record representation and serialization.
//!
//! Every type persisted through a record store implements [`Record`]. A record is
//! transient until its first successful save, at which point the store assigns it an
//! id. From then on saves replace it in place.

use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::{error::RecordStoreResult, id::RecordId, validate::Schema};

/// Name of the client-visible id field in stored documents.
pub const ID_FIELD: &str = "id";

/// Core trait that all records stored in a record store must implement.
///
/// # Example
///
/// ```ignore
/// use reclayer::prelude::*;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Pet {
///     #[serde(default, skip_serializing_if = "Option::is_none")]
///     pub id: Option<RecordId>,
///     pub name: String,
/// }
///
/// impl Record for Pet {
///     fn id(&self) -> Option<&RecordId> { self.id.as_ref() }
///     fn set_id(&mut self, id: RecordId) { self.id = Some(id); }
///     fn clear_id(&mut self) { self.id = None; }
///     fn collection_name() -> &'static str { "pets" }
///     fn schema() -> &'static Schema { &PET_SCHEMA }
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns the id assigned by the store, if the record has been saved.
    fn id(&self) -> Option<&RecordId>;

    /// Assigns the store-issued id.
    fn set_id(&mut self, id: RecordId);

    /// Drops any id, making the record transient again.
    fn clear_id(&mut self);

    /// Returns the name of the collection this record type belongs to.
    fn collection_name() -> &'static str;

    /// Describes the fields the validator checks for this record type.
    fn schema() -> &'static Schema;
}

/// Conversion helpers between records and their BSON/JSON document forms.
///
/// Automatically implemented for all types that implement [`Record`].
pub trait RecordExt: Record {
    /// Converts this record into the document handed to a backend.
    ///
    /// The id is never part of the body; backends attach it themselves.
    fn to_body(&self) -> RecordStoreResult<Bson>;

    /// Builds a record from a document returned by a backend.
    fn from_bson(bson: Bson) -> RecordStoreResult<Self>;

    fn to_json(&self) -> RecordStoreResult<Value>;

    fn from_json(value: Value) -> RecordStoreResult<Self>;
}

impl<R: Record> RecordExt for R {
    fn to_body(&self) -> RecordStoreResult<Bson> {
        let mut body = serialize_to_bson(self)?;

        if let Some(document) = body.as_document_mut() {
            document.remove(ID_FIELD);
        }

        Ok(body)
    }

    fn from_bson(bson: Bson) -> RecordStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> RecordStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> RecordStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// Reads the client-visible id out of a stored document.
pub fn document_id(document: &Bson) -> Option<RecordId> {
    document
        .as_document()?
        .get(ID_FIELD)
        .and_then(|value| RecordId::try_from(value).ok())
}
