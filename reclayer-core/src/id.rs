//! Record identifiers and identifier allocation.
//!
//! Two allocation policies exist and exactly one applies per backend:
//!
//! - [`IdPolicy::Local`] - ids come from a [`LocalIdAllocator`], an in-process counter
//!   guarded by an async mutex. Ids start at 1, strictly increase and are never reused,
//!   even after the record holding them is deleted.
//! - [`IdPolicy::Delegated`] - the backend assigns the id at insert time (an atomic
//!   increment or a generated key). Whatever the backend returns is authoritative.

use std::{fmt, str::FromStr};

use bson::Bson;
use mea::mutex::Mutex;
use serde::{Deserialize, Serialize};

/// The identifier of a persisted record.
///
/// Serialized untagged, so it appears on the wire as a plain integer or a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// A numeric id, issued by a local counter or a key-value `INCR`.
    Int(i64),
    /// An opaque id generated by a document store.
    Key(String),
}

impl RecordId {
    /// Parses an id from its textual form.
    ///
    /// An all-digit string becomes [`RecordId::Int`], anything else is kept as an opaque key.
    pub fn parse(value: &str) -> Self {
        match value.parse::<i64>() {
            Ok(id) if !value.starts_with('+') => RecordId::Int(id),
            _ => RecordId::Key(value.to_string()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RecordId::Int(id) => Some(*id),
            RecordId::Key(_) => None,
        }
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            RecordId::Int(_) => None,
            RecordId::Key(key) => Some(key),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{id}"),
            RecordId::Key(key) => f.write_str(key),
        }
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RecordId::parse(s))
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(key: &str) -> Self {
        RecordId::Key(key.to_string())
    }
}

impl From<String> for RecordId {
    fn from(key: String) -> Self {
        RecordId::Key(key)
    }
}

// `Bson::from(&id)` comes from bson's blanket impl over `Clone + Into<Bson>`.
impl From<RecordId> for Bson {
    fn from(id: RecordId) -> Self {
        match id {
            RecordId::Int(id) => Bson::Int64(id),
            RecordId::Key(key) => Bson::String(key),
        }
    }
}

impl TryFrom<&Bson> for RecordId {
    type Error = ();

    fn try_from(value: &Bson) -> Result<Self, Self::Error> {
        match value {
            Bson::Int32(id) => Ok(RecordId::Int(i64::from(*id))),
            Bson::Int64(id) => Ok(RecordId::Int(*id)),
            Bson::String(key) => Ok(RecordId::Key(key.clone())),
            _ => Err(()),
        }
    }
}

/// Which party assigns record ids for a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// Ids are allocated in-process by a [`LocalIdAllocator`].
    Local,
    /// Ids are assigned by the storage backend.
    Delegated,
}

/// Monotonic in-process id allocator.
///
/// The counter sits behind an async mutex so concurrent callers never observe the
/// same value twice. It only goes back to its initial value through [`reset`](Self::reset).
#[derive(Debug)]
pub struct LocalIdAllocator {
    counter: Mutex<i64>,
}

impl Default for LocalIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdAllocator {
    pub fn new() -> Self {
        Self { counter: Mutex::new(0) }
    }

    /// Returns a fresh id, never returned before by this allocator since its last reset.
    pub async fn next(&self) -> RecordId {
        let mut counter = self.counter.lock().await;
        *counter += 1;

        RecordId::Int(*counter)
    }

    /// The last id handed out, or 0 if none has been.
    pub async fn current(&self) -> i64 {
        *self.counter.lock().await
    }

    /// Returns the allocator to its initial state. Administrative use only.
    pub async fn reset(&self) {
        *self.counter.lock().await = 0;
    }
}
