//! Convenient re-exports of commonly used types from reclayer.
//!
//! ```ignore
//! use reclayer::prelude::*;
//! ```

pub use reclayer_core::{
    backend::{DynRecordBackend, RecordBackend, RecordBackendBuilder},
    config::{BackendConfig, StoreConfig},
    customer::Customer,
    error::{RecordStoreError, RecordStoreResult},
    id::{IdPolicy, LocalIdAllocator, RecordId},
    query::{Expr, FieldOp, Filter, Filters, QueryVisitor},
    record::{Record, RecordExt},
    store::{DynRecordStore, RecordCollection, RecordStore},
    validate::{FieldKind, FieldSpec, Schema, SchemaVariant, ValidationError, Validator},
};

pub use crate::open_store;
