//! Store configuration and backend selection.
//!
//! The backend is resolved once, before any store is built, from environment variables.
//! Sources are consulted in order and the first one that names a backend wins:
//!
//! 1. `RECLAYER_BACKEND` (`memory`, `mongodb` or `redis`) forces a backend; its connection
//!    details still come from the sources below, or from local defaults.
//! 2. `VCAP_SERVICES`: a bound service whose name starts with `mongodb` or `redis`.
//! 3. `BINDING_MONGODB` / `BINDING_REDIS`: credential JSON mounted by the orchestrator.
//! 4. `MONGODB_URI` / `REDIS_URL`.
//! 5. The in-memory backend.
//!
//! `RECLAYER_DATABASE` names the MongoDB database and `RECLAYER_SCHEMA` (`strict` or
//! `minimal`) picks the validator's schema variant.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{RecordStoreError, RecordStoreResult},
    validate::SchemaVariant,
};

pub const BACKEND_VAR: &str = "RECLAYER_BACKEND";
pub const DATABASE_VAR: &str = "RECLAYER_DATABASE";
pub const SCHEMA_VAR: &str = "RECLAYER_SCHEMA";
pub const VCAP_SERVICES_VAR: &str = "VCAP_SERVICES";
pub const MONGODB_BINDING_VAR: &str = "BINDING_MONGODB";
pub const REDIS_BINDING_VAR: &str = "BINDING_REDIS";
pub const MONGODB_URI_VAR: &str = "MONGODB_URI";
pub const REDIS_URL_VAR: &str = "REDIS_URL";

pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_DATABASE: &str = "customers";

/// Which persistence strategy backs the store, with its connection details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Memory,
    MongoDb { uri: String, database: String },
    Redis { url: String },
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Memory => "memory",
            BackendConfig::MongoDb { .. } => "mongodb",
            BackendConfig::Redis { .. } => "redis",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub schema: SchemaVariant,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Memory,
            schema: SchemaVariant::default(),
        }
    }
}

/// Connection credentials as found in service bindings.
#[derive(Debug, Default, Deserialize)]
struct Credentials {
    uri: Option<String>,
    url: Option<String>,
    database: Option<String>,
}

impl Credentials {
    fn location(self) -> Option<String> {
        self.uri.or(self.url)
    }
}

#[derive(Debug, Deserialize)]
struct BoundService {
    #[serde(default)]
    credentials: Credentials,
}

/// An external backend a source can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    MongoDb,
    Redis,
}

impl Kind {
    const ALL: [Kind; 2] = [Kind::MongoDb, Kind::Redis];

    /// Lower-case name, also the prefix of a matching VCAP service name.
    fn name(self) -> &'static str {
        match self {
            Kind::MongoDb => "mongodb",
            Kind::Redis => "redis",
        }
    }

    fn binding_var(self) -> &'static str {
        match self {
            Kind::MongoDb => MONGODB_BINDING_VAR,
            Kind::Redis => REDIS_BINDING_VAR,
        }
    }

    fn location_var(self) -> &'static str {
        match self {
            Kind::MongoDb => MONGODB_URI_VAR,
            Kind::Redis => REDIS_URL_VAR,
        }
    }
}

/// What one source says about the backend.
struct Located {
    kind: Kind,
    location: Option<String>,
    database: Option<String>,
}

impl StoreConfig {
    /// Resolves the configuration from the process environment.
    pub fn from_env() -> RecordStoreResult<Self> {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// Resolves the configuration from any variable lookup.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> RecordStoreResult<Self> {
        let schema = match lookup(SCHEMA_VAR).as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("strict") => SchemaVariant::Strict,
            Some("minimal") => SchemaVariant::Minimal,
            Some(other) => {
                return Err(RecordStoreError::Configuration(format!(
                    "unknown schema variant {other}"
                )));
            }
        };

        let forced = match lookup(BACKEND_VAR).map(|name| name.to_ascii_lowercase()) {
            None => None,
            Some(name) if name == "memory" => {
                return Ok(Self { backend: BackendConfig::Memory, schema });
            }
            Some(name) => match Kind::ALL.into_iter().find(|kind| kind.name() == name) {
                Some(kind) => Some(kind),
                None => {
                    return Err(RecordStoreError::Configuration(format!(
                        "unknown backend {name}"
                    )));
                }
            },
        };

        let database = lookup(DATABASE_VAR);

        let backend = match locate(&lookup, forced)? {
            None => BackendConfig::Memory,
            Some(Located { kind: Kind::MongoDb, location, database: bound }) => BackendConfig::MongoDb {
                uri: location.unwrap_or_else(|| DEFAULT_MONGODB_URI.to_string()),
                database: database
                    .or(bound)
                    .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            },
            Some(Located { kind: Kind::Redis, location, .. }) => BackendConfig::Redis {
                url: location.unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            },
        };

        tracing::info!(backend = backend.name(), "resolved store backend");

        Ok(Self { backend, schema })
    }
}

fn locate(
    lookup: &impl Fn(&str) -> Option<String>,
    forced: Option<Kind>,
) -> RecordStoreResult<Option<Located>> {
    let candidates = Kind::ALL
        .into_iter()
        .filter(|kind| forced.is_none_or(|forced| forced == *kind))
        .collect::<Vec<_>>();

    if let Some(raw) = lookup(VCAP_SERVICES_VAR) {
        tracing::info!("reading service bindings from {VCAP_SERVICES_VAR}");
        let services: serde_json::Map<String, Value> = serde_json::from_str(&raw).map_err(|e| {
            RecordStoreError::Configuration(format!("{VCAP_SERVICES_VAR} is not valid JSON: {e}"))
        })?;

        for &kind in &candidates {
            let bound = services
                .iter()
                .find(|(name, _)| name.to_ascii_lowercase().starts_with(kind.name()))
                .map(|(_, entry)| entry);

            if let Some(entry) = bound {
                let credentials = first_service(entry)?.credentials;
                return Ok(Some(Located {
                    kind,
                    database: credentials.database.clone(),
                    location: credentials.location(),
                }));
            }
        }
    }

    for &kind in &candidates {
        let var = kind.binding_var();

        if let Some(raw) = lookup(var) {
            tracing::info!("found {} binding in {var}", kind.name());
            let credentials: Credentials = serde_json::from_str(&raw).map_err(|e| {
                RecordStoreError::Configuration(format!("{var} is not valid credential JSON: {e}"))
            })?;

            return Ok(Some(Located {
                kind,
                database: credentials.database.clone(),
                location: credentials.location(),
            }));
        }
    }

    for &kind in &candidates {
        if let Some(location) = lookup(kind.location_var()) {
            return Ok(Some(Located { kind, location: Some(location), database: None }));
        }
    }

    Ok(forced.map(|kind| Located { kind, location: None, database: None }))
}

/// A VCAP entry is a list of service instances; the first one is used.
fn first_service(entry: &Value) -> RecordStoreResult<BoundService> {
    let instance = match entry {
        Value::Array(instances) => instances.first().cloned(),
        other => Some(other.clone()),
    }
    .ok_or_else(|| RecordStoreError::Configuration("service binding has no instances".into()))?;

    serde_json::from_value(instance)
        .map_err(|e| RecordStoreError::Configuration(format!("malformed service binding: {e}")))
}
