//! Payload validation.
//!
//! A [`Validator`] turns an untrusted JSON payload into a typed [`Record`]. It checks the
//! payload shape against the record's [`Schema`] and builds the record from schema fields
//! only, so client-supplied ids (`id`, `_id`) and unknown keys never reach the store.
//! Values are stored with their original case; case folding is a query concern.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{error::RecordStoreResult, record::{Record, RecordExt}};

/// Rejection reasons for an incoming payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("body of request contained bad or no data")]
    NotAMapping,
    #[error("missing {0}")]
    MissingField(String),
    #[error("field {field} must be a {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },
    #[error("field {0} must not be blank")]
    BlankField(String),
}

/// The value type a schema field must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
}

impl FieldKind {
    fn name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Bool => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Bool => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// The identity field must always be present and non-blank.
    pub identity: bool,
}

impl FieldSpec {
    pub const fn string(name: &'static str) -> Self {
        Self { name, kind: FieldKind::String, identity: false }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Bool, identity: false }
    }

    pub const fn identity(name: &'static str) -> Self {
        Self { name, kind: FieldKind::String, identity: true }
    }
}

/// The ordered field list of a record type.
#[derive(Debug)]
pub struct Schema {
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }
}

/// Which schema fields a payload must carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaVariant {
    /// Every schema field is required.
    #[default]
    Strict,
    /// Only the identity field is required; other fields fall back to record defaults.
    Minimal,
}

impl SchemaVariant {
    fn requires(self, spec: &FieldSpec) -> bool {
        spec.identity || self == SchemaVariant::Strict
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    variant: SchemaVariant,
}

impl Validator {
    pub fn new(variant: SchemaVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    /// Validates a payload and builds a transient record from it.
    ///
    /// Fails on the first missing required field in schema order.
    pub fn validate<R: Record>(&self, payload: &Value) -> RecordStoreResult<R> {
        let object = payload.as_object().ok_or(ValidationError::NotAMapping)?;
        let body = self.check_fields(R::schema(), object)?;

        let mut record = R::from_json(Value::Object(body))?;
        record.clear_id();

        Ok(record)
    }

    /// Re-checks an already typed record before it is persisted.
    pub fn check_record<R: Record>(&self, record: &R) -> RecordStoreResult<()> {
        match record.to_json()? {
            Value::Object(object) => {
                self.check_fields(R::schema(), &object)?;
                Ok(())
            }
            _ => Err(ValidationError::NotAMapping.into()),
        }
    }

    fn check_fields(
        &self,
        schema: &Schema,
        object: &Map<String, Value>,
    ) -> Result<Map<String, Value>, ValidationError> {
        let mut body = Map::with_capacity(schema.fields.len());

        for spec in schema.fields {
            match object.get(spec.name) {
                None | Some(Value::Null) if self.variant.requires(spec) => {
                    return Err(ValidationError::MissingField(spec.name.to_string()));
                }
                None | Some(Value::Null) => {}
                Some(value) if !spec.kind.accepts(value) => {
                    return Err(ValidationError::InvalidType {
                        field: spec.name.to_string(),
                        expected: spec.kind.name(),
                    });
                }
                Some(value) => {
                    if spec.identity && value.as_str().is_some_and(|s| s.trim().is_empty()) {
                        return Err(ValidationError::BlankField(spec.name.to_string()));
                    }
                    body.insert(spec.name.to_string(), value.clone());
                }
            }
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{customer::Customer, error::RecordStoreError, id::RecordId};

    fn full_payload() -> Value {
        json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "address": "12 St James Square",
            "email": "ada@example.com",
            "username": "ada",
            "password": "engine",
            "phone_number": "555-0100",
            "active": true,
        })
    }

    fn validation_error(result: RecordStoreResult<Customer>) -> ValidationError {
        match result {
            Err(RecordStoreError::Validation(err)) => err,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_a_complete_payload() {
        let customer: Customer = Validator::default().validate(&full_payload()).unwrap();

        assert_eq!(customer.username, "ada");
        assert_eq!(customer.address, "12 St James Square");
        assert!(customer.active);
        assert_eq!(customer.id, None);
    }

    #[test]
    fn rejects_non_mapping_payloads() {
        for payload in [json!([1, 2]), json!("ada"), json!(null)] {
            let err = validation_error(Validator::default().validate(&payload));
            assert_eq!(err, ValidationError::NotAMapping);
        }
    }

    #[test]
    fn empty_payload_names_first_missing_field() {
        let err = validation_error(Validator::default().validate(&json!({})));
        assert_eq!(err, ValidationError::MissingField("first_name".into()));

        let err = validation_error(Validator::new(SchemaVariant::Minimal).validate(&json!({})));
        assert_eq!(err, ValidationError::MissingField("username".into()));
    }

    #[test]
    fn strict_variant_requires_every_field() {
        let mut payload = full_payload();
        payload.as_object_mut().unwrap().remove("phone_number");

        let err = validation_error(Validator::default().validate(&payload));
        assert_eq!(err, ValidationError::MissingField("phone_number".into()));
    }

    #[test]
    fn minimal_variant_only_requires_username() {
        let customer: Customer = Validator::new(SchemaVariant::Minimal)
            .validate(&json!({ "username": "ker" }))
            .unwrap();

        assert_eq!(customer.username, "ker");
        assert_eq!(customer.email, "");
        assert!(customer.active);
    }

    #[test]
    fn rejects_blank_username_and_wrong_types() {
        let mut payload = full_payload();
        payload["username"] = json!("   ");
        let err = validation_error(Validator::default().validate(&payload));
        assert_eq!(err, ValidationError::BlankField("username".into()));

        let mut payload = full_payload();
        payload["active"] = json!("yes");
        let err = validation_error(Validator::default().validate(&payload));
        assert_eq!(
            err,
            ValidationError::InvalidType { field: "active".into(), expected: "boolean" }
        );
    }

    #[test]
    fn client_supplied_ids_are_dropped() {
        let mut payload = full_payload();
        payload["id"] = json!(999);
        payload["_id"] = json!("abc");
        payload["favourite_colour"] = json!("teal");

        let customer: Customer = Validator::default().validate(&payload).unwrap();

        assert_eq!(customer.id, None);
    }

    #[test]
    fn raw_case_is_preserved() {
        let mut payload = full_payload();
        payload["username"] = json!("KER");

        let customer: Customer = Validator::default().validate(&payload).unwrap();

        assert_eq!(customer.username, "KER");
    }

    #[test]
    fn check_record_rejects_empty_username() {
        let mut customer = Customer::new("");
        customer.id = Some(RecordId::Int(3));

        assert!(matches!(
            Validator::new(SchemaVariant::Minimal).check_record(&customer),
            Err(RecordStoreError::Validation(ValidationError::BlankField(_)))
        ));
        assert!(Validator::default().check_record(&Customer::new("ker")).is_ok());
    }
}
