//! The customer record.

use serde::{Deserialize, Serialize};

use crate::{
    id::RecordId,
    record::Record,
    validate::{FieldSpec, Schema},
};

static CUSTOMER_SCHEMA: Schema = Schema::new(&[
    FieldSpec::string("first_name"),
    FieldSpec::string("last_name"),
    FieldSpec::string("address"),
    FieldSpec::string("email"),
    FieldSpec::identity("username"),
    FieldSpec::string("password"),
    FieldSpec::string("phone_number"),
    FieldSpec::boolean("active"),
]);

/// A customer managed by the record store.
///
/// `username` is the only field whose absence is fatal to a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}

impl Customer {
    /// Creates a transient, active customer with only a username set.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            first_name: String::new(),
            last_name: String::new(),
            address: String::new(),
            email: String::new(),
            username: username.into(),
            password: String::new(),
            phone_number: String::new(),
            active: true,
        }
    }
}

impl Record for Customer {
    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn collection_name() -> &'static str {
        "customers"
    }

    fn schema() -> &'static Schema {
        &CUSTOMER_SCHEMA
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;
    use crate::record::RecordExt;

    #[test]
    fn body_never_carries_the_id() {
        let mut customer = Customer::new("ker");
        customer.set_id(RecordId::Int(4));

        let body = customer.to_body().unwrap();

        assert!(body.as_document().unwrap().get("id").is_none());
        assert_eq!(body.as_document().unwrap().get_str("username").unwrap(), "ker");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let customer = Customer::from_bson(doc! { "id": 2_i64, "username": "ker" }.into()).unwrap();

        assert_eq!(customer.id, Some(RecordId::Int(2)));
        assert!(customer.active);
        assert_eq!(customer.first_name, "");
    }
}
