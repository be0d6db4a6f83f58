//! Query translation from reclayer filter expressions to MongoDB query syntax.
//!
//! Case-insensitive equality becomes an anchored, escaped `$regex` with the `i` option, so
//! the match is on the whole value and never on a pattern the caller smuggled in.

use bson::{Bson, Document, doc, oid::ObjectId};

use reclayer_core::{
    error::RecordStoreError,
    query::{Expr, FieldOp, QueryVisitor},
    record::ID_FIELD,
};

/// Name of MongoDB's primary key field.
pub(crate) const MONGO_ID_FIELD: &str = "_id";

/// Translates reclayer query expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    pub(crate) fn translate(expr: &Expr) -> Result<Document, RecordStoreError> {
        MongoQueryTranslator.visit_expr(expr)
    }

    /// The client-visible `id` lives in `_id` as an ObjectId.
    fn id_value(value: &Bson) -> Bson {
        match value {
            Bson::String(key) => match ObjectId::parse_str(key) {
                Ok(oid) => Bson::ObjectId(oid),
                Err(_) => value.clone(),
            },
            _ => value.clone(),
        }
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = RecordStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        if field == ID_FIELD {
            return Ok(doc! { MONGO_ID_FIELD: { "$eq": Self::id_value(value) } });
        }

        Ok(doc! {
            field: match (op, value) {
                (FieldOp::EqIgnoreCase, Bson::String(s)) => doc! {
                    "$regex": format!("^{}$", regex::escape(s)),
                    "$options": "i",
                },
                _ => doc! { "$eq": value },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use reclayer_core::query::{Filter, Filters};

    use super::*;

    #[test]
    fn strings_become_anchored_case_insensitive_regexes() {
        let query = MongoQueryTranslator::translate(&Filter::matching("email", "a.b+c@example.com")).unwrap();

        assert_eq!(
            query,
            doc! { "email": { "$regex": r"^a\.b\+c@example\.com$", "$options": "i" } }
        );
    }

    #[test]
    fn exact_and_non_string_values_use_eq() {
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::matching("active", false)).unwrap(),
            doc! { "active": { "$eq": false } }
        );
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::eq("username", "Ker")).unwrap(),
            doc! { "username": { "$eq": "Ker" } }
        );
    }

    #[test]
    fn id_maps_to_object_id() {
        let oid = ObjectId::new();

        assert_eq!(
            MongoQueryTranslator::translate(&Filter::matching("id", oid.to_hex())).unwrap(),
            doc! { "_id": { "$eq": oid } }
        );
        assert_eq!(
            MongoQueryTranslator::translate(&Filter::matching("id", "not-an-oid")).unwrap(),
            doc! { "_id": { "$eq": "not-an-oid" } }
        );
    }

    #[test]
    fn and_nests_each_filter() {
        let filters = Filters::new().with("address", "NY").with("active", true);

        assert_eq!(
            MongoQueryTranslator::translate(&Filter::and(filters.exprs())).unwrap(),
            doc! {
                "$and": [
                    { "address": { "$regex": "^NY$", "$options": "i" } },
                    { "active": { "$eq": true } },
                ]
            }
        );
    }
}
