//! In-process evaluation of filter expressions against stored documents.
//!
//! Backends without a native query language (the in-memory list, the key-value store)
//! scan their documents and keep the ones this evaluator accepts.

use std::collections::HashMap;

use bson::{Bson, Document};

use crate::{
    error::{RecordStoreError, RecordStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Type-erased, comparable representation of BSON values.
///
/// Integers widen to i64 so an `Int32` filter value matches an `Int64` stored value.
/// Integers only meet f64 when the other side is a `Double`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::Int(a), Comparable::Number(b))
            | (Comparable::Number(b), Comparable::Int(a)) => *a as f64 == *b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Equality with strings compared after lower-casing both sides.
    fn eq_ignore_case(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::String(a), Comparable::String(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => self == other,
        }
    }
}

pub struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> RecordStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Keeps the documents matching `expr`, in their original order.
    ///
    /// Entries that are not documents never match.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Bson>,
        expr: &Expr,
    ) -> RecordStoreResult<Vec<Bson>> {
        let mut matched = Vec::new();

        for bson in documents {
            let Some(document) = bson.as_document() else {
                continue;
            };

            if DocumentEvaluator::new(document).evaluate(expr)? {
                matched.push(bson.clone());
            }
        }

        Ok(matched)
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = RecordStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        match self.document.get(field) {
            Some(field_value) => Ok(match op {
                FieldOp::Eq => Comparable::from(field_value) == Comparable::from(value),
                FieldOp::EqIgnoreCase => {
                    Comparable::from(field_value).eq_ignore_case(&Comparable::from(value))
                }
            }),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;
    use crate::query::{Filter, Filters};

    fn documents() -> Vec<Bson> {
        vec![
            doc! { "id": 1_i64, "city": "NY", "active": true, "username": "ker" }.into(),
            doc! { "id": 2_i64, "city": "NY", "active": false, "username": "Kim" }.into(),
            doc! { "id": 3_i64, "city": "LA", "active": true, "username": "lee" }.into(),
        ]
    }

    fn ids(documents: &[Bson]) -> Vec<i64> {
        documents
            .iter()
            .map(|doc| doc.as_document().unwrap().get_i64("id").unwrap())
            .collect()
    }

    #[test]
    fn strings_match_ignoring_case() {
        let docs = documents();

        let matched = DocumentEvaluator::filter_documents(&docs, &Filter::matching("username", "KER")).unwrap();
        assert_eq!(ids(&matched), vec![1]);

        let matched = DocumentEvaluator::filter_documents(&docs, &Filter::matching("city", "ny")).unwrap();
        assert_eq!(ids(&matched), vec![1, 2]);
    }

    #[test]
    fn exact_operator_keeps_case() {
        let docs = documents();

        let matched = DocumentEvaluator::filter_documents(&docs, &Filter::eq("username", "KER")).unwrap();
        assert!(matched.is_empty());
    }

    #[test]
    fn non_strings_match_exactly() {
        let docs = documents();

        let matched = DocumentEvaluator::filter_documents(&docs, &Filter::matching("active", false)).unwrap();
        assert_eq!(ids(&matched), vec![2]);

        // Int32 filter value against Int64 stored id
        let matched = DocumentEvaluator::filter_documents(&docs, &Filter::matching("id", 3)).unwrap();
        assert_eq!(ids(&matched), vec![3]);
    }

    #[test]
    fn large_integers_compare_exactly() {
        let docs: Vec<Bson> = vec![
            doc! { "id": 9_007_199_254_740_992_i64 }.into(),
            doc! { "id": 9_007_199_254_740_993_i64 }.into(),
        ];

        let matched = DocumentEvaluator::filter_documents(&docs, &Filter::matching("id", 9_007_199_254_740_993_i64)).unwrap();
        assert_eq!(ids(&matched), vec![9_007_199_254_740_993]);

        // Doubles still meet integers
        let matched = DocumentEvaluator::filter_documents(&documents(), &Filter::matching("id", 2.0)).unwrap();
        assert_eq!(ids(&matched), vec![2]);
    }

    #[test]
    fn and_requires_every_filter() {
        let docs = documents();
        let filters = Filters::new().with("city", "NY").with("active", true);

        let matched = DocumentEvaluator::filter_documents(&docs, &Filter::and(filters.exprs())).unwrap();
        assert_eq!(ids(&matched), vec![1]);
    }

    #[test]
    fn missing_fields_never_match() {
        let docs = documents();

        let matched = DocumentEvaluator::filter_documents(&docs, &Filter::matching("email", "")).unwrap();
        assert!(matched.is_empty());
    }
}
