//! Filter construction for record queries.
//!
//! Callers describe a query as a set of [`Filters`]: attribute → value pairs, all of which
//! must hold (logical AND). String values match case-insensitively, everything else matches
//! exactly. Backends receive single-attribute [`Expr`]s and either evaluate them in-process
//! with [`DocumentEvaluator`](crate::evaluator::DocumentEvaluator) or translate them through
//! a [`QueryVisitor`] into a native filter.
//!
//! ```ignore
//! use reclayer::query::Filters;
//!
//! let filters = Filters::new()
//!     .with("address", "NY")
//!     .with("active", true);
//! ```

use bson::Bson;

use crate::{
    error::RecordStoreError,
    id::RecordId,
    record::ID_FIELD,
    validate::{FieldKind, Schema},
};

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Equal to after lower-casing both sides. Only meaningful for strings.
    EqIgnoreCase,
}

/// A filter expression for querying records.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Field comparison expression.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }
}

/// Helper struct for constructing filter expressions.
pub struct Filter;

impl Filter {
    /// Matches records where the field equals the value exactly.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Matches records where the string field equals the value, ignoring case.
    pub fn eq_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Expr {
        Expr::field(field.into(), FieldOp::EqIgnoreCase, Bson::String(value.into()))
    }

    /// The filter used by attribute lookups: case-insensitive for strings, exact otherwise.
    pub fn matching(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        match value.into() {
            Bson::String(value) => Filter::eq_ignore_case(field, value),
            value => Filter::eq(field, value),
        }
    }

    /// Creates a logical AND filter expression.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }
}

/// An ordered set of attribute → value lookups, combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    entries: Vec<(String, Bson)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a lookup, replacing an earlier one on the same attribute.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Bson>) {
        let field = field.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }

    /// Builds filters from raw query-string pairs.
    ///
    /// Values for boolean schema fields are read as booleans (`"true"`/`"false"`, any case),
    /// `id` goes through [`RecordId::parse`], and everything else stays a string.
    pub fn from_query_pairs<K, V>(
        schema: &Schema,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, RecordStoreError>
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut filters = Filters::new();

        for (field, raw) in pairs {
            let field = field.into();
            let raw = raw.as_ref();

            let value = if field == ID_FIELD {
                Bson::from(RecordId::parse(raw))
            } else {
                match schema.field(&field).map(|spec| spec.kind) {
                    Some(FieldKind::Bool) => match raw.to_ascii_lowercase().as_str() {
                        "true" => Bson::Boolean(true),
                        "false" => Bson::Boolean(false),
                        _ => {
                            return Err(RecordStoreError::InvalidRecord(format!(
                                "query value for {field} must be true or false, got {raw}"
                            )));
                        }
                    },
                    _ => Bson::String(raw.to_string()),
                }
            };

            filters.insert(field, value);
        }

        Ok(filters)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bson)> {
        self.entries
            .iter()
            .map(|(field, value)| (field.as_str(), value))
    }

    /// One expression per lookup, each producing its own candidate set.
    pub fn exprs(&self) -> Vec<Expr> {
        self.entries
            .iter()
            .map(|(field, value)| Filter::matching(field.clone(), value.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Bson>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (field, value) in iter {
            filters.insert(field, value);
        }
        filters
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<RecordStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Field { field, op, value } => self.visit_field(field, *op, value),
        }
    }
}
