use indexmap::IndexMap;

use crate::common::Value;

/// One filter predicate over a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Equality against a single value.
    Eq(Value),
    /// Inequality against a single value.
    NotEq(Value),
    /// Membership in a value list, rendered as `IN (?, ...)`.
    In(Vec<Value>),
    /// Exclusion from a value list, rendered as `NOT IN (?, ...)`.
    NotIn(Vec<Value>),
}

/// Ordered set of column predicates, combined with `AND`.
///
/// # Usage
/// ```text
/// let criteria = Criteria::new()
///     .eq("status", "open")
///     .within("customer_id", vec![1.into(), 2.into()]);
/// ```
///
/// Insertion order is preserved, but repositories re-order predicates to
/// the table's declared column order before rendering, so equivalent
/// criteria produce identical SQL.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    entries: IndexMap<String, Criterion>,
}

impl Criteria {
    pub fn new() -> Self {
        Criteria::default()
    }

    /// Requires `field` to equal `value`.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.entries.insert(field.to_string(), Criterion::Eq(value.into()));
        self
    }

    /// Requires `field` to differ from `value`.
    pub fn ne(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.entries
            .insert(field.to_string(), Criterion::NotEq(value.into()));
        self
    }

    /// Requires `field` to be one of `values`.
    pub fn within(mut self, field: &str, values: Vec<Value>) -> Self {
        self.entries.insert(field.to_string(), Criterion::In(values));
        self
    }

    /// Requires `field` to be none of `values`.
    pub fn without(mut self, field: &str, values: Vec<Value>) -> Self {
        self.entries
            .insert(field.to_string(), Criterion::NotIn(values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, field: &str) -> Option<&Criterion> {
        self.entries.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
