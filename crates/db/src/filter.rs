//! Query expressions evaluated against stored documents.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::{DbError, Document};

/// Predicate over a document's top-level fields.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Matches every document.
    All,
    Eq(String, Value),
    /// Field equals any of the listed values.
    In(String, Vec<Value>),
    /// String field matches the pattern.
    Matches(String, Regex),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn any_of<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Case-insensitive substring match. `needle` is taken literally.
    pub fn contains_ignore_case(field: impl Into<String>, needle: &str) -> Result<Self, DbError> {
        let pattern = RegexBuilder::new(&regex::escape(needle))
            .case_insensitive(true)
            .build()?;
        Ok(Filter::Matches(field.into(), pattern))
    }

    /// Conjunction of the given filters; an empty list matches everything.
    pub fn all_of(filters: Vec<Filter>) -> Self {
        match filters.len() {
            0 => Filter::All,
            1 => filters.into_iter().next().unwrap_or(Filter::All),
            _ => Filter::And(filters),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => doc.get(field) == Some(value),
            Filter::In(field, values) => doc.get(field).is_some_and(|v| values.contains(v)),
            Filter::Matches(field, pattern) => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| pattern.is_match(s)),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort, skip and limit applied to the matched documents, in that order.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    sort: Option<(String, SortDirection)>,
    skip: u64,
    limit: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some((field.into(), direction));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sorts in place. Ties keep insertion order when ascending and reverse
    /// it when descending, so "newest first" holds for equal keys.
    pub(crate) fn sort_documents(&self, docs: &mut [&Document]) {
        let Some((field, direction)) = &self.sort else {
            return;
        };

        match direction {
            SortDirection::Ascending => {
                docs.sort_by(|a, b| compare_values(a.get(field), b.get(field)));
            }
            SortDirection::Descending => {
                docs.reverse();
                docs.sort_by(|a, b| compare_values(b.get(field), a.get(field)));
            }
        }
    }

    pub(crate) fn window<T>(&self, items: Vec<T>) -> Vec<T> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let take = self
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        items.into_iter().skip(skip).take(take).collect()
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over field values: missing < null-like < bool < number < string.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
