//! Query descriptors identifying one logical list query.
//!
//! A [`QuerySpec`] is the full set of parameters that defines "what is being
//! listed": keywords, sort order, structured filters, and page size. Specs
//! are immutable once handed to the engine; changing any parameter produces
//! a *new* spec, and structural equality decides whether an in-flight fetch
//! is still for the current query.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sort direction for an ordered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Immutable parameters defining one list query.
///
/// Equality is structural, not referential: two specs with identical fields
/// are the same query. Clearing a search box produces a spec with
/// `keywords: ""` and goes through the same reset path as any other change.
///
/// Maps use `BTreeMap` so serialized output (and therefore request query
/// strings) is deterministic for a given spec.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    /// Free-text search keywords. Empty string means "no keyword filter".
    pub keywords: String,
    /// Field name to sort direction, in field-name order.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub sort: BTreeMap<String, SortDirection>,
    /// Structured filter conditions (field name to filter value).
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub filters: BTreeMap<String, serde_json::Value>,
    /// Number of records per fetched page. Must be greater than zero.
    pub page_size: u32,
}

impl QuerySpec {
    /// Creates an empty spec with the given page size.
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            keywords: String::new(),
            sort: BTreeMap::new(),
            filters: BTreeMap::new(),
            page_size,
        }
    }

    /// Returns a copy of this spec with different keywords.
    #[must_use]
    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = keywords.into();
        self
    }

    /// Returns a copy of this spec with an additional sort field.
    #[must_use]
    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.insert(field.into(), direction);
        self
    }

    /// Returns a copy of this spec with an additional filter condition.
    #[must_use]
    pub fn with_filter(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.filters.insert(field.into(), value);
        self
    }
}
