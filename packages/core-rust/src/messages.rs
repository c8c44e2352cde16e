//! Wire schemas for REST list endpoints.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` to match the JSON
//! the admin-console backend produces and consumes. Optional fields are
//! omitted from serialized output rather than sent as `null`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::query::{QuerySpec, SortDirection};
use crate::session::Session;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Parameters of one page fetch as sent to a list endpoint.
///
/// Exactly one of `page` / `scroll_id` is populated, depending on the
/// endpoint's pagination style; a token-paginated first fetch carries
/// neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub keywords: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub sort: BTreeMap<String, SortDirection>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub filters: BTreeMap<String, serde_json::Value>,
    /// 1-based page number (offset pagination only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub page: Option<u32>,
    pub page_size: u32,
    /// Opaque continuation token (token pagination only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scroll_id: Option<String>,
    /// Fetch-generation stamp, echoed in server logs for correlation.
    pub session: Session,
}

impl PageRequest {
    /// Builds the wire request for a spec/cursor/session triple.
    #[must_use]
    pub fn from_parts(spec: &QuerySpec, cursor: &Cursor, session: Session) -> Self {
        let (page, scroll_id) = match cursor {
            Cursor::Offset { page, .. } => (Some(*page), None),
            Cursor::Token { token } => (None, token.clone()),
        };
        Self {
            keywords: spec.keywords.clone(),
            sort: spec.sort.clone(),
            filters: spec.filters.clone(),
            page,
            page_size: spec.page_size,
            scroll_id,
            session,
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// One page of results as returned by a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    /// The matching records, in result order.
    pub records: Vec<serde_json::Value>,
    /// Total matching records across all pages. May be absent or
    /// approximate on token-paginated endpoints.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total: Option<u64>,
    /// Whether more pages are available.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub has_more: Option<bool>,
    /// Continuation token for the next page (token pagination only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_cursor: Option<String>,
}

/// Application-level error envelope returned on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
}
