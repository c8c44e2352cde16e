//! Pagination position descriptors.
//!
//! A [`Cursor`] marks where the *next* page fetch should resume. Offset
//! endpoints count pages; scroll endpoints hand out opaque tokens that only
//! the server may construct.

use serde::{Deserialize, Serialize};

/// Pagination style supported by a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    /// `(page, page_size)` arithmetic; `has_more` is reconstructed from
    /// the server-reported total.
    Offset,
    /// Opaque server-issued scroll token; `has_more` comes from the server
    /// response directly (totals may be absent or approximate).
    Token,
}

/// Position of the next page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Offset pagination: the next request asks for `page`.
    Offset {
        /// 1-based page number of the next fetch.
        page: u32,
        /// Records per page.
        page_size: u32,
    },
    /// Opaque-token pagination. `None` before the first response and after
    /// the server reports the end of the result set; a `Some` token is
    /// server-supplied and never synthesized by the client.
    Token { token: Option<String> },
}

impl Cursor {
    /// Cursor positioned at the first page for the given pagination style.
    #[must_use]
    pub fn first_page(mode: PaginationMode, page_size: u32) -> Self {
        match mode {
            PaginationMode::Offset => Cursor::Offset { page: 1, page_size },
            PaginationMode::Token => Cursor::Token { token: None },
        }
    }

    /// Advances past a successfully applied page.
    ///
    /// Offset cursors step to the next page number; token cursors adopt the
    /// server-supplied continuation token (which may be `None` at the end).
    pub fn advance(&mut self, next_token: Option<String>) {
        match self {
            Cursor::Offset { page, .. } => *page += 1,
            Cursor::Token { token } => *token = next_token,
        }
    }

    /// Whether this cursor still points at the first page.
    #[must_use]
    pub fn is_first_page(&self) -> bool {
        match self {
            Cursor::Offset { page, .. } => *page == 1,
            Cursor::Token { token } => token.is_none(),
        }
    }

    /// The pagination style this cursor belongs to.
    #[must_use]
    pub fn mode(&self) -> PaginationMode {
        match self {
            Cursor::Offset { .. } => PaginationMode::Offset,
            Cursor::Token { .. } => PaginationMode::Token,
        }
    }
}
