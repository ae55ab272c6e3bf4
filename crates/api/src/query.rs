//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped with [`promptlab_db::clamp_limit`] /
/// [`promptlab_db::clamp_offset`] via [`PaginationParams::resolve`].
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// Clamped `(limit, offset)`.
    pub fn resolve(&self) -> (i64, i64) {
        (
            promptlab_db::clamp_limit(self.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE),
            promptlab_db::clamp_offset(self.offset),
        )
    }
}
