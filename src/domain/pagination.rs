//! Page arithmetic shared by row pagination and line pagination
//!
//! Callers validate `page >= 0` and `max >= 1` before getting here.

use crate::constants::{TEXT_PREVIEW_CHARS, TEXT_PREVIEW_ELLIPSIS};
use crate::models::PageMaxQuery;

/// Rows (or lines) to skip for the requested page
pub fn offset(query: PageMaxQuery) -> i64 {
    query.page.saturating_mul(query.max)
}

/// Whether another page exists after the requested one
pub fn has_next(query: PageMaxQuery, total: i64) -> bool {
    query.max.saturating_mul(query.page.saturating_add(1)) < total
}

/// Lyrics preview: the stored prefix, plus an ellipsis when the full text
/// (`full_chars` characters long) did not fit.
pub fn preview_text(mut prefix: String, full_chars: i32) -> String {
    if full_chars > TEXT_PREVIEW_CHARS {
        prefix.push_str(TEXT_PREVIEW_ELLIPSIS);
    }
    prefix
}
