//! Application constants

use std::time::Duration;

/// Upper bound for a single query or statement against the database
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of characters of lyrics returned by the song detail endpoint
pub const TEXT_PREVIEW_CHARS: i32 = 1024;

/// Appended to a lyrics preview when the full text is longer
pub const TEXT_PREVIEW_ELLIPSIS: &str = "...";

/// Default page size for paginated list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Line delimiter used when splitting lyrics into pages
pub const LINE_DELIMITER: &str = "\n";
