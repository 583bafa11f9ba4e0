//! Shared data models used across modules

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PAGE_SIZE;

/// A song row as returned by the list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Song {
    pub id: i64,
    #[serde(rename = "group")]
    pub group_name: String,
    #[serde(rename = "song")]
    pub name: String,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<NaiveDate>,
    pub link: String,
}

/// A single song with a preview of its lyrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongDetail {
    pub id: i64,
    #[serde(rename = "group")]
    pub group_name: String,
    #[serde(rename = "song")]
    pub name: String,
    pub text: String,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<NaiveDate>,
    pub link: String,
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Page/size pair shared by every paginated query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageMaxQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub max: i64,
}

impl Default for PageMaxQuery {
    fn default() -> Self {
        Self {
            page: 0,
            max: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Filters and pagination for listing songs.
///
/// A filter left as `None` does not restrict the result set. `Some("")` is a
/// concrete value and only matches empty columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SongsQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub max: i64,
    pub group: Option<String>,
    pub song: Option<String>,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<NaiveDate>,
}

impl SongsQuery {
    pub fn pagination(&self) -> PageMaxQuery {
        PageMaxQuery {
            page: self.page,
            max: self.max,
        }
    }
}

impl Default for SongsQuery {
    fn default() -> Self {
        Self {
            page: 0,
            max: DEFAULT_PAGE_SIZE,
            group: None,
            song: None,
            release_date: None,
        }
    }
}

/// Lookup key for a single song
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SongDetailQuery {
    pub group: String,
    pub song: String,
}

/// Body of a create request. Only the release date may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SongCreateQuery {
    pub group: String,
    pub song: String,
    pub text: String,
    pub link: String,
    #[serde(rename = "releaseDate", default)]
    pub release_date: Option<NaiveDate>,
}

/// Partial update: a present field replaces the column, an absent one is left alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SongUpdate {
    pub group: Option<String>,
    pub song: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<NaiveDate>,
    pub link: Option<String>,
}

impl SongUpdate {
    pub fn is_empty(&self) -> bool {
        self.group.is_none()
            && self.song.is_none()
            && self.text.is_none()
            && self.release_date.is_none()
            && self.link.is_none()
    }
}
