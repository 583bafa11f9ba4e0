//! API response envelopes for song endpoints

use serde::Serialize;

use crate::domain::pagination;
use crate::models::PageMaxQuery;

/// Plain status message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub ok: bool,
    pub msg: String,
}

impl Message {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            ok: true,
            msg: msg.into(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            msg: msg.into(),
        }
    }
}

/// One page of data with the totals needed to request the next one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginator<D> {
    pub ok: bool,
    pub data: D,
    pub page: i64,
    pub amount: i64,
    pub next: bool,
}

impl<D> Paginator<D> {
    pub fn new(data: D, query: PageMaxQuery, amount: i64) -> Self {
        Self {
            ok: true,
            data,
            page: query.page,
            amount,
            next: pagination::has_next(query, amount),
        }
    }
}
