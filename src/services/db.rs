//! Database executor and transaction utilities
//!
//! Repository functions never talk to `PgPool` or a transaction directly. They
//! take a [`DbExecutor`], which is either the shared pool or the connection of
//! one active [`SongTransaction`], and run every statement through it. Each
//! call is bounded by [`QUERY_TIMEOUT`].
//!
//! # Usage Pattern
//!
//! ```ignore
//! let mut tx = SongTransaction::begin(&state.db).await?;
//!
//! let outcome = songs::get_songs(&mut tx.executor(), &query).await;
//!
//! // Ok commits, Err rolls back; commit/rollback failures are returned.
//! let (rows, amount) = tx.finish(outcome.map_err(ApiError::from)).await?;
//! ```
//!
//! Standalone calls outside a request transaction use the pool directly:
//!
//! ```ignore
//! let exists = songs::check_if_exists(&mut DbExecutor::from(&pool), id).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use sqlx::postgres::{PgArguments, PgQueryResult, PgRow};
use sqlx::query::{Query, QueryAs};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use thiserror::Error;

use crate::constants::QUERY_TIMEOUT;

/// Failure of a repository call
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A keyed lookup matched no row
    #[error("no matching row")]
    NotFound,

    /// The statement did not finish within the per-call timeout
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    /// Connection loss, constraint violation and any other driver error
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            other => RepositoryError::Database(other),
        }
    }
}

/// Run a database future under [`QUERY_TIMEOUT`].
///
/// Hitting the timeout drops the future, which cancels the in-flight statement.
pub async fn bounded<T, F>(query: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(QUERY_TIMEOUT, query).await {
        Ok(result) => result.map_err(RepositoryError::from),
        Err(_) => Err(RepositoryError::Timeout(QUERY_TIMEOUT)),
    }
}

/// Where a repository call runs: the shared pool or one transaction's connection
pub enum DbExecutor<'c> {
    Pool(&'c PgPool),
    Transaction(&'c mut PgConnection),
}

impl<'c> From<&'c PgPool> for DbExecutor<'c> {
    fn from(pool: &'c PgPool) -> Self {
        DbExecutor::Pool(pool)
    }
}

impl DbExecutor<'_> {
    /// Fetch exactly one row; no row is [`RepositoryError::NotFound`]
    pub async fn fetch_one<'q, O>(
        &mut self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<O, RepositoryError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        match self {
            DbExecutor::Pool(pool) => bounded(query.fetch_one(*pool)).await,
            DbExecutor::Transaction(conn) => bounded(query.fetch_one(&mut **conn)).await,
        }
    }

    /// Fetch at most one row
    pub async fn fetch_optional<'q, O>(
        &mut self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<Option<O>, RepositoryError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        match self {
            DbExecutor::Pool(pool) => bounded(query.fetch_optional(*pool)).await,
            DbExecutor::Transaction(conn) => bounded(query.fetch_optional(&mut **conn)).await,
        }
    }

    /// Fetch every row
    pub async fn fetch_all<'q, O>(
        &mut self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<Vec<O>, RepositoryError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        match self {
            DbExecutor::Pool(pool) => bounded(query.fetch_all(*pool)).await,
            DbExecutor::Transaction(conn) => bounded(query.fetch_all(&mut **conn)).await,
        }
    }

    /// Execute a statement that returns no rows
    pub async fn execute<'q>(
        &mut self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Result<PgQueryResult, RepositoryError> {
        match self {
            DbExecutor::Pool(pool) => bounded(query.execute(*pool)).await,
            DbExecutor::Transaction(conn) => bounded(query.execute(&mut **conn)).await,
        }
    }
}

/// One transaction scoped to one inbound request.
///
/// `commit` and `rollback` consume the handle, so each runs at most once and
/// only one of them can run. A handle dropped without either (cancelled
/// request, early return) is rolled back by sqlx.
pub struct SongTransaction {
    tx: Transaction<'static, Postgres>,
}

impl SongTransaction {
    /// Acquire a pooled connection and start a transaction on it
    pub async fn begin(pool: &PgPool) -> Result<Self, RepositoryError> {
        let tx = bounded(pool.begin()).await?;
        tracing::debug!("transaction started");
        Ok(Self { tx })
    }

    /// Executor bound to this transaction
    pub fn executor(&mut self) -> DbExecutor<'_> {
        DbExecutor::Transaction(&mut *self.tx)
    }

    pub async fn commit(self) -> Result<(), RepositoryError> {
        bounded(self.tx.commit()).await?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), RepositoryError> {
        bounded(self.tx.rollback()).await?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    /// Commit on `Ok`, roll back on `Err`.
    ///
    /// A failed commit turns the outcome into an error. A failed rollback is
    /// logged along with the original error and the rollback error is returned.
    pub async fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<RepositoryError> + std::fmt::Display,
    {
        match outcome {
            Ok(value) => {
                if let Err(err) = self.commit().await {
                    tracing::error!(error = %err, "commit failed");
                    return Err(err.into());
                }
                Ok(value)
            }
            Err(err) => match self.rollback().await {
                Ok(()) => Err(err),
                Err(rollback_err) => {
                    tracing::error!(
                        error = %err,
                        rollback_error = %rollback_err,
                        "rollback failed"
                    );
                    Err(rollback_err.into())
                }
            },
        }
    }
}
