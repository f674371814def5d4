//! Error types for PostgreSQL-backed pagination.

use std::borrow::Cow;

pub use deadpool::managed::TimeoutType;
pub use diesel::result::{ConnectionError as DieselConnectionError, Error as DieselError};
pub use diesel_async::pooled_connection::PoolError as DieselPoolError;
pub use diesel_async::pooled_connection::deadpool::PoolError as DeadpoolError;
use keypage_core::{Error, ErrorKind};

/// Error type for all PostgreSQL pagination operations.
#[derive(Debug, thiserror::Error)]
#[must_use = "database errors should be handled appropriately"]
pub enum PgError {
    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// SQL that cannot be paginated or rendered.
    ///
    /// Raised for base queries with a top-level `ORDER BY` or `LIMIT`,
    /// malformed column references and reversing an unordered query.
    #[error("Invalid SQL: {0}")]
    InvalidSql(Cow<'static, str>),

    /// Database operation timed out.
    #[error("Database operation timed out")]
    Timeout(TimeoutType),

    /// Failed to establish or keep a database connection.
    #[error("Database connection error: {0}")]
    Connection(#[from] DieselConnectionError),

    /// Query execution failed.
    #[error("Database query error: {0}")]
    Query(#[from] DieselError),

    /// The operation was cancelled before it completed.
    #[error("Database operation cancelled")]
    Cancelled,

    /// Unexpected error.
    #[error("Unexpected error: {0}")]
    Unexpected(Cow<'static, str>),
}

impl PgError {
    /// Creates an invalid SQL error.
    pub fn invalid_sql(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidSql(message.into())
    }

    /// Returns whether retrying the operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PgError::Timeout(_) | PgError::Connection(DieselConnectionError::BadConnection(_))
        )
    }

    /// Returns the pagination error kind this error maps to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PgError::Config(_) | PgError::InvalidSql(_) => ErrorKind::Configuration,
            PgError::Cancelled => ErrorKind::Cancelled,
            PgError::Unexpected(_) => ErrorKind::Internal,
            PgError::Timeout(_) | PgError::Connection(_) | PgError::Query(_) => ErrorKind::Query,
        }
    }
}

impl From<DeadpoolError> for PgError {
    fn from(value: DeadpoolError) -> Self {
        match value {
            DeadpoolError::Timeout(timeout) => Self::Timeout(timeout),
            DeadpoolError::Backend(DieselPoolError::QueryError(error)) => Self::Query(error),
            DeadpoolError::Backend(DieselPoolError::ConnectionError(error)) => {
                Self::Connection(error)
            }
            DeadpoolError::PostCreateHook(err) => Self::Unexpected(err.to_string().into()),
            DeadpoolError::NoRuntimeSpecified => {
                tracing::error!("No tokio runtime specified for connection pool");
                Self::Unexpected("No runtime specified".into())
            }
            DeadpoolError::Closed => Self::Connection(DieselConnectionError::InvalidConnectionUrl(
                "Connection pool is closed".into(),
            )),
        }
    }
}

impl From<PgError> for Error {
    fn from(value: PgError) -> Self {
        let transient = value.is_transient();
        Error::new(value.kind())
            .with_message(value.to_string())
            .with_transient(transient)
            .with_source(value)
    }
}

/// Specialized [`Result`] type for PostgreSQL pagination operations.
pub type PgResult<T, E = PgError> = Result<T, E>;
