#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging.

/// Tracing target for database connection operations.
///
/// Use this target for logging connection establishment, pool management, and connection errors.
pub const TRACING_TARGET_CONNECTION: &str = "keypage_postgres::connection";

/// Tracing target for database query operations.
///
/// Use this target for logging rendered statements, row counts, and query-related errors.
pub const TRACING_TARGET_QUERY: &str = "keypage_postgres::queries";

mod client;
pub mod error;
pub mod query;
mod sql;

pub use diesel_async::AsyncPgConnection as PgConnection;

pub use crate::client::{ConnectionPool, PgClient, PgConfig, PgConn, PooledConnection};
pub use crate::error::{PgError, PgResult};
pub use crate::query::{PaginationRepository, PgExistenceResolver};
pub use crate::sql::{
    RenderedSql, SqlQuery, quote_identifier, validate_base_query, validate_column_name,
};
