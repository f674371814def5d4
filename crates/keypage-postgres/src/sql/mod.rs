//! Lowering of paginated queries to PostgreSQL.

mod base;
mod identifier;
mod query;
mod render;

pub use base::validate_base_query;
pub use identifier::{quote_identifier, validate_column_name};
pub use query::SqlQuery;
pub use render::RenderedSql;
