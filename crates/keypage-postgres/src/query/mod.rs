//! Database operations for paginated queries.

mod pagination;
mod resolver;

pub use pagination::PaginationRepository;
pub use resolver::PgExistenceResolver;
