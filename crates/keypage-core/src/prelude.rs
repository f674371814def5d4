//! Prelude module for keypage-core.
//!
//! Re-exports the types needed to configure a paginator and walk pages.
//!
//! ```rust
//! use keypage_core::prelude::*;
//! ```

pub use crate::{
    ContinuationToken, DefaultPaginatorFactory, Direction, Error, ErrorKind, ExistenceResolver,
    Field, Materialize, PageResult, PaginatorConfig, PaginatorFactory, QueryPaginator, Queryable,
    Result, TokenOptions, Value,
};
