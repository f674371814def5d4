#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging.

/// Tracing target for paginator construction and page assembly.
pub const TRACING_TARGET_PAGINATOR: &str = "keypage_core::paginator";

/// Tracing target for continuation token encoding and validation.
pub const TRACING_TARGET_TOKEN: &str = "keypage_core::token";

/// Tracing target for the comparison method registry.
pub const TRACING_TARGET_REGISTRY: &str = "keypage_core::registry";

/// Tracing target for query execution by the bundled providers.
pub const TRACING_TARGET_QUERY: &str = "keypage_core::query";

mod builder;
mod column;
mod comparison;
mod config;
mod direction;
mod error;
mod factory;
mod field;
mod memory;
mod page;
mod paginator;
mod predicate;
mod query;
mod token;
mod value;

pub mod prelude;

pub use crate::column::ColumnDefinition;
pub use crate::comparison::{CompareFn, CompareMethod, ComparisonRegistry};
pub use crate::config::{PaginatorConfig, TokenOptions};
pub use crate::direction::Direction;
pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::factory::{DefaultPaginatorFactory, PaginatorFactory};
pub use crate::field::{Field, MemberKind};
pub use crate::memory::{MemoryExistenceResolver, MemoryQuery};
pub use crate::page::PageResult;
pub use crate::paginator::QueryPaginator;
pub use crate::predicate::{CompareOp, Operand, Parameter, Predicate};
pub use crate::query::{ExistenceResolver, Materialize, Queryable};
pub use crate::token::{ContinuationToken, TokenEncoder};
pub use crate::value::{EnumType, Scalar, ScalarType, Value};
