//! Paginator construction.

use std::sync::Arc;

use crate::{PaginatorConfig, QueryPaginator, Queryable, Result, TRACING_TARGET_PAGINATOR};

/// Creates paginators from a base query and a shared configuration.
pub trait PaginatorFactory {
    /// Validates `config` and returns a paginator with no ordering columns.
    fn create_paginator<E, Q>(
        &self,
        base_query: Q,
        config: Arc<PaginatorConfig>,
    ) -> Result<QueryPaginator<E, Q>>
    where
        Q: Queryable<E>;
}

/// Factory producing [`QueryPaginator`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPaginatorFactory;

impl DefaultPaginatorFactory {
    /// Creates a new factory.
    pub fn new() -> Self {
        Self
    }
}

impl PaginatorFactory for DefaultPaginatorFactory {
    #[tracing::instrument(skip_all, target = TRACING_TARGET_PAGINATOR)]
    fn create_paginator<E, Q>(
        &self,
        base_query: Q,
        config: Arc<PaginatorConfig>,
    ) -> Result<QueryPaginator<E, Q>>
    where
        Q: Queryable<E>,
    {
        config.validate()?;

        tracing::debug!(
            target: TRACING_TARGET_PAGINATOR,
            page_size = config.page_size,
            direction = %config.direction,
            "Created paginator"
        );

        Ok(QueryPaginator::new(base_query, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Field, MemoryQuery};

    #[derive(Debug, Clone)]
    struct Row {
        id: i64,
    }

    #[test]
    fn validates_configuration() {
        let factory = DefaultPaginatorFactory::new();
        let error = factory
            .create_paginator::<Row, _>(
                MemoryQuery::new(vec![Row { id: 1 }]),
                Arc::new(PaginatorConfig::new(0)),
            )
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn shares_configuration() {
        let config = Arc::new(PaginatorConfig::new(5));
        let factory = DefaultPaginatorFactory::new();

        let rows = MemoryQuery::new(vec![Row { id: 2 }, Row { id: 1 }]);
        let mut first = factory
            .create_paginator(rows.clone(), Arc::clone(&config))
            .expect("valid config");
        let second = factory
            .create_paginator::<Row, _>(rows, Arc::clone(&config))
            .expect("valid config");

        first
            .add_column_ascending(Field::stored("id", |r: &Row| r.id))
            .expect("valid column");

        assert_eq!(first.config(), second.config());
        assert!(second.columns().is_empty());
        assert_eq!(Arc::strong_count(&config), 3);

        let page = first.page(None).expect("page");
        assert_eq!(page.results.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
    }
}
