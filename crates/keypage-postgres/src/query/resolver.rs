//! Store-native existence checks for the asynchronous page checks.

use diesel::QueryableByName;
use diesel::pg::Pg;
use keypage_core::{ExistenceResolver, Predicate, Queryable};
use tokio_util::sync::CancellationToken;

use super::PaginationRepository;
use crate::{PgClient, PgError, SqlQuery, TRACING_TARGET_QUERY};

/// Answers existence checks with `SELECT EXISTS` on a pooled connection.
///
/// Pass it to [`QueryPaginator::has_next_page_async`] or
/// [`QueryPaginator::has_previous_page_async`].
///
/// [`QueryPaginator::has_next_page_async`]: keypage_core::QueryPaginator::has_next_page_async
/// [`QueryPaginator::has_previous_page_async`]: keypage_core::QueryPaginator::has_previous_page_async
#[derive(Debug, Clone)]
pub struct PgExistenceResolver {
    client: PgClient,
}

impl PgExistenceResolver {
    /// Creates a resolver backed by `client`.
    pub fn new(client: PgClient) -> Self {
        Self { client }
    }
}

impl<E> ExistenceResolver<E, SqlQuery<E>> for PgExistenceResolver
where
    E: QueryableByName<Pg> + Send + Sync + 'static,
{
    async fn exists(
        &self,
        query: SqlQuery<E>,
        predicate: Predicate<E>,
        cancel: CancellationToken,
    ) -> keypage_core::Result<bool> {
        let query = query.filter(predicate);

        let check = async {
            let mut conn = self.client.get_connection().await?;
            conn.rows_exist(&query).await
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(target: TRACING_TARGET_QUERY, "Existence query cancelled");
                Err(PgError::Cancelled.into())
            }
            result = check => result.map_err(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use diesel::sql_types::BigInt;
    use keypage_core::ErrorKind;

    use super::*;
    use crate::PgConfig;

    #[derive(QueryableByName)]
    struct Row {
        #[diesel(sql_type = BigInt)]
        #[allow(dead_code)]
        id: i64,
    }

    #[tokio::test]
    async fn cancellation_wins_over_connecting() {
        let client = PgConfig::new("postgresql://app@127.0.0.1:1/shop")
            .build()
            .expect("valid config");
        let resolver = PgExistenceResolver::new(client);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let query = SqlQuery::<Row>::new("SELECT id FROM orders").expect("valid base query");
        let error = resolver
            .exists(query, Predicate::And(Vec::new()), cancel)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Cancelled);
    }
}
