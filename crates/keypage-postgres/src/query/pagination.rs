//! Execution of paginated queries over a PostgreSQL connection.

use std::future::Future;

use diesel::QueryableByName;
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery as RawSqlQuery};
use diesel::sql_types::{self, BigInt, Bool, Double, Nullable, Numeric, Text, Timestamptz};
use diesel_async::RunQueryDsl;
use keypage_core::{Direction, PageResult, QueryPaginator, Queryable, Value};

use crate::{PgConnection, PgError, PgResult, RenderedSql, SqlQuery, TRACING_TARGET_QUERY};

type BoundQuery = BoxedSqlQuery<'static, Pg, RawSqlQuery>;

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

#[derive(QueryableByName)]
struct ExistsRow {
    #[diesel(sql_type = Bool)]
    exists: bool,
}

/// Repository for executing keyset-paginated queries.
///
/// Rows are loaded by column name, so `E` must derive
/// [`QueryableByName`] with fields matching the base query's output columns.
pub trait PaginationRepository {
    /// Loads the rows of `query` in order.
    fn load_rows<E>(&mut self, query: &SqlQuery<E>) -> impl Future<Output = PgResult<Vec<E>>> + Send
    where
        E: QueryableByName<Pg> + Send + 'static;

    /// Counts the rows matching the filters of `query`.
    fn count_rows<E>(&mut self, query: &SqlQuery<E>) -> impl Future<Output = PgResult<usize>> + Send;

    /// Returns whether any row matches the filters of `query`.
    fn rows_exist<E>(&mut self, query: &SqlQuery<E>) -> impl Future<Output = PgResult<bool>> + Send;

    /// Fetches one page and the tokens around it.
    ///
    /// Behaves like [`QueryPaginator::page`], executing every statement on
    /// this connection.
    fn fetch_page<E>(
        &mut self,
        paginator: &QueryPaginator<E, SqlQuery<E>>,
        token: Option<&str>,
    ) -> impl Future<Output = keypage_core::Result<PageResult<E>>> + Send
    where
        E: QueryableByName<Pg> + Send + Sync + 'static;
}

impl PaginationRepository for PgConnection {
    async fn load_rows<E>(&mut self, query: &SqlQuery<E>) -> PgResult<Vec<E>>
    where
        E: QueryableByName<Pg> + Send + 'static,
    {
        let rendered = query.to_sql()?;
        log_statement("load", &rendered);

        let rows = bind_all(rendered)
            .load::<E>(self)
            .await
            .map_err(PgError::from)?;

        tracing::debug!(target: TRACING_TARGET_QUERY, rows = rows.len(), "Loaded rows");
        Ok(rows)
    }

    async fn count_rows<E>(&mut self, query: &SqlQuery<E>) -> PgResult<usize> {
        let rendered = query.to_count_sql()?;
        log_statement("count", &rendered);

        let row = bind_all(rendered)
            .get_result::<CountRow>(self)
            .await
            .map_err(PgError::from)?;

        usize::try_from(row.count)
            .map_err(|_| PgError::Unexpected(format!("invalid row count {}", row.count).into()))
    }

    async fn rows_exist<E>(&mut self, query: &SqlQuery<E>) -> PgResult<bool> {
        let rendered = query.to_exists_sql()?;
        log_statement("exists", &rendered);

        let row = bind_all(rendered)
            .get_result::<ExistsRow>(self)
            .await
            .map_err(PgError::from)?;

        Ok(row.exists)
    }

    async fn fetch_page<E>(
        &mut self,
        paginator: &QueryPaginator<E, SqlQuery<E>>,
        token: Option<&str>,
    ) -> keypage_core::Result<PageResult<E>>
    where
        E: QueryableByName<Pg> + Send + Sync + 'static,
    {
        let decoded = paginator.token_encoder()?.decode(token)?;
        let page_query = paginator.page_query_for(&decoded)?;

        let results = self.load_rows(&page_query).await?;
        let total_count = self.count_rows(paginator.base_query()).await?;

        let direction = paginator.config().direction;
        let (next_anchor, previous_anchor) = anchors(&results, direction);

        let mut next_token = None;
        if let Some(anchor) = next_anchor {
            let adjacent = adjacent_query(paginator, direction, anchor)?;
            if self.rows_exist(&adjacent).await? {
                next_token = Some(paginator.token_from(direction, anchor)?);
            }
        }

        let mut previous_token = None;
        if let Some(anchor) = previous_anchor {
            let adjacent = adjacent_query(paginator, direction.reversed(), anchor)?;
            if self.rows_exist(&adjacent).await? {
                previous_token = Some(paginator.token_from(direction.reversed(), anchor)?);
            }
        }

        let current_token = token.filter(|_| !decoded.is_none()).map(str::to_owned);

        Ok(PageResult::new(results, total_count)
            .with_current_token(current_token)
            .with_previous_token(previous_token)
            .with_next_token(next_token))
    }
}

/// Returns the rows the next and previous tokens continue from.
fn anchors<E>(results: &[E], direction: Direction) -> (Option<&E>, Option<&E>) {
    if direction.is_forward() {
        (<[E]>::last(results), <[E]>::first(results))
    } else {
        (<[E]>::first(results), <[E]>::last(results))
    }
}

/// Returns the base query restricted to rows beyond `anchor` in `direction`.
fn adjacent_query<E>(
    paginator: &QueryPaginator<E, SqlQuery<E>>,
    direction: Direction,
    anchor: &E,
) -> keypage_core::Result<SqlQuery<E>> {
    let predicate = paginator.predicate(direction, &paginator.reference_values(anchor))?;
    Ok(paginator.base_query().clone().filter(predicate))
}

fn log_statement(kind: &'static str, rendered: &RenderedSql) {
    tracing::trace!(
        target: TRACING_TARGET_QUERY,
        kind,
        sql = %rendered.sql,
        binds = rendered.binds.len(),
        "Executing paginated statement"
    );
}

/// Prepares `rendered` with its values bound in placeholder order.
pub(crate) fn bind_all(rendered: RenderedSql) -> BoundQuery {
    let query = diesel::sql_query(rendered.sql).into_boxed::<Pg>();
    rendered.binds.into_iter().fold(query, bind_value)
}

fn bind_value(query: BoundQuery, value: Value) -> BoundQuery {
    match value {
        Value::Null => query.bind::<Nullable<Text>, _>(None::<String>),
        Value::Bool(v) => query.bind::<Bool, _>(v),
        Value::Int(v) | Value::Enum(v) => query.bind::<BigInt, _>(v),
        Value::Float(v) => query.bind::<Double, _>(v),
        Value::Decimal(v) => query.bind::<Numeric, _>(v),
        Value::Text(v) => query.bind::<Text, _>(v),
        Value::Uuid(v) => query.bind::<sql_types::Uuid, _>(v),
        Value::Timestamp(v) => query.bind::<Timestamptz, _>(jiff_diesel::Timestamp::from(v)),
        Value::Date(v) => query.bind::<sql_types::Date, _>(jiff_diesel::Date::from(v)),
    }
}

#[cfg(test)]
mod tests {
    use diesel::debug_query;

    use super::*;

    #[test]
    fn anchors_follow_direction() {
        let rows = vec![1, 2, 3];

        assert_eq!(anchors(&rows, Direction::Forward), (Some(&3), Some(&1)));
        assert_eq!(anchors(&rows, Direction::Backward), (Some(&1), Some(&3)));
        assert_eq!(anchors::<i32>(&[], Direction::Forward), (None, None));
    }

    #[test]
    fn binds_values_in_placeholder_order() {
        let rendered = RenderedSql {
            sql: "SELECT * FROM orders WHERE region = $1 AND id > $2".to_owned(),
            binds: vec![Value::Text("EU".to_owned()), Value::Int(42)],
        };

        let query = bind_all(rendered);
        let debug = debug_query::<Pg, _>(&query).to_string();

        assert!(debug.starts_with("SELECT * FROM orders WHERE region = $1 AND id > $2"));
        assert!(debug.contains("-- binds:"));
    }
}
