//! Keyset paginator over a composable query.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::builder::PredicateBuilder;
use crate::{
    ColumnDefinition, ContinuationToken, Direction, Error, ExistenceResolver, Field, MemberKind,
    Materialize, PageResult, PaginatorConfig, Predicate, Queryable, Result,
    TRACING_TARGET_PAGINATOR, TokenEncoder, Value,
};

/// Keyset paginator over records of type `E` drawn from a base query `Q`.
///
/// Ordering columns are registered with [`add_column`](Self::add_column)
/// before the paginator is first used. The first call that needs the column
/// set (building a query, a predicate or the token encoder) freezes it, and
/// later attempts to add columns fail with a configuration error.
///
/// The two ordered queries and the token encoder are built once and reused,
/// so a frozen paginator can be shared between threads.
pub struct QueryPaginator<E, Q> {
    base_query: Q,
    config: Arc<PaginatorConfig>,
    columns: Vec<ColumnDefinition<E>>,
    frozen: OnceLock<()>,
    direction_query: OnceLock<Q>,
    reverse_query: OnceLock<Q>,
    token_encoder: OnceLock<TokenEncoder>,
}

impl<E, Q> QueryPaginator<E, Q>
where
    Q: Queryable<E>,
{
    /// Creates a paginator without ordering columns.
    ///
    /// The configuration is expected to be validated; use a
    /// [`PaginatorFactory`](crate::PaginatorFactory) to have that done.
    pub fn new(base_query: Q, config: Arc<PaginatorConfig>) -> Self {
        Self {
            base_query,
            config,
            columns: Vec::new(),
            frozen: OnceLock::new(),
            direction_query: OnceLock::new(),
            reverse_query: OnceLock::new(),
            token_encoder: OnceLock::new(),
        }
    }

    /// Returns the unordered, unfiltered base query.
    #[inline]
    pub fn base_query(&self) -> &Q {
        &self.base_query
    }

    /// Returns the shared configuration.
    #[inline]
    pub fn config(&self) -> &PaginatorConfig {
        &self.config
    }

    /// Returns the ordering columns in priority order.
    #[inline]
    pub fn columns(&self) -> &[ColumnDefinition<E>] {
        &self.columns
    }

    /// Returns whether the column set has been frozen by first use.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }

    /// Appends an ordering column.
    ///
    /// Fails with a configuration error once the paginator has been used,
    /// for computed members, and for names that are not plain identifiers.
    /// The column set is unchanged on failure.
    pub fn add_column(&mut self, field: Field<E>, is_ascending: bool) -> Result<&mut Self> {
        if self.is_frozen() {
            return Err(Error::configuration().with_message(format!(
                "cannot add column '{}' after pagination has started",
                field.name()
            )));
        }

        if field.kind() != MemberKind::Stored {
            return Err(Error::configuration().with_message(format!(
                "column '{}' must be a stored field",
                field.name()
            )));
        }

        if !field.has_valid_name() {
            return Err(Error::configuration()
                .with_message(format!("invalid column name '{}'", field.name())));
        }

        tracing::debug!(
            target: TRACING_TARGET_PAGINATOR,
            column = field.name(),
            scalar_type = %field.scalar_type(),
            nullable = field.is_nullable(),
            is_ascending,
            position = self.columns.len(),
            "Added ordering column"
        );

        self.columns.push(ColumnDefinition::new(field, is_ascending));
        Ok(self)
    }

    /// Appends an ascending ordering column.
    pub fn add_column_ascending(&mut self, field: Field<E>) -> Result<&mut Self> {
        self.add_column(field, true)
    }

    /// Appends a descending ordering column.
    pub fn add_column_descending(&mut self, field: Field<E>) -> Result<&mut Self> {
        self.add_column(field, false)
    }

    /// Returns the token encoder bound to the frozen column set.
    pub fn token_encoder(&self) -> Result<&TokenEncoder> {
        self.freeze()?;
        Ok(self.token_encoder.get_or_init(|| {
            TokenEncoder::new(
                &self.columns,
                self.config.direction,
                self.config.token_options,
            )
        }))
    }

    /// Extracts the ordering column values of `entity`.
    pub fn reference_values(&self, entity: &E) -> Vec<Value> {
        self.columns
            .iter()
            .map(|column| column.field().value(entity))
            .collect()
    }

    /// Builds the predicate selecting records strictly after `values` when
    /// walking in `direction`.
    pub fn predicate(&self, direction: Direction, values: &[Value]) -> Result<Predicate<E>> {
        self.freeze()?;
        PredicateBuilder::new(&self.columns, self.config.use_parameterized_queries)
            .build(direction, values)
    }

    /// Builds the query for the page described by an encoded token.
    ///
    /// A missing or blank token yields the first page in the configured
    /// direction.
    #[tracing::instrument(
        skip_all,
        target = TRACING_TARGET_PAGINATOR,
        fields(has_token = token.is_some())
    )]
    pub fn page_query(&self, token: Option<&str>) -> Result<Q> {
        let token = self.token_encoder()?.decode(token)?;
        self.page_query_for(&token)
    }

    /// Builds the query for the page described by a decoded token.
    ///
    /// Results come back in natural order whichever way the token points.
    pub fn page_query_for(&self, token: &ContinuationToken) -> Result<Q> {
        let direction = token.direction().unwrap_or(self.config.direction);
        let values = token.has_values().then(|| token.values());
        self.windowed_query(direction, values)
    }

    /// Builds the query for the page after `reference` in the configured
    /// direction, or the first page when `reference` is `None`.
    #[tracing::instrument(skip_all, target = TRACING_TARGET_PAGINATOR)]
    pub fn next_page_query(&self, reference: Option<&E>) -> Result<Q> {
        let values = reference.map(|entity| self.reference_values(entity));
        self.windowed_query(self.config.direction, values.as_deref())
    }

    /// Builds the query for the page before `reference`, or the last page
    /// when `reference` is `None`.
    #[tracing::instrument(skip_all, target = TRACING_TARGET_PAGINATOR)]
    pub fn previous_page_query(&self, reference: Option<&E>) -> Result<Q> {
        let values = reference.map(|entity| self.reference_values(entity));
        self.windowed_query(self.config.direction.reversed(), values.as_deref())
    }

    /// Returns whether any record follows `reference` in the configured direction.
    pub fn has_next_page(&self, reference: Option<&E>) -> Result<bool>
    where
        Q: Materialize<E>,
    {
        let (query, predicate) = self.existence_check(self.config.direction, reference)?;
        query.filter(predicate).exists()
    }

    /// Returns whether any record precedes `reference` in the configured direction.
    pub fn has_previous_page(&self, reference: Option<&E>) -> Result<bool>
    where
        Q: Materialize<E>,
    {
        let (query, predicate) =
            self.existence_check(self.config.direction.reversed(), reference)?;
        query.filter(predicate).exists()
    }

    /// Asynchronous [`has_next_page`](Self::has_next_page) through `resolver`.
    ///
    /// Fails with a cancellation error as soon as `cancel` fires.
    pub async fn has_next_page_async<R>(
        &self,
        reference: Option<&E>,
        resolver: &R,
        cancel: CancellationToken,
    ) -> Result<bool>
    where
        R: ExistenceResolver<E, Q>,
    {
        self.resolve_existence(self.config.direction, reference, resolver, cancel)
            .await
    }

    /// Asynchronous [`has_previous_page`](Self::has_previous_page) through `resolver`.
    ///
    /// Fails with a cancellation error as soon as `cancel` fires.
    pub async fn has_previous_page_async<R>(
        &self,
        reference: Option<&E>,
        resolver: &R,
        cancel: CancellationToken,
    ) -> Result<bool>
    where
        R: ExistenceResolver<E, Q>,
    {
        self.resolve_existence(self.config.direction.reversed(), reference, resolver, cancel)
            .await
    }

    /// Encodes a token that continues from `reference` in `direction`.
    pub fn token_from(&self, direction: Direction, reference: &E) -> Result<String> {
        let token = ContinuationToken::new(direction, self.reference_values(reference));
        self.token_encoder()?.encode(&token)
    }

    /// Fetches one page and the tokens around it.
    ///
    /// Results are in natural order. The next token continues from the
    /// boundary record in the configured direction and the previous token
    /// from the opposite boundary; each is present only when records exist
    /// beyond that boundary.
    #[tracing::instrument(
        skip_all,
        target = TRACING_TARGET_PAGINATOR,
        fields(has_token = token.is_some())
    )]
    pub fn page(&self, token: Option<&str>) -> Result<PageResult<E>>
    where
        Q: Materialize<E>,
    {
        let decoded = self.token_encoder()?.decode(token)?;
        let results = self.page_query_for(&decoded)?.to_vec()?;
        let total_count = self.base_query.count()?;

        let direction = self.config.direction;
        let (next_anchor, previous_anchor) = if direction.is_forward() {
            (results.last(), results.first())
        } else {
            (results.first(), results.last())
        };

        let next_token = match next_anchor {
            Some(anchor) if self.has_next_page(Some(anchor))? => {
                Some(self.token_from(direction, anchor)?)
            }
            _ => None,
        };
        let previous_token = match previous_anchor {
            Some(anchor) if self.has_previous_page(Some(anchor))? => {
                Some(self.token_from(direction.reversed(), anchor)?)
            }
            _ => None,
        };

        let current_token = token
            .filter(|_| !decoded.is_none())
            .map(str::to_owned);

        tracing::debug!(
            target: TRACING_TARGET_PAGINATOR,
            results = results.len(),
            total_count,
            has_next = next_token.is_some(),
            has_previous = previous_token.is_some(),
            "Fetched page"
        );

        Ok(PageResult::new(results, total_count)
            .with_current_token(current_token)
            .with_previous_token(previous_token)
            .with_next_token(next_token))
    }

    fn freeze(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::configuration()
                .with_message("at least one ordering column is required"));
        }

        self.frozen.get_or_init(|| {
            tracing::debug!(
                target: TRACING_TARGET_PAGINATOR,
                columns = self.columns.len(),
                "Froze ordering columns"
            );
        });
        Ok(())
    }

    /// Returns the base query ordered for walking in `direction`.
    fn ordered_query(&self, direction: Direction) -> Result<&Q> {
        self.freeze()?;

        let lock = if direction == self.config.direction {
            &self.direction_query
        } else {
            &self.reverse_query
        };

        Ok(lock.get_or_init(|| {
            let mut columns = self.columns.iter();
            let query = match columns.next() {
                Some(first) => first.apply_as_first_order(self.base_query.clone(), direction),
                None => self.base_query.clone(),
            };
            columns.fold(query, |query, column| {
                column.apply_as_subsequent_order(query, direction)
            })
        }))
    }

    fn windowed_query(&self, direction: Direction, values: Option<&[Value]>) -> Result<Q> {
        let mut query = self.ordered_query(direction)?.clone();
        if let Some(values) = values {
            query = query.filter(self.predicate(direction, values)?);
        }

        let query = query.take(self.config.page_size);
        Ok(if direction.is_backward() {
            query.reverse()
        } else {
            query
        })
    }

    fn existence_check(
        &self,
        direction: Direction,
        reference: Option<&E>,
    ) -> Result<(Q, Predicate<E>)> {
        let Some(reference) = reference else {
            return Err(Error::invalid_argument()
                .with_message("a reference record is required to check for adjacent pages"));
        };

        let query = self.ordered_query(direction)?.clone();
        let predicate = self.predicate(direction, &self.reference_values(reference))?;
        Ok((query, predicate))
    }

    async fn resolve_existence<R>(
        &self,
        direction: Direction,
        reference: Option<&E>,
        resolver: &R,
        cancel: CancellationToken,
    ) -> Result<bool>
    where
        R: ExistenceResolver<E, Q>,
    {
        if cancel.is_cancelled() {
            return Err(Error::cancelled().with_message("existence check was cancelled"));
        }

        let (query, predicate) = self.existence_check(direction, reference)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(
                    target: TRACING_TARGET_PAGINATOR,
                    %direction,
                    "Existence check cancelled"
                );
                Err(Error::cancelled().with_message("existence check was cancelled"))
            }
            exists = resolver.exists(query, predicate, cancel.clone()) => exists,
        }
    }
}

impl<E, Q: fmt::Debug> fmt::Debug for QueryPaginator<E, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPaginator")
            .field("base_query", &self.base_query)
            .field("config", &self.config)
            .field("columns", &self.columns)
            .field("frozen", &self.frozen.get().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::{Date, date};

    use super::*;
    use crate::{ErrorKind, MemoryExistenceResolver, MemoryQuery, TokenOptions};

    #[derive(Debug, Clone, PartialEq)]
    struct Order {
        region: String,
        placed: Date,
        id: i64,
    }

    fn order(region: &str, placed: Date, id: i64) -> Order {
        Order {
            region: region.into(),
            placed,
            id,
        }
    }

    fn orders() -> Vec<Order> {
        vec![
            order("B", date(2024, 3, 1), 7),
            order("A", date(2024, 1, 5), 10),
            order("A", date(2024, 1, 9), 3),
            order("C", date(2024, 2, 2), 1),
            order("A", date(2024, 1, 5), 11),
            order("B", date(2024, 3, 1), 2),
            order("A", date(2024, 1, 1), 4),
        ]
    }

    fn region() -> Field<Order> {
        Field::stored("region", |o: &Order| o.region.clone())
    }

    fn placed() -> Field<Order> {
        Field::stored("placed", |o: &Order| o.placed)
    }

    fn id() -> Field<Order> {
        Field::stored("id", |o: &Order| o.id)
    }

    fn paginator(config: PaginatorConfig) -> QueryPaginator<Order, MemoryQuery<Order>> {
        let mut paginator = QueryPaginator::new(MemoryQuery::new(orders()), Arc::new(config));
        paginator
            .add_column_ascending(region())
            .and_then(|p| p.add_column_descending(placed()))
            .and_then(|p| p.add_column_ascending(id()))
            .expect("valid columns");
        paginator
    }

    fn ids(rows: &[Order]) -> Vec<i64> {
        rows.iter().map(|o| o.id).collect()
    }

    // Natural order: (A,01-09,3) (A,01-05,10) (A,01-05,11) (A,01-01,4)
    //                (B,03-01,2) (B,03-01,7) (C,02-02,1)
    const NATURAL: [i64; 7] = [3, 10, 11, 4, 2, 7, 1];

    #[test]
    fn first_page_is_unfiltered_prefix() {
        let paginator = paginator(PaginatorConfig::new(3));
        let first = paginator.page_query(None).expect("query").to_vec().expect("rows");
        assert_eq!(ids(&first), &NATURAL[..3]);

        let blank = paginator.page_query(Some("  ")).expect("query").to_vec().expect("rows");
        assert_eq!(first, blank);
    }

    #[test]
    fn predicate_for_reference_row() {
        let paginator = paginator(PaginatorConfig::new(3).with_parameterized_queries(false));
        let reference = order("A", date(2024, 1, 5), 10);

        let predicate = paginator
            .predicate(Direction::Forward, &paginator.reference_values(&reference))
            .expect("predicate");

        assert_eq!(
            predicate.to_string(),
            "(compare(region, 'A') >= 0 AND (compare(region, 'A') > 0 \
             OR (region = 'A' AND placed < '2024-01-05') \
             OR (region = 'A' AND placed = '2024-01-05' AND id > 10)))"
        );
    }

    #[test]
    fn walks_forward_and_back() {
        let paginator = paginator(PaginatorConfig::new(3));

        let first = paginator.page(None).expect("first page");
        assert_eq!(ids(&first.results), &NATURAL[..3]);
        assert_eq!(first.total_count, 7);
        assert!(first.current_token.is_none());
        assert!(first.previous_token.is_none());

        let second = paginator
            .page(first.next_token.as_deref())
            .expect("second page");
        assert_eq!(ids(&second.results), &NATURAL[3..6]);
        assert!(second.current_token.is_some());

        let third = paginator
            .page(second.next_token.as_deref())
            .expect("third page");
        assert_eq!(ids(&third.results), &NATURAL[6..]);
        assert!(third.next_token.is_none());

        let back = paginator
            .page(third.previous_token.as_deref())
            .expect("previous page");
        assert_eq!(ids(&back.results), &NATURAL[3..6]);

        let start = paginator
            .page(back.previous_token.as_deref())
            .expect("first page again");
        assert_eq!(ids(&start.results), &NATURAL[..3]);
        assert!(start.previous_token.is_none());
    }

    #[test]
    fn backward_configuration_starts_at_the_end() {
        let paginator = paginator(PaginatorConfig::new(3).with_direction(Direction::Backward));

        let last = paginator.page(None).expect("last page");
        assert_eq!(ids(&last.results), &NATURAL[4..]);
        assert!(last.previous_token.is_none());

        let earlier = paginator
            .page(last.next_token.as_deref())
            .expect("earlier page");
        assert_eq!(ids(&earlier.results), &NATURAL[1..4]);

        let earliest = paginator
            .page(earlier.next_token.as_deref())
            .expect("earliest page");
        assert_eq!(ids(&earliest.results), &NATURAL[..1]);
        assert!(earliest.next_token.is_none());

        let later = paginator
            .page(earliest.previous_token.as_deref())
            .expect("later page");
        assert_eq!(ids(&later.results), &NATURAL[1..4]);
    }

    #[test]
    fn anchor_queries() {
        let paginator = paginator(PaginatorConfig::new(2));
        let reference = order("A", date(2024, 1, 1), 4);

        let next = paginator.next_page_query(Some(&reference)).expect("query");
        assert_eq!(ids(&next.to_vec().expect("rows")), vec![2, 7]);

        let previous = paginator.previous_page_query(Some(&reference)).expect("query");
        assert_eq!(ids(&previous.to_vec().expect("rows")), vec![10, 11]);

        let last = paginator.previous_page_query(None).expect("query");
        assert_eq!(ids(&last.to_vec().expect("rows")), vec![7, 1]);
    }

    #[test]
    fn existence_checks() {
        let paginator = paginator(PaginatorConfig::new(2));
        let first = order("A", date(2024, 1, 9), 3);
        let last = order("C", date(2024, 2, 2), 1);

        assert!(paginator.has_next_page(Some(&first)).expect("check"));
        assert!(!paginator.has_previous_page(Some(&first)).expect("check"));
        assert!(!paginator.has_next_page(Some(&last)).expect("check"));
        assert!(paginator.has_previous_page(Some(&last)).expect("check"));

        let error = paginator.has_previous_page(None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn columns_freeze_on_first_use() {
        let mut paginator = paginator(PaginatorConfig::new(2));
        assert!(!paginator.is_frozen());

        paginator.page_query(None).expect("query");
        assert!(paginator.is_frozen());

        let error = paginator.add_column_ascending(id()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert_eq!(paginator.columns().len(), 3);
    }

    #[test]
    fn token_encoder_access_freezes_columns() {
        let mut paginator = paginator(PaginatorConfig::new(2));
        paginator.token_encoder().expect("encoder");
        assert!(paginator.add_column_ascending(id()).is_err());
    }

    #[test]
    fn rejects_computed_and_malformed_columns() {
        let mut paginator =
            QueryPaginator::new(MemoryQuery::new(orders()), Arc::new(PaginatorConfig::new(2)));

        let computed = Field::computed("region_len", |o: &Order| o.region.len() as i64);
        let error = paginator.add_column_ascending(computed).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);

        let malformed = Field::stored("id; drop", |o: &Order| o.id);
        let error = paginator.add_column_ascending(malformed).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);

        let qualified = Field::stored("orders.id", |o: &Order| o.id);
        let error = paginator.add_column_ascending(qualified).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert!(paginator.columns().is_empty());
    }

    #[test]
    fn debug_reports_frozen_state() {
        let paginator = paginator(PaginatorConfig::new(2));
        assert!(format!("{paginator:?}").contains("frozen: false"));

        paginator.page_query(None).expect("query");
        assert!(format!("{paginator:?}").contains("frozen: true"));
    }

    #[test]
    fn requires_a_column() {
        let paginator: QueryPaginator<Order, _> =
            QueryPaginator::new(MemoryQuery::new(orders()), Arc::new(PaginatorConfig::new(2)));
        let error = paginator.page_query(None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn hashed_tokens_from_another_paginator_are_rejected() {
        let options = TokenOptions {
            include_hash: true,
            use_compression: true,
        };
        let config = PaginatorConfig::new(2).with_token_options(options);
        let ours = paginator(config.clone());

        let mut theirs = QueryPaginator::new(MemoryQuery::new(orders()), Arc::new(config));
        theirs
            .add_column_ascending(region())
            .and_then(|p| p.add_column_ascending(id()))
            .expect("valid columns");

        let first = theirs.page(None).expect("first page");
        let error = ours.page(first.next_token.as_deref()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidToken);
    }

    #[tokio::test]
    async fn async_existence_checks() {
        let paginator = paginator(PaginatorConfig::new(2));
        let first = order("A", date(2024, 1, 9), 3);

        let has_next = paginator
            .has_next_page_async(Some(&first), &MemoryExistenceResolver, CancellationToken::new())
            .await
            .expect("check");
        assert!(has_next);

        let has_previous = paginator
            .has_previous_page_async(
                Some(&first),
                &MemoryExistenceResolver,
                CancellationToken::new(),
            )
            .await
            .expect("check");
        assert!(!has_previous);
    }

    #[tokio::test]
    async fn async_existence_requires_reference() {
        let paginator = paginator(PaginatorConfig::new(2));

        let error = paginator
            .has_next_page_async(None, &MemoryExistenceResolver, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);

        let error = paginator
            .has_previous_page_async(None, &MemoryExistenceResolver, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn async_existence_honours_cancellation() {
        let paginator = paginator(PaginatorConfig::new(2));
        let first = order("A", date(2024, 1, 9), 3);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = paginator
            .has_next_page_async(Some(&first), &MemoryExistenceResolver, cancel)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Cancelled);
    }
}
