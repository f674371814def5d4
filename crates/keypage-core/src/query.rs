//! Contracts for the queries a paginator composes.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::{Field, Predicate, Result};

/// A composable query over records of type `E`.
///
/// Implementations are cheap to clone; every method returns a new query and
/// leaves `self` untouched. The paginator only ever chains
/// `order_by`, `then_by`, `filter`, `take` and `reverse` in that order.
pub trait Queryable<E>: Clone {
    /// Replaces any ordering with a sort on `field`.
    fn order_by(self, field: &Field<E>, ascending: bool) -> Self;

    /// Adds a lower-priority sort on `field` to the current ordering.
    fn then_by(self, field: &Field<E>, ascending: bool) -> Self;

    /// Keeps only records matching `predicate`.
    fn filter(self, predicate: Predicate<E>) -> Self;

    /// Keeps at most `count` records.
    fn take(self, count: usize) -> Self;

    /// Reverses the order of the records.
    fn reverse(self) -> Self;
}

/// A query that can be executed synchronously.
pub trait Materialize<E>: Queryable<E> {
    /// Executes the query and returns the matching records in order.
    fn to_vec(&self) -> Result<Vec<E>>;

    /// Returns the number of matching records.
    fn count(&self) -> Result<usize>;

    /// Returns whether any record matches.
    fn exists(&self) -> Result<bool>;
}

/// Answers whether any record of a query matches a predicate.
///
/// Lets callers plug in a store-native existence check (such as SQL
/// `EXISTS`) for the asynchronous `has_*_page` operations. Implementations
/// should stop work when `cancel` fires; the paginator also stops waiting.
pub trait ExistenceResolver<E, Q>: Send + Sync
where
    Q: Queryable<E>,
{
    /// Returns whether `query` filtered by `predicate` yields any record.
    fn exists(
        &self,
        query: Q,
        predicate: Predicate<E>,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<bool>> + Send;
}
