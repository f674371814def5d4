//! In-memory query provider.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    ExistenceResolver, Field, Materialize, Predicate, Queryable, Result, TRACING_TARGET_QUERY,
};

enum Stage<E> {
    Sort(Vec<(Field<E>, bool)>),
    Filter(Predicate<E>),
    Take(usize),
    Reverse,
}

impl<E> Clone for Stage<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Sort(keys) => Self::Sort(keys.clone()),
            Self::Filter(predicate) => Self::Filter(predicate.clone()),
            Self::Take(count) => Self::Take(*count),
            Self::Reverse => Self::Reverse,
        }
    }
}

/// A [`Queryable`] over a shared slice of records.
///
/// Stages are recorded lazily and applied in order on execution. Sorting is
/// stable and treats incomparable values as equal.
pub struct MemoryQuery<E> {
    rows: Arc<[E]>,
    stages: Vec<Stage<E>>,
}

impl<E: Clone> MemoryQuery<E> {
    /// Creates a query returning every record in `rows`.
    pub fn new(rows: impl Into<Arc<[E]>>) -> Self {
        Self {
            rows: rows.into(),
            stages: Vec::new(),
        }
    }

    fn execute(&self) -> Vec<&E> {
        let mut rows: Vec<&E> = self.rows.iter().collect();
        for stage in &self.stages {
            match stage {
                Stage::Sort(keys) => rows.sort_by(|a, b| compare_keys(keys, a, b)),
                Stage::Filter(predicate) => rows.retain(|row| predicate.matches(row)),
                Stage::Take(count) => rows.truncate(*count),
                Stage::Reverse => rows.reverse(),
            }
        }

        tracing::trace!(
            target: TRACING_TARGET_QUERY,
            stages = self.stages.len(),
            scanned = self.rows.len(),
            returned = rows.len(),
            "Executed in-memory query"
        );
        rows
    }
}

fn compare_keys<E>(keys: &[(Field<E>, bool)], a: &E, b: &E) -> Ordering {
    for (field, ascending) in keys {
        let ordering = field
            .value(a)
            .native_cmp(&field.value(b))
            .unwrap_or(Ordering::Equal);
        let ordering = if *ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering.is_ne() {
            return ordering;
        }
    }
    Ordering::Equal
}

impl<E> Clone for MemoryQuery<E> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            stages: self.stages.clone(),
        }
    }
}

impl<E> fmt::Debug for MemoryQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryQuery")
            .field("rows", &self.rows.len())
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl<E: Clone> Queryable<E> for MemoryQuery<E> {
    fn order_by(mut self, field: &Field<E>, ascending: bool) -> Self {
        self.stages.push(Stage::Sort(vec![(field.clone(), ascending)]));
        self
    }

    fn then_by(mut self, field: &Field<E>, ascending: bool) -> Self {
        match self.stages.last_mut() {
            Some(Stage::Sort(keys)) => keys.push((field.clone(), ascending)),
            _ => self.stages.push(Stage::Sort(vec![(field.clone(), ascending)])),
        }
        self
    }

    fn filter(mut self, predicate: Predicate<E>) -> Self {
        self.stages.push(Stage::Filter(predicate));
        self
    }

    fn take(mut self, count: usize) -> Self {
        self.stages.push(Stage::Take(count));
        self
    }

    fn reverse(mut self) -> Self {
        self.stages.push(Stage::Reverse);
        self
    }
}

impl<E: Clone> Materialize<E> for MemoryQuery<E> {
    fn to_vec(&self) -> Result<Vec<E>> {
        Ok(self.execute().into_iter().cloned().collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.execute().len())
    }

    fn exists(&self) -> Result<bool> {
        Ok(!self.execute().is_empty())
    }
}

/// [`ExistenceResolver`] evaluating predicates in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryExistenceResolver;

impl<E> ExistenceResolver<E, MemoryQuery<E>> for MemoryExistenceResolver
where
    E: Clone + Send + Sync,
{
    async fn exists(
        &self,
        query: MemoryQuery<E>,
        predicate: Predicate<E>,
        _cancel: CancellationToken,
    ) -> Result<bool> {
        query.filter(predicate).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompareOp, Operand, Value};

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        group: i64,
        rank: i64,
    }

    fn items() -> Vec<Item> {
        vec![
            Item { group: 2, rank: 1 },
            Item { group: 1, rank: 2 },
            Item { group: 1, rank: 1 },
            Item { group: 2, rank: 3 },
        ]
    }

    fn group() -> Field<Item> {
        Field::stored("group", |i: &Item| i.group)
    }

    fn rank() -> Field<Item> {
        Field::stored("rank", |i: &Item| i.rank)
    }

    #[test]
    fn sorts_by_multiple_keys() {
        let query = MemoryQuery::new(items())
            .order_by(&group(), true)
            .then_by(&rank(), false);
        let ranks: Vec<_> = query
            .to_vec()
            .expect("in-memory execution")
            .iter()
            .map(|i| (i.group, i.rank))
            .collect();

        assert_eq!(ranks, vec![(1, 2), (1, 1), (2, 3), (2, 1)]);
    }

    #[test]
    fn applies_stages_in_order() {
        let predicate = Predicate::compare(
            Operand::Member(rank()),
            CompareOp::Gt,
            Operand::Literal(Value::Int(1)),
        );
        let query = MemoryQuery::new(items())
            .order_by(&group(), true)
            .then_by(&rank(), true)
            .filter(predicate)
            .take(1)
            .reverse();

        assert_eq!(
            query.to_vec().expect("in-memory execution"),
            vec![Item { group: 1, rank: 2 }]
        );
        assert_eq!(query.count().expect("in-memory execution"), 1);
        assert!(query.exists().expect("in-memory execution"));
    }

    #[tokio::test]
    async fn resolver_filters_before_checking() {
        let predicate = Predicate::compare(
            Operand::Member(rank()),
            CompareOp::Gt,
            Operand::Literal(Value::Int(3)),
        );
        let exists = MemoryExistenceResolver
            .exists(MemoryQuery::new(items()), predicate, CancellationToken::new())
            .await
            .expect("in-memory execution");

        assert!(!exists);
    }
}
