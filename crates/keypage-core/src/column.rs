//! Ordering column definitions.

use std::fmt;

use crate::{Direction, Field, Queryable};

/// One ordering column of a paginator.
///
/// Columns are ranked by insertion order: the first column is the most
/// significant. The same definitions drive both the natural and the mirrored
/// ordering, since the requested direction is applied at use time.
pub struct ColumnDefinition<E> {
    field: Field<E>,
    is_ascending: bool,
}

impl<E> ColumnDefinition<E> {
    /// Creates a column definition.
    pub fn new(field: Field<E>, is_ascending: bool) -> Self {
        Self {
            field,
            is_ascending,
        }
    }

    /// Returns the field this column orders by.
    #[inline]
    pub fn field(&self) -> &Field<E> {
        &self.field
    }

    /// Returns whether the column is declared ascending.
    #[inline]
    pub fn is_ascending(&self) -> bool {
        self.is_ascending
    }

    /// Applies this column as the primary ordering of `query`.
    pub fn apply_as_first_order<Q>(&self, query: Q, direction: Direction) -> Q
    where
        Q: Queryable<E>,
    {
        query.order_by(&self.field, direction.effective_ascending(self.is_ascending))
    }

    /// Applies this column as a lower-priority ordering of `query`.
    pub fn apply_as_subsequent_order<Q>(&self, query: Q, direction: Direction) -> Q
    where
        Q: Queryable<E>,
    {
        query.then_by(&self.field, direction.effective_ascending(self.is_ascending))
    }
}

impl<E> Clone for ColumnDefinition<E> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            is_ascending: self.is_ascending,
        }
    }
}

impl<E> fmt::Debug for ColumnDefinition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDefinition")
            .field("field", &self.field)
            .field("is_ascending", &self.is_ascending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Materialize, MemoryQuery};

    #[derive(Debug, Clone)]
    struct Event {
        day: i64,
        seq: i64,
    }

    fn events() -> Vec<Event> {
        vec![
            Event { day: 1, seq: 2 },
            Event { day: 2, seq: 1 },
            Event { day: 1, seq: 1 },
        ]
    }

    fn ordered(direction: Direction) -> Vec<(i64, i64)> {
        let day = ColumnDefinition::new(Field::stored("day", |e: &Event| e.day), true);
        let seq = ColumnDefinition::new(Field::stored("seq", |e: &Event| e.seq), false);

        let query = day.apply_as_first_order(MemoryQuery::new(events()), direction);
        let query = seq.apply_as_subsequent_order(query, direction);
        query
            .to_vec()
            .expect("in-memory execution")
            .iter()
            .map(|e| (e.day, e.seq))
            .collect()
    }

    #[test]
    fn forward_uses_declared_order() {
        assert_eq!(ordered(Direction::Forward), vec![(1, 2), (1, 1), (2, 1)]);
    }

    #[test]
    fn backward_mirrors_declared_order() {
        assert_eq!(ordered(Direction::Backward), vec![(2, 1), (1, 1), (1, 2)]);
    }
}
