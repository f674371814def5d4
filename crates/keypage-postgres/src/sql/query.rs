//! Paginated SQL query composition.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use keypage_core::{Field, Predicate, Queryable};

use super::base::validate_base_query;
use super::identifier::column_reference;
use super::render::{RenderedSql, SqlWriter};
use crate::{PgError, PgResult};

const BASE_ALIAS: &str = "keypage_base";
const PAGE_ALIAS: &str = "keypage_page";

#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderTerm {
    column: String,
    ascending: bool,
}

/// A [`Queryable`] over the rows of a PostgreSQL base query.
///
/// The base query is selected from as a derived table; orderings, keyset
/// filters, limits and reversal are layered on top of it when the statement
/// is rendered. Column names refer to the output columns of the base query.
///
/// ```rust
/// use keypage_core::{Field, Queryable};
/// use keypage_postgres::SqlQuery;
///
/// #[derive(Clone)]
/// struct Order {
///     id: i64,
/// }
///
/// let query = SqlQuery::<Order>::new("SELECT id, total FROM orders")?
///     .order_by(&Field::stored("id", |o: &Order| o.id), true)
///     .take(20);
///
/// assert_eq!(
///     query.to_sql()?.sql,
///     "SELECT * FROM (SELECT id, total FROM orders) AS keypage_base \
///      ORDER BY \"id\" ASC LIMIT 20"
/// );
/// # Ok::<(), keypage_postgres::PgError>(())
/// ```
pub struct SqlQuery<E> {
    base: Arc<str>,
    order: Vec<OrderTerm>,
    filters: Vec<Predicate<E>>,
    limit: Option<usize>,
    reversed: bool,
    _row: PhantomData<fn() -> E>,
}

impl<E> SqlQuery<E> {
    /// Creates a query over `base_sql`.
    ///
    /// Fails if the base query carries its own top-level ordering or limit.
    pub fn new(base_sql: &str) -> PgResult<Self> {
        let base = validate_base_query(base_sql)?;
        Ok(Self {
            base: Arc::from(base),
            order: Vec::new(),
            filters: Vec::new(),
            limit: None,
            reversed: false,
            _row: PhantomData,
        })
    }

    /// Returns the validated base query.
    #[inline]
    pub fn base_sql(&self) -> &str {
        &self.base
    }

    /// Renders the row-returning statement.
    pub fn to_sql(&self) -> PgResult<RenderedSql> {
        let mut writer = SqlWriter::new();
        self.write_source(&mut writer)?;

        if !self.order.is_empty() {
            writer.push(" ORDER BY ");
            writer.push(&order_clause(&self.order, false)?);
        }

        if let Some(limit) = self.limit {
            writer.push(&format!(" LIMIT {limit}"));
        }

        if self.reversed {
            if self.order.is_empty() {
                return Err(PgError::invalid_sql("cannot reverse an unordered query"));
            }

            let reversed = order_clause(&self.order, true)?;
            writer.wrap(|inner| {
                format!("SELECT * FROM ({inner}) AS {PAGE_ALIAS} ORDER BY {reversed}")
            });
        }

        Ok(writer.finish())
    }

    /// Renders a statement counting the filtered rows, ignoring order and limit.
    pub fn to_count_sql(&self) -> PgResult<RenderedSql> {
        let mut writer = SqlWriter::new();
        self.write_source(&mut writer)?;
        writer.wrap(|inner| format!("SELECT COUNT(*) AS count FROM ({inner}) AS {PAGE_ALIAS}"));
        Ok(writer.finish())
    }

    /// Renders a statement testing whether any filtered row exists.
    pub fn to_exists_sql(&self) -> PgResult<RenderedSql> {
        let mut writer = SqlWriter::new();
        self.write_source(&mut writer)?;
        writer.wrap(|inner| format!("SELECT EXISTS ({inner}) AS exists"));
        Ok(writer.finish())
    }

    /// Writes the base query and its filters.
    fn write_source(&self, writer: &mut SqlWriter) -> PgResult<()> {
        writer.push("SELECT * FROM (");
        writer.push(&self.base);
        writer.push(") AS ");
        writer.push(BASE_ALIAS);

        for (index, filter) in self.filters.iter().enumerate() {
            writer.push(if index == 0 { " WHERE " } else { " AND " });
            writer.predicate(filter)?;
        }

        Ok(())
    }

    fn push_order(mut self, field: &Field<E>, ascending: bool) -> Self {
        self.order.push(OrderTerm {
            column: field.name().to_owned(),
            ascending,
        });
        self
    }
}

fn order_clause(order: &[OrderTerm], reversed: bool) -> PgResult<String> {
    let terms = order
        .iter()
        .map(|term| {
            let column = column_reference(&term.column)?;
            let ascending = term.ascending != reversed;
            Ok(format!("{column} {}", if ascending { "ASC" } else { "DESC" }))
        })
        .collect::<PgResult<Vec<_>>>()?;
    Ok(terms.join(", "))
}

impl<E> Queryable<E> for SqlQuery<E> {
    fn order_by(mut self, field: &Field<E>, ascending: bool) -> Self {
        self.order.clear();
        self.push_order(field, ascending)
    }

    fn then_by(self, field: &Field<E>, ascending: bool) -> Self {
        self.push_order(field, ascending)
    }

    fn filter(mut self, predicate: Predicate<E>) -> Self {
        self.filters.push(predicate);
        self
    }

    fn take(mut self, count: usize) -> Self {
        self.limit = Some(self.limit.map_or(count, |limit| limit.min(count)));
        self
    }

    fn reverse(mut self) -> Self {
        self.reversed = !self.reversed;
        self
    }
}

impl<E> Clone for SqlQuery<E> {
    fn clone(&self) -> Self {
        Self {
            base: Arc::clone(&self.base),
            order: self.order.clone(),
            filters: self.filters.clone(),
            limit: self.limit,
            reversed: self.reversed,
            _row: PhantomData,
        }
    }
}

impl<E> fmt::Debug for SqlQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlQuery")
            .field("base", &self.base)
            .field("order", &self.order)
            .field("filters", &self.filters)
            .field("limit", &self.limit)
            .field("reversed", &self.reversed)
            .finish()
    }
}
