//! Keyset predicate construction.
//!
//! For columns `c1..cn` and reference values `r1..rn` the builder expands the
//! row-value comparison `(c1, .., cn) OP (r1, .., rn)` into
//!
//! ```text
//! (c1 OP1 r1)
//! OR (c1 = r1 AND c2 OP2 r2)
//! OR ...
//! OR (c1 = r1 AND .. AND cn-1 = rn-1 AND cn OPn rn)
//! ```
//!
//! where each `OPi` is `>` or `<` depending on the requested direction and the
//! column's declared order. With more than one column the expansion is
//! conjoined with the inclusive comparison of the first column, which is
//! implied by the disjunction but lets a store range-scan an index on `c1`.

use std::sync::Arc;

use crate::{
    ColumnDefinition, CompareOp, ComparisonRegistry, Direction, Error, Operand, Parameter,
    Predicate, Result, ScalarType, TRACING_TARGET_PAGINATOR, Value,
};

/// Builds keyset predicates over a frozen column set.
pub(crate) struct PredicateBuilder<'a, E> {
    columns: &'a [ColumnDefinition<E>],
    parameterize: bool,
}

impl<'a, E> PredicateBuilder<'a, E> {
    pub(crate) fn new(columns: &'a [ColumnDefinition<E>], parameterize: bool) -> Self {
        Self {
            columns,
            parameterize,
        }
    }

    /// Builds the predicate selecting records strictly after `values` in `direction`.
    pub(crate) fn build(&self, direction: Direction, values: &[Value]) -> Result<Predicate<E>> {
        let count = self.columns.len();
        if count == 0 || values.len() != count {
            return Err(Error::internal().with_message(format!(
                "expected {} reference values, got {}",
                count,
                values.len()
            )));
        }

        tracing::trace!(
            target: TRACING_TARGET_PAGINATOR,
            columns = count,
            %direction,
            parameterized = self.parameterize,
            "Building keyset predicate"
        );

        // One value node per column, shared by every clause that references it.
        let mut cache: Vec<Option<Operand<E>>> = vec![None; count];

        let mut disjuncts = Vec::with_capacity(count);
        for index in 0..count {
            let mut clauses = Vec::with_capacity(index + 1);
            for prior in 0..index {
                let value = self.value_operand(prior, values, &mut cache);
                clauses.push(self.equality(prior, value));
            }

            let value = self.value_operand(index, values, &mut cache);
            clauses.push(self.comparison(index, self.strict_op(index, direction), value));

            disjuncts.push(collapse(clauses, Predicate::And));
        }

        let keyset = collapse(disjuncts, Predicate::Or);
        if count == 1 {
            return Ok(keyset);
        }

        let value = self.value_operand(0, values, &mut cache);
        let access = self.comparison(0, self.strict_op(0, direction).inclusive(), value);
        Ok(Predicate::And(vec![access, keyset]))
    }

    fn strict_op(&self, index: usize, direction: Direction) -> CompareOp {
        let effective_greater = direction.is_forward() == self.columns[index].is_ascending();
        CompareOp::strict(effective_greater)
    }

    fn value_operand(
        &self,
        index: usize,
        values: &[Value],
        cache: &mut [Option<Operand<E>>],
    ) -> Operand<E> {
        cache[index]
            .get_or_insert_with(|| {
                let value = values[index].clone();
                let widen = self.columns[index].field().is_nullable() && !value.is_null();

                let operand = if self.parameterize {
                    Operand::Parameter(Arc::new(Parameter {
                        name: format!("p{index}"),
                        value,
                    }))
                } else {
                    Operand::Literal(value)
                };

                if widen {
                    Operand::Nullable(Box::new(operand))
                } else {
                    operand
                }
            })
            .clone()
    }

    fn equality(&self, index: usize, value: Operand<E>) -> Predicate<E> {
        let member = Operand::Member(self.columns[index].field().clone());
        Predicate::compare(member, CompareOp::Eq, value)
    }

    fn comparison(&self, index: usize, op: CompareOp, value: Operand<E>) -> Predicate<E> {
        let field = self.columns[index].field();
        let member = Operand::Member(field.clone());

        let Some(method) = ComparisonRegistry::comparison_for(field.scalar_type()) else {
            return Predicate::compare(member, op, value);
        };

        let (left, right) = match field.scalar_type() {
            ScalarType::Enum(_) => (
                Operand::Widen(Box::new(member)),
                Operand::Widen(Box::new(value)),
            ),
            _ => (member, value),
        };

        Predicate::compare(
            Operand::ThreeWay {
                method,
                left: Box::new(left),
                right: Box::new(right),
            },
            op,
            Operand::Literal(Value::Int(0)),
        )
    }
}

fn collapse<E>(
    mut children: Vec<Predicate<E>>,
    combine: fn(Vec<Predicate<E>>) -> Predicate<E>,
) -> Predicate<E> {
    if children.len() == 1
        && let Some(only) = children.pop()
    {
        return only;
    }
    combine(children)
}
