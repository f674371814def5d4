//! Provider-agnostic predicate tree.
//!
//! The paginator builds keyset predicates as a small expression tree.
//! [`Predicate::matches`] evaluates it against a record in memory; query
//! adapters walk the tree and lower it into their own query language.

use std::fmt;
use std::sync::Arc;

use strum::{AsRefStr, IntoStaticStr};

use crate::{CompareMethod, Field, Value};

/// Relational operator of a comparison node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
pub enum CompareOp {
    /// `=`
    #[strum(serialize = "=")]
    Eq,
    /// `<`
    #[strum(serialize = "<")]
    Lt,
    /// `<=`
    #[strum(serialize = "<=")]
    Le,
    /// `>`
    #[strum(serialize = ">")]
    Gt,
    /// `>=`
    #[strum(serialize = ">=")]
    Ge,
}

impl CompareOp {
    /// Returns the strict ordering operator for a comparison direction.
    #[inline]
    pub fn strict(greater: bool) -> Self {
        if greater { Self::Gt } else { Self::Lt }
    }

    /// Returns the inclusive form of this operator.
    pub fn inclusive(self) -> Self {
        match self {
            Self::Lt => Self::Le,
            Self::Gt => Self::Ge,
            other => other,
        }
    }

    /// Returns whether an ordering of `left` against `right` satisfies this operator.
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};

        match self {
            Self::Eq => ordering == Equal,
            Self::Lt => ordering == Less,
            Self::Le => ordering != Greater,
            Self::Gt => ordering == Greater,
            Self::Ge => ordering != Less,
        }
    }

    /// Returns the SQL spelling of this operator.
    #[inline]
    pub fn symbol(self) -> &'static str {
        self.into()
    }
}

/// A named value bound at execution time instead of embedded as a literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name, unique within one predicate.
    pub name: String,
    /// Bound value.
    pub value: Value,
}

/// Value-producing node of a predicate.
pub enum Operand<E> {
    /// Column read from the record.
    Member(Field<E>),
    /// Inline constant.
    Literal(Value),
    /// Named bound parameter, shared by every clause that references it.
    Parameter(Arc<Parameter>),
    /// Widening of a plain value to a nullable column's type.
    Nullable(Box<Operand<E>>),
    /// Widening of an enum to its integer discriminant.
    Widen(Box<Operand<E>>),
    /// Three-way comparison call producing `-1`, `0` or `1`.
    ThreeWay {
        /// Comparison operation of the operand type.
        method: CompareMethod,
        /// Left operand.
        left: Box<Operand<E>>,
        /// Right operand.
        right: Box<Operand<E>>,
    },
}

impl<E> Operand<E> {
    /// Evaluates the operand against a record.
    pub fn eval(&self, entity: &E) -> Value {
        match self {
            Self::Member(field) => field.value(entity),
            Self::Literal(value) => value.clone(),
            Self::Parameter(parameter) => parameter.value.clone(),
            Self::Nullable(inner) => inner.eval(entity),
            Self::Widen(inner) => match inner.eval(entity) {
                Value::Enum(ordinal) => Value::Int(ordinal),
                other => other,
            },
            Self::ThreeWay {
                method,
                left,
                right,
            } => method
                .call(&left.eval(entity), &right.eval(entity))
                .map_or(Value::Null, Value::Int),
        }
    }
}

impl<E> Clone for Operand<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Member(field) => Self::Member(field.clone()),
            Self::Literal(value) => Self::Literal(value.clone()),
            Self::Parameter(parameter) => Self::Parameter(Arc::clone(parameter)),
            Self::Nullable(inner) => Self::Nullable(inner.clone()),
            Self::Widen(inner) => Self::Widen(inner.clone()),
            Self::ThreeWay {
                method,
                left,
                right,
            } => Self::ThreeWay {
                method: *method,
                left: left.clone(),
                right: right.clone(),
            },
        }
    }
}

impl<E> fmt::Debug for Operand<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operand({self})")
    }
}

impl<E> fmt::Display for Operand<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(field) => f.write_str(field.name()),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Parameter(parameter) => write!(f, "@{}", parameter.name),
            Self::Nullable(inner) | Self::Widen(inner) => write!(f, "{inner}"),
            Self::ThreeWay { left, right, .. } => write!(f, "compare({left}, {right})"),
        }
    }
}

/// Boolean node of a predicate.
pub enum Predicate<E> {
    /// Binary comparison.
    Compare {
        /// Left operand.
        left: Operand<E>,
        /// Operator.
        op: CompareOp,
        /// Right operand.
        right: Operand<E>,
    },
    /// Conjunction of all children.
    And(Vec<Predicate<E>>),
    /// Disjunction of all children.
    Or(Vec<Predicate<E>>),
}

impl<E> Predicate<E> {
    /// Creates a comparison node.
    pub fn compare(left: Operand<E>, op: CompareOp, right: Operand<E>) -> Self {
        Self::Compare { left, op, right }
    }

    /// Evaluates the predicate against a record.
    ///
    /// Comparisons involving `Null` or mismatched types are false.
    pub fn matches(&self, entity: &E) -> bool {
        match self {
            Self::Compare { left, op, right } => left
                .eval(entity)
                .native_cmp(&right.eval(entity))
                .is_some_and(|ordering| op.holds(ordering)),
            Self::And(children) => children.iter().all(|child| child.matches(entity)),
            Self::Or(children) => children.iter().any(|child| child.matches(entity)),
        }
    }
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Compare { left, op, right } => Self::Compare {
                left: left.clone(),
                op: *op,
                right: right.clone(),
            },
            Self::And(children) => Self::And(children.clone()),
            Self::Or(children) => Self::Or(children.clone()),
        }
    }
}

impl<E> fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({self})")
    }
}

impl<E> fmt::Display for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (children, separator) = match self {
            Self::Compare { left, op, right } => {
                return write!(f, "{left} {} {right}", op.symbol());
            }
            Self::And(children) => (children, " AND "),
            Self::Or(children) => (children, " OR "),
        };

        f.write_str("(")?;
        for (index, child) in children.iter().enumerate() {
            if index > 0 {
                f.write_str(separator)?;
            }
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        score: i64,
        label: Option<i64>,
    }

    fn score() -> Operand<Row> {
        Operand::Member(Field::stored("score", |r: &Row| r.score))
    }

    #[test]
    fn evaluates_comparisons() {
        let row = Row {
            score: 5,
            label: None,
        };
        let gt = Predicate::compare(score(), CompareOp::Gt, Operand::Literal(Value::Int(4)));
        let le = Predicate::compare(score(), CompareOp::Le, Operand::Literal(Value::Int(4)));

        assert!(gt.matches(&row));
        assert!(!le.matches(&row));
        assert!(Predicate::Or(vec![gt.clone(), le.clone()]).matches(&row));
        assert!(!Predicate::And(vec![gt, le]).matches(&row));
    }

    #[test]
    fn null_comparisons_are_false() {
        let row = Row {
            score: 1,
            label: None,
        };
        let label = Operand::Member(Field::stored("label", |r: &Row| r.label));
        let eq = Predicate::compare(label, CompareOp::Eq, Operand::Literal(Value::Int(1)));

        assert!(!eq.matches(&row));
    }

    #[test]
    fn renders_nested_predicates() {
        let parameter = Arc::new(Parameter {
            name: "p0".into(),
            value: Value::Int(3),
        });
        let predicate = Predicate::Or(vec![
            Predicate::compare(score(), CompareOp::Gt, Operand::Parameter(parameter.clone())),
            Predicate::And(vec![
                Predicate::compare(score(), CompareOp::Eq, Operand::Parameter(parameter)),
                Predicate::compare(score(), CompareOp::Lt, Operand::Literal(Value::Int(9))),
            ]),
        ]);

        assert_eq!(
            predicate.to_string(),
            "(score > @p0 OR (score = @p0 AND score < 9))"
        );
    }

    #[test]
    fn inclusive_operators() {
        assert_eq!(CompareOp::Gt.inclusive(), CompareOp::Ge);
        assert_eq!(CompareOp::Lt.inclusive(), CompareOp::Le);
        assert_eq!(CompareOp::strict(false), CompareOp::Lt);
        assert_eq!(CompareOp::Ge.symbol(), ">=");
    }
}
