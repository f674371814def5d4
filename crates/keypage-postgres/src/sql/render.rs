//! Lowering of predicate trees into PostgreSQL.
//!
//! Members become quoted column references, parameters become `$n`
//! placeholders (one per distinct parameter name) and literals are inlined.
//! A three-way comparison tested against zero, as the keyset builder emits
//! for text, UUID, boolean and enum columns, is lowered to the native
//! operator on its operands since PostgreSQL orders those types directly.

use std::collections::HashMap;

use keypage_core::{CompareOp, Operand, Parameter, Predicate, Value};

use super::identifier::column_reference;
use crate::PgResult;

/// SQL text together with the values bound to its `$n` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    /// Statement text.
    pub sql: String,
    /// Bind values, `binds[0]` belongs to `$1`.
    pub binds: Vec<Value>,
}

/// Incremental SQL writer tracking bind positions.
#[derive(Debug, Default)]
pub(crate) struct SqlWriter {
    sql: String,
    binds: Vec<Value>,
    positions: HashMap<String, usize>,
}

impl SqlWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    /// Replaces the text written so far with `wrap(text)`, keeping the binds.
    pub(crate) fn wrap(&mut self, wrap: impl FnOnce(&str) -> String) {
        self.sql = wrap(&self.sql);
    }

    pub(crate) fn finish(self) -> RenderedSql {
        RenderedSql {
            sql: self.sql,
            binds: self.binds,
        }
    }

    /// Writes a predicate.
    pub(crate) fn predicate<E>(&mut self, predicate: &Predicate<E>) -> PgResult<()> {
        match predicate {
            Predicate::Compare {
                left: Operand::ThreeWay { left, right, .. },
                op,
                right: Operand::Literal(Value::Int(0)),
            } => self.comparison(left, *op, right),
            Predicate::Compare { left, op, right } => self.comparison(left, *op, right),
            Predicate::And(children) => self.junction(children, " AND ", "TRUE"),
            Predicate::Or(children) => self.junction(children, " OR ", "FALSE"),
        }
    }

    fn comparison<E>(
        &mut self,
        left: &Operand<E>,
        op: CompareOp,
        right: &Operand<E>,
    ) -> PgResult<()> {
        self.operand(left)?;
        self.push(" ");
        self.push(op.symbol());
        self.push(" ");
        self.operand(right)
    }

    fn junction<E>(
        &mut self,
        children: &[Predicate<E>],
        separator: &str,
        empty: &str,
    ) -> PgResult<()> {
        match children {
            [] => self.push(empty),
            [only] => self.predicate(only)?,
            _ => {
                self.push("(");
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        self.push(separator);
                    }
                    self.predicate(child)?;
                }
                self.push(")");
            }
        }
        Ok(())
    }

    fn operand<E>(&mut self, operand: &Operand<E>) -> PgResult<()> {
        match operand {
            Operand::Member(field) => {
                let column = column_reference(field.name())?;
                self.push(&column);
            }
            Operand::Literal(value) => self.literal(value),
            Operand::Parameter(parameter) => self.parameter(parameter),
            Operand::Nullable(inner) | Operand::Widen(inner) => self.operand(inner)?,
            Operand::ThreeWay { left, right, .. } => {
                self.push("(CASE WHEN ");
                self.comparison(left, CompareOp::Lt, right)?;
                self.push(" THEN -1 WHEN ");
                self.comparison(left, CompareOp::Gt, right)?;
                self.push(" THEN 1 ELSE 0 END)");
            }
        }
        Ok(())
    }

    fn parameter(&mut self, parameter: &Parameter) {
        let position = match self.positions.get(&parameter.name) {
            Some(position) => *position,
            None => {
                self.binds.push(parameter.value.clone());
                let position = self.binds.len();
                self.positions.insert(parameter.name.clone(), position);
                position
            }
        };
        self.push(&format!("${position}"));
    }

    fn literal(&mut self, value: &Value) {
        let literal = match value {
            Value::Null => "NULL".to_owned(),
            Value::Bool(true) => "TRUE".to_owned(),
            Value::Bool(false) => "FALSE".to_owned(),
            Value::Int(v) | Value::Enum(v) => v.to_string(),
            Value::Float(v) if v.is_nan() => "'NaN'::double precision".to_owned(),
            Value::Float(v) if v.is_infinite() => {
                let sign = if v.is_sign_negative() { "-" } else { "" };
                format!("'{sign}Infinity'::double precision")
            }
            Value::Float(v) => format!("{v:?}::double precision"),
            Value::Decimal(v) => format!("{v}::numeric"),
            Value::Text(v) => quote_literal(v),
            Value::Uuid(v) => format!("'{v}'::uuid"),
            Value::Timestamp(v) => format!("'{v}'::timestamptz"),
            Value::Date(v) => format!("'{v}'::date"),
        };
        self.push(&literal);
    }
}

/// Quotes text as a standard SQL string literal.
fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
