//! Typed field selectors.
//!
//! A [`Field`] pairs a closure reading a value from a record with the
//! symbolic column name a query provider uses to translate predicates and
//! orderings. Only stored fields can drive pagination.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use strum::{AsRefStr, Display};

use crate::{Scalar, ScalarType, Value};

type Accessor<E> = Arc<dyn Fn(&E) -> Value + Send + Sync>;

/// How a field is backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MemberKind {
    /// A column the backing store can filter and sort on.
    Stored,
    /// A value derived in memory; providers cannot translate it.
    Computed,
}

/// A typed selector from a record of type `E` to one scalar column.
pub struct Field<E> {
    name: Cow<'static, str>,
    scalar_type: ScalarType,
    nullable: bool,
    kind: MemberKind,
    accessor: Accessor<E>,
}

impl<E: 'static> Field<E> {
    /// Creates a selector for a storage-backed column.
    pub fn stored<V, F>(name: impl Into<Cow<'static, str>>, accessor: F) -> Self
    where
        V: Scalar + 'static,
        F: Fn(&E) -> V + Send + Sync + 'static,
    {
        Self::new(name, MemberKind::Stored, accessor)
    }

    /// Creates a selector for a value computed from the record.
    ///
    /// Computed fields can be read but are rejected as ordering columns.
    pub fn computed<V, F>(name: impl Into<Cow<'static, str>>, accessor: F) -> Self
    where
        V: Scalar + 'static,
        F: Fn(&E) -> V + Send + Sync + 'static,
    {
        Self::new(name, MemberKind::Computed, accessor)
    }

    fn new<V, F>(name: impl Into<Cow<'static, str>>, kind: MemberKind, accessor: F) -> Self
    where
        V: Scalar + 'static,
        F: Fn(&E) -> V + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            scalar_type: V::scalar_type(),
            nullable: V::NULLABLE,
            kind,
            accessor: Arc::new(move |entity: &E| accessor(entity).into_value()),
        }
    }
}

impl<E> Field<E> {
    /// Returns the column name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column type.
    #[inline]
    pub fn scalar_type(&self) -> ScalarType {
        self.scalar_type
    }

    /// Returns whether the column is declared as an optional value.
    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns how the field is backed.
    #[inline]
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Reads the field from a record.
    #[inline]
    pub fn value(&self, entity: &E) -> Value {
        (self.accessor)(entity)
    }

    /// Returns whether the name is a plain identifier.
    ///
    /// Accepts `[a-zA-Z_][a-zA-Z0-9_]*`.
    pub fn has_valid_name(&self) -> bool {
        let mut chars = self.name.chars();
        let Some(first) = chars.next() else {
            return false;
        };

        (first.is_ascii_alphabetic() || first == '_')
            && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    }
}

impl<E> Clone for Field<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            scalar_type: self.scalar_type,
            nullable: self.nullable,
            kind: self.kind,
            accessor: Arc::clone(&self.accessor),
        }
    }
}

impl<E> fmt::Debug for Field<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("scalar_type", &self.scalar_type)
            .field("nullable", &self.nullable)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
