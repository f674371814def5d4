//! Process-wide registry of three-way comparison functions.
//!
//! Some column types cannot be compared with native `<`/`>` operators in a
//! generated predicate and are instead compared through a three-way
//! comparison tested against zero. Booleans, text and unique identifiers are
//! registered up front; enum types are registered the first time a column of
//! that type is seen.

use std::cmp::Ordering;
use std::sync::LazyLock;

use dashmap::DashMap;

use crate::{ScalarType, TRACING_TARGET_REGISTRY, Value};

/// Three-way comparison between two column values.
///
/// Returns `None` when the operands cannot be compared (mismatched types or
/// `Null`), which makes the enclosing comparison false.
pub type CompareFn = fn(&Value, &Value) -> Option<Ordering>;

/// Named three-way comparison operation for one scalar type.
#[derive(Debug, Clone, Copy)]
pub struct CompareMethod {
    scalar_type: ScalarType,
    compare: CompareFn,
}

impl CompareMethod {
    /// Returns the scalar type this operation compares.
    #[inline]
    pub fn scalar_type(&self) -> ScalarType {
        self.scalar_type
    }

    /// Compares two values, returning `-1`, `0` or `1`.
    pub fn call(&self, left: &Value, right: &Value) -> Option<i64> {
        (self.compare)(left, right).map(|ordering| ordering as i64)
    }
}

impl PartialEq for CompareMethod {
    fn eq(&self, other: &Self) -> bool {
        self.scalar_type == other.scalar_type
    }
}

static REGISTRY: LazyLock<DashMap<ScalarType, CompareMethod>> = LazyLock::new(|| {
    let map = DashMap::new();
    for scalar_type in [ScalarType::Bool, ScalarType::Text, ScalarType::Uuid] {
        map.insert(
            scalar_type,
            CompareMethod {
                scalar_type,
                compare: Value::native_cmp,
            },
        );
    }
    map
});

/// Lookup from a column type to its three-way comparison operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComparisonRegistry;

impl ComparisonRegistry {
    /// Returns whether `scalar_type` can use native relational operators.
    pub fn supports_native_ordering(scalar_type: ScalarType) -> bool {
        Self::comparison_for(scalar_type).is_none()
    }

    /// Returns the three-way comparison for `scalar_type`, if it needs one.
    ///
    /// Enum types are registered on first lookup and memoized.
    pub fn comparison_for(scalar_type: ScalarType) -> Option<CompareMethod> {
        if let Some(method) = REGISTRY.get(&scalar_type) {
            return Some(*method);
        }

        let ScalarType::Enum(enum_type) = scalar_type else {
            return None;
        };

        let method = *REGISTRY.entry(scalar_type).or_insert_with(|| {
            tracing::debug!(
                target: TRACING_TARGET_REGISTRY,
                enum_type = enum_type.name(),
                "Registered enum comparison"
            );
            CompareMethod {
                scalar_type,
                compare: Value::native_cmp,
            }
        });

        Some(method)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::{EnumType, Scalar};

    #[derive(Clone, Copy)]
    enum Color {
        Red,
        Blue,
    }

    crate::scalar_enum!(Color);

    #[test]
    fn seeded_types_need_three_way_comparison() {
        assert!(!ComparisonRegistry::supports_native_ordering(ScalarType::Bool));
        assert!(!ComparisonRegistry::supports_native_ordering(ScalarType::Text));
        assert!(!ComparisonRegistry::supports_native_ordering(ScalarType::Uuid));
    }

    #[test]
    fn numeric_and_temporal_types_are_native() {
        for scalar_type in [
            ScalarType::Int,
            ScalarType::Float,
            ScalarType::Decimal,
            ScalarType::Timestamp,
            ScalarType::Date,
        ] {
            assert!(ComparisonRegistry::supports_native_ordering(scalar_type));
        }
    }

    #[test]
    fn enums_are_registered_once() {
        let scalar_type = ScalarType::Enum(EnumType::of::<Color>());
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(move || ComparisonRegistry::comparison_for(scalar_type)))
            .collect();

        for handle in handles {
            let method = handle.join().expect("lookup thread panicked");
            assert_eq!(method.map(|m| m.scalar_type()), Some(scalar_type));
        }

        let method = ComparisonRegistry::comparison_for(scalar_type).expect("registered");
        assert_eq!(
            method.call(&Color::Red.into_value(), &Color::Blue.into_value()),
            Some(-1)
        );
    }

    #[test]
    fn text_comparison_is_three_way() {
        let method = ComparisonRegistry::comparison_for(ScalarType::Text).expect("seeded");
        let a = Value::Text("a".into());
        let b = Value::Text("b".into());
        assert_eq!(method.call(&a, &b), Some(-1));
        assert_eq!(method.call(&b, &a), Some(1));
        assert_eq!(method.call(&a, &a), Some(0));
        assert_eq!(method.call(&a, &Value::Null), None);
    }
}
