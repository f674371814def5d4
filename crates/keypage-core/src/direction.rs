//! Navigation direction shared by tokens, configuration and ordering.

#[cfg(feature = "config")]
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Direction in which pages are navigated.
///
/// `Forward` walks the ordering as declared by the columns; `Backward` walks
/// the mirrored ordering.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString
)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// Navigate towards records that sort after the reference.
    #[default]
    Forward,
    /// Navigate towards records that sort before the reference.
    Backward,
}

impl Direction {
    /// Returns the opposite direction.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// Returns whether this is the forward direction.
    #[inline]
    pub fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }

    /// Returns whether this is the backward direction.
    #[inline]
    pub fn is_backward(self) -> bool {
        matches!(self, Self::Backward)
    }

    /// Resolves the effective sort order of a column for this direction.
    ///
    /// Backward navigation flips every column's declared order.
    #[inline]
    pub fn effective_ascending(self, is_ascending: bool) -> bool {
        is_ascending ^ self.is_backward()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_is_involutive() {
        assert_eq!(Direction::Forward.reversed(), Direction::Backward);
        assert_eq!(Direction::Forward.reversed().reversed(), Direction::Forward);
    }

    #[test]
    fn effective_ascending_flips_on_backward() {
        assert!(Direction::Forward.effective_ascending(true));
        assert!(!Direction::Forward.effective_ascending(false));
        assert!(!Direction::Backward.effective_ascending(true));
        assert!(Direction::Backward.effective_ascending(false));
    }

    #[test]
    fn parses_snake_case() {
        assert_eq!("backward".parse::<Direction>().ok(), Some(Direction::Backward));
        assert_eq!(Direction::Forward.to_string(), "forward");
    }
}
