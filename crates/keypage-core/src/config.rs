//! Paginator configuration.
//!
//! A [`PaginatorConfig`] is created once by the caller, validated, and then
//! shared read-only by every paginator built from it.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Direction, Error, Result, TRACING_TARGET_PAGINATOR};

/// Continuation token formatting options.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct TokenOptions {
    /// Embed an integrity hash bound to the paginator's column set
    #[cfg_attr(
        feature = "config",
        arg(long = "token-include-hash", env = "TOKEN_INCLUDE_HASH")
    )]
    #[serde(default)]
    pub include_hash: bool,

    /// Deflate the token payload before encoding
    #[cfg_attr(
        feature = "config",
        arg(long = "token-use-compression", env = "TOKEN_USE_COMPRESSION")
    )]
    #[serde(default)]
    pub use_compression: bool,
}

/// Paging behaviour shared by the paginators of one query shape.
///
/// ## Example
///
/// ```rust
/// use keypage_core::{Direction, PaginatorConfig};
///
/// let config = PaginatorConfig::new(25)
///     .with_direction(Direction::Backward)
///     .with_parameterized_queries(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "paginator configurations must be used to create paginators"]
pub struct PaginatorConfig {
    /// Maximum number of records per page (1-1000)
    #[cfg_attr(
        feature = "config",
        arg(long = "page-size", env = "PAGE_SIZE", default_value = "10")
    )]
    pub page_size: usize,

    /// Direction of the first page and of "next" navigation
    #[cfg_attr(
        feature = "config",
        arg(
            long = "page-direction",
            env = "PAGE_DIRECTION",
            value_enum,
            default_value = "forward"
        )
    )]
    #[serde(default)]
    pub direction: Direction,

    /// Bind reference values as named parameters instead of inline literals
    #[cfg_attr(
        feature = "config",
        arg(
            long = "parameterized-queries",
            env = "PARAMETERIZED_QUERIES",
            default_value = "true",
            action = clap::ArgAction::Set
        )
    )]
    #[serde(default = "default_parameterized")]
    pub use_parameterized_queries: bool,

    /// Continuation token options
    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(default)]
    pub token_options: TokenOptions,
}

const fn default_parameterized() -> bool {
    true
}

// Configuration constants
const DEFAULT_PAGE_SIZE: usize = 10;
const MIN_PAGE_SIZE: usize = 1;
const MAX_PAGE_SIZE: usize = 1000;

impl PaginatorConfig {
    /// Creates a forward, parameterized configuration with the given page size.
    #[tracing::instrument(target = TRACING_TARGET_PAGINATOR)]
    pub fn new(page_size: usize) -> Self {
        let this = Self {
            page_size,
            direction: Direction::Forward,
            use_parameterized_queries: true,
            token_options: TokenOptions::default(),
        };

        tracing::debug!(
            target: TRACING_TARGET_PAGINATOR,
            page_size = this.page_size,
            direction = %this.direction,
            use_parameterized_queries = this.use_parameterized_queries,
            "Created paginator configuration"
        );

        this
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the default navigation direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets whether reference values are bound as parameters.
    pub fn with_parameterized_queries(mut self, enabled: bool) -> Self {
        self.use_parameterized_queries = enabled;
        self
    }

    /// Sets the continuation token options.
    pub fn with_token_options(mut self, token_options: TokenOptions) -> Self {
        self.token_options = token_options;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(Error::invalid_argument().with_message(format!(
                "page_size must be between {} and {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }

        Ok(())
    }
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn defaults() {
        let config = PaginatorConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.direction, Direction::Forward);
        assert!(config.use_parameterized_queries);
        assert_eq!(config.token_options, TokenOptions::default());
    }

    #[test]
    fn rejects_out_of_range_page_size() {
        let error = PaginatorConfig::new(0).validate().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        assert!(PaginatorConfig::new(MAX_PAGE_SIZE + 1).validate().is_err());
        assert!(PaginatorConfig::new(MAX_PAGE_SIZE).validate().is_ok());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: PaginatorConfig =
            serde_json::from_str(r#"{"page_size": 5}"#).expect("valid config");
        assert_eq!(config.page_size, 5);
        assert_eq!(config.direction, Direction::Forward);
        assert!(config.use_parameterized_queries);
        assert!(!config.token_options.include_hash);
    }
}
