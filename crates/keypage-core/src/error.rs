//! Common error type definitions.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Query adapters attach their backend failures (connection pools, drivers)
/// as the source of an [`Error`] using this type.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur during pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Paginator misconfiguration: no columns, a column added after
    /// pagination started, or a column that is not storage-backed.
    Configuration,
    /// A required argument was missing or out of range.
    InvalidArgument,
    /// A continuation token could not be decoded or does not belong to
    /// this paginator's column set.
    InvalidToken,
    /// The operation was cancelled before the backing store answered.
    Cancelled,
    /// The backing store failed to execute a query.
    Query,
    /// An internal invariant was broken.
    Internal,
}

/// A structured error type for pagination operations.
#[derive(Debug, Error)]
#[error("{}{}", kind.as_ref(), message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
#[must_use = "pagination errors should be handled appropriately"]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Whether retrying the failed operation may succeed.
    pub transient: bool,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            transient: false,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Adds an already boxed source error to this error.
    pub fn with_boxed_source(mut self, source: BoxedError) -> Self {
        self.source = Some(source);
        self
    }

    /// Marks this error as transient.
    pub fn with_transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument() -> Self {
        Self::new(ErrorKind::InvalidArgument)
    }

    /// Creates a new invalid token error.
    pub fn invalid_token() -> Self {
        Self::new(ErrorKind::InvalidToken)
    }

    /// Creates a new cancellation error.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled)
    }

    /// Creates a new query error.
    pub fn query() -> Self {
        Self::new(ErrorKind::Query)
    }

    /// Creates a new internal error.
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns whether this error indicates a failure that might succeed on retry.
    ///
    /// Configuration, argument and token errors are programming errors and
    /// never transient.
    pub fn is_transient(&self) -> bool {
        self.transient && matches!(self.kind, ErrorKind::Query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let error = Error::configuration().with_message("no columns defined");
        assert_eq!(error.to_string(), "configuration: no columns defined");
        assert_eq!(error.kind_str(), "configuration");
    }

    #[test]
    fn display_without_message() {
        assert_eq!(Error::cancelled().to_string(), "cancelled");
    }

    #[test]
    fn only_query_errors_are_transient() {
        assert!(Error::query().with_transient(true).is_transient());
        assert!(!Error::configuration().with_transient(true).is_transient());
        assert!(!Error::query().is_transient());
    }
}
