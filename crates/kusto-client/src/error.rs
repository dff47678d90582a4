//! Client error types.

use thiserror::Error;

/// Errors that can occur while parsing a connection string or building a token provider.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The connection string or a builder argument is malformed or incomplete.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The cluster's auth metadata could not be retrieved or decoded.
    #[error("metadata request to {url} failed: {message}")]
    Metadata {
        /// The metadata URL (or the data source, if no URL could be formed).
        url: String,
        /// The underlying failure.
        message: String,
        /// Whether retrying the request may succeed.
        transient: bool,
    },

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    Authentication(#[from] kusto_auth::AuthError),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Check if this error is transient and may succeed on retry.
    ///
    /// No retries are performed by this crate; callers decide.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Metadata { transient, .. } => *transient,
            Self::Authentication(e) => e.is_transient(),
            Self::InvalidConfiguration(_) => false,
        }
    }

    /// Check if this error is caused by bad input rather than the environment.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = Error::invalid("Connection string cannot be empty");
        assert!(err.is_configuration());
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "invalid configuration: Connection string cannot be empty"
        );

        let err = Error::Metadata {
            url: "https://help.kusto.windows.net/v1/rest/auth/metadata".into(),
            message: "HTTP 503".into(),
            transient: true,
        };
        assert!(err.is_transient());
        assert!(!err.is_configuration());

        let err: Error = kusto_auth::AuthError::MissingEnvironment("AZURE_TENANT_ID".into()).into();
        assert_eq!(
            err.to_string(),
            "authentication failed: missing environment variable AZURE_TENANT_ID"
        );
    }
}
