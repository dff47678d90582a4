//! Token provider trait.
//!
//! Every authentication mode produces an implementation of [`TokenProvider`].
//! Callers hold the provider as `Arc<dyn TokenProvider>` and ask it for a
//! bearer token whenever a request to the service is made.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::AuthError;

/// Authentication method enumeration.
///
/// Identifies which credential flow a provider uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AuthMethod {
    /// Pre-acquired application token.
    ApplicationToken,
    /// Pre-acquired user token.
    UserToken,
    /// Entra ID username and password.
    UserPassword,
    /// Managed identity (system or user-assigned).
    ManagedIdentity,
    /// Azure CLI login context.
    AzureCli,
    /// Service principal with client secret.
    ClientSecret,
    /// Service principal with X.509 certificate.
    Certificate,
    /// Interactive sign-in.
    Interactive,
    /// Credentials sourced from `AZURE_*` environment variables.
    Environment,
}

impl AuthMethod {
    /// Check if this method wraps a token acquired outside this crate.
    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self, Self::ApplicationToken | Self::UserToken)
    }

    /// Check if this method signs in on behalf of a user rather than an application.
    #[must_use]
    pub fn is_user_flow(&self) -> bool {
        matches!(
            self,
            Self::UserToken | Self::UserPassword | Self::Interactive | Self::AzureCli
        )
    }
}

/// A bearer token and, when known, the instant it stops being valid.
#[derive(Clone)]
pub struct AccessToken {
    /// The raw bearer token.
    pub token: String,
    /// When the token expires (if known).
    pub expires_at: Option<Instant>,
}

impl AccessToken {
    /// Create a token with no known expiry.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    /// Create a token that expires after `expires_in`.
    ///
    /// A lifetime too large to represent as an [`Instant`] is treated as an
    /// unknown expiry.
    pub fn expiring(token: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            token: token.into(),
            expires_at: Instant::now().checked_add(expires_in),
        }
    }

    /// Check if the token is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Instant::now() >= exp)
            .unwrap_or(false)
    }

    /// Check if the token is expiring soon (within the given duration).
    #[must_use]
    pub fn is_expiring_soon(&self, within: Duration) -> bool {
        self.expires_at
            .map(|exp| Instant::now().checked_add(within).is_none_or(|at| at >= exp))
            .unwrap_or(false)
    }

    /// Format the token as an `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Trait for token providers.
///
/// A provider is built once per connection configuration and may be asked
/// for tokens many times. Providers backed by the identity SDK acquire a
/// fresh token on each call; static providers return the wrapped token.
///
/// # Example
///
/// ```rust,ignore
/// use kusto_auth::{StaticTokenAuth, TokenProvider};
///
/// let provider = StaticTokenAuth::application("eyJ0eXAi...");
/// let token = provider.get_token().await?;
/// ```
#[async_trait]
pub trait TokenProvider: Send + Sync + std::fmt::Debug {
    /// Get the authentication method this provider uses.
    fn method(&self) -> AuthMethod;

    /// The OAuth2 scope tokens are requested for, if the provider requests any.
    fn scope(&self) -> Option<&str> {
        None
    }

    /// Acquire a bearer token.
    async fn get_token(&self) -> Result<AccessToken, AuthError>;
}

/// Convert an SDK expiry timestamp into a duration from now.
pub(crate) fn expires_in(expires_on: time::OffsetDateTime) -> Option<Duration> {
    let now = time::OffsetDateTime::now_utc();
    if expires_on > now {
        let diff = expires_on - now;
        Some(Duration::from_secs(diff.whole_seconds().max(0) as u64))
    } else {
        None
    }
}

/// Build an [`AccessToken`] from a secret and optional lifetime.
pub(crate) fn access_token(token: String, lifetime: Option<Duration>) -> AccessToken {
    match lifetime {
        Some(duration) => AccessToken::expiring(token, duration),
        None => AccessToken::new(token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_method_properties() {
        assert!(AuthMethod::ApplicationToken.is_static());
        assert!(AuthMethod::UserToken.is_static());
        assert!(!AuthMethod::ManagedIdentity.is_static());

        assert!(AuthMethod::UserPassword.is_user_flow());
        assert!(AuthMethod::Interactive.is_user_flow());
        assert!(!AuthMethod::ClientSecret.is_user_flow());
    }

    #[test]
    fn test_access_token_expiry() {
        let token = AccessToken::expiring("abc", Duration::from_secs(3600));
        assert!(!token.is_expired());
        assert!(!token.is_expiring_soon(Duration::from_secs(60)));
        assert!(token.is_expiring_soon(Duration::from_secs(7200)));

        let token = AccessToken::new("abc");
        assert!(!token.is_expired());
        assert!(!token.is_expiring_soon(Duration::from_secs(u32::MAX as u64)));
    }

    #[test]
    fn test_access_token_expired() {
        let token = AccessToken::expiring("abc", Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(10));
        assert!(token.is_expired());
    }

    #[test]
    fn test_access_token_unrepresentable_lifetime() {
        let token = AccessToken::expiring("abc", Duration::from_secs(u64::MAX));
        assert!(token.expires_at.is_none());
        assert!(!token.is_expired());

        let token = AccessToken::expiring("abc", Duration::from_secs(60));
        assert!(token.is_expiring_soon(Duration::MAX));
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(AccessToken::new("abc").bearer(), "Bearer abc");
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", AccessToken::new("secret_token"));
        assert!(!debug.contains("secret_token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_expires_in_past_is_none() {
        let past = time::OffsetDateTime::now_utc() - time::Duration::seconds(30);
        assert!(expires_in(past).is_none());

        let future = time::OffsetDateTime::now_utc() + time::Duration::seconds(600);
        let remaining = expires_in(future).unwrap_or_default();
        assert!(remaining > Duration::from_secs(590));
    }
}
