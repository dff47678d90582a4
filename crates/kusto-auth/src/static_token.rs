//! Pre-acquired token providers.
//!
//! When the caller already holds an access token (issued to an application
//! or to a user), the provider simply hands it back. No network call is made
//! when the provider is built or when a token is requested.

use std::time::Duration;

use async_trait::async_trait;

use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::provider::{AccessToken, AuthMethod, TokenProvider};

/// Who the wrapped token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Token issued to an application.
    Application,
    /// Token issued to a user.
    User,
}

/// Token provider wrapping a pre-acquired access token.
///
/// # Example
///
/// ```rust
/// use kusto_auth::StaticTokenAuth;
///
/// let auth = StaticTokenAuth::user("eyJ0eXAi...");
/// ```
#[derive(Clone)]
pub struct StaticTokenAuth {
    token: AccessToken,
    kind: TokenKind,
}

impl StaticTokenAuth {
    /// Wrap a token issued to an application.
    pub fn application(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
            kind: TokenKind::Application,
        }
    }

    /// Wrap a token issued to a user.
    pub fn user(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
            kind: TokenKind::User,
        }
    }

    /// Set a known lifetime so expiry can be detected before the service rejects the token.
    #[must_use]
    pub fn expiring_in(mut self, expires_in: Duration) -> Self {
        self.token = AccessToken::expiring(self.token.token, expires_in);
        self
    }

    /// Create from existing credentials.
    ///
    /// Returns an error if the credentials are not a pre-acquired token.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, AuthError> {
        match credentials {
            Credentials::ApplicationToken { token } => Ok(Self::application(token.clone())),
            Credentials::UserToken { token } => Ok(Self::user(token.clone())),
            other => Err(AuthError::UnsupportedMethod(format!(
                "StaticTokenAuth requires a pre-acquired token, got {}",
                other.method_name()
            ))),
        }
    }

    /// Who the wrapped token was issued to.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }
}

#[async_trait]
impl TokenProvider for StaticTokenAuth {
    fn method(&self) -> AuthMethod {
        match self.kind {
            TokenKind::Application => AuthMethod::ApplicationToken,
            TokenKind::User => AuthMethod::UserToken,
        }
    }

    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        if self.token.is_expired() {
            return Err(AuthError::TokenExpired);
        }

        tracing::debug!(kind = ?self.kind, "using pre-acquired token");

        Ok(self.token.clone())
    }
}

impl std::fmt::Debug for StaticTokenAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenAuth")
            .field("token", &self.token)
            .field("kind", &self.kind)
            .finish()
    }
}
