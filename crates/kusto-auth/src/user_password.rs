//! Entra ID username/password authentication.
//!
//! Uses the OAuth2 resource owner password credentials grant against the
//! tenant's v2.0 token endpoint. Accounts that require MFA or are federated
//! to another identity provider cannot use this flow.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::oauth::{self, DEFAULT_TENANT};
use crate::provider::{AccessToken, AuthMethod, TokenProvider};

/// Username/password token provider.
#[derive(Clone)]
pub struct UserPasswordAuth {
    http: reqwest::Client,
    token_endpoint: String,
    client_id: String,
    username: String,
    password: String,
    scope: String,
}

impl UserPasswordAuth {
    /// Create a new username/password provider.
    ///
    /// `tenant_id` falls back to the `organizations` tenant when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the username or password is empty.
    pub fn new(
        http: reqwest::Client,
        login_endpoint: &str,
        tenant_id: Option<&str>,
        client_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        scope: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() {
            return Err(AuthError::InvalidCredentials("username is empty".into()));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials("password is empty".into()));
        }

        let tenant = tenant_id.unwrap_or(DEFAULT_TENANT);
        Ok(Self {
            http,
            token_endpoint: oauth::endpoint(login_endpoint, tenant, "token"),
            client_id: client_id.into(),
            username,
            password,
            scope: scope.into(),
        })
    }

    /// The token endpoint this provider posts to.
    #[must_use]
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }
}

#[async_trait]
impl TokenProvider for UserPasswordAuth {
    fn method(&self) -> AuthMethod {
        AuthMethod::UserPassword
    }

    fn scope(&self) -> Option<&str> {
        Some(&self.scope)
    }

    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        tracing::debug!(
            username = %self.username,
            endpoint = %self.token_endpoint,
            "requesting token with username/password"
        );

        let params = [
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await?;

        Ok(oauth::read_token_response(response)
            .await?
            .into_access_token())
    }
}

impl std::fmt::Debug for UserPasswordAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPasswordAuth")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SCOPE: &str = "https://kusto.kusto.windows.net/.default";

    fn provider(login: &str, password: &str) -> Result<UserPasswordAuth, AuthError> {
        UserPasswordAuth::new(
            reqwest::Client::new(),
            login,
            Some("contoso"),
            "app-id",
            "alice@contoso.com",
            password,
            SCOPE,
        )
    }

    #[test]
    fn test_empty_password_rejected() {
        let result = provider("https://login.example", "");
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[test]
    fn test_default_tenant() {
        let auth = UserPasswordAuth::new(
            reqwest::Client::new(),
            "https://login.example",
            None,
            "app-id",
            "alice",
            "pw",
            SCOPE,
        )
        .unwrap();
        assert_eq!(
            auth.token_endpoint(),
            "https://login.example/organizations/oauth2/v2.0/token"
        );
    }

    #[tokio::test]
    async fn test_password_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=alice%40contoso.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "access_token": "user-access-token",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = provider(&server.uri(), "pw").unwrap();
        let token = auth.get_token().await.unwrap();
        assert_eq!(token.token, "user-access-token");
        assert!(token.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_invalid_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "AADSTS50126: Error validating credentials"
            })))
            .mount(&server)
            .await;

        let auth = provider(&server.uri(), "wrong").unwrap();
        let err = auth.get_token().await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_unrepresentable_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "t",
                "expires_in": u64::MAX
            })))
            .mount(&server)
            .await;

        let auth = provider(&server.uri(), "pw").unwrap();
        let token = auth.get_token().await.unwrap();
        assert_eq!(token.token, "t");
        assert!(token.expires_at.is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let auth = provider("https://login.example", "hunter2").unwrap();
        let debug = format!("{auth:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("alice@contoso.com"));
    }
}
