//! Azure Identity token providers.
//!
//! This module provides Kusto authentication using the `azure_identity` crate
//! for token acquisition. It supports:
//!
//! - **Managed Identity**: For Azure VMs, App Service, Container Instances, and AKS
//! - **Service Principal**: For application-based authentication with client credentials
//! - **Azure CLI**: Reuses the signed-in `az` session on developer machines
//!
//! Every provider is bound to the scope resolved from the cluster's auth
//! metadata, e.g. `https://kusto.kusto.windows.net/.default`.
//!
//! ## Example: Managed Identity (User-Assigned)
//!
//! ```rust,ignore
//! use kusto_auth::{ManagedIdentityAuth, TokenProvider};
//!
//! let auth = ManagedIdentityAuth::user_assigned_client_id(
//!     "https://kusto.kusto.windows.net/.default",
//!     "your-client-id",
//! )?;
//! let token = auth.get_token().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use azure_core::credentials::{Secret, TokenCredential};
use azure_core::http::Transport;
use azure_identity::{
    AzureCliCredential, ClientSecretCredential, ManagedIdentityCredential,
    ManagedIdentityCredentialOptions, UserAssignedId,
};

use crate::error::AuthError;
use crate::oauth::{self, DEFAULT_LOGIN_ENDPOINT};
use crate::provider::{AccessToken, AuthMethod, TokenProvider, access_token, expires_in};

/// Request a token for `scope` from an SDK credential.
async fn request_token(
    credential: &dyn TokenCredential,
    scope: &str,
) -> Result<AccessToken, AuthError> {
    let token = credential
        .get_token(&[scope], None)
        .await
        .map_err(|e| AuthError::AzureIdentity(e.to_string()))?;

    Ok(access_token(
        token.token.secret().to_string(),
        expires_in(token.expires_on),
    ))
}

/// Managed Identity token provider.
///
/// Uses Azure Managed Identity to acquire access tokens for the cluster.
#[derive(Clone)]
pub struct ManagedIdentityAuth {
    credential: Arc<ManagedIdentityCredential>,
    client_id: Option<String>,
    scope: String,
    custom_transport: bool,
}

impl ManagedIdentityAuth {
    /// Create authentication using system-assigned managed identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the managed identity credential cannot be created.
    pub fn system_assigned(scope: impl Into<String>) -> Result<Self, AuthError> {
        Self::build(scope.into(), None, None)
    }

    /// Create authentication using a user-assigned managed identity by client ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the managed identity credential cannot be created.
    pub fn user_assigned_client_id(
        scope: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<Self, AuthError> {
        Self::build(scope.into(), Some(client_id.into()), None)
    }

    /// Create from an optional user-assigned client ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the managed identity credential cannot be created.
    pub fn new(scope: impl Into<String>, client_id: Option<&str>) -> Result<Self, AuthError> {
        Self::build(scope.into(), client_id.map(str::to_string), None)
    }

    /// Create from an optional user-assigned client ID, sending identity
    /// endpoint requests through `http`.
    ///
    /// The client's timeouts and user agent then apply to token requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the managed identity credential cannot be created.
    pub fn with_http_client(
        scope: impl Into<String>,
        client_id: Option<&str>,
        http: reqwest::Client,
    ) -> Result<Self, AuthError> {
        Self::build(scope.into(), client_id.map(str::to_string), Some(http))
    }

    fn build(
        scope: String,
        client_id: Option<String>,
        http: Option<reqwest::Client>,
    ) -> Result<Self, AuthError> {
        let mut options = ManagedIdentityCredentialOptions::default();
        options.user_assigned_id = client_id.clone().map(UserAssignedId::ClientId);
        let custom_transport = http.is_some();
        if let Some(http) = http {
            options.client_options.transport = Some(Transport::new(Arc::new(http)));
        }

        let credential = ManagedIdentityCredential::new(Some(options))
            .map_err(|e| AuthError::AzureIdentity(e.to_string()))?;
        Ok(Self {
            credential,
            client_id,
            scope,
            custom_transport,
        })
    }

    /// Whether identity endpoint requests go through a caller-supplied client.
    #[must_use]
    pub fn uses_custom_transport(&self) -> bool {
        self.custom_transport
    }

    /// The user-assigned identity's client ID, if any.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }
}

impl std::fmt::Debug for ManagedIdentityAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedIdentityAuth")
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("custom_transport", &self.custom_transport)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for ManagedIdentityAuth {
    fn method(&self) -> AuthMethod {
        AuthMethod::ManagedIdentity
    }

    fn scope(&self) -> Option<&str> {
        Some(&self.scope)
    }

    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        request_token(self.credential.as_ref(), &self.scope).await
    }
}

/// Where a service principal's tokens come from.
#[derive(Clone)]
enum ClientSecretSource {
    /// `azure_identity` against the public cloud authority.
    Sdk(Arc<ClientSecretCredential>),
    /// Client credentials grant posted to a cloud-specific token endpoint.
    TokenEndpoint {
        http: reqwest::Client,
        endpoint: String,
        client_secret: String,
    },
}

/// Service Principal token provider.
///
/// Uses an application's client ID and secret to acquire access tokens.
/// This is suitable for server-to-server authentication where no user is present.
#[derive(Clone)]
pub struct ServicePrincipalAuth {
    source: ClientSecretSource,
    tenant_id: String,
    client_id: String,
    scope: String,
}

impl ServicePrincipalAuth {
    /// Create a new Service Principal authenticator for the public cloud.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be created.
    pub fn new(
        scope: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let tenant_id = tenant_id.into();
        let client_id = client_id.into();
        let secret = Secret::new(client_secret.into());
        let credential = ClientSecretCredential::new(&tenant_id, client_id.clone(), secret, None)
            .map_err(|e| AuthError::AzureIdentity(e.to_string()))?;
        Ok(Self {
            source: ClientSecretSource::Sdk(credential),
            tenant_id,
            client_id,
            scope: scope.into(),
        })
    }

    /// Create a Service Principal authenticator signing in at `login_endpoint`.
    ///
    /// The public cloud endpoint uses the SDK credential. Any other endpoint
    /// (sovereign or private clouds) gets the client credentials grant posted
    /// to `<login_endpoint>/<tenant>/oauth2/v2.0/token` through `http`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be created or the secret is empty.
    pub fn with_authority(
        http: reqwest::Client,
        login_endpoint: &str,
        scope: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let login_endpoint = login_endpoint.trim_end_matches('/');
        if login_endpoint.is_empty() || login_endpoint.eq_ignore_ascii_case(DEFAULT_LOGIN_ENDPOINT)
        {
            return Self::new(scope, tenant_id, client_id, client_secret);
        }

        let client_secret = client_secret.into();
        if client_secret.is_empty() {
            return Err(AuthError::InvalidCredentials("client secret is empty".into()));
        }
        let tenant_id = tenant_id.into();
        Ok(Self {
            source: ClientSecretSource::TokenEndpoint {
                http,
                endpoint: oauth::endpoint(login_endpoint, &tenant_id, "token"),
                client_secret,
            },
            tenant_id,
            client_id: client_id.into(),
            scope: scope.into(),
        })
    }

    /// The tenant the application signs in to.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// The token endpoint, when tokens are not issued through the SDK.
    #[must_use]
    pub fn token_endpoint(&self) -> Option<&str> {
        match &self.source {
            ClientSecretSource::Sdk(_) => None,
            ClientSecretSource::TokenEndpoint { endpoint, .. } => Some(endpoint),
        }
    }
}

impl std::fmt::Debug for ServicePrincipalAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePrincipalAuth")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("token_endpoint", &self.token_endpoint())
            .field("credential", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

#[async_trait]
impl TokenProvider for ServicePrincipalAuth {
    fn method(&self) -> AuthMethod {
        AuthMethod::ClientSecret
    }

    fn scope(&self) -> Option<&str> {
        Some(&self.scope)
    }

    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        match &self.source {
            ClientSecretSource::Sdk(credential) => {
                request_token(credential.as_ref(), &self.scope).await
            }
            ClientSecretSource::TokenEndpoint {
                http,
                endpoint,
                client_secret,
            } => {
                tracing::debug!(endpoint = %endpoint, "requesting token with client credentials");
                let params = [
                    ("grant_type", "client_credentials"),
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("scope", self.scope.as_str()),
                ];
                let response = http.post(endpoint).form(&params).send().await?;
                Ok(oauth::read_token_response(response)
                    .await?
                    .into_access_token())
            }
        }
    }
}

/// Azure CLI token provider.
///
/// Shells out to `az account get-access-token`; the user must have run
/// `az login` beforehand.
#[derive(Clone)]
pub struct AzureCliAuth {
    credential: Arc<AzureCliCredential>,
    scope: String,
}

impl AzureCliAuth {
    /// Create a provider using the current Azure CLI login.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be created.
    pub fn new(scope: impl Into<String>) -> Result<Self, AuthError> {
        let credential =
            AzureCliCredential::new(None).map_err(|e| AuthError::AzureIdentity(e.to_string()))?;
        Ok(Self {
            credential,
            scope: scope.into(),
        })
    }
}

impl std::fmt::Debug for AzureCliAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureCliAuth")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for AzureCliAuth {
    fn method(&self) -> AuthMethod {
        AuthMethod::AzureCli
    }

    fn scope(&self) -> Option<&str> {
        Some(&self.scope)
    }

    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        request_token(self.credential.as_ref(), &self.scope).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SCOPE: &str = "https://kusto.kusto.windows.net/.default";

    // Note: Token acquisition needs a real Azure environment.
    // Those tests are ignored by default and can be run manually with:
    // cargo test -p kusto-auth -- --ignored

    #[test]
    fn test_service_principal_construction() {
        let auth = ServicePrincipalAuth::new(SCOPE, "tenant", "client", "s3cr3t-value").unwrap();
        assert_eq!(auth.method(), AuthMethod::ClientSecret);
        assert_eq!(auth.scope(), Some(SCOPE));
        assert_eq!(auth.tenant_id(), "tenant");

        let debug = format!("{auth:?}");
        assert!(!debug.contains("s3cr3t-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_service_principal_public_cloud_uses_sdk() {
        let auth = ServicePrincipalAuth::with_authority(
            reqwest::Client::new(),
            "https://login.microsoftonline.com/",
            SCOPE,
            "tenant",
            "client",
            "s3cr3t-value",
        )
        .unwrap();
        assert_eq!(auth.token_endpoint(), None);
    }

    #[tokio::test]
    async fn test_service_principal_sovereign_cloud() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "app-token",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = ServicePrincipalAuth::with_authority(
            reqwest::Client::new(),
            &server.uri(),
            SCOPE,
            "tenant",
            "client",
            "s3cr3t-value",
        )
        .unwrap();
        assert_eq!(
            auth.token_endpoint(),
            Some(format!("{}/tenant/oauth2/v2.0/token", server.uri()).as_str())
        );
        assert!(!format!("{auth:?}").contains("s3cr3t-value"));

        let token = auth.get_token().await.unwrap();
        assert_eq!(token.token, "app-token");
    }

    #[test]
    fn test_managed_identity_custom_transport() {
        let http = reqwest::Client::builder()
            .user_agent("kusto-test")
            .build()
            .unwrap();
        if let Ok(auth) = ManagedIdentityAuth::with_http_client(SCOPE, Some("mi-client"), http) {
            assert!(auth.uses_custom_transport());
            assert_eq!(auth.client_id(), Some("mi-client"));
        }
        if let Ok(auth) = ManagedIdentityAuth::system_assigned(SCOPE) {
            assert!(!auth.uses_custom_transport());
        }
    }

    #[test]
    fn test_managed_identity_client_id() {
        if let Ok(auth) = ManagedIdentityAuth::new(SCOPE, Some("mi-client")) {
            assert_eq!(auth.client_id(), Some("mi-client"));
            assert_eq!(auth.method(), AuthMethod::ManagedIdentity);
            assert!(format!("{auth:?}").contains("ManagedIdentityAuth"));
        }
    }

    #[test]
    fn test_azure_cli_construction() {
        if let Ok(auth) = AzureCliAuth::new(SCOPE) {
            assert_eq!(auth.method(), AuthMethod::AzureCli);
            assert_eq!(auth.scope(), Some(SCOPE));
        }
    }

    #[tokio::test]
    #[ignore = "Requires Azure Managed Identity environment"]
    async fn test_managed_identity_system_assigned() {
        let auth = ManagedIdentityAuth::system_assigned(SCOPE).expect("Failed to create credential");
        let token = auth.get_token().await.expect("Failed to get token");
        assert!(!token.token.is_empty());
    }

    #[tokio::test]
    #[ignore = "Requires Azure Service Principal credentials"]
    async fn test_service_principal() {
        let tenant_id = std::env::var("AZURE_TENANT_ID").expect("AZURE_TENANT_ID not set");
        let client_id = std::env::var("AZURE_CLIENT_ID").expect("AZURE_CLIENT_ID not set");
        let client_secret =
            std::env::var("AZURE_CLIENT_SECRET").expect("AZURE_CLIENT_SECRET not set");

        let auth = ServicePrincipalAuth::new(SCOPE, tenant_id, client_id, client_secret)
            .expect("Failed to create credential");
        let token = auth.get_token().await.expect("Failed to get token");
        assert!(!token.token.is_empty());
    }
}
