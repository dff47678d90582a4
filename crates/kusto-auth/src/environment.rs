//! Credentials sourced from `AZURE_*` environment variables.
//!
//! This is the fallback when a connection string names no explicit
//! authentication mode. Variables are read in this order:
//!
//! | Variable | Required |
//! |----------|----------|
//! | `AZURE_TENANT_ID` | always |
//! | `AZURE_CLIENT_ID` | always |
//! | `AZURE_CLIENT_SECRET` | for client secret auth |
//! | `AZURE_CLIENT_CERTIFICATE_PATH` | for certificate auth (`cert-auth` feature) |
//! | `AZURE_CLIENT_CERTIFICATE_PASSWORD` | optional, with the certificate |
//! | `AZURE_USERNAME` / `AZURE_PASSWORD` | for username/password auth |
//!
//! Empty or whitespace-only values are treated as unset.

use std::sync::Arc;

use async_trait::async_trait;

use crate::azure_identity_auth::ServicePrincipalAuth;
use crate::error::AuthError;
use crate::provider::{AccessToken, AuthMethod, TokenProvider};
use crate::user_password::UserPasswordAuth;

/// Tenant ID variable.
pub const AZURE_TENANT_ID: &str = "AZURE_TENANT_ID";
/// Client ID variable.
pub const AZURE_CLIENT_ID: &str = "AZURE_CLIENT_ID";
/// Client secret variable.
pub const AZURE_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
/// Certificate path variable.
pub const AZURE_CLIENT_CERTIFICATE_PATH: &str = "AZURE_CLIENT_CERTIFICATE_PATH";
/// Certificate password variable.
pub const AZURE_CLIENT_CERTIFICATE_PASSWORD: &str = "AZURE_CLIENT_CERTIFICATE_PASSWORD";
/// Username variable.
pub const AZURE_USERNAME: &str = "AZURE_USERNAME";
/// Password variable.
pub const AZURE_PASSWORD: &str = "AZURE_PASSWORD";

/// Read an environment variable, returning None if unset, empty, or whitespace-only.
pub fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Token provider configured from the environment.
#[derive(Clone)]
pub struct EnvironmentAuth {
    inner: Arc<dyn TokenProvider>,
}

impl EnvironmentAuth {
    /// Build a provider from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingEnvironment`] naming the first required
    /// variable that is not set.
    pub fn from_env(
        http: reqwest::Client,
        login_endpoint: &str,
        scope: &str,
    ) -> Result<Self, AuthError> {
        Self::from_lookup(http, login_endpoint, scope, env_var_or_none)
    }

    /// Build a provider reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingEnvironment`] naming the first required
    /// variable that `lookup` does not return.
    pub fn from_lookup<F>(
        http: reqwest::Client,
        login_endpoint: &str,
        scope: &str,
        lookup: F,
    ) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require =
            |name: &str| lookup(name).ok_or_else(|| AuthError::MissingEnvironment(name.into()));

        let tenant_id = require(AZURE_TENANT_ID)?;
        let client_id = require(AZURE_CLIENT_ID)?;

        let inner: Arc<dyn TokenProvider> = if let Some(secret) = lookup(AZURE_CLIENT_SECRET) {
            tracing::debug!(tenant_id = %tenant_id, "environment credential: client secret");
            Arc::new(ServicePrincipalAuth::with_authority(
                http,
                login_endpoint,
                scope,
                tenant_id,
                client_id,
                secret,
            )?)
        } else if let Some(cert_path) = lookup(AZURE_CLIENT_CERTIFICATE_PATH) {
            tracing::debug!(tenant_id = %tenant_id, "environment credential: certificate");
            certificate_provider(
                scope,
                &tenant_id,
                client_id,
                &cert_path,
                lookup(AZURE_CLIENT_CERTIFICATE_PASSWORD),
            )?
        } else if let Some(username) = lookup(AZURE_USERNAME) {
            let password = require(AZURE_PASSWORD)?;
            tracing::debug!(tenant_id = %tenant_id, "environment credential: username/password");
            Arc::new(UserPasswordAuth::new(
                http,
                login_endpoint,
                Some(&tenant_id),
                client_id,
                username,
                password,
                scope,
            )?)
        } else {
            return Err(AuthError::MissingEnvironment(AZURE_CLIENT_SECRET.into()));
        };

        Ok(Self { inner })
    }

    /// The method of the underlying provider.
    #[must_use]
    pub fn inner_method(&self) -> AuthMethod {
        self.inner.method()
    }
}

#[cfg(feature = "cert-auth")]
fn certificate_provider(
    scope: &str,
    tenant_id: &str,
    client_id: String,
    cert_path: &str,
    password: Option<String>,
) -> Result<Arc<dyn TokenProvider>, AuthError> {
    let auth = crate::cert_auth::CertificateAuth::new(
        scope,
        tenant_id,
        client_id,
        cert_path,
        password.as_deref(),
        false,
    )?;
    Ok(Arc::new(auth))
}

#[cfg(not(feature = "cert-auth"))]
fn certificate_provider(
    _scope: &str,
    _tenant_id: &str,
    _client_id: String,
    _cert_path: &str,
    _password: Option<String>,
) -> Result<Arc<dyn TokenProvider>, AuthError> {
    Err(AuthError::UnsupportedMethod(
        "certificate authentication requires the `cert-auth` feature".into(),
    ))
}

#[async_trait]
impl TokenProvider for EnvironmentAuth {
    fn method(&self) -> AuthMethod {
        AuthMethod::Environment
    }

    fn scope(&self) -> Option<&str> {
        self.inner.scope()
    }

    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        self.inner.get_token().await
    }
}

impl std::fmt::Debug for EnvironmentAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentAuth")
            .field("inner", &self.inner)
            .finish()
    }
}
