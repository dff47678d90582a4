//! Token-provider selection.
//!
//! Turns a [`ConnectionConfig`] into exactly one [`TokenProvider`]. The
//! authentication mode is resolved once by [`ConnectionConfig::credentials`];
//! this module then matches on the resulting [`Credentials`] variant.

use std::sync::Arc;

use kusto_auth::{
    AuthError, AzureCliAuth, Credentials, DeviceCodeAuth, EnvironmentAuth, ManagedIdentityAuth,
    ServicePrincipalAuth, StaticTokenAuth, TokenProvider, UserPasswordAuth,
};

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::metadata::CloudInfo;

impl ConnectionConfig {
    /// Build the token provider for this configuration.
    ///
    /// Pre-acquired application and user tokens are wrapped without any
    /// network call. Every other mode first fetches the cluster's auth
    /// metadata to learn the scope, login endpoint and default client ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] if the metadata request fails and
    /// [`Error::Authentication`] if the chosen credential cannot be built.
    pub async fn token_provider(&self) -> Result<Arc<dyn TokenProvider>> {
        let credentials = self.credentials();
        tracing::debug!(
            method = credentials.method_name(),
            data_source = %self.data_source,
            "selected authentication mode"
        );

        if !credentials.requires_metadata() {
            let provider = StaticTokenAuth::from_credentials(&credentials)?;
            return Ok(Arc::new(provider));
        }

        let options = self.client_options.clone().unwrap_or_default();
        let http = options.http_client()?;
        let cloud = CloudInfo::fetch(&http, &self.data_source).await?;

        build_provider(credentials, &cloud, http)
    }
}

/// Build a provider for `credentials` using already-fetched cluster metadata.
///
/// `http` carries the caller's transport options to every provider that
/// makes its own HTTP calls: username/password, interactive, client secret
/// on non-public clouds, managed identity, and the environment credential.
/// The Azure CLI credential shells out to `az`, which signs in against the
/// cloud the CLI is configured for.
///
/// # Errors
///
/// Returns [`Error::Authentication`] if the credential cannot be built, or
/// [`Error::InvalidConfiguration`] if a user flow has no client ID.
pub fn build_provider(
    credentials: Credentials,
    cloud: &CloudInfo,
    http: reqwest::Client,
) -> Result<Arc<dyn TokenProvider>> {
    let scope = cloud.scope();
    let login_endpoint = cloud.login_endpoint();

    let provider: Arc<dyn TokenProvider> = match credentials {
        Credentials::ApplicationToken { .. } | Credentials::UserToken { .. } => {
            Arc::new(StaticTokenAuth::from_credentials(&credentials)?)
        }
        Credentials::UserPassword {
            username,
            password,
            authority_id,
            client_id,
        } => {
            let client_id = user_client_id(client_id, cloud)?;
            Arc::new(UserPasswordAuth::new(
                http,
                login_endpoint,
                authority_id.as_deref(),
                client_id,
                username,
                password,
                scope,
            )?)
        }
        Credentials::ManagedIdentity { client_id } => Arc::new(
            ManagedIdentityAuth::with_http_client(scope, client_id.as_deref(), http)?,
        ),
        Credentials::AzureCli => Arc::new(AzureCliAuth::new(scope)?),
        Credentials::ClientSecret {
            authority_id,
            client_id,
            client_secret,
        } => Arc::new(ServicePrincipalAuth::with_authority(
            http,
            login_endpoint,
            scope,
            authority_id.unwrap_or_else(|| kusto_auth::DEFAULT_TENANT.to_string()),
            client_id,
            client_secret,
        )?),
        Credentials::Certificate {
            authority_id,
            client_id,
            certificate,
            thumbprint,
            send_certificate_chain,
        } => {
            if client_id.is_empty() {
                return Err(Error::invalid(
                    "Application client ID is required for certificate authentication",
                ));
            }
            tracing::debug!(thumbprint = ?thumbprint, "building certificate credential");
            if !is_public_cloud(login_endpoint) {
                tracing::warn!(
                    login_endpoint,
                    "certificate credential signs in at the public cloud authority"
                );
            }
            certificate_provider(
                scope,
                authority_id.unwrap_or_else(|| kusto_auth::DEFAULT_TENANT.to_string()),
                client_id,
                &certificate,
                send_certificate_chain,
            )?
        }
        Credentials::Interactive {
            authority_id,
            client_id,
            domain_hint,
        } => {
            let client_id = user_client_id(client_id, cloud)?;
            Arc::new(
                DeviceCodeAuth::new(
                    http,
                    login_endpoint,
                    authority_id.as_deref(),
                    client_id,
                    scope,
                )
                .with_domain_hint(domain_hint),
            )
        }
        Credentials::Environment => {
            Arc::new(EnvironmentAuth::from_env(http, login_endpoint, &scope)?)
        }
        other => {
            return Err(AuthError::UnsupportedMethod(other.method_name().to_string()).into());
        }
    };

    Ok(provider)
}

fn is_public_cloud(login_endpoint: &str) -> bool {
    login_endpoint
        .trim_end_matches('/')
        .eq_ignore_ascii_case(kusto_auth::DEFAULT_LOGIN_ENDPOINT)
}

/// Client ID for user sign-in: the configured one, else the cluster's first-party app.
fn user_client_id(client_id: Option<String>, cloud: &CloudInfo) -> Result<String> {
    client_id
        .or_else(|| cloud.client_app_id().map(str::to_string))
        .ok_or_else(|| {
            Error::invalid("no application client ID configured and none published by the cluster")
        })
}

#[cfg(feature = "cert-auth")]
fn certificate_provider(
    scope: String,
    tenant_id: String,
    client_id: String,
    certificate: &str,
    send_certificate_chain: bool,
) -> Result<Arc<dyn TokenProvider>> {
    let auth = kusto_auth::CertificateAuth::new(
        scope,
        tenant_id,
        client_id,
        certificate,
        None,
        send_certificate_chain,
    )?;
    Ok(Arc::new(auth))
}

#[cfg(not(feature = "cert-auth"))]
fn certificate_provider(
    _scope: String,
    _tenant_id: String,
    _client_id: String,
    _certificate: &str,
    _send_certificate_chain: bool,
) -> Result<Arc<dyn TokenProvider>> {
    Err(AuthError::UnsupportedMethod(
        "certificate authentication requires the `cert-auth` feature".into(),
    )
    .into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kusto_auth::AuthMethod;

    fn cloud(client_app_id: &str) -> CloudInfo {
        let mut info = CloudInfo::default();
        info.azure_ad.kusto_service_resource_id = "https://kusto.windows.net".into();
        info.azure_ad.login_endpoint = "https://login.example".into();
        info.azure_ad.kusto_client_app_id = client_app_id.into();
        info
    }

    #[test]
    fn test_user_client_id_fallback() {
        assert_eq!(user_client_id(None, &cloud("kusto-app")).unwrap(), "kusto-app");
        assert_eq!(
            user_client_id(Some("mine".into()), &cloud("kusto-app")).unwrap(),
            "mine"
        );
        assert!(user_client_id(None, &cloud("")).unwrap_err().is_configuration());
    }

    #[test]
    fn test_build_user_password() {
        let creds = Credentials::UserPassword {
            username: "alice".into(),
            password: "pw".into(),
            authority_id: None,
            client_id: None,
        };
        let provider = build_provider(creds, &cloud("kusto-app"), reqwest::Client::new()).unwrap();
        assert_eq!(provider.method(), AuthMethod::UserPassword);
        assert_eq!(provider.scope(), Some("https://kusto.windows.net/.default"));
    }

    #[test]
    fn test_build_interactive() {
        let creds = Credentials::Interactive {
            authority_id: Some("tenant".into()),
            client_id: None,
            domain_hint: Some("contoso.com".into()),
        };
        let provider = build_provider(creds, &cloud("kusto-app"), reqwest::Client::new()).unwrap();
        assert_eq!(provider.method(), AuthMethod::Interactive);
    }

    #[test]
    fn test_certificate_requires_client_id() {
        let creds = Credentials::Certificate {
            authority_id: None,
            client_id: String::new(),
            certificate: "MIIK".into(),
            thumbprint: None,
            send_certificate_chain: false,
        };
        let err = build_provider(creds, &cloud("kusto-app"), reqwest::Client::new()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[cfg(not(feature = "cert-auth"))]
    #[test]
    fn test_certificate_without_feature() {
        let creds = Credentials::Certificate {
            authority_id: None,
            client_id: "app".into(),
            certificate: "MIIK".into(),
            thumbprint: None,
            send_certificate_chain: true,
        };
        let err = build_provider(creds, &cloud("kusto-app"), reqwest::Client::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication(AuthError::UnsupportedMethod(_))
        ));
    }
}
