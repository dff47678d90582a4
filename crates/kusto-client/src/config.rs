//! Connection configuration.

use std::str::FromStr;
use std::time::Duration;

use kusto_auth::Credentials;

use crate::error::{Error, Result};

/// Transport options for the HTTP requests this crate issues itself.
///
/// Applies to metadata discovery, to the OAuth2 calls made by the
/// username/password, interactive and non-public-cloud client secret
/// providers, and to managed identity endpoint requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Total time allowed for a single request (default: 30s).
    pub timeout: Duration,
    /// Time to establish the TCP/TLS connection (default: 10s).
    pub connect_timeout: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("kusto-rust/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientOptions {
    /// Create new client options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build an HTTP client honoring these options.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| Error::invalid(format!("failed to build HTTP client: {e}")))
    }
}

/// Configuration for connecting to a Kusto cluster.
///
/// Built from a connection string with [`ConnectionConfig::from_connection_string()`]
/// or from [`ConnectionConfig::new()`] plus the `with_*` builder methods.
/// Fields are a flat record; [`ConnectionConfig::credentials()`] resolves
/// which authentication mode they describe.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Cluster URL, e.g. `https://help.kusto.windows.net`.
    pub data_source: String,
    /// Entra ID user principal name.
    pub aad_user_id: Option<String>,
    /// Password for `aad_user_id`.
    pub password: Option<String>,
    /// Pre-acquired user token.
    pub user_token: Option<String>,
    /// Application (client) ID.
    pub application_client_id: Option<String>,
    /// Application client secret.
    pub application_key: Option<String>,
    /// Application certificate (base64 PKCS#12 or file path).
    pub application_certificate: Option<String>,
    /// Application certificate thumbprint.
    pub application_certificate_thumbprint: Option<String>,
    /// Send the certificate chain with the client assertion.
    pub send_certificate_chain: bool,
    /// Tenant (authority) ID.
    pub authority_id: Option<String>,
    /// Pre-acquired application token.
    pub application_token: Option<String>,
    /// Authenticate with the Azure CLI login.
    pub az_cli: bool,
    /// Authenticate with a managed identity.
    pub msi_authentication: bool,
    /// Client ID of a user-assigned managed identity.
    pub managed_service_identity: Option<String>,
    /// Authenticate interactively.
    pub interactive_login: bool,
    /// Redirect URL / domain hint for interactive sign-in.
    pub redirect_url: Option<String>,
    /// Transport options for metadata and OAuth2 requests.
    pub client_options: Option<ClientOptions>,
}

/// Connection string keywords, after lower-casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    DataSource,
    AadUserId,
    Password,
    UserToken,
    ApplicationClientId,
    ApplicationKey,
    ApplicationCertificate,
    ApplicationCertificateThumbprint,
    SendCertificateChain,
    AuthorityId,
    ApplicationToken,
    AzCli,
    MsiAuthentication,
    ManagedServiceIdentity,
    InteractiveLogin,
    RedirectUrl,
}

impl Keyword {
    fn parse(key: &str) -> Option<Self> {
        let keyword = match key {
            "data source" | "datasource" | "addr" | "address" | "network address" | "server" => {
                Self::DataSource
            }
            "aad user id" | "aaduserid" => Self::AadUserId,
            "password" | "pwd" => Self::Password,
            "user token" | "usertoken" | "usrtoken" => Self::UserToken,
            "application client id" | "applicationclientid" | "appclientid" => {
                Self::ApplicationClientId
            }
            "application key" | "applicationkey" | "appkey" => Self::ApplicationKey,
            "application certificate" | "applicationcertificate" => Self::ApplicationCertificate,
            "application certificate thumbprint" | "applicationcertificatethumbprint"
            | "appcert" => Self::ApplicationCertificateThumbprint,
            "send certificate chain" | "sendcertificatechain" | "sendx5c" => {
                Self::SendCertificateChain
            }
            "authority id" | "authorityid" | "authority" | "tenantid" | "tenant" | "tid" => {
                Self::AuthorityId
            }
            "application token" | "applicationtoken" | "apptoken" => Self::ApplicationToken,
            "az cli" | "azcli" => Self::AzCli,
            "msi_auth" | "msi authentication" | "msiauthentication" => Self::MsiAuthentication,
            "managedserviceidentity" | "managed service identity" => Self::ManagedServiceIdentity,
            "interactive login" | "interactivelogin" => Self::InteractiveLogin,
            "domain hint" | "domainhint" | "redirect url" | "redirecturl" => Self::RedirectUrl,
            _ => return None,
        };
        Some(keyword)
    }
}

/// Treat empty values as unset.
fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse a case-insensitive `true`/`false` value. Empty means `false`.
fn parse_bool(key: &str, value: &str) -> Result<bool> {
    if value.is_empty() || value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else {
        Err(Error::invalid(format!(
            "invalid boolean value for '{key}': {value}"
        )))
    }
}

/// Fail with `message` if `value` is empty.
fn require(value: &str, message: &str) -> Result<String> {
    if value.is_empty() {
        Err(Error::invalid(message))
    } else {
        Ok(value.to_string())
    }
}

impl ConnectionConfig {
    /// Create an empty configuration for `data_source`.
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            ..Self::default()
        }
    }

    /// Parse a connection string into configuration.
    ///
    /// The first segment, if it has no `=`, is the cluster URL:
    /// ```text
    /// https://help.kusto.windows.net/Samples;AAD User ID=alice@contoso.com;Password=secret
    /// ```
    ///
    /// Keys are case-insensitive and unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the string is empty or a
    /// boolean key has a value other than `true`/`false`.
    pub fn from_connection_string(conn_str: &str) -> Result<Self> {
        if conn_str.trim().is_empty() {
            return Err(Error::invalid("Connection string cannot be empty"));
        }

        let mut config = Self::default();

        for (index, part) in conn_str.split(';').enumerate() {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            match part.split_once('=') {
                Some((key, value)) => config.assign(key, value.trim())?,
                None if index == 0 => config.data_source = part.to_string(),
                None => {
                    tracing::debug!(
                        segment = index,
                        "ignoring connection string segment without '='"
                    );
                }
            }
        }

        Ok(config)
    }

    fn assign(&mut self, raw_key: &str, value: &str) -> Result<()> {
        let key = raw_key.trim().to_lowercase();
        let Some(keyword) = Keyword::parse(&key) else {
            // Ignore unknown options for forward compatibility
            tracing::debug!(key = %key, "ignoring unknown connection string option");
            return Ok(());
        };

        match keyword {
            Keyword::DataSource => self.data_source = value.to_string(),
            Keyword::AadUserId => self.aad_user_id = non_empty(value),
            Keyword::Password => self.password = non_empty(value),
            Keyword::UserToken => self.user_token = non_empty(value),
            Keyword::ApplicationClientId => self.application_client_id = non_empty(value),
            Keyword::ApplicationKey => self.application_key = non_empty(value),
            Keyword::ApplicationCertificate => self.application_certificate = non_empty(value),
            Keyword::ApplicationCertificateThumbprint => {
                self.application_certificate_thumbprint = non_empty(value)
            }
            Keyword::SendCertificateChain => {
                self.send_certificate_chain = parse_bool(&key, value)?
            }
            Keyword::AuthorityId => self.authority_id = non_empty(value),
            Keyword::ApplicationToken => self.application_token = non_empty(value),
            Keyword::AzCli => self.az_cli = parse_bool(&key, value)?,
            Keyword::MsiAuthentication => self.msi_authentication = parse_bool(&key, value)?,
            Keyword::ManagedServiceIdentity => self.managed_service_identity = non_empty(value),
            Keyword::InteractiveLogin => self.interactive_login = parse_bool(&key, value)?,
            Keyword::RedirectUrl => self.redirect_url = non_empty(value),
        }
        Ok(())
    }

    /// Authenticate with an Entra ID username and password.
    ///
    /// # Errors
    ///
    /// Returns an error if `user_id` or `password` is empty.
    pub fn with_aad_user_pass_auth(
        mut self,
        user_id: &str,
        password: &str,
        authority_id: &str,
    ) -> Result<Self> {
        self.aad_user_id = Some(require(user_id, "AAD user ID cannot be null")?);
        self.password = Some(require(password, "Password cannot be null")?);
        self.authority_id = non_empty(authority_id);
        Ok(self)
    }

    /// Authenticate with a pre-acquired user token.
    ///
    /// # Errors
    ///
    /// Returns an error if `token` is empty.
    pub fn with_aad_user_token(mut self, token: &str) -> Result<Self> {
        self.user_token = Some(require(token, "UserToken cannot be null")?);
        Ok(self)
    }

    /// Authenticate as an application with a client secret.
    ///
    /// # Errors
    ///
    /// Returns an error if `app_id` or `app_key` is empty.
    pub fn with_aad_app_key(
        mut self,
        app_id: &str,
        app_key: &str,
        authority_id: &str,
    ) -> Result<Self> {
        self.application_client_id =
            Some(require(app_id, "Application client ID cannot be null")?);
        self.application_key = Some(require(app_key, "Application key cannot be null")?);
        self.authority_id = non_empty(authority_id);
        Ok(self)
    }

    /// Authenticate as an application with an X.509 certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if `app_id` or `certificate` is empty.
    pub fn with_app_certificate(
        mut self,
        app_id: &str,
        certificate: &str,
        thumbprint: &str,
        send_certificate_chain: bool,
        authority_id: &str,
    ) -> Result<Self> {
        self.application_client_id =
            Some(require(app_id, "Application client ID cannot be null")?);
        self.application_certificate =
            Some(require(certificate, "Application certificate cannot be null")?);
        self.application_certificate_thumbprint = non_empty(thumbprint);
        self.send_certificate_chain = send_certificate_chain;
        self.authority_id = non_empty(authority_id);
        Ok(self)
    }

    /// Authenticate with a pre-acquired application token.
    ///
    /// # Errors
    ///
    /// Returns an error if `token` is empty.
    pub fn with_application_token(mut self, app_id: &str, token: &str) -> Result<Self> {
        self.application_token = Some(require(token, "ApplicationToken cannot be null")?);
        self.application_client_id = non_empty(app_id);
        Ok(self)
    }

    /// Authenticate with the Azure CLI login.
    #[must_use]
    pub fn with_az_cli(mut self) -> Self {
        self.az_cli = true;
        self
    }

    /// Authenticate with the system-assigned managed identity.
    #[must_use]
    pub fn with_system_managed_identity(mut self) -> Self {
        self.msi_authentication = true;
        self.managed_service_identity = None;
        self
    }

    /// Authenticate with a user-assigned managed identity.
    ///
    /// # Errors
    ///
    /// Returns an error if `client_id` is empty.
    pub fn with_user_managed_identity(mut self, client_id: &str) -> Result<Self> {
        self.managed_service_identity = Some(require(
            client_id,
            "Managed identity client ID cannot be null",
        )?);
        self.msi_authentication = true;
        Ok(self)
    }

    /// Authenticate interactively.
    #[must_use]
    pub fn with_interactive_login(mut self, authority_id: &str) -> Self {
        self.interactive_login = true;
        self.authority_id = non_empty(authority_id);
        self
    }

    /// Set the redirect URL / domain hint for interactive sign-in.
    #[must_use]
    pub fn with_redirect_url(mut self, redirect_url: &str) -> Self {
        self.redirect_url = non_empty(redirect_url);
        self
    }

    /// Set transport options for metadata and OAuth2 requests.
    #[must_use]
    pub fn with_client_options(mut self, options: ClientOptions) -> Self {
        self.client_options = Some(options);
        self
    }

    /// Resolve the authentication mode these fields describe.
    ///
    /// When several modes are populated the first match wins, in this order:
    /// application token, user token, username/password, managed identity,
    /// Azure CLI, client secret, certificate, interactive login, and finally
    /// the environment credential.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        if let Some(token) = &self.application_token {
            return Credentials::application_token(token.clone());
        }
        if let Some(token) = &self.user_token {
            return Credentials::user_token(token.clone());
        }
        if let (Some(username), Some(password)) = (&self.aad_user_id, &self.password) {
            return Credentials::UserPassword {
                username: username.clone(),
                password: password.clone(),
                authority_id: self.authority_id.clone(),
                client_id: self.application_client_id.clone(),
            };
        }
        if self.msi_authentication {
            return Credentials::ManagedIdentity {
                client_id: self.managed_service_identity.clone(),
            };
        }
        if self.az_cli {
            return Credentials::AzureCli;
        }
        if let (Some(client_id), Some(client_secret)) =
            (&self.application_client_id, &self.application_key)
        {
            return Credentials::ClientSecret {
                authority_id: self.authority_id.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            };
        }
        if let Some(certificate) = &self.application_certificate {
            return Credentials::Certificate {
                authority_id: self.authority_id.clone(),
                client_id: self.application_client_id.clone().unwrap_or_default(),
                certificate: certificate.clone(),
                thumbprint: self.application_certificate_thumbprint.clone(),
                send_certificate_chain: self.send_certificate_chain,
            };
        }
        if self.interactive_login {
            return Credentials::Interactive {
                authority_id: self.authority_id.clone(),
                client_id: self.application_client_id.clone(),
                domain_hint: self.redirect_url.clone(),
            };
        }
        Credentials::Environment
    }
}

impl FromStr for ConnectionConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_connection_string(s)
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ConnectionConfig")
            .field("data_source", &self.data_source)
            .field("aad_user_id", &self.aad_user_id)
            .field("password", &redact(&self.password))
            .field("user_token", &redact(&self.user_token))
            .field("application_client_id", &self.application_client_id)
            .field("application_key", &redact(&self.application_key))
            .field("application_certificate", &redact(&self.application_certificate))
            .field(
                "application_certificate_thumbprint",
                &self.application_certificate_thumbprint,
            )
            .field("send_certificate_chain", &self.send_certificate_chain)
            .field("authority_id", &self.authority_id)
            .field("application_token", &redact(&self.application_token))
            .field("az_cli", &self.az_cli)
            .field("msi_authentication", &self.msi_authentication)
            .field("managed_service_identity", &self.managed_service_identity)
            .field("interactive_login", &self.interactive_login)
            .field("redirect_url", &self.redirect_url)
            .field("client_options", &self.client_options)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_only() {
        let config = ConnectionConfig::from_connection_string("https://endpoint").unwrap();
        assert_eq!(config, ConnectionConfig::new("https://endpoint"));
    }

    #[test]
    fn test_keyword_aliases() {
        let config = ConnectionConfig::from_connection_string(
            "Data Source=https://c.kusto.windows.net;AppClientId=app;AppKey=key;TenantId=t",
        )
        .unwrap();
        assert_eq!(config.data_source, "https://c.kusto.windows.net");
        assert_eq!(config.application_client_id.as_deref(), Some("app"));
        assert_eq!(config.application_key.as_deref(), Some("key"));
        assert_eq!(config.authority_id.as_deref(), Some("t"));
    }

    #[test]
    fn test_value_with_equals_sign() {
        let config =
            ConnectionConfig::from_connection_string("https://c;Application Key=abc==").unwrap();
        assert_eq!(config.application_key.as_deref(), Some("abc=="));
    }

    #[test]
    fn test_boolean_parsing() {
        let config =
            ConnectionConfig::from_connection_string("https://c;AZCLI=TRUE;MSI_Auth=False")
                .unwrap();
        assert!(config.az_cli);
        assert!(!config.msi_authentication);

        let err = ConnectionConfig::from_connection_string("https://c;azcli=yes").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("azcli"));
    }

    #[test]
    fn test_segment_without_equals_after_first_is_ignored() {
        let config = ConnectionConfig::from_connection_string("https://c;stray;pwd=x").unwrap();
        assert_eq!(config.data_source, "https://c");
        assert_eq!(config.password.as_deref(), Some("x"));
    }

    #[test]
    fn test_fluent_setters() {
        let config = ConnectionConfig::new("https://c")
            .with_aad_app_key("app", "key", "")
            .unwrap();
        assert_eq!(config.authority_id, None);

        let err = ConnectionConfig::new("https://c")
            .with_aad_app_key("", "key", "tenant")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: Application client ID cannot be null"
        );

        let config = ConnectionConfig::new("https://c")
            .with_user_managed_identity("mi")
            .unwrap();
        assert!(config.msi_authentication);
        assert_eq!(config.managed_service_identity.as_deref(), Some("mi"));

        let config = config.with_system_managed_identity();
        assert_eq!(config.managed_service_identity, None);
    }

    #[test]
    fn test_client_options_builder() {
        let options = ClientOptions::new()
            .timeout(Duration::from_secs(5))
            .user_agent("test-agent");
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.connect_timeout, Duration::from_secs(10));
        assert!(options.http_client().is_ok());

        let config = ConnectionConfig::new("https://c").with_client_options(options.clone());
        assert_eq!(config.client_options, Some(options));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ConnectionConfig::from_connection_string(
            "https://c;aad user id=alice;password=hunter2;apptoken=eyJapp",
        )
        .unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("eyJapp"));
    }
}
