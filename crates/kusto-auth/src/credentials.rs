//! Credential types for authentication.

use crate::provider::AuthMethod;

/// The authentication mode chosen for a connection.
///
/// Exactly one variant is resolved per connection configuration. Each
/// variant carries only the inputs its flow needs, so the provider built
/// from it never has to guess which of several populated fields applies.
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Credentials {
    /// Pre-acquired application token.
    ApplicationToken {
        /// The access token string.
        token: String,
    },

    /// Pre-acquired user token.
    UserToken {
        /// The access token string.
        token: String,
    },

    /// Entra ID username and password.
    UserPassword {
        /// User principal name.
        username: String,
        /// Password.
        password: String,
        /// Tenant ID (default tenant if absent).
        authority_id: Option<String>,
        /// Application ID to sign in through (service default if absent).
        client_id: Option<String>,
    },

    /// Managed identity (for VMs, App Service, containers and AKS).
    ManagedIdentity {
        /// Optional client ID for user-assigned identity.
        client_id: Option<String>,
    },

    /// Azure CLI login context.
    AzureCli,

    /// Service principal with client secret.
    ClientSecret {
        /// Tenant ID (default tenant if absent).
        authority_id: Option<String>,
        /// Application (client) ID.
        client_id: String,
        /// Client secret.
        client_secret: String,
    },

    /// Service principal with X.509 certificate.
    Certificate {
        /// Tenant ID (default tenant if absent).
        authority_id: Option<String>,
        /// Application (client) ID.
        client_id: String,
        /// PKCS#12 certificate, base64-encoded or a path to a `.pfx` file.
        certificate: String,
        /// Certificate thumbprint, if known.
        thumbprint: Option<String>,
        /// Send the full certificate chain (`x5c`) with the assertion.
        send_certificate_chain: bool,
    },

    /// Interactive sign-in.
    Interactive {
        /// Tenant ID (default tenant if absent).
        authority_id: Option<String>,
        /// Application ID to sign in through (service default if absent).
        client_id: Option<String>,
        /// Domain hint forwarded to the sign-in page.
        domain_hint: Option<String>,
    },

    /// Credentials sourced from `AZURE_*` environment variables.
    Environment,
}

impl Credentials {
    /// Create application token credentials.
    pub fn application_token(token: impl Into<String>) -> Self {
        Self::ApplicationToken {
            token: token.into(),
        }
    }

    /// Create user token credentials.
    pub fn user_token(token: impl Into<String>) -> Self {
        Self::UserToken {
            token: token.into(),
        }
    }

    /// Get the authentication method for these credentials.
    #[must_use]
    pub fn method(&self) -> AuthMethod {
        match self {
            Self::ApplicationToken { .. } => AuthMethod::ApplicationToken,
            Self::UserToken { .. } => AuthMethod::UserToken,
            Self::UserPassword { .. } => AuthMethod::UserPassword,
            Self::ManagedIdentity { .. } => AuthMethod::ManagedIdentity,
            Self::AzureCli => AuthMethod::AzureCli,
            Self::ClientSecret { .. } => AuthMethod::ClientSecret,
            Self::Certificate { .. } => AuthMethod::Certificate,
            Self::Interactive { .. } => AuthMethod::Interactive,
            Self::Environment => AuthMethod::Environment,
        }
    }

    /// Check if these credentials need the service's auth metadata to build a provider.
    #[must_use]
    pub fn requires_metadata(&self) -> bool {
        !self.method().is_static()
    }

    /// Get the authentication method name.
    #[must_use]
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::ApplicationToken { .. } => "Application Token",
            Self::UserToken { .. } => "User Token",
            Self::UserPassword { .. } => "AAD Username/Password",
            Self::ManagedIdentity { client_id: None } => "System-Assigned Managed Identity",
            Self::ManagedIdentity { client_id: Some(_) } => "User-Assigned Managed Identity",
            Self::AzureCli => "Azure CLI",
            Self::ClientSecret { .. } => "Application Key",
            Self::Certificate { .. } => "Application Certificate",
            Self::Interactive { .. } => "Interactive Login",
            Self::Environment => "Environment Credential",
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose sensitive data in debug output
        match self {
            Self::ApplicationToken { .. } => f
                .debug_struct("ApplicationToken")
                .field("token", &"[REDACTED]")
                .finish(),
            Self::UserToken { .. } => f
                .debug_struct("UserToken")
                .field("token", &"[REDACTED]")
                .finish(),
            Self::UserPassword {
                username,
                authority_id,
                client_id,
                ..
            } => f
                .debug_struct("UserPassword")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .field("authority_id", authority_id)
                .field("client_id", client_id)
                .finish(),
            Self::ManagedIdentity { client_id } => f
                .debug_struct("ManagedIdentity")
                .field("client_id", client_id)
                .finish(),
            Self::AzureCli => f.debug_struct("AzureCli").finish(),
            Self::ClientSecret {
                authority_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("authority_id", authority_id)
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .finish(),
            Self::Certificate {
                authority_id,
                client_id,
                thumbprint,
                send_certificate_chain,
                ..
            } => f
                .debug_struct("Certificate")
                .field("authority_id", authority_id)
                .field("client_id", client_id)
                .field("certificate", &"[REDACTED]")
                .field("thumbprint", thumbprint)
                .field("send_certificate_chain", send_certificate_chain)
                .finish(),
            Self::Interactive {
                authority_id,
                client_id,
                domain_hint,
            } => f
                .debug_struct("Interactive")
                .field("authority_id", authority_id)
                .field("client_id", client_id)
                .field("domain_hint", domain_hint)
                .finish(),
            Self::Environment => f.debug_struct("Environment").finish(),
        }
    }
}
