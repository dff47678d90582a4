//! Client certificate authentication provider.
//!
//! Authenticates an Entra ID service principal with an X.509 certificate
//! instead of a client secret. The certificate's private key signs a JWT
//! assertion which Entra ID validates against the public key registered with
//! the application, then issues an access token for the cluster.
//!
//! The certificate may be given as base64-encoded PKCS#12 data or as a path
//! to a `.pfx`/`.p12` file.
//!
//! ## Example
//!
//! ```rust,ignore
//! use kusto_auth::CertificateAuth;
//!
//! let auth = CertificateAuth::new(
//!     "https://kusto.kusto.windows.net/.default",
//!     "your-tenant-id",
//!     "your-client-id",
//!     "/etc/kusto/service-principal.pfx",
//!     None,
//!     true,
//! )?;
//! let token = auth.get_token().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use azure_core::credentials::{Secret, TokenCredential};
use azure_identity::ClientCertificateCredential;

use crate::error::AuthError;
use crate::provider::{AccessToken, AuthMethod, TokenProvider, access_token, expires_in};

/// Client certificate token provider.
pub struct CertificateAuth {
    credential: Arc<ClientCertificateCredential>,
    client_id: String,
    send_certificate_chain: bool,
    scope: String,
}

impl CertificateAuth {
    /// Create a new certificate authentication provider.
    ///
    /// # Arguments
    ///
    /// * `scope` - The scope to request tokens for
    /// * `tenant_id` - The Entra ID tenant ID
    /// * `client_id` - The application (client) ID of the service principal
    /// * `certificate` - Base64-encoded PKCS#12 data, or a path to a PKCS#12 file
    /// * `password` - Optional password for the certificate's private key
    /// * `send_certificate_chain` - Send the `x5c` chain to support subject name/issuer auth
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be read or the credential
    /// cannot be created.
    pub fn new(
        scope: impl Into<String>,
        tenant_id: impl AsRef<str>,
        client_id: impl Into<String>,
        certificate: &str,
        password: Option<&str>,
        send_certificate_chain: bool,
    ) -> Result<Self, AuthError> {
        use azure_identity::ClientCertificateCredentialOptions;

        let cert_b64 = load_certificate(certificate)?;
        let cert_secret = Secret::new(cert_b64);

        // Password for the certificate (empty string if not provided)
        let cert_password = Secret::new(password.unwrap_or("").to_string());

        let options = ClientCertificateCredentialOptions::new(
            azure_identity::TokenCredentialOptions::default(),
            send_certificate_chain,
        );

        let client_id = client_id.into();
        let credential = ClientCertificateCredential::new(
            tenant_id.as_ref().to_string(),
            client_id.clone(),
            cert_secret,
            cert_password,
            options,
        )
        .map_err(|e| {
            AuthError::Certificate(format!("Failed to create certificate credential: {}", e))
        })?;

        Ok(Self {
            credential,
            client_id,
            send_certificate_chain,
            scope: scope.into(),
        })
    }
}

/// Resolve a certificate argument to base64-encoded PKCS#12.
fn load_certificate(certificate: &str) -> Result<String, AuthError> {
    use base64::Engine;

    let trimmed = certificate.trim();
    if trimmed.is_empty() {
        return Err(AuthError::Certificate("certificate is empty".into()));
    }

    let path = std::path::Path::new(trimmed);
    if path.is_file() {
        let bytes = std::fs::read(path).map_err(|e| {
            AuthError::Certificate(format!("failed to read {}: {e}", path.display()))
        })?;
        return Ok(if is_base64(&bytes) {
            String::from_utf8_lossy(&bytes).trim().to_string()
        } else {
            base64::engine::general_purpose::STANDARD.encode(bytes)
        });
    }

    if is_base64(trimmed.as_bytes()) {
        Ok(trimmed.to_string())
    } else {
        Err(AuthError::Certificate(
            "certificate is neither a readable file nor base64-encoded PKCS#12".into(),
        ))
    }
}

/// Check if bytes look like base64-encoded data.
fn is_base64(data: &[u8]) -> bool {
    // base64 contains only alphanumeric, +, /, = (and line breaks);
    // raw PKCS#12 data has binary bytes
    !data.is_empty()
        && data.iter().all(|&b| {
            b.is_ascii_alphanumeric()
                || b == b'+'
                || b == b'/'
                || b == b'='
                || b == b'\n'
                || b == b'\r'
        })
}

impl Clone for CertificateAuth {
    fn clone(&self) -> Self {
        Self {
            credential: Arc::clone(&self.credential),
            client_id: self.client_id.clone(),
            send_certificate_chain: self.send_certificate_chain,
            scope: self.scope.clone(),
        }
    }
}

impl std::fmt::Debug for CertificateAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuth")
            .field("client_id", &self.client_id)
            .field("credential", &"[REDACTED]")
            .field("send_certificate_chain", &self.send_certificate_chain)
            .field("scope", &self.scope)
            .finish()
    }
}

#[async_trait]
impl TokenProvider for CertificateAuth {
    fn method(&self) -> AuthMethod {
        AuthMethod::Certificate
    }

    fn scope(&self) -> Option<&str> {
        Some(&self.scope)
    }

    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        let token = self
            .credential
            .get_token(&[self.scope.as_str()], None)
            .await
            .map_err(|e| AuthError::Certificate(format!("Failed to acquire token: {}", e)))?;

        Ok(access_token(
            token.token.secret().to_string(),
            expires_in(token.expires_on),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_base64() {
        assert!(is_base64(b"SGVsbG8gV29ybGQ="));
        assert!(is_base64(b"MIIC+jCCAeKgAwIBAgIJAL"));
        assert!(!is_base64(&[0x00, 0x01, 0x02, 0x03])); // Binary data
        assert!(!is_base64(b""));
    }

    #[test]
    fn test_load_certificate_inline_base64() {
        assert_eq!(load_certificate(" MIIKcQIBAz== ").unwrap(), "MIIKcQIBAz==");
    }

    #[test]
    fn test_load_certificate_rejects_garbage() {
        assert!(matches!(
            load_certificate("not a cert!"),
            Err(AuthError::Certificate(_))
        ));
        assert!(matches!(load_certificate(""), Err(AuthError::Certificate(_))));
    }

    #[tokio::test]
    #[ignore = "Requires Azure Service Principal with certificate"]
    async fn test_certificate_auth() {
        let tenant_id = std::env::var("AZURE_TENANT_ID").expect("AZURE_TENANT_ID not set");
        let client_id = std::env::var("AZURE_CLIENT_ID").expect("AZURE_CLIENT_ID not set");
        let cert_path = std::env::var("AZURE_CLIENT_CERTIFICATE_PATH")
            .expect("AZURE_CLIENT_CERTIFICATE_PATH not set");
        let cert_password = std::env::var("AZURE_CLIENT_CERTIFICATE_PASSWORD").ok();

        let auth = CertificateAuth::new(
            "https://kusto.kusto.windows.net/.default",
            tenant_id,
            client_id,
            &cert_path,
            cert_password.as_deref(),
            false,
        )
        .expect("Failed to create CertificateAuth");

        let token = auth.get_token().await.expect("Failed to get token");
        assert!(!token.token.is_empty());
    }
}
