//! # kusto-auth
//!
//! Token providers for Azure Data Explorer (Kusto) connections.
//!
//! This crate provides one [`TokenProvider`] per authentication mode,
//! isolated from connection-string handling for better modularity and
//! testing. Token issuance is delegated to `azure_identity` or to the
//! Entra ID OAuth2 endpoints.
//!
//! ## Supported Authentication Methods
//!
//! | Method | Feature Flag | Provider |
//! |--------|--------------|----------|
//! | Application / user token | default | [`StaticTokenAuth`] |
//! | Username/password | default | [`UserPasswordAuth`] |
//! | Managed Identity | default | [`ManagedIdentityAuth`] |
//! | Azure CLI | default | [`AzureCliAuth`] |
//! | Service Principal | default | [`ServicePrincipalAuth`] |
//! | Certificate | `cert-auth` | `CertificateAuth` |
//! | Interactive (device code) | default | [`DeviceCodeAuth`] |
//! | Environment variables | default | [`EnvironmentAuth`] |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod azure_identity_auth;
#[cfg(feature = "cert-auth")]
pub mod cert_auth;
pub mod credentials;
pub mod device_code;
pub mod environment;
pub mod error;
pub mod oauth;
pub mod provider;
pub mod static_token;
pub mod user_password;

pub use azure_identity_auth::{AzureCliAuth, ManagedIdentityAuth, ServicePrincipalAuth};
#[cfg(feature = "cert-auth")]
pub use cert_auth::CertificateAuth;
pub use credentials::Credentials;
pub use device_code::{DeviceCodeAuth, DeviceCodePrompt};
pub use environment::EnvironmentAuth;
pub use error::AuthError;
pub use oauth::{DEFAULT_LOGIN_ENDPOINT, DEFAULT_TENANT};
pub use provider::{AccessToken, AuthMethod, TokenProvider};
pub use static_token::{StaticTokenAuth, TokenKind};
pub use user_password::UserPasswordAuth;
