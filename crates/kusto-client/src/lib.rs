//! # kusto-client
//!
//! Connection-string parsing and token-provider selection for Azure Data
//! Explorer (Kusto).
//!
//! A [`ConnectionConfig`] is parsed from a semicolon-delimited connection
//! string (or assembled with `with_*` builder methods), then turned into
//! exactly one [`TokenProvider`] by [`ConnectionConfig::token_provider`].
//!
//! ## Authentication Precedence
//!
//! When several modes are populated the first match wins:
//!
//! | # | Populated fields | Provider |
//! |---|------------------|----------|
//! | 1 | `Application Token` | static application token |
//! | 2 | `User Token` | static user token |
//! | 3 | `AAD User ID` + `Password` | username/password |
//! | 4 | `MSI_Auth=true` | managed identity |
//! | 5 | `AZCLI=true` | Azure CLI |
//! | 6 | `Application Client Id` + `Application Key` | client secret |
//! | 7 | `Application Certificate` | certificate (`cert-auth` feature) |
//! | 8 | `Interactive Login=true` | interactive (device code) |
//! | - | none of the above | `AZURE_*` environment variables |
//!
//! ## Example
//!
//! ```rust,ignore
//! use kusto_client::ConnectionConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::from_connection_string(
//!         "https://help.kusto.windows.net/Samples;AZCLI=true",
//!     )?;
//!
//!     let provider = config.token_provider().await?;
//!     let token = provider.get_token().await?;
//!     println!("Authorization: {}", token.bearer());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod metadata;
pub mod token_provider;

// Re-export commonly used types
pub use config::{ClientOptions, ConnectionConfig};
pub use error::{Error, Result};
pub use kusto_auth::{AccessToken, AuthError, AuthMethod, Credentials, TokenProvider};
pub use metadata::{AzureAdInfo, CloudInfo, DstsInfo};
pub use token_provider::build_provider;
