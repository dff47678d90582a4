//! Cluster auth metadata discovery.
//!
//! Every Kusto cluster publishes the identity settings clients need at
//! `/v1/rest/auth/metadata`:
//!
//! ```json
//! {
//!   "AzureAD": {
//!     "LoginEndpoint": "https://login.microsoftonline.com",
//!     "LoginMfaRequired": false,
//!     "KustoClientAppId": "db662dc1-0cfe-4e1c-a843-19a68e65be58",
//!     "KustoClientRedirectUri": "https://microsoft/kustoclient",
//!     "KustoServiceResourceId": "https://kusto.kusto.windows.net",
//!     "FirstPartyAuthorityUrl": "https://login.microsoftonline.com/f8cdef31-..."
//!   },
//!   "dSTS": { "CloudEndpointSuffix": "windows.net", ... }
//! }
//! ```
//!
//! The document is fetched once per [`crate::ConnectionConfig::token_provider`]
//! call. Caching it is left to the caller, who can pass a fetched
//! [`CloudInfo`] to [`crate::build_provider`].

use reqwest::Url;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Path of the metadata document, relative to the cluster root.
pub const METADATA_PATH: &str = "/v1/rest/auth/metadata";

/// Entra ID settings of a cluster's cloud.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AzureAdInfo {
    /// Entra ID login endpoint.
    pub login_endpoint: String,
    /// Whether the cloud requires MFA on sign-in.
    pub login_mfa_required: bool,
    /// First-party client application ID for user sign-in.
    pub kusto_client_app_id: String,
    /// Redirect URI registered for the client application.
    pub kusto_client_redirect_uri: String,
    /// Resource ID tokens are requested for.
    pub kusto_service_resource_id: String,
    /// Authority URL for first-party applications.
    pub first_party_authority_url: String,
}

/// dSTS settings of a cluster's cloud.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DstsInfo {
    /// DNS suffix of cloud endpoints.
    pub cloud_endpoint_suffix: String,
    /// dSTS realm.
    pub dsts_realm: String,
    /// dSTS instance host.
    pub dsts_instance: String,
    /// Kusto DNS host name.
    pub kusto_dns_host_name: String,
    /// Service name.
    pub service_name: String,
}

/// The metadata document returned by a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CloudInfo {
    /// Entra ID settings.
    #[serde(rename = "AzureAD", default)]
    pub azure_ad: AzureAdInfo,
    /// dSTS settings, absent on most public clouds.
    #[serde(rename = "dSTS", default)]
    pub dsts: Option<DstsInfo>,
}

impl CloudInfo {
    /// Build the metadata URL for a data source.
    ///
    /// The database path, query and fragment of the data source are dropped;
    /// the metadata document lives at the cluster root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] if `data_source` is not an absolute
    /// `http`/`https` URL.
    pub fn metadata_url(data_source: &str) -> Result<Url> {
        let fail = |message: String| Error::Metadata {
            url: format!("{}{}", data_source.trim_end_matches('/'), METADATA_PATH),
            message,
            transient: false,
        };

        let mut url = Url::parse(data_source.trim()).map_err(|e| fail(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(fail(format!("unsupported protocol scheme \"{}\"", url.scheme())));
        }
        url.set_path(METADATA_PATH);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    /// Fetch the metadata document for a data source.
    ///
    /// Performs exactly one GET; no retries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] on an invalid URL, transport failure,
    /// non-2xx status, malformed JSON, or a document without a service
    /// resource ID.
    pub async fn fetch(http: &reqwest::Client, data_source: &str) -> Result<Self> {
        let url = Self::metadata_url(data_source)?;
        let url_str = url.to_string();

        tracing::debug!(url = %url_str, "fetching cluster auth metadata");

        let response = http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::Metadata {
                url: url_str.clone(),
                transient: e.is_timeout() || e.is_connect(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url_str, status = status.as_u16(), "metadata request rejected");
            return Err(Error::Metadata {
                url: url_str,
                message: format!("HTTP {status}"),
                transient: status.is_server_error()
                    || status == reqwest::StatusCode::TOO_MANY_REQUESTS,
            });
        }

        let body = response.bytes().await.map_err(|e| Error::Metadata {
            url: url_str.clone(),
            message: e.to_string(),
            transient: true,
        })?;

        Self::from_json(&body).map_err(|message| Error::Metadata {
            url: url_str,
            message,
            transient: false,
        })
    }

    /// Decode and validate a metadata document.
    fn from_json(body: &[u8]) -> std::result::Result<Self, String> {
        let info: Self =
            serde_json::from_slice(body).map_err(|e| format!("malformed metadata: {e}"))?;
        if info.azure_ad.kusto_service_resource_id.is_empty() {
            return Err("metadata is missing AzureAD.KustoServiceResourceId".into());
        }
        Ok(info)
    }

    /// The OAuth2 scope to request tokens for.
    #[must_use]
    pub fn scope(&self) -> String {
        format!(
            "{}/.default",
            self.azure_ad.kusto_service_resource_id.trim_end_matches('/')
        )
    }

    /// The login endpoint, falling back to the public cloud.
    #[must_use]
    pub fn login_endpoint(&self) -> &str {
        if self.azure_ad.login_endpoint.is_empty() {
            kusto_auth::DEFAULT_LOGIN_ENDPOINT
        } else {
            &self.azure_ad.login_endpoint
        }
    }

    /// The first-party client application ID, if the cluster publishes one.
    #[must_use]
    pub fn client_app_id(&self) -> Option<&str> {
        Some(self.azure_ad.kusto_client_app_id.as_str()).filter(|id| !id.is_empty())
    }
}
