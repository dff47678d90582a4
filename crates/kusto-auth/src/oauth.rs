//! Entra ID OAuth2 v2.0 endpoint helpers shared by the user sign-in flows.

use std::time::Duration;

use serde::Deserialize;

use crate::error::AuthError;
use crate::provider::{AccessToken, access_token};

/// Public-cloud login endpoint, used when the cluster metadata does not name one.
pub const DEFAULT_LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";

/// Tenant used when no authority ID is configured.
pub const DEFAULT_TENANT: &str = "organizations";

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    pub(crate) fn into_access_token(self) -> AccessToken {
        access_token(self.access_token, self.expires_in.map(Duration::from_secs))
    }
}

/// Error body returned by the authorize/token endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn into_auth_error(self) -> AuthError {
        match self.error_description {
            Some(description) => {
                AuthError::TokenAcquisition(format!("{}: {}", self.error, description))
            }
            None => AuthError::TokenAcquisition(self.error),
        }
    }
}

/// Build `<login_endpoint>/<tenant>/oauth2/v2.0/<path>`.
pub(crate) fn endpoint(login_endpoint: &str, tenant: &str, path: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/{}",
        login_endpoint.trim_end_matches('/'),
        tenant,
        path
    )
}

/// Read a token endpoint response, mapping OAuth2 error bodies to [`AuthError`].
pub(crate) async fn read_token_response(
    response: reqwest::Response,
) -> Result<TokenResponse, AuthError> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        serde_json::from_str(&body).map_err(|e| {
            AuthError::TokenAcquisition(format!("malformed token response: {e}"))
        })
    } else {
        Err(parse_error(status, &body))
    }
}

/// Map a non-success body to an [`AuthError`].
pub(crate) fn parse_error(status: reqwest::StatusCode, body: &str) -> AuthError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => err.into_auth_error(),
        Err(_) => AuthError::TokenAcquisition(format!("token endpoint returned {status}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            endpoint("https://login.microsoftonline.com/", "contoso", "token"),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_error_response_message() {
        let err = parse_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"AADSTS50126: bad password"}"#,
        );
        assert_eq!(
            err.to_string(),
            "failed to acquire token: invalid_grant: AADSTS50126: bad password"
        );

        let err = parse_error(reqwest::StatusCode::BAD_GATEWAY, "<html>");
        assert!(err.to_string().contains("502"));
    }
}
