//! Interactive sign-in using the OAuth2 device authorization grant.
//!
//! The provider asks Entra ID for a device code, shows the user a
//! verification URL and code, then polls the token endpoint until the user
//! has completed sign-in in a browser on any device.
//!
//! ## Flow
//!
//! 1. POST `<login>/<tenant>/oauth2/v2.0/devicecode` with client ID and scope
//! 2. Hand the returned message to the prompt callback
//! 3. POST `<login>/<tenant>/oauth2/v2.0/token` every `interval` seconds
//!    until a token is issued, the code expires, or the user declines

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AuthError;
use crate::oauth::{self, DEFAULT_TENANT, ErrorResponse};
use crate::provider::{AccessToken, AuthMethod, TokenProvider};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Default polling interval when the server does not send one.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on the polling interval, whatever the server asks for.
const MAX_INTERVAL: Duration = Duration::from_secs(60);

/// Device authorization response shown to the user.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodePrompt {
    /// Code the user types on the verification page.
    pub user_code: String,
    /// Page the user opens to sign in.
    pub verification_uri: String,
    /// Human-readable instructions from the server.
    #[serde(default)]
    pub message: String,
    /// Seconds until the device code expires.
    pub expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
    device_code: String,
}

/// Callback receiving the sign-in instructions.
pub type PromptCallback = Arc<dyn Fn(&DeviceCodePrompt) + Send + Sync>;

fn default_prompt(prompt: &DeviceCodePrompt) {
    tracing::info!(
        verification_uri = %prompt.verification_uri,
        user_code = %prompt.user_code,
        "interactive sign-in required"
    );
    eprintln!("{}", prompt.message);
}

/// Interactive token provider.
#[derive(Clone)]
pub struct DeviceCodeAuth {
    http: reqwest::Client,
    device_code_endpoint: String,
    token_endpoint: String,
    client_id: String,
    scope: String,
    domain_hint: Option<String>,
    prompt: PromptCallback,
}

impl DeviceCodeAuth {
    /// Create an interactive provider.
    ///
    /// `tenant_id` falls back to the `organizations` tenant when `None`.
    pub fn new(
        http: reqwest::Client,
        login_endpoint: &str,
        tenant_id: Option<&str>,
        client_id: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        let tenant = tenant_id.unwrap_or(DEFAULT_TENANT);
        Self {
            http,
            device_code_endpoint: oauth::endpoint(login_endpoint, tenant, "devicecode"),
            token_endpoint: oauth::endpoint(login_endpoint, tenant, "token"),
            client_id: client_id.into(),
            scope: scope.into(),
            domain_hint: None,
            prompt: Arc::new(default_prompt),
        }
    }

    /// Forward a domain hint to the sign-in page.
    #[must_use]
    pub fn with_domain_hint(mut self, domain_hint: Option<String>) -> Self {
        self.domain_hint = domain_hint;
        self
    }

    /// Replace the default prompt (log + stderr) with a custom callback.
    #[must_use]
    pub fn with_prompt<F>(mut self, prompt: F) -> Self
    where
        F: Fn(&DeviceCodePrompt) + Send + Sync + 'static,
    {
        self.prompt = Arc::new(prompt);
        self
    }

    async fn request_device_code(&self) -> Result<DeviceCodePrompt, AuthError> {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("scope", self.scope.as_str()),
        ];
        if let Some(hint) = &self.domain_hint {
            params.push(("domain_hint", hint.as_str()));
        }

        let response = self
            .http
            .post(&self.device_code_endpoint)
            .form(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(oauth::parse_error(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| AuthError::TokenAcquisition(format!("malformed device code response: {e}")))
    }

    async fn poll(&self, prompt: &DeviceCodePrompt) -> Result<AccessToken, AuthError> {
        // No local deadline if the lifetime overflows; the server still sends `expired_token`.
        let deadline = Instant::now().checked_add(Duration::from_secs(prompt.expires_in));
        let mut interval = prompt
            .interval
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_INTERVAL)
            .min(MAX_INTERVAL);

        loop {
            tokio::time::sleep(interval).await;
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(AuthError::TokenExpired);
            }

            let params = [
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", self.client_id.as_str()),
                ("device_code", prompt.device_code.as_str()),
            ];
            let response = self
                .http
                .post(&self.token_endpoint)
                .form(&params)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;

            if status.is_success() {
                let token: oauth::TokenResponse = serde_json::from_str(&body).map_err(|e| {
                    AuthError::TokenAcquisition(format!("malformed token response: {e}"))
                })?;
                return Ok(token.into_access_token());
            }

            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) if err.error == "authorization_pending" => {
                    tracing::trace!("waiting for user to complete sign-in");
                }
                Ok(err) if err.error == "slow_down" => {
                    interval = (interval + DEFAULT_INTERVAL).min(MAX_INTERVAL);
                    tracing::debug!(interval_secs = interval.as_secs(), "token endpoint asked to slow down");
                }
                Ok(err) if err.error == "expired_token" => return Err(AuthError::TokenExpired),
                Ok(err) => return Err(err.into_auth_error()),
                Err(_) => return Err(oauth::parse_error(status, &body)),
            }
        }
    }
}

#[async_trait]
impl TokenProvider for DeviceCodeAuth {
    fn method(&self) -> AuthMethod {
        AuthMethod::Interactive
    }

    fn scope(&self) -> Option<&str> {
        Some(&self.scope)
    }

    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        let prompt = self.request_device_code().await?;
        (self.prompt)(&prompt);
        self.poll(&prompt).await
    }
}

impl std::fmt::Debug for DeviceCodeAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCodeAuth")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("domain_hint", &self.domain_hint)
            .finish_non_exhaustive()
    }
}
