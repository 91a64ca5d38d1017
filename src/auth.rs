//! Bearer token acquisition
//!
//! [`Authenticator`] performs the raw `/auth` and `/refresh` calls.
//! [`TokenProvider`] decides when a new token is needed, according to the
//! configured [`TokenPolicy`], and is what the lifecycle steps ask for a
//! token before every request.

use crate::config::{HarnessConfig, TokenPolicy};
use crate::error::{Error, Result};
use crate::response;
use crate::transport::{ApiRequest, Transport};
use crate::types::Step;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Body returned by `/auth` and `/refresh`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    /// Authenticated user id
    #[serde(default)]
    pub user_id: Option<String>,
    /// Bearer token for API calls
    #[serde(default)]
    pub access_token: Option<String>,
    /// Expiration of the access token (ISO-8601 string or epoch seconds)
    #[serde(default)]
    pub access_expiration_time: Option<Value>,
    /// Token accepted by `/refresh`
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiration of the refresh token
    #[serde(default)]
    pub refresh_expiration_time: Option<Value>,
    /// Failure reason reported by the server
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A usable bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// The bearer token
    pub access_token: String,
    /// When the token stops being accepted, if the server said
    pub expires_at: Option<DateTime<Utc>>,
    /// Token for `/refresh`, if one was issued
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AuthToken {
    /// Whether the token expires within `margin` of `now`
    ///
    /// Tokens without an expiration never need renewal.
    pub fn needs_renewal(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::MAX);
        match expires_at.checked_sub_signed(margin) {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }
}

impl TryFrom<AuthResult> for AuthToken {
    type Error = Error;

    fn try_from(result: AuthResult) -> Result<Self> {
        let access_token = result
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Authentication {
                message: result
                    .error_message
                    .unwrap_or_else(|| "response carried no accessToken".to_string()),
            })?;

        Ok(Self {
            access_token,
            expires_at: result.access_expiration_time.as_ref().and_then(parse_instant),
            refresh_token: result.refresh_token.filter(|t| !t.is_empty()),
        })
    }
}

/// Interpret a server timestamp: RFC 3339 text or (fractional) epoch seconds
fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let secs = n.as_f64()?;
            let whole = secs.trunc() as i64;
            let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
            DateTime::from_timestamp(whole, nanos.min(999_999_999))
        }
        _ => None,
    }
}

/// Performs login and token refresh calls
pub struct Authenticator {
    config: Arc<HarnessConfig>,
    transport: Arc<dyn Transport>,
}

impl Authenticator {
    /// Create an authenticator for the configured service
    pub fn new(config: Arc<HarnessConfig>, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Log in with the configured credentials
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] when the response is not JSON or
    /// carries no access token. Transport failures propagate unchanged.
    pub async fn login(&self) -> Result<AuthToken> {
        let credentials = &self.config.credentials;
        tracing::debug!(uid = %credentials.uid, "logging in");

        let request = ApiRequest::post(self.config.endpoint("/auth")).form([
            ("uid", credentials.uid.as_str()),
            ("pw", credentials.pw.as_str()),
        ]);
        self.request_token(request).await
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthToken> {
        tracing::debug!("refreshing access token");

        let request =
            ApiRequest::post(self.config.endpoint("/refresh")).form([("rt", refresh_token)]);
        self.request_token(request).await
    }

    async fn request_token(&self, request: ApiRequest) -> Result<AuthToken> {
        let raw = self.transport.execute(&request).await?;

        let parsed = response::parse(Step::Auth, &raw).map_err(|e| Error::Authentication {
            message: format!("unreadable auth response: {}", e),
        })?;
        let result: AuthResult =
            serde_json::from_value(parsed.body).map_err(|e| Error::Authentication {
                message: format!("unexpected auth response: {}", e),
            })?;

        let token = AuthToken::try_from(result)?;
        tracing::debug!(expires_at = ?token.expires_at, "access token acquired");
        Ok(token)
    }
}

/// Hands out a bearer token that is valid under the configured policy
pub struct TokenProvider {
    authenticator: Authenticator,
    policy: TokenPolicy,
    cached: Option<AuthToken>,
}

impl TokenProvider {
    /// Create a provider with an empty cache
    pub fn new(authenticator: Authenticator, policy: TokenPolicy) -> Self {
        Self {
            authenticator,
            policy,
            cached: None,
        }
    }

    /// The most recently acquired token, if any
    pub fn current(&self) -> Option<&AuthToken> {
        self.cached.as_ref()
    }

    /// Return a token that can be used for the next request
    ///
    /// Under [`TokenPolicy::PerStep`] this logs in every time. Under
    /// [`TokenPolicy::Cached`] the cached token is reused until it is within
    /// the refresh margin of expiring; it is then refreshed, or replaced by a
    /// fresh login when no refresh token is available or the refresh fails.
    pub async fn ensure_valid_token(&mut self) -> Result<String> {
        let token = match self.policy {
            TokenPolicy::PerStep => self.authenticator.login().await?,
            TokenPolicy::Cached { refresh_margin } => match self.cached.take() {
                Some(token) if !token.needs_renewal(Utc::now(), refresh_margin) => token,
                Some(AuthToken {
                    refresh_token: Some(rt),
                    ..
                }) => match self.authenticator.refresh(&rt).await {
                    Ok(token) => token,
                    Err(e) => {
                        tracing::warn!(error = %e, "token refresh failed, logging in again");
                        self.authenticator.login().await?
                    }
                },
                _ => self.authenticator.login().await?,
            },
        };

        let access_token = token.access_token.clone();
        self.cached = Some(token);
        Ok(access_token)
    }
}
