//! Configuration types for belayer-e2e

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Environment variable holding the API host (e.g. `http://localhost:8000`)
pub const ENV_API_HOST: &str = "BELAYER_API_HOST";
/// Environment variable holding the path of the Belayer CLI
pub const ENV_CLI_PATH: &str = "BELAYER_CLI_PATH";
/// Environment variable overriding the curl binary used by the curl transport
pub const ENV_CURL_PATH: &str = "BELAYER_CURL_PATH";
/// Environment variable holding the login user id
pub const ENV_UID: &str = "BELAYER_UID";
/// Environment variable holding the login password
pub const ENV_PW: &str = "BELAYER_PW";
/// Environment variable selecting the transport (`http` or `curl`)
pub const ENV_TRANSPORT: &str = "BELAYER_TRANSPORT";
/// Environment variable holding the request timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "BELAYER_TIMEOUT_SECS";

/// Login credentials posted to `/auth`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// User id (`uid` form field)
    #[serde(default = "default_uid")]
    pub uid: String,

    /// Password (`pw` form field)
    #[serde(default = "default_pw")]
    pub pw: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("uid", &self.uid)
            .field("pw", &"<redacted>")
            .finish()
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            uid: default_uid(),
            pw: default_pw(),
        }
    }
}

/// Which transport issues the requests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// In-process HTTP client (reqwest)
    #[default]
    Http,
    /// External `curl -i` invocations
    Curl,
}

impl std::str::FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(TransportKind::Http),
            "curl" => Ok(TransportKind::Curl),
            other => Err(Error::Config {
                message: format!("unknown transport '{}', expected http or curl", other),
                key: Some("transport".to_string()),
            }),
        }
    }
}

/// When the harness acquires a new bearer token
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum TokenPolicy {
    /// Log in again before every step
    #[default]
    PerStep,
    /// Reuse the token until it is within `refresh_margin` of expiring
    Cached {
        /// Safety margin before `accessExpirationTime` (seconds in serialized form)
        #[serde(default = "default_refresh_margin", with = "duration_serde")]
        refresh_margin: Duration,
    },
}

/// Harness configuration
///
/// Everything a run needs is carried here and passed explicitly to the
/// authenticator, the transport and each step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Base URL of the service, without the API prefix
    pub base_url: String,

    /// Path prefix of every API endpoint (default: "/api")
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Path of the Belayer CLI, passed through for external runners
    #[serde(default)]
    pub cli_path: Option<PathBuf>,

    /// Path of the curl binary (searched in PATH when None)
    #[serde(default)]
    pub curl_path: Option<PathBuf>,

    /// Login credentials
    #[serde(default)]
    pub credentials: Credentials,

    /// Transport used for every request
    #[serde(default)]
    pub transport: TransportKind,

    /// Per-request timeout (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Directory downloaded artifacts are written to (default: "fs/dl")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Directory holding the files uploaded by load steps (default: "fs/load_file")
    #[serde(default = "default_load_dir")]
    pub load_dir: PathBuf,

    /// Token acquisition policy
    #[serde(default)]
    pub token_policy: TokenPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            cli_path: None,
            curl_path: None,
            credentials: Credentials::default(),
            transport: TransportKind::default(),
            request_timeout: default_request_timeout(),
            download_dir: default_download_dir(),
            load_dir: default_load_dir(),
            token_policy: TokenPolicy::default(),
        }
    }
}

impl HarnessConfig {
    /// Create a configuration for `base_url` with every other setting defaulted
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from the environment, reading `.env` first
    ///
    /// `BELAYER_API_HOST` is required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let base_url = std::env::var(ENV_API_HOST).map_err(|_| Error::Config {
            message: format!("{} not set in environment", ENV_API_HOST),
            key: Some("base_url".to_string()),
        })?;

        let mut config = Self::new(base_url);
        config.cli_path = std::env::var(ENV_CLI_PATH).ok().map(PathBuf::from);
        config.curl_path = std::env::var(ENV_CURL_PATH).ok().map(PathBuf::from);

        if let Ok(uid) = std::env::var(ENV_UID) {
            config.credentials.uid = uid;
        }
        if let Ok(pw) = std::env::var(ENV_PW) {
            config.credentials.pw = pw;
        }
        if let Ok(transport) = std::env::var(ENV_TRANSPORT) {
            config.transport = transport.parse()?;
        }
        if let Ok(secs) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| Error::Config {
                message: format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_TIMEOUT_SECS, secs
                ),
                key: Some("request_timeout".to_string()),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot possibly reach a server
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config {
                message: "base URL is empty".to_string(),
                key: Some("base_url".to_string()),
            });
        }

        let parsed = url::Url::parse(&self.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.base_url, e),
            key: Some("base_url".to_string()),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("unsupported URL scheme '{}'", parsed.scheme()),
                key: Some("base_url".to_string()),
            });
        }

        if self.credentials.uid.is_empty() {
            return Err(Error::Config {
                message: "login uid is empty".to_string(),
                key: Some("credentials.uid".to_string()),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config {
                message: "request timeout must be greater than zero".to_string(),
                key: Some("request_timeout".to_string()),
            });
        }

        Ok(())
    }

    /// Base of every endpoint: `{base_url}{api_prefix}` without a trailing slash
    pub fn api_base(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        )
        .trim_end_matches('/')
        .to_string()
    }

    /// Absolute URL of the endpoint at `path` (e.g. "/transaction/begin")
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base(), path.trim_start_matches('/'))
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_uid() -> String {
    "tsurugi".to_string()
}

fn default_pw() -> String {
    "password".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_refresh_margin() -> Duration {
    Duration::from_secs(30)
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("fs/dl")
}

fn default_load_dir() -> PathBuf {
    PathBuf::from("fs/load_file")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
