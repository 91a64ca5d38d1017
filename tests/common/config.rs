//! Test configuration helpers for loading .env settings and pointing runs at a server

use belayer_e2e::config::{ENV_API_HOST, HarnessConfig};
use belayer_e2e::transport::{HttpTransport, Transport};
use std::sync::Arc;
use std::time::Duration;

use super::fixtures::Workspace;

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for a run against `base_url` using the workspace directories
pub fn config_for(base_url: impl Into<String>, workspace: &Workspace) -> HarnessConfig {
    HarnessConfig {
        download_dir: workspace.download_dir.clone(),
        load_dir: workspace.load_dir.clone(),
        request_timeout: Duration::from_secs(5),
        ..HarnessConfig::new(base_url)
    }
}

/// Reqwest transport with a short timeout
pub fn http_transport() -> Arc<dyn Transport> {
    Arc::new(HttpTransport::new(Duration::from_secs(5)).expect("Failed to build HTTP transport"))
}

/// Load the live harness configuration from the environment
///
/// Required environment variables:
/// - `BELAYER_API_HOST` - Base URL of the running service
///
/// Optional environment variables are the ones `HarnessConfig::from_env` reads
/// (`BELAYER_UID`, `BELAYER_PW`, `BELAYER_TRANSPORT`, ...).
pub fn load_live_config(workspace: &Workspace) -> Result<HarnessConfig, ConfigError> {
    let config = HarnessConfig::from_env().map_err(|e| ConfigError(e.to_string()))?;
    Ok(HarnessConfig {
        download_dir: workspace.download_dir.clone(),
        load_dir: workspace.load_dir.clone(),
        ..config
    })
}

/// Check if a live service is configured
pub fn has_live_credentials() -> bool {
    dotenvy::dotenv().ok();
    std::env::var(ENV_API_HOST).is_ok()
}

/// Skip test if no live service is configured
#[macro_export]
macro_rules! skip_if_no_credentials {
    () => {
        if !$crate::common::has_live_credentials() {
            eprintln!("Skipping test: BELAYER_API_HOST not found in .env");
            return;
        }
    };
}
