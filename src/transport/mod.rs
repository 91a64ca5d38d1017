//! Request transports
//!
//! The harness only needs two capabilities from a transport: send a request
//! and hand back the response as raw HTTP text (status line, headers, blank
//! line, body), and stream a download into a local file. Two implementations
//! are provided:
//!
//! - [`HttpTransport`]: in-process HTTP client (reqwest)
//! - [`CurlTransport`]: runs the external `curl` binary with `-i`

mod curl;
mod http;

pub use curl::CurlTransport;
pub use http::HttpTransport;

use crate::config::{HarnessConfig, TransportKind};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

impl Method {
    /// Method name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body
    Empty,
    /// `application/json` body
    Json(Value),
    /// `application/x-www-form-urlencoded` fields
    Form(Vec<(String, String)>),
    /// `multipart/form-data` with a single file part
    Multipart {
        /// Form field name of the file part
        field: String,
        /// Local file to upload
        file: PathBuf,
    },
}

/// A fully resolved request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Bearer token for the `Authorization` header
    pub bearer: Option<String>,
    /// Payload
    pub body: RequestBody,
}

impl ApiRequest {
    /// GET request without a body
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            bearer: None,
            body: RequestBody::Empty,
        }
    }

    /// POST request without a body
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            bearer: None,
            body: RequestBody::Empty,
        }
    }

    /// Attach a bearer token
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Attach a JSON body
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Attach form fields
    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Attach a file as a multipart part named `field`
    pub fn multipart_file(mut self, field: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.body = RequestBody::Multipart {
            field: field.into(),
            file: file.into(),
        };
        self
    }
}

/// Outcome of a download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// HTTP status code of the download response
    pub status: u16,
    /// Bytes written to the destination file
    pub bytes: u64,
}

impl DownloadOutcome {
    /// Whether the server answered with a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for issuing requests against the service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response as raw HTTP text
    ///
    /// # Errors
    ///
    /// Returns a transport or network error when the request could not be
    /// delivered. HTTP error statuses are not errors at this level; they are
    /// part of the returned text.
    async fn execute(&self, request: &ApiRequest) -> Result<String>;

    /// Send `request` and write the response body to `dest`
    ///
    /// Parent directories of `dest` are created as needed. The body is only
    /// written when the server answers with a 2xx status.
    async fn download(&self, request: &ApiRequest, dest: &Path) -> Result<DownloadOutcome>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Build the transport selected by the configuration
pub fn from_config(config: &HarnessConfig) -> Result<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match config.transport {
        TransportKind::Http => Arc::new(HttpTransport::new(config.request_timeout)?),
        TransportKind::Curl => Arc::new(CurlTransport::from_config(config)?),
    };
    tracing::debug!(transport = transport.name(), "transport selected");
    Ok(transport)
}
