//! In-process HTTP transport backed by reqwest

use super::{ApiRequest, DownloadOutcome, Method, RequestBody, Transport};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Transport using a shared `reqwest::Client`
///
/// Responses are rendered back to the text `curl -i` would print, so both
/// transports feed the same parser.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Multipart { field, file } => {
                let bytes = tokio::fs::read(file).await?;
                let file_name = file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("upload")
                    .to_string();
                let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                builder.multipart(reqwest::multipart::Form::new().part(field.clone(), part))
            }
        };

        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            "sending request"
        );

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Transport(format!(
                    "Timeout calling '{}' (exceeded {:?})",
                    request.url, self.timeout
                ))
            } else if e.is_connect() {
                Error::Transport(format!("Connection failed for '{}': {}", request.url, e))
            } else {
                Error::Network(e)
            }
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<String> {
        let response = self.send(request).await?;
        let head = render_head(&response);
        let body = response.text().await?;
        Ok(format!("{}\r\n{}", head, body))
    }

    async fn download(&self, request: &ApiRequest, dest: &Path) -> Result<DownloadOutcome> {
        let response = self.send(request).await?;
        let status = response.status().as_u16();

        if !response.status().is_success() {
            tracing::warn!(url = %request.url, status, "download returned error status");
            return Ok(DownloadOutcome { status, bytes: 0 });
        }

        let bytes = response.bytes().await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;

        Ok(DownloadOutcome {
            status,
            bytes: bytes.len() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Status line and headers, each terminated by CRLF
fn render_head(response: &reqwest::Response) -> String {
    let mut head = format!("{:?} {}\r\n", response.version(), response.status());
    for (name, value) in response.headers() {
        head.push_str(name.as_str());
        head.push_str(": ");
        head.push_str(&String::from_utf8_lossy(value.as_bytes()));
        head.push_str("\r\n");
    }
    head
}
