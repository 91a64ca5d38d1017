//! Transport that shells out to the `curl` binary

use super::{ApiRequest, DownloadOutcome, Method, RequestBody, Transport};
use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Transport executing `curl -s -i` for every request
///
/// This reproduces the exact wire behaviour of shell-driven test runners,
/// including the `100 Continue` block curl prints for multipart uploads.
pub struct CurlTransport {
    binary_path: PathBuf,
    timeout: Duration,
}

impl CurlTransport {
    /// Create a transport with an explicit curl binary
    pub fn new(binary_path: PathBuf, timeout: Duration) -> Self {
        Self {
            binary_path,
            timeout,
        }
    }

    /// Attempt to find curl in PATH
    pub fn from_path(timeout: Duration) -> Option<Self> {
        which::which("curl").ok().map(|p| Self::new(p, timeout))
    }

    /// Use `config.curl_path`, falling back to a PATH search
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        match &config.curl_path {
            Some(path) => Ok(Self::new(path.clone(), config.request_timeout)),
            None => Self::from_path(config.request_timeout).ok_or_else(|| Error::Config {
                message: "curl binary not found in PATH".to_string(),
                key: Some("curl_path".to_string()),
            }),
        }
    }

    async fn run(&self, args: Vec<OsString>) -> Result<Vec<u8>> {
        tracing::debug!(binary = ?self.binary_path, args = ?args, "executing curl");

        let output = Command::new(&self.binary_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::Transport(format!("Failed to execute curl: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Transport(format!(
                "curl exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl Transport for CurlTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<String> {
        let stdout = self.run(request_args(request, self.timeout)?).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    async fn download(&self, request: &ApiRequest, dest: &Path) -> Result<DownloadOutcome> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let stdout = self.run(download_args(request, dest, self.timeout)).await?;
        let status: u16 = String::from_utf8_lossy(&stdout)
            .trim()
            .parse()
            .map_err(|_| {
                Error::Transport(format!(
                    "curl did not report an HTTP status for '{}'",
                    request.url
                ))
            })?;

        if !(200..300).contains(&status) {
            // curl -o writes error bodies too; do not leave them behind as artifacts
            tokio::fs::remove_file(dest).await.ok();
            return Ok(DownloadOutcome { status, bytes: 0 });
        }

        let bytes = tokio::fs::metadata(dest).await?.len();
        Ok(DownloadOutcome { status, bytes })
    }

    fn name(&self) -> &'static str {
        "curl"
    }
}

/// Arguments for a request whose response is printed with headers (`-i`)
fn request_args(request: &ApiRequest, timeout: Duration) -> Result<Vec<OsString>> {
    let mut args: Vec<OsString> = vec!["-s".into(), "-i".into()];
    push_common(&mut args, request, timeout);

    match &request.body {
        RequestBody::Empty => {}
        RequestBody::Json(value) => {
            args.push("-H".into());
            args.push("Content-Type: application/json".into());
            args.push("-d".into());
            args.push(value.to_string().into());
        }
        RequestBody::Form(fields) => {
            for (key, value) in fields {
                args.push("--data-urlencode".into());
                args.push(format!("{}={}", key, value).into());
            }
        }
        RequestBody::Multipart { field, file } => {
            args.push("-F".into());
            args.push(format!("{}=@{}", field, quote_form_path(file)?).into());
        }
    }

    args.push(request.url.clone().into());
    Ok(args)
}

/// Double-quote a path for `-F`, so `,` `;` and `"` are not read as curl syntax
fn quote_form_path(file: &Path) -> Result<String> {
    let path = file.to_str().ok_or_else(|| Error::Config {
        message: format!("upload path {} is not valid UTF-8", file.display()),
        key: Some("load_files".to_string()),
    })?;
    let escaped = path.replace('\\', "\\\\").replace('"', "\\\"");
    Ok(format!("\"{}\"", escaped))
}

/// Arguments for a download: body to `dest`, status code on stdout
fn download_args(request: &ApiRequest, dest: &Path, timeout: Duration) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-s".into()];
    push_common(&mut args, request, timeout);
    args.push("-o".into());
    args.push(dest.as_os_str().to_owned());
    args.push("-w".into());
    args.push("%{http_code}".into());
    args.push(request.url.clone().into());
    args
}

fn push_common(args: &mut Vec<OsString>, request: &ApiRequest, timeout: Duration) {
    if request.method == Method::Post {
        args.push("-X".into());
        args.push("POST".into());
    }
    if let Some(token) = &request.bearer {
        args.push("-H".into());
        args.push(format!("Authorization: Bearer {}", token).into());
    }
    args.push("--max-time".into());
    args.push(timeout.as_secs().max(1).to_string().into());
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn json_post_carries_token_content_type_and_body() {
        let req = ApiRequest::post("http://h/api/transaction/begin")
            .bearer("tok")
            .json(json!({"timeoutMin": 1}));

        let args = strings(&request_args(&req, Duration::from_secs(30)).unwrap());
        assert_eq!(
            args,
            vec![
                "-s",
                "-i",
                "-X",
                "POST",
                "-H",
                "Authorization: Bearer tok",
                "--max-time",
                "30",
                "-H",
                "Content-Type: application/json",
                "-d",
                "{\"timeoutMin\":1}",
                "http://h/api/transaction/begin",
            ]
        );
    }

    #[test]
    fn get_has_no_method_override() {
        let req = ApiRequest::get("http://h/api/transaction/status/T1").bearer("tok");
        let args = strings(&request_args(&req, Duration::from_millis(10)).unwrap());
        assert!(!args.contains(&"-X".to_string()));
        assert_eq!(args[args.len() - 3..], ["--max-time", "1", "http://h/api/transaction/status/T1"]);
    }

    #[test]
    fn form_and_multipart_bodies() {
        let auth = ApiRequest::post("http://h/api/auth").form([("uid", "tsurugi"), ("pw", "password")]);
        let args = strings(&request_args(&auth, Duration::from_secs(5)).unwrap());
        assert!(args.windows(2).any(|w| w == ["--data-urlencode", "uid=tsurugi"]));
        assert!(args.windows(2).any(|w| w == ["--data-urlencode", "pw=password"]));

        let load = ApiRequest::post("http://h/api/transaction/load/T1/demo")
            .multipart_file("file", "fs/load_file/dump1.parquet");
        let args = strings(&request_args(&load, Duration::from_secs(5)).unwrap());
        assert!(args.windows(2).any(|w| w == ["-F", "file=@\"fs/load_file/dump1.parquet\""]));
    }

    #[test]
    fn multipart_path_with_curl_separators_is_quoted() {
        let load = ApiRequest::post("http://h/api/transaction/load/T1/demo")
            .multipart_file("file", r#"fs/load_file/a,b;type=text "c".csv"#);
        let args = strings(&request_args(&load, Duration::from_secs(5)).unwrap());
        assert!(
            args.windows(2)
                .any(|w| w == ["-F", r#"file=@"fs/load_file/a,b;type=text \"c\".csv""#]),
            "args: {args:?}"
        );

        let windows_style = ApiRequest::post("http://h/api/transaction/load/T1/demo")
            .multipart_file("file", r"C:\load\dump1.parquet");
        let args = strings(&request_args(&windows_style, Duration::from_secs(5)).unwrap());
        assert!(args.contains(&r#"file=@"C:\\load\\dump1.parquet""#.to_string()));
    }

    #[test]
    fn download_writes_to_destination_and_reports_status() {
        let req = ApiRequest::get("http://h/api/download/T1%2Fdemo0.csv").bearer("tok");
        let args = strings(&download_args(&req, Path::new("fs/dl/demo0.csv"), Duration::from_secs(5)));

        assert!(!args.contains(&"-i".to_string()));
        assert!(args.windows(2).any(|w| w == ["-o", "fs/dl/demo0.csv"]));
        assert!(args.windows(2).any(|w| w == ["-w", "%{http_code}"]));
        assert_eq!(args.last().unwrap(), "http://h/api/download/T1%2Fdemo0.csv");
    }

    #[tokio::test]
    async fn invalid_binary_path_is_a_transport_error() {
        let transport = CurlTransport::new(
            PathBuf::from("/nonexistent/path/to/curl"),
            Duration::from_secs(1),
        );

        let result = transport.execute(&ApiRequest::get("http://h/")).await;
        match result {
            Err(Error::Transport(msg)) => assert!(msg.contains("Failed to execute curl")),
            other => panic!("Expected Transport error, got: {:?}", other),
        }
    }

    #[test]
    fn explicit_curl_path_wins_over_path_search() {
        let config = HarnessConfig {
            curl_path: Some(PathBuf::from("/opt/curl/bin/curl")),
            ..HarnessConfig::new("http://localhost:8000")
        };
        let transport = CurlTransport::from_config(&config).unwrap();
        assert_eq!(transport.binary_path, PathBuf::from("/opt/curl/bin/curl"));
        assert_eq!(transport.name(), "curl");
    }
}
