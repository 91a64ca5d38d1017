//! Parser for raw HTTP response text
//!
//! Transports hand back responses in the form `curl -i` prints them: a status
//! line, header lines, a blank line and the body. The parser splits that text
//! at the first blank line and decodes everything after it as JSON, so bodies
//! spanning several lines are read in full.

use crate::error::{Error, Result};
use crate::types::Step;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A response split into its header block and decoded JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// Status line followed by header lines, in received order
    pub headers: Vec<String>,
    /// Decoded JSON body
    pub body: Value,
}

impl ParsedResponse {
    /// The status line (first header line), if any
    pub fn status_line(&self) -> Option<&str> {
        self.headers.first().map(String::as_str)
    }

    /// Numeric status code taken from the status line
    pub fn status_code(&self) -> Option<u16> {
        self.status_line().and_then(status_code_of)
    }

    /// Whether `line` appears verbatim among the header lines
    pub fn has_status_line(&self, line: &str) -> bool {
        self.headers.iter().any(|h| h == line)
    }

    /// Deserialize the body into a typed result
    pub fn body_as<T: DeserializeOwned>(&self, step: Step) -> Result<T> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| Error::malformed(step, format!("unexpected body structure: {}", e)))
    }
}

/// Split a raw HTTP response into header lines and a JSON body
///
/// Interim `1xx` blocks (curl prints `HTTP/1.1 100 Continue` before the real
/// response of a multipart upload) are skipped.
///
/// # Errors
///
/// Returns [`Error::MalformedResponse`] when no blank line separates the
/// headers from the body, or when the body is not valid JSON.
pub fn parse(step: Step, raw: &str) -> Result<ParsedResponse> {
    let mut rest = raw;

    loop {
        let (head, body) = split_head(rest).ok_or_else(|| {
            Error::malformed(step, "no blank line between headers and body")
        })?;

        let headers: Vec<String> = head.lines().map(|l| l.trim_end().to_string()).collect();

        let is_interim = headers
            .first()
            .and_then(|l| status_code_of(l))
            .is_some_and(|code| (100..200).contains(&code));
        if is_interim && body.trim_start().starts_with("HTTP/") {
            rest = body.trim_start();
            continue;
        }

        let body = body.trim();
        if body.is_empty() {
            return Err(Error::malformed(step, "response body is empty"));
        }

        let body: Value = serde_json::from_str(body).map_err(|e| {
            Error::malformed(step, format!("body is not valid JSON ({}): {}", e, preview(body)))
        })?;

        tracing::debug!(%step, headers = ?headers, body = %body, "parsed response");

        return Ok(ParsedResponse { headers, body });
    }
}

/// Split at the first blank line, accepting both CRLF and bare LF endings
fn split_head(raw: &str) -> Option<(&str, &str)> {
    let crlf = raw.find("\r\n\r\n").map(|i| (i, 4));
    let lf = raw.find("\n\n").map(|i| (i, 2));

    let (idx, sep_len) = match (crlf, lf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };

    Some((&raw[..idx], &raw[idx + sep_len..]))
}

/// Extract the numeric code from a status line such as `HTTP/1.1 200 OK`
fn status_code_of(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

fn preview(body: &str) -> String {
    const MAX: usize = 120;
    if body.chars().count() <= MAX {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX).collect();
        format!("{}...", head)
    }
}
