//! Wiremock simulation of the Belayer transaction API
//!
//! Every endpoint of the happy path is mounted with the responses a healthy
//! server gives for transaction [`TX_ID`]. Failure tests override single
//! endpoints by mounting a mock with [`OVERRIDE_PRIORITY`].

use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use super::fixtures::{
    ACCESS_TOKEN, CSV_PATHS, PARQUET_PATHS, TABLE, TX_ID, download_content, dump_body, load_body,
    transaction_body,
};

/// Priority that wins over every default mock
pub const OVERRIDE_PRIORITY: u8 = 1;

/// Matches requests that carry no body
pub struct EmptyBody;

impl Match for EmptyBody {
    fn matches(&self, request: &Request) -> bool {
        request.body.is_empty()
    }
}

/// Running mock server with the default Belayer behavior mounted
pub struct MockBelayer {
    /// The underlying wiremock server
    pub server: MockServer,
}

impl MockBelayer {
    /// Start a server answering every lifecycle step successfully
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        mount_defaults(&server).await;
        Self { server }
    }

    /// Base URL to put into `HarnessConfig::base_url`
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Number of requests received for exactly `request_path`
    pub async fn hits(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }

    /// Number of requests received whose path starts with `prefix`
    pub async fn hits_under(&self, prefix: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().starts_with(prefix))
            .count()
    }
}

/// Path of the dump endpoint for the fixture transaction
pub fn dump_path() -> String {
    format!("/api/transaction/dump/{}/{}", TX_ID, TABLE)
}

/// Path of the load endpoint for the fixture transaction
pub fn load_path() -> String {
    format!("/api/transaction/load/{}/{}", TX_ID, TABLE)
}

/// Path of the download endpoint for a server path, slashes encoded
pub fn download_path(server_path: &str) -> String {
    format!("/api/download/{}", server_path.replace('/', "%2F"))
}

fn bearer() -> String {
    format!("Bearer {}", ACCESS_TOKEN)
}

async fn mount_defaults(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .and(body_string_contains("uid=tsurugi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userId": "tsurugi",
            "accessToken": ACCESS_TOKEN,
            "refreshToken": "test-refresh-token"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/transaction/begin"))
        .and(header("Authorization", bearer().as_str()))
        .and(body_partial_json(json!({
            "type": "read_write",
            "timeoutMin": 1,
            "tables": ["demo"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(transaction_body("AVAILABLE", None)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/transaction/status/{}", TX_ID)))
        .and(header("Authorization", bearer().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(transaction_body("AVAILABLE", None)))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(dump_path()))
        .and(header("Authorization", bearer().as_str()))
        .and(EmptyBody)
        .respond_with(ResponseTemplate::new(200).set_body_json(dump_body("parquet", PARQUET_PATHS)))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(dump_path()))
        .and(header("Authorization", bearer().as_str()))
        .and(body_partial_json(json!({ "format": "csv" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(dump_body("csv", CSV_PATHS)))
        .mount(server)
        .await;

    for server_path in PARQUET_PATHS.iter().chain(CSV_PATHS) {
        Mock::given(method("GET"))
            .and(path(download_path(server_path)))
            .and(header("Authorization", bearer().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(download_content(server_path)))
            .mount(server)
            .await;
    }

    for file_name in ["dump1.parquet", "dump2.csv"] {
        Mock::given(method("POST"))
            .and(path(load_path()))
            .and(header("Authorization", bearer().as_str()))
            .and(body_string_contains(format!("filename=\"{}\"", file_name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(load_body(file_name)))
            .mount(server)
            .await;
    }

    Mock::given(method("POST"))
        .and(path(format!("/api/transaction/commit/{}", TX_ID)))
        .and(header("Authorization", bearer().as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(transaction_body("COMMITED", Some("2023-04-01 10:00:05"))),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/api/transaction/rollback/{}", TX_ID)))
        .and(header("Authorization", bearer().as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(transaction_body(
                "ROLLBACK_COMPLETED",
                Some("2023-04-01 10:00:05"),
            )),
        )
        .mount(server)
        .await;
}
