//! Upload fixtures and canned server bodies

use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Transaction id handed out by the mock server
pub const TX_ID: &str = "TID-0000018a7b3c0001";

/// Bearer token handed out by the mock server
pub const ACCESS_TOKEN: &str = "test-access-token";

/// Table every scenario works on
pub const TABLE: &str = "demo";

/// Paths returned by the parquet dump
pub const PARQUET_PATHS: &[&str] = &["TID-0000018a7b3c0001/demo0.parquet"];

/// Paths returned by the csv dump
pub const CSV_PATHS: &[&str] = &[
    "TID-0000018a7b3c0001/demo0.csv",
    "TID-0000018a7b3c0001/demo1.csv",
];

/// Content of the parquet upload fixture (ASCII so multipart bodies stay UTF-8)
pub const PARQUET_FIXTURE: &[u8] = b"PAR1 parquet fixture PAR1";

/// Content of the csv upload fixture
pub const CSV_FIXTURE: &[u8] = b"id,name\n1,alpha\n2,beta\n";

/// Working directories of one test run
pub struct Workspace {
    /// Keeps the directories alive for the duration of the test
    pub temp_dir: TempDir,
    /// Where downloads land
    pub download_dir: PathBuf,
    /// Where upload fixtures live
    pub load_dir: PathBuf,
}

/// Create a temp workspace with `dump1.parquet` and `dump2.csv` in its load dir
pub fn create_workspace() -> Workspace {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let download_dir = temp_dir.path().join("fs").join("dl");
    let load_dir = temp_dir.path().join("fs").join("load_file");

    std::fs::create_dir_all(&load_dir).expect("Failed to create load dir");
    std::fs::write(load_dir.join("dump1.parquet"), PARQUET_FIXTURE)
        .expect("Failed to write parquet fixture");
    std::fs::write(load_dir.join("dump2.csv"), CSV_FIXTURE).expect("Failed to write csv fixture");

    Workspace {
        temp_dir,
        download_dir,
        load_dir,
    }
}

/// Transaction body as the server renders it
pub fn transaction_body(status: &str, end_time: Option<&str>) -> Value {
    json!({
        "type": "read_write",
        "transactionId": TX_ID,
        "status": status,
        "startTime": "2023-04-01 10:00:00",
        "endTime": end_time
    })
}

/// Dump result body
pub fn dump_body(format: &str, paths: &[&str]) -> Value {
    json!({
        "transactionId": TX_ID,
        "table": TABLE,
        "format": format,
        "downloadPathList": paths
    })
}

/// Load result body for an uploaded file
pub fn load_body(file_name: &str) -> Value {
    json!({
        "transactionId": TX_ID,
        "dumpFiles": [format!("{}/{}", TX_ID, file_name)],
        "format": "detect_by_ext",
        "table": TABLE
    })
}

/// Bytes served for a download path
pub fn download_content(path: &str) -> Vec<u8> {
    format!("content of {}", path).into_bytes()
}

/// Local file name a download path ends up as
pub fn local_name(download_dir: &Path, path: &str) -> PathBuf {
    let name = path.rsplit('/').next().unwrap_or(path);
    download_dir.join(name)
}
