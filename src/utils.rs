//! Utility functions for artifact naming and path manipulation

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Percent-encode a server-relative path for use as a single URL segment
///
/// Every `/` becomes `%2F`, so `T1/dir/demo0.parquet` is requested as
/// `/download/T1%2Fdir%2Fdemo0.parquet`.
///
/// # Examples
///
/// ```
/// use belayer_e2e::utils::encode_download_path;
///
/// assert_eq!(encode_download_path("T1/demo0.parquet"), "T1%2Fdemo0.parquet");
/// ```
pub fn encode_download_path(path: &str) -> String {
    urlencoding::encode(path).into_owned()
}

/// Final segment of a server-relative path
///
/// # Errors
///
/// Returns [`Error::InvalidState`] when the path has no file name (empty or
/// ending in `/`).
pub fn artifact_file_name(server_path: &str) -> Result<&str> {
    let name = server_path.rsplit('/').next().unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidState(format!(
            "download path '{}' has no file name",
            server_path
        )));
    }
    Ok(name)
}

/// Local destination of a downloaded artifact: `{download_dir}/{final segment}`
pub fn local_artifact_path(download_dir: &Path, server_path: &str) -> Result<PathBuf> {
    Ok(download_dir.join(artifact_file_name(server_path)?))
}

/// Base name of a file to upload, as the server will echo it back
pub fn upload_file_name(file: &Path) -> Result<String> {
    file.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::InvalidState(format!("upload path {} has no file name", file.display()))
        })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_download_path_escapes_every_separator() {
        assert_eq!(
            encode_download_path("T1/sub/demo 0.csv"),
            "T1%2Fsub%2Fdemo%200.csv"
        );
        assert_eq!(encode_download_path("plain.parquet"), "plain.parquet");
    }

    #[test]
    fn artifact_file_name_is_final_segment() {
        assert_eq!(artifact_file_name("T1/demo0.parquet").unwrap(), "demo0.parquet");
        assert_eq!(artifact_file_name("demo0.csv").unwrap(), "demo0.csv");
        assert!(artifact_file_name("T1/").is_err());
        assert!(artifact_file_name("").is_err());
        assert!(artifact_file_name("T1/..").is_err());
    }

    #[test]
    fn local_artifact_path_joins_download_dir() {
        let path = local_artifact_path(Path::new("fs/dl"), "T1/a/demo0.csv").unwrap();
        assert_eq!(path, PathBuf::from("fs/dl/demo0.csv"));
    }

    #[test]
    fn upload_file_name_is_basename() {
        assert_eq!(
            upload_file_name(Path::new("fs/load_file/dump1.parquet")).unwrap(),
            "dump1.parquet"
        );
        assert!(upload_file_name(Path::new("/")).is_err());
    }
}
