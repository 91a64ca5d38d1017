//! Core types for belayer-e2e

use serde::{Deserialize, Serialize};

/// Server-assigned transaction identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// Create a new TransactionId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for TransactionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction mode requested on begin
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Read-write transaction (default)
    #[default]
    ReadWrite,
    /// Read-only transaction
    ReadOnly,
}

impl TransactionType {
    /// Wire name of the transaction type
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::ReadWrite => "read_write",
            TransactionType::ReadOnly => "read_only",
        }
    }
}

/// Server-side transaction status
///
/// Spellings follow the server, including `COMMITED`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Open and ready for dump/load
    Available,
    /// A dump or load is currently running against it
    InUse,
    /// Committed
    #[serde(rename = "COMMITED")]
    Commited,
    /// Rolled back
    RollbackCompleted,
}

impl TransactionStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Available => "AVAILABLE",
            TransactionStatus::InUse => "IN_USE",
            TransactionStatus::Commited => "COMMITED",
            TransactionStatus::RollbackCompleted => "ROLLBACK_COMPLETED",
        }
    }
}

/// Dump output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    /// Apache Parquet (server default)
    #[default]
    Parquet,
    /// Comma-separated values
    Csv,
}

impl DumpFormat {
    /// Wire name of the format
    pub fn as_str(&self) -> &'static str {
        match self {
            DumpFormat::Parquet => "parquet",
            DumpFormat::Csv => "csv",
        }
    }
}

/// How a transaction is finished
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishType {
    /// Commit the transaction
    Commit,
    /// Roll the transaction back
    Rollback,
}

impl FinishType {
    /// Path segment used by `/transaction/{type}/{id}`
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishType::Commit => "commit",
            FinishType::Rollback => "rollback",
        }
    }

    /// Status the transaction must report after finishing this way
    pub fn expected_status(&self) -> TransactionStatus {
        match self {
            FinishType::Commit => TransactionStatus::Commited,
            FinishType::Rollback => TransactionStatus::RollbackCompleted,
        }
    }
}

/// A lifecycle step, used for diagnostics and logging
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Authentication against `/auth` or `/refresh`
    Auth,
    /// `POST /transaction/begin`
    Begin,
    /// `GET /transaction/status/{id}`
    Status,
    /// `POST /transaction/dump/{id}/{table}`
    Dump(DumpFormat),
    /// `GET /download/{path}`
    Download,
    /// `POST /transaction/load/{id}/{table}`
    Load,
    /// `POST /transaction/commit/{id}`
    Commit,
    /// `POST /transaction/rollback/{id}`
    Rollback,
}

impl From<FinishType> for Step {
    fn from(finish: FinishType) -> Self {
        match finish {
            FinishType::Commit => Step::Commit,
            FinishType::Rollback => Step::Rollback,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Auth => f.write_str("auth"),
            Step::Begin => f.write_str("begin"),
            Step::Status => f.write_str("status"),
            Step::Dump(format) => write!(f, "dump({})", format.as_str()),
            Step::Download => f.write_str("download"),
            Step::Load => f.write_str("load"),
            Step::Commit => f.write_str("commit"),
            Step::Rollback => f.write_str("rollback"),
        }
    }
}

/// Body of `POST /transaction/begin`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginRequest {
    /// Transaction mode
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Server-side inactivity timeout in minutes
    pub timeout_min: u32,
    /// Tables the transaction will touch
    pub tables: Vec<String>,
}

impl Default for BeginRequest {
    fn default() -> Self {
        Self {
            transaction_type: TransactionType::ReadWrite,
            timeout_min: 1,
            tables: vec!["demo".to_string()],
        }
    }
}

/// Body of `POST /transaction/dump/{id}/{table}` when a format is given
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpRequest {
    /// Requested output format
    pub format: DumpFormat,
}

/// Transaction object returned by begin, status, commit and rollback
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction mode
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Server-assigned id
    pub transaction_id: TransactionId,
    /// Current status
    pub status: TransactionStatus,
    /// Start timestamp, if the server reports one
    pub start_time: Option<String>,
    /// End timestamp; null while the transaction is open
    pub end_time: Option<String>,
}

/// Result of a dump step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpResult {
    /// Transaction the dump ran under
    pub transaction_id: TransactionId,
    /// Dumped table
    pub table: String,
    /// Resolved output format
    pub format: DumpFormat,
    /// Server-relative paths of the produced files
    pub download_path_list: Vec<String>,
}

/// Result of a load step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResult {
    /// Transaction the load ran under
    pub transaction_id: TransactionId,
    /// Namespaced paths of the loaded files (`{transactionId}/{basename}`)
    pub dump_files: Vec<String>,
    /// Format detection mode, `detect_by_ext` for uploads
    pub format: String,
    /// Target table
    pub table: String,
}
