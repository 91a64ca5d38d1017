//! # belayer-e2e
//!
//! End-to-end verification harness for the Belayer stateful transaction API.
//!
//! A run drives one server-side transaction through its whole lifecycle and
//! checks every response against the contract of its step:
//!
//! 1. `POST /transaction/begin` returns an AVAILABLE transaction
//! 2. `GET /transaction/status/{id}` reports it unchanged
//! 3. `POST /transaction/dump/{id}/{table}` (parquet, then csv) returns download paths
//! 4. `GET /download/{path}` retrieves every dumped file
//! 5. `POST /transaction/load/{id}/{table}` uploads files into the transaction
//! 6. `POST /transaction/commit/{id}` returns it COMMITED
//!
//! ## Quick Start
//!
//! ```no_run
//! use belayer_e2e::{HarnessConfig, Scenario, run};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // BELAYER_API_HOST (and optionally credentials) from the environment / .env
//!     let config = HarnessConfig::from_env()?;
//!     let scenario = Scenario::standard(&config);
//!
//!     let report = run(config, &scenario).await?;
//!     println!("transaction {} is {:?}", report.transaction_id, report.final_transaction.status);
//!     Ok(())
//! }
//! ```
//!
//! Individual steps can also be driven by hand through
//! [`executor::Lifecycle`], whose type parameter only exposes the steps that
//! are legal in the current state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Bearer token acquisition
pub mod auth;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Typed lifecycle step execution
pub mod executor;
/// Response contracts and structural verification
pub mod oracle;
/// Raw HTTP response parsing
pub mod response;
/// Full scenario runs
pub mod runner;
/// Per-run transaction state
pub mod session;
/// Request transports (reqwest, curl)
pub mod transport;
/// Core wire types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use auth::{AuthToken, Authenticator, TokenProvider};
pub use config::{Credentials, HarnessConfig, TokenPolicy, TransportKind};
pub use error::{Error, Result};
pub use executor::{Lifecycle, RunRecord, RunReport};
pub use oracle::{Expect, StepContract, verify};
pub use response::{ParsedResponse, parse};
pub use runner::{Scenario, run, run_with_transport};
pub use session::TransactionSession;
pub use transport::{ApiRequest, CurlTransport, HttpTransport, Transport};
pub use types::{
    BeginRequest, DumpFormat, DumpResult, FinishType, LoadResult, Step, Transaction,
    TransactionId, TransactionStatus, TransactionType,
};
