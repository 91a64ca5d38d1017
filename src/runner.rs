//! Full lifecycle runs
//!
//! [`Scenario::standard`] is the reference sequence: begin a read-write
//! transaction on `demo`, check its status, dump it as parquet (server
//! default) and as csv, download every dumped file, load `dump1.parquet` and
//! `dump2.csv`, and commit.

use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::executor::{Lifecycle, RunReport};
use crate::transport::{self, Transport};
use crate::types::{BeginRequest, DumpFormat, FinishType};
use std::path::PathBuf;
use std::sync::Arc;

/// Steps and inputs of one run
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Body of the begin request
    pub begin: BeginRequest,
    /// Table dumped and loaded
    pub table: String,
    /// One dump per entry; `None` sends no body and expects parquet
    pub dump_formats: Vec<Option<DumpFormat>>,
    /// Local files uploaded by the load steps, in order
    pub load_files: Vec<PathBuf>,
    /// How the transaction is finished
    pub finish: FinishType,
}

impl Scenario {
    /// The reference scenario, loading fixtures from `config.load_dir`
    pub fn standard(config: &HarnessConfig) -> Self {
        Self {
            begin: BeginRequest::default(),
            table: "demo".to_string(),
            dump_formats: vec![None, Some(DumpFormat::Csv)],
            load_files: vec![
                config.load_dir.join("dump1.parquet"),
                config.load_dir.join("dump2.csv"),
            ],
            finish: FinishType::Commit,
        }
    }

    /// Reject scenarios the lifecycle cannot express
    pub fn validate(&self) -> Result<()> {
        if self.dump_formats.is_empty() {
            return Err(Error::Config {
                message: "scenario needs at least one dump".to_string(),
                key: Some("dump_formats".to_string()),
            });
        }
        if self.load_files.is_empty() {
            return Err(Error::Config {
                message: "scenario needs at least one load file".to_string(),
                key: Some("load_files".to_string()),
            });
        }
        if self.table.is_empty() {
            return Err(Error::Config {
                message: "scenario table is empty".to_string(),
                key: Some("table".to_string()),
            });
        }
        Ok(())
    }
}

/// Run `scenario` with the transport selected by `config`
pub async fn run(config: HarnessConfig, scenario: &Scenario) -> Result<RunReport> {
    config.validate()?;
    let transport = transport::from_config(&config)?;
    run_with_transport(Arc::new(config), transport, scenario).await
}

/// Run `scenario` over an explicit transport
///
/// Steps execute strictly in order; the first failure ends the run and is
/// returned unchanged.
pub async fn run_with_transport(
    config: Arc<HarnessConfig>,
    transport: Arc<dyn Transport>,
    scenario: &Scenario,
) -> Result<RunReport> {
    scenario.validate()?;
    tracing::info!(
        base_url = %config.base_url,
        transport = transport.name(),
        table = %scenario.table,
        "starting lifecycle run"
    );

    let table = scenario.table.as_str();
    let (first_format, more_formats) = scenario
        .dump_formats
        .split_first()
        .ok_or_else(|| Error::InvalidState("no dump configured".to_string()))?;
    let (first_file, more_files) = scenario
        .load_files
        .split_first()
        .ok_or_else(|| Error::InvalidState("no load file configured".to_string()))?;

    let begun = Lifecycle::new(config, transport)
        .begin(&scenario.begin)
        .await?;
    let checked = begun.check_status().await?;

    let mut dumped = checked.dump(table, *first_format).await?;
    for format in more_formats {
        dumped = dumped.dump(table, *format).await?;
    }

    let downloaded = dumped.download_all().await?;

    let mut loaded = downloaded.load(table, first_file).await?;
    for file in more_files {
        loaded = loaded.load(table, file).await?;
    }

    let report = match scenario.finish {
        FinishType::Commit => loaded.commit().await?.into_report()?,
        FinishType::Rollback => loaded.rollback().await?.into_report()?,
    };

    tracing::info!(
        transaction_id = %report.transaction_id,
        status = report.final_transaction.status.as_str(),
        downloads = report.record.downloads.len(),
        loads = report.record.loads.len(),
        "lifecycle run completed"
    );
    Ok(report)
}
