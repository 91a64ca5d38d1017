//! Lifecycle step execution
//!
//! A run is a [`Lifecycle`] value whose type parameter is the state the
//! server-side transaction has reached. Each step consumes the lifecycle and
//! returns it in the next state, so steps can only be issued in protocol
//! order:
//!
//! ```text
//! Init -begin-> Begun -status-> StatusChecked -dump-> Dumped (-dump-> Dumped)*
//!      -download-> Downloaded -load-> Loaded (-load-> Loaded)*
//!      -commit-> Committed | -rollback-> RolledBack
//! ```
//!
//! Every step obtains a bearer token from the [`TokenProvider`], sends one
//! request (one per file for downloads), parses the raw response, checks it
//! against the step contract and only then records what it learned in the
//! [`TransactionSession`]. Any failure consumes the lifecycle; nothing is
//! retried.
//!
//! ```compile_fail
//! use belayer_e2e::executor::{Lifecycle, state::Init};
//!
//! async fn load_before_begin(lifecycle: Lifecycle<Init>) {
//!     // `load` only exists once something has been downloaded
//!     let _ = lifecycle.load("demo", "fs/load_file/dump1.parquet").await;
//! }
//! ```

pub mod state;

use crate::auth::{Authenticator, TokenProvider};
use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::oracle::{self, StepContract, contracts};
use crate::response::{self, ParsedResponse};
use crate::session::TransactionSession;
use crate::transport::{self, ApiRequest, Transport};
use crate::types::{
    BeginRequest, DumpFormat, DumpRequest, DumpResult, FinishType, LoadResult, Step, Transaction,
    TransactionId, TransactionType,
};
use crate::utils;
use state::{
    Begun, Committed, Downloaded, Dumped, Finished, Init, Loaded, RolledBack, Started,
    StatusChecked,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A file retrieved by the download step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    /// Server-relative path it was dumped to
    pub server_path: String,
    /// Where it was written locally
    pub local_path: PathBuf,
    /// Size in bytes
    pub bytes: u64,
}

/// Everything the server returned over the run, in step order
#[derive(Debug, Clone, Default)]
pub struct RunRecord {
    /// Transaction returned by begin
    pub begun: Option<Transaction>,
    /// Transaction returned by the status check
    pub status: Option<Transaction>,
    /// Result of every dump call
    pub dumps: Vec<DumpResult>,
    /// Every artifact retrieved
    pub downloads: Vec<DownloadedArtifact>,
    /// Result of every load call
    pub loads: Vec<LoadResult>,
    /// Transaction returned by commit or rollback
    pub finished: Option<Transaction>,
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The transaction the run drove
    pub transaction_id: TransactionId,
    /// Final state of the transaction as reported by the server
    pub final_transaction: Transaction,
    /// Everything the server returned along the way
    pub record: RunRecord,
    /// Session state at the end of the run
    pub session: TransactionSession,
}

/// Explicit context threaded through every step of one run
struct StepContext {
    config: Arc<HarnessConfig>,
    transport: Arc<dyn Transport>,
    tokens: TokenProvider,
    session: TransactionSession,
    record: RunRecord,
    transaction_type: TransactionType,
}

/// One run of the transaction lifecycle, typed by the state it has reached
pub struct Lifecycle<S> {
    ctx: StepContext,
    state: S,
}

impl Lifecycle<Init> {
    /// Create a run using an explicit transport
    pub fn new(config: Arc<HarnessConfig>, transport: Arc<dyn Transport>) -> Self {
        let authenticator = Authenticator::new(Arc::clone(&config), Arc::clone(&transport));
        let tokens = TokenProvider::new(authenticator, config.token_policy);

        Self {
            ctx: StepContext {
                config,
                transport,
                tokens,
                session: TransactionSession::new(),
                record: RunRecord::default(),
                transaction_type: TransactionType::default(),
            },
            state: Init,
        }
    }

    /// Validate the configuration and create a run with the configured transport
    pub fn connect(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        let transport = transport::from_config(&config)?;
        Ok(Self::new(Arc::new(config), transport))
    }

    /// `POST /transaction/begin`
    ///
    /// Expects a fresh AVAILABLE transaction with a null `endTime`, and records
    /// its id in the session.
    pub async fn begin(mut self, request: &BeginRequest) -> Result<Lifecycle<Begun>> {
        let step = Step::Begin;
        let http = ApiRequest::post(self.ctx.config.endpoint("/transaction/begin"))
            .json(serde_json::to_value(request)?);
        let contract = contracts::begin(request.transaction_type);

        let parsed = self.ctx.call(step, http, &contract).await?;
        let transaction: Transaction = parsed.body_as(step)?;
        let id = transaction.transaction_id.clone();

        self.ctx.session.set_transaction_id(id.clone())?;
        self.ctx.transaction_type = request.transaction_type;
        self.ctx.record.begun = Some(transaction);
        tracing::info!(%step, transaction_id = %id, "transaction started");

        Ok(self.advance(Begun(id)))
    }
}

impl<S> Lifecycle<S> {
    /// Session state accumulated so far
    pub fn session(&self) -> &TransactionSession {
        &self.ctx.session
    }

    /// Server responses accumulated so far
    pub fn record(&self) -> &RunRecord {
        &self.ctx.record
    }

    /// The configuration this run uses
    pub fn config(&self) -> &HarnessConfig {
        &self.ctx.config
    }

    fn advance<T>(self, state: T) -> Lifecycle<T> {
        Lifecycle {
            ctx: self.ctx,
            state,
        }
    }
}

impl<S: Started> Lifecycle<S> {
    /// The transaction id assigned by begin
    pub fn transaction_id(&self) -> &TransactionId {
        self.state.transaction_id()
    }

    async fn run_dump(&mut self, table: &str, format: Option<DumpFormat>) -> Result<()> {
        let id = self.state.transaction_id().clone();
        let resolved = format.unwrap_or_default();
        let step = Step::Dump(resolved);

        let mut http = ApiRequest::post(self.ctx.config.endpoint(&format!(
            "/transaction/dump/{}/{}",
            id, table
        )));
        if let Some(format) = format {
            http = http.json(serde_json::to_value(DumpRequest { format })?);
        }
        let contract = contracts::dump(&id, table, resolved);

        let parsed = self.ctx.call(step, http, &contract).await?;
        let result: DumpResult = parsed.body_as(step)?;

        self.ctx
            .session
            .extend_download_paths(result.download_path_list.iter().cloned());
        tracing::info!(
            %step,
            transaction_id = %id,
            files = result.download_path_list.len(),
            total_files = self.ctx.session.download_paths().len(),
            "table dumped"
        );
        self.ctx.record.dumps.push(result);
        Ok(())
    }

    async fn run_load(&mut self, table: &str, file: &Path) -> Result<()> {
        let id = self.state.transaction_id().clone();
        let step = Step::Load;
        let file_name = utils::upload_file_name(file)?;

        let http = ApiRequest::post(self.ctx.config.endpoint(&format!(
            "/transaction/load/{}/{}",
            id, table
        )))
        .multipart_file("file", file);
        let contract = contracts::load(&id, table, &file_name);

        let parsed = self.ctx.call(step, http, &contract).await?;
        let result: LoadResult = parsed.body_as(step)?;

        tracing::info!(%step, transaction_id = %id, file = %file_name, "file loaded");
        self.ctx.record.loads.push(result);
        Ok(())
    }

    async fn finish(mut self, finish: FinishType) -> Result<(StepContext, TransactionId)> {
        let id = self.state.transaction_id().clone();
        let step = Step::from(finish);

        let http = ApiRequest::post(self.ctx.config.endpoint(&format!(
            "/transaction/{}/{}",
            finish.as_str(),
            id
        )));
        let contract = contracts::finish(self.ctx.transaction_type, &id, finish);

        let parsed = self.ctx.call(step, http, &contract).await?;
        let transaction: Transaction = parsed.body_as(step)?;

        tracing::info!(
            %step,
            transaction_id = %id,
            status = transaction.status.as_str(),
            "transaction finished"
        );
        self.ctx.record.finished = Some(transaction);
        Ok((self.ctx, id))
    }
}

impl Lifecycle<Begun> {
    /// `GET /transaction/status/{id}`
    ///
    /// Expects the transaction unchanged: same id, still AVAILABLE.
    pub async fn check_status(mut self) -> Result<Lifecycle<StatusChecked>> {
        let id = self.state.0.clone();
        let step = Step::Status;

        let http = ApiRequest::get(
            self.ctx
                .config
                .endpoint(&format!("/transaction/status/{}", id)),
        );
        let contract = contracts::status(self.ctx.transaction_type, &id);

        let parsed = self.ctx.call(step, http, &contract).await?;
        let transaction: Transaction = parsed.body_as(step)?;

        tracing::info!(%step, transaction_id = %id, "transaction status verified");
        self.ctx.record.status = Some(transaction);
        Ok(self.advance(StatusChecked(id)))
    }
}

impl Lifecycle<StatusChecked> {
    /// `POST /transaction/dump/{id}/{table}`
    ///
    /// With `format` None no body is sent and the server must resolve the
    /// format to parquet.
    pub async fn dump(mut self, table: &str, format: Option<DumpFormat>) -> Result<Lifecycle<Dumped>> {
        self.run_dump(table, format).await?;
        let id = self.state.0.clone();
        Ok(self.advance(Dumped(id)))
    }
}

impl Lifecycle<Dumped> {
    /// Dump again under the same transaction; download paths accumulate
    pub async fn dump(mut self, table: &str, format: Option<DumpFormat>) -> Result<Self> {
        self.run_dump(table, format).await?;
        Ok(self)
    }

    /// `GET /download/{path}` for every accumulated download path
    ///
    /// Each file is written to `{download_dir}/{final path segment}`.
    pub async fn download_all(mut self) -> Result<Lifecycle<Downloaded>> {
        let step = Step::Download;
        let id = self.state.0.clone();
        let token = self.ctx.tokens.ensure_valid_token().await?;
        let paths = self.ctx.session.download_paths().to_vec();

        for server_path in paths {
            let dest = utils::local_artifact_path(&self.ctx.config.download_dir, &server_path)?;
            let http = ApiRequest::get(self.ctx.config.endpoint(&format!(
                "/download/{}",
                utils::encode_download_path(&server_path)
            )))
            .bearer(token.as_str());

            let outcome = self.ctx.transport.download(&http, &dest).await?;
            if !outcome.is_success() {
                tracing::error!(%step, path = %server_path, status = outcome.status, "download failed");
                return Err(Error::verification(
                    step,
                    format!("2xx status for '{}'", server_path),
                    outcome.status.to_string(),
                ));
            }

            tracing::debug!(path = %server_path, dest = ?dest, bytes = outcome.bytes, "artifact retrieved");
            self.ctx.session.record_file(&dest);
            self.ctx.record.downloads.push(DownloadedArtifact {
                server_path,
                local_path: dest,
                bytes: outcome.bytes,
            });
        }

        tracing::info!(
            %step,
            transaction_id = %id,
            files = self.ctx.session.file_names().len(),
            "artifacts downloaded"
        );
        Ok(self.advance(Downloaded(id)))
    }
}

impl Lifecycle<Downloaded> {
    /// `POST /transaction/load/{id}/{table}` with `file` as multipart upload
    ///
    /// Expects `dumpFiles` to be exactly `["{id}/{basename(file)}"]`.
    pub async fn load(mut self, table: &str, file: impl AsRef<Path>) -> Result<Lifecycle<Loaded>> {
        self.run_load(table, file.as_ref()).await?;
        let id = self.state.0.clone();
        Ok(self.advance(Loaded(id)))
    }
}

impl Lifecycle<Loaded> {
    /// Load another file under the same transaction
    pub async fn load(mut self, table: &str, file: impl AsRef<Path>) -> Result<Self> {
        self.run_load(table, file.as_ref()).await?;
        Ok(self)
    }

    /// `POST /transaction/commit/{id}`; expects status COMMITED
    pub async fn commit(self) -> Result<Lifecycle<Committed>> {
        let (ctx, id) = self.finish(FinishType::Commit).await?;
        Ok(Lifecycle {
            ctx,
            state: Committed(id),
        })
    }

    /// `POST /transaction/rollback/{id}`; expects status ROLLBACK_COMPLETED
    pub async fn rollback(self) -> Result<Lifecycle<RolledBack>> {
        let (ctx, id) = self.finish(FinishType::Rollback).await?;
        Ok(Lifecycle {
            ctx,
            state: RolledBack(id),
        })
    }
}

impl<S: Finished> Lifecycle<S> {
    /// Consume the finished run and return its report
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the session lost track of the
    /// transaction this run drove.
    pub fn into_report(self) -> Result<RunReport> {
        let session_id = self.ctx.session.require_transaction_id()?;
        if session_id != self.state.transaction_id() {
            return Err(Error::InvalidState(format!(
                "session holds transaction {}, run finished {}",
                session_id,
                self.state.transaction_id()
            )));
        }

        let final_transaction =
            self.ctx.record.finished.clone().ok_or_else(|| {
                Error::InvalidState("finished run has no final transaction".to_string())
            })?;

        Ok(RunReport {
            transaction_id: self.state.transaction_id().clone(),
            final_transaction,
            record: self.ctx.record,
            session: self.ctx.session,
        })
    }
}

impl StepContext {
    /// Authenticate, send, parse and verify one request
    async fn call(
        &mut self,
        step: Step,
        request: ApiRequest,
        contract: &StepContract,
    ) -> Result<ParsedResponse> {
        let token = self.tokens.ensure_valid_token().await?;
        let request = request.bearer(token);

        tracing::debug!(
            %step,
            method = request.method.as_str(),
            url = %request.url,
            transport = self.transport.name(),
            "issuing step request"
        );

        let raw = self.transport.execute(&request).await.inspect_err(|e| {
            tracing::error!(%step, error = %e, code = e.code(), "step request failed");
        })?;
        let parsed = response::parse(step, &raw)?;
        oracle::verify(contract, &parsed.headers, &parsed.body)?;
        Ok(parsed)
    }
}
