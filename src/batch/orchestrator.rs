//! Batch orchestration: validation, bounded parallel rendering, optional
//! delivery, and single-writer report assembly.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::dispatch::{
    DispatchClient, DispatchConnector, MessageTemplate, RetryPolicy, SessionOptions,
    SmtpConnector,
};
use crate::error::{DispatchError, EngineResult};
use crate::models::{
    Artifact, BatchReport, CompanyProfile, EmployeeRecord, ProcessingMode, RecordOutcome,
    RecordStage,
};
use crate::render::PayslipRenderer;
use crate::validation::{RawDataset, ValidatedRecord, validate};

use super::progress::ProgressObserver;

const CANCELLED: &str = "batch cancelled before this record was processed";

/// Runs payslip batches.
///
/// One orchestrator can run any number of batches; each run opens its own mail
/// session in live mode.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use payslip_engine::batch::{BatchOrchestrator, NoProgress};
/// use payslip_engine::config::ConfigLoader;
/// use payslip_engine::models::ProcessingMode;
/// use payslip_engine::validation::RawDataset;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), payslip_engine::error::EngineError> {
/// let (profile, settings) = ConfigLoader::load("./config/acme")?.into_parts();
/// let dataset = RawDataset::from_csv(std::fs::File::open("payroll.csv").unwrap())?;
///
/// let orchestrator = BatchOrchestrator::new(settings);
/// let report = orchestrator
///     .run(
///         &dataset,
///         Arc::new(profile),
///         ProcessingMode::DryRun,
///         &mut NoProgress,
///         CancellationToken::new(),
///     )
///     .await?;
/// println!("{} of {} rendered", report.summary().succeeded, report.summary().total);
/// # Ok(())
/// # }
/// ```
pub struct BatchOrchestrator {
    settings: EngineSettings,
    renderer: Arc<PayslipRenderer>,
    connector: Arc<dyn DispatchConnector>,
}

impl BatchOrchestrator {
    /// Creates an orchestrator that delivers over SMTP.
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_connector(settings, Arc::new(SmtpConnector))
    }

    /// Creates an orchestrator that opens mail sessions with `connector`.
    pub fn with_connector(settings: EngineSettings, connector: Arc<dyn DispatchConnector>) -> Self {
        let renderer = PayslipRenderer::with_pinned_line_items(
            settings.pinned_line_items.iter().copied(),
        );
        Self {
            settings,
            renderer: Arc::new(renderer),
            connector,
        }
    }

    /// The settings every run uses.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Processes every row of `dataset` and returns one outcome per row, in
    /// input order.
    ///
    /// Returns `Err` only when the dataset fails the column schema; no document
    /// is rendered in that case. Every other failure is captured in the
    /// record's outcome. In [`ProcessingMode::DryRun`] the connector is never
    /// called.
    ///
    /// `observer` is called once per record as it finishes. When `cancel` fires,
    /// work already in flight completes and every record not yet started is
    /// reported as `Skipped`.
    pub async fn run(
        &self,
        dataset: &RawDataset,
        profile: Arc<CompanyProfile>,
        mode: ProcessingMode,
        observer: &mut dyn ProgressObserver,
        cancel: CancellationToken,
    ) -> EngineResult<BatchReport> {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();

        info!(
            batch_id = %batch_id,
            mode = ?mode,
            rows = dataset.row_count(),
            "Starting payslip batch"
        );

        let validated = validate(dataset, &self.settings.validation_rules()).inspect_err(|e| {
            warn!(batch_id = %batch_id, error = %e, "Dataset rejected");
        })?;

        let total = validated.total_rows();
        let (records, rejected) = validated.into_parts();
        let mut identities = vec![(String::new(), String::new()); total];
        for item in &records {
            identities[item.row] = (item.record.employee_id.clone(), item.record.name.clone());
        }
        for row in &rejected {
            identities[row.row] = (row.employee_id.clone(), row.name.clone());
        }

        let (client, fatal) = match mode {
            ProcessingMode::DryRun => (None, OnceLock::new()),
            ProcessingMode::Live if records.is_empty() || cancel.is_cancelled() => {
                (None, OnceLock::new())
            }
            ProcessingMode::Live => self.open_session(batch_id, &profile).await,
        };

        let context = Arc::new(RunContext {
            batch_id,
            mode,
            profile,
            renderer: self.renderer.clone(),
            template: self.settings.message.clone(),
            retry: RetryPolicy::new(self.settings.retry, self.settings.send_timeout()),
            render_slots: Semaphore::new(self.settings.render_workers.max(1)),
            dispatch_slots: Semaphore::new(self.settings.dispatch_concurrency.max(1)),
            client,
            fatal,
            cancel,
        });

        let (tx, mut rx) = mpsc::unbounded_channel();

        for row in rejected {
            let detail = row.detail();
            warn!(
                batch_id = %batch_id,
                row = row.row,
                employee_id = %row.employee_id,
                error = %detail,
                "Row failed validation"
            );
            let outcome =
                RecordOutcome::render_failed(row.row, &row.employee_id, &row.name, detail);
            if tx.send(outcome).is_err() {
                break;
            }
        }

        let mut tasks = JoinSet::new();
        for item in records {
            let context = context.clone();
            let tx = tx.clone();
            tasks.spawn(async move {
                let outcome = context.process(item).await;
                if tx.send(outcome).is_err() {
                    debug!("Aggregator closed before outcome was delivered");
                }
            });
        }
        drop(tx);

        let mut slots: Vec<Option<RecordOutcome>> = vec![None; total];
        let mut completed = 0;
        while let Some(outcome) = rx.recv().await {
            completed += 1;
            observer.on_progress(completed, total, &outcome);
            let row = outcome.row;
            slots[row] = Some(outcome);
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(batch_id = %batch_id, error = %e, "Record task aborted");
            }
        }

        let outcomes: Vec<RecordOutcome> = slots
            .into_iter()
            .zip(identities)
            .enumerate()
            .map(|(row, (slot, (employee_id, name)))| {
                slot.unwrap_or_else(|| {
                    RecordOutcome::render_failed(row, &employee_id, &name, "record task aborted")
                })
            })
            .collect();

        let batch_failure = context.fatal.get().cloned();
        let report = BatchReport::new(batch_id, mode, outcomes, batch_failure, started_at);
        let summary = report.summary();

        info!(
            batch_id = %batch_id,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "Payslip batch complete"
        );

        Ok(report)
    }

    /// Opens and verifies the batch's mail session.
    ///
    /// A batch-fatal failure here is recorded so every send short-circuits.
    async fn open_session(
        &self,
        batch_id: Uuid,
        profile: &CompanyProfile,
    ) -> (Option<Arc<dyn DispatchClient>>, OnceLock<DispatchError>) {
        let fatal = OnceLock::new();
        let options = SessionOptions::from_settings(&self.settings);

        let client = match self.connector.connect(&profile.mail, options).await {
            Ok(client) => client,
            Err(e) => {
                warn!(batch_id = %batch_id, error = %e, "Could not open mail session");
                let _ = fatal.set(e);
                return (None, fatal);
            }
        };

        match client.verify().await {
            Ok(()) => debug!(batch_id = %batch_id, "Mail session verified"),
            Err(e) if e.is_batch_fatal() => {
                warn!(batch_id = %batch_id, error = %e, "Mail session rejected");
                let _ = fatal.set(e);
            }
            Err(e) => {
                warn!(
                    batch_id = %batch_id,
                    error = %e,
                    "Mail session check failed, continuing"
                );
            }
        }

        (Some(client), fatal)
    }
}

/// State shared by every record task of one run.
struct RunContext {
    batch_id: Uuid,
    mode: ProcessingMode,
    profile: Arc<CompanyProfile>,
    renderer: Arc<PayslipRenderer>,
    template: MessageTemplate,
    retry: RetryPolicy,
    render_slots: Semaphore,
    dispatch_slots: Semaphore,
    client: Option<Arc<dyn DispatchClient>>,
    fatal: OnceLock<DispatchError>,
    cancel: CancellationToken,
}

impl RunContext {
    fn advance(&self, employee_id: &str, stage: &mut RecordStage, next: RecordStage) {
        debug_assert!(stage.can_advance_to(next), "{stage:?} -> {next:?}");
        debug!(
            batch_id = %self.batch_id,
            employee_id = %employee_id,
            from = ?stage,
            to = ?next,
            "Record stage"
        );
        *stage = next;
    }

    async fn process(&self, item: ValidatedRecord) -> RecordOutcome {
        let ValidatedRecord { row, record } = item;
        let record = Arc::new(record);
        let id = record.employee_id.as_str();
        let mut stage = RecordStage::Validated;

        let artifact = {
            let Ok(_permit) = self.render_slots.acquire().await else {
                self.advance(id, &mut stage, RecordStage::Skipped);
                return RecordOutcome::skipped(row, id, &record.name, CANCELLED);
            };
            if self.cancel.is_cancelled() {
                self.advance(id, &mut stage, RecordStage::Skipped);
                return RecordOutcome::skipped(row, id, &record.name, CANCELLED);
            }

            self.advance(id, &mut stage, RecordStage::Rendering);
            let renderer = self.renderer.clone();
            let profile = self.profile.clone();
            let input = record.clone();
            let rendered =
                tokio::task::spawn_blocking(move || renderer.render(&input, &profile)).await;

            match rendered {
                Ok(Ok(artifact)) => artifact,
                Ok(Err(e)) => {
                    self.advance(id, &mut stage, RecordStage::RenderFailed);
                    warn!(
                        batch_id = %self.batch_id,
                        employee_id = %id,
                        error = %e,
                        "Render failed"
                    );
                    return RecordOutcome::render_failed(row, id, &record.name, e.to_string());
                }
                Err(e) => {
                    self.advance(id, &mut stage, RecordStage::RenderFailed);
                    warn!(
                        batch_id = %self.batch_id,
                        employee_id = %id,
                        error = %e,
                        "Render task failed"
                    );
                    let detail = format!("render task failed: {e}");
                    return RecordOutcome::render_failed(row, id, &record.name, detail);
                }
            }
        };
        self.advance(id, &mut stage, RecordStage::Rendered);

        match self.mode {
            ProcessingMode::DryRun => RecordOutcome::rendered(row, id, &record.name, artifact),
            ProcessingMode::Live => self.deliver(row, &record, artifact, stage).await,
        }
    }

    async fn deliver(
        &self,
        row: usize,
        record: &EmployeeRecord,
        artifact: Artifact,
        mut stage: RecordStage,
    ) -> RecordOutcome {
        let id = record.employee_id.as_str();

        if let Some(fatal) = self.fatal.get() {
            return self.short_circuit(row, record, artifact, fatal, stage);
        }
        let Some(client) = self.client.as_deref() else {
            let missing = DispatchError::TransientNetwork {
                message: "no mail session".to_string(),
            };
            return self.short_circuit(row, record, artifact, &missing, stage);
        };

        let Ok(_permit) = self.dispatch_slots.acquire().await else {
            self.advance(id, &mut stage, RecordStage::Skipped);
            return skipped_with(row, record, artifact);
        };
        if self.cancel.is_cancelled() {
            self.advance(id, &mut stage, RecordStage::Skipped);
            return skipped_with(row, record, artifact);
        }
        if let Some(fatal) = self.fatal.get() {
            return self.short_circuit(row, record, artifact, fatal, stage);
        }

        self.advance(id, &mut stage, RecordStage::Sending);
        let subject = self.template.subject_for(record, &self.profile);
        let body = self.template.body_for(record, &self.profile);
        let (email, subject, body, attachment) =
            (record.email.as_str(), subject.as_str(), body.as_str(), &artifact);

        let result = self
            .retry
            .call(move || client.send(email, subject, body, attachment))
            .await;

        match result {
            Ok(()) => {
                self.advance(id, &mut stage, RecordStage::Sent);
                info!(batch_id = %self.batch_id, employee_id = %id, "Payslip sent");
                RecordOutcome::sent(row, id, &record.name, artifact)
            }
            Err(e) => {
                self.advance(id, &mut stage, RecordStage::SendFailed);
                warn!(batch_id = %self.batch_id, employee_id = %id, error = %e, "Send failed");
                if e.is_batch_fatal() && self.fatal.set(e.clone()).is_ok() {
                    warn!(batch_id = %self.batch_id, error = %e, "Stopping remaining sends");
                }
                RecordOutcome::send_failed(row, id, &record.name, artifact, e.to_string())
            }
        }
    }

    fn short_circuit(
        &self,
        row: usize,
        record: &EmployeeRecord,
        artifact: Artifact,
        cause: &DispatchError,
        mut stage: RecordStage,
    ) -> RecordOutcome {
        let id = record.employee_id.as_str();
        self.advance(id, &mut stage, RecordStage::Sending);
        self.advance(id, &mut stage, RecordStage::SendFailed);
        RecordOutcome::send_failed(row, id, &record.name, artifact, cause.to_string())
    }
}

fn skipped_with(row: usize, record: &EmployeeRecord, artifact: Artifact) -> RecordOutcome {
    let mut outcome = RecordOutcome::skipped(row, &record.employee_id, &record.name, CANCELLED);
    outcome.artifact = Some(artifact);
    outcome
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::config::RetrySettings;
    use crate::error::{EngineError, SchemaError};
    use crate::models::{MailCredentials, RecordStatus};

    const HEADER: &str = "employeeId,name,email,payPeriod,grossIncome,totalDeductions,netPay";

    #[derive(Default)]
    struct ScriptedClient {
        verify_error: Option<DispatchError>,
        failures: HashMap<String, DispatchError>,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DispatchClient for ScriptedClient {
        async fn verify(&self) -> Result<(), DispatchError> {
            match &self.verify_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        async fn send(
            &self,
            recipient: &str,
            _subject: &str,
            _body: &str,
            _artifact: &Artifact,
        ) -> Result<(), DispatchError> {
            self.sent.lock().unwrap().push(recipient.to_string());
            match self.failures.get(recipient) {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    struct ScriptedConnector {
        client: Arc<ScriptedClient>,
        connects: AtomicUsize,
    }

    impl ScriptedConnector {
        fn new(client: ScriptedClient) -> Arc<Self> {
            Arc::new(Self {
                client: Arc::new(client),
                connects: AtomicUsize::new(0),
            })
        }

        fn sent(&self) -> Vec<String> {
            self.client.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DispatchConnector for ScriptedConnector {
        async fn connect(
            &self,
            _credentials: &MailCredentials,
            _options: SessionOptions,
        ) -> Result<Arc<dyn DispatchClient>, DispatchError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let client: Arc<dyn DispatchClient> = self.client.clone();
            Ok(client)
        }
    }

    fn create_test_settings() -> EngineSettings {
        EngineSettings {
            render_workers: 2,
            dispatch_concurrency: 1,
            retry: RetrySettings {
                max_retries: 0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn create_test_profile() -> Arc<CompanyProfile> {
        Arc::new(CompanyProfile {
            name: "Acme Corp".to_string(),
            footer_text: "Confidential.".to_string(),
            document_id: Some("HR-FORM-012".to_string()),
            effectivity_date: None,
            logo: None,
            mail: MailCredentials::new("hr@acme.test", "secret", "smtp.acme.test", 587),
        })
    }

    fn row(i: usize) -> String {
        format!("E{i},Employee {i},e{i}@acme.test,January 2025,1000,100,900")
    }

    fn dataset(rows: &[String]) -> RawDataset {
        let body = rows.join("\n");
        RawDataset::from_csv(format!("{HEADER}\n{body}").as_bytes()).unwrap()
    }

    fn auth_error() -> DispatchError {
        DispatchError::Auth {
            message: "535 5.7.8 Username and Password not accepted".to_string(),
        }
    }

    async fn run(
        connector: Arc<ScriptedConnector>,
        data: &RawDataset,
        mode: ProcessingMode,
    ) -> EngineResult<BatchReport> {
        let orchestrator = BatchOrchestrator::with_connector(create_test_settings(), connector);
        orchestrator
            .run(
                data,
                create_test_profile(),
                mode,
                &mut crate::batch::NoProgress,
                CancellationToken::new(),
            )
            .await
    }

    #[tokio::test]
    async fn test_dry_run_renders_every_row_without_connecting() {
        let connector = ScriptedConnector::new(ScriptedClient::default());
        let data = dataset(&(0..5).map(row).collect::<Vec<_>>());

        let mut events = Vec::new();
        let mut observer = |completed: usize, total: usize, _latest: &RecordOutcome| {
            events.push((completed, total));
        };
        let orchestrator =
            BatchOrchestrator::with_connector(create_test_settings(), connector.clone());
        let report = orchestrator
            .run(
                &data,
                create_test_profile(),
                ProcessingMode::DryRun,
                &mut observer,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert!(connector.sent().is_empty());
        assert_eq!(report.summary().succeeded, 5);
        assert_eq!(events, (1..=5).map(|c| (c, 5)).collect::<Vec<_>>());

        for (i, outcome) in report.outcomes().iter().enumerate() {
            assert_eq!(outcome.row, i);
            assert_eq!(outcome.employee_id, format!("E{i}"));
            assert_eq!(outcome.status, RecordStatus::Rendered);
            assert!(outcome.artifact.as_ref().unwrap().bytes().starts_with(b"%PDF"));
        }
    }

    #[tokio::test]
    async fn test_invalid_row_is_render_failed_in_place() {
        let connector = ScriptedConnector::new(ScriptedClient::default());
        let mut rows: Vec<String> = (0..3).map(row).collect();
        rows[1] = "E1,Employee 1,not-an-email,January 2025,1000,100,900".to_string();

        let report = run(connector, &dataset(&rows), ProcessingMode::DryRun)
            .await
            .unwrap();

        let statuses: Vec<RecordStatus> = report.outcomes().iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                RecordStatus::Rendered,
                RecordStatus::RenderFailed,
                RecordStatus::Rendered
            ]
        );
        let failed = &report.outcomes()[1];
        assert!(failed.error_detail.as_deref().unwrap().contains("email"));
        assert!(failed.artifact.is_none());
    }

    #[tokio::test]
    async fn test_missing_column_fails_before_rendering() {
        let connector = ScriptedConnector::new(ScriptedClient::default());
        let data = RawDataset::from_csv(
            "employeeId,name,payPeriod,grossIncome,totalDeductions,netPay\nE1,Jane,Jan,1,0,1"
                .as_bytes(),
        )
        .unwrap();

        let mut calls = 0;
        let mut observer = |_: usize, _: usize, _: &RecordOutcome| calls += 1;
        let orchestrator =
            BatchOrchestrator::with_connector(create_test_settings(), connector.clone());
        let result = orchestrator
            .run(
                &data,
                create_test_profile(),
                ProcessingMode::Live,
                &mut observer,
                CancellationToken::new(),
            )
            .await;

        match result {
            Err(EngineError::Schema(SchemaError::MissingColumns { columns })) => {
                assert_eq!(columns, vec!["email".to_string()]);
            }
            other => panic!("expected missing column error, got {other:?}"),
        }
        assert_eq!(calls, 0);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_stops_remaining_sends() {
        let mut client = ScriptedClient::default();
        client.failures.insert("e2@acme.test".to_string(), auth_error());
        let connector = ScriptedConnector::new(client);
        let data = dataset(&(0..6).map(row).collect::<Vec<_>>());

        let report = run(connector.clone(), &data, ProcessingMode::Live)
            .await
            .unwrap();

        let sent = connector.sent();
        assert_eq!(sent.last().map(String::as_str), Some("e2@acme.test"));
        assert_eq!(report.batch_failure(), Some(&auth_error()));

        let cause = auth_error().to_string();
        for outcome in report.outcomes() {
            let recipient = format!("e{}@acme.test", outcome.row);
            match outcome.status {
                RecordStatus::Sent => assert!(sent.contains(&recipient)),
                RecordStatus::SendFailed => {
                    assert_eq!(outcome.error_detail.as_deref(), Some(cause.as_str()));
                    assert!(outcome.artifact.is_some());
                }
                other => panic!("unexpected status {other:?}"),
            }
        }
        assert_eq!(report.outcomes()[2].status, RecordStatus::SendFailed);
        assert_eq!(report.summary().succeeded, sent.len() - 1);
    }

    #[tokio::test]
    async fn test_rejected_address_does_not_stop_batch() {
        let mut client = ScriptedClient::default();
        client.failures.insert(
            "e1@acme.test".to_string(),
            DispatchError::AddressRejected {
                address: "e1@acme.test".to_string(),
                message: "550 5.1.1 No such user".to_string(),
            },
        );
        let connector = ScriptedConnector::new(client);
        let data = dataset(&(0..3).map(row).collect::<Vec<_>>());

        let report = run(connector.clone(), &data, ProcessingMode::Live)
            .await
            .unwrap();

        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(connector.sent().len(), 3);
        assert!(report.batch_failure().is_none());
        assert_eq!(report.outcomes()[0].status, RecordStatus::Sent);
        assert_eq!(report.outcomes()[1].status, RecordStatus::SendFailed);
        assert_eq!(report.outcomes()[2].status, RecordStatus::Sent);
    }

    #[tokio::test]
    async fn test_rejected_verify_fails_every_send() {
        let client = ScriptedClient {
            verify_error: Some(auth_error()),
            ..Default::default()
        };
        let connector = ScriptedConnector::new(client);
        let data = dataset(&(0..3).map(row).collect::<Vec<_>>());

        let report = run(connector.clone(), &data, ProcessingMode::Live)
            .await
            .unwrap();

        assert!(connector.sent().is_empty());
        assert_eq!(report.summary().failed, 3);
        assert!(
            report
                .outcomes()
                .iter()
                .all(|o| o.status == RecordStatus::SendFailed)
        );
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_unstarted_records() {
        let connector = ScriptedConnector::new(ScriptedClient::default());
        let mut rows: Vec<String> = (0..4).map(row).collect();
        rows[3] = "E3,Employee 3,e3@acme.test,January 2025,abc,100,900".to_string();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let orchestrator =
            BatchOrchestrator::with_connector(create_test_settings(), connector.clone());
        let report = orchestrator
            .run(
                &dataset(&rows),
                create_test_profile(),
                ProcessingMode::Live,
                &mut crate::batch::NoProgress,
                cancel,
            )
            .await
            .unwrap();

        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert_eq!(report.summary().skipped, 3);
        assert_eq!(report.outcomes()[3].status, RecordStatus::RenderFailed);
        for outcome in &report.outcomes()[..3] {
            assert_eq!(outcome.status, RecordStatus::Skipped);
            assert!(outcome.skip_reason.is_some());
            assert!(outcome.error_detail.is_none());
        }
    }
}
