use crate::db::{to_document, DocumentSink};
use crate::error::PipelineError;
use crate::models::{
    Ack, Pipeline, PipelineOutcome, RunSummary, TargetUrl, LIGHTHOUSE_COLLECTION,
    PAGESPEED_COLLECTION,
};
use crate::services::pagespeed::ScoreSource;
use crate::services::site_audit_service::{
    normalize, AuditConfig, AuditEngine, BrowserLauncher, BrowserProcessHandle,
};
use crate::utils::{append_run_log, save_raw_report, Clock, SystemClock};
use futures::future::join;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Runs the pagespeed and lighthouse pipelines for one URL side by side.
pub struct Orchestrator {
    scores: Arc<dyn ScoreSource>,
    browsers: Arc<dyn BrowserLauncher>,
    engine: Arc<dyn AuditEngine>,
    sink: Arc<dyn DocumentSink>,
    clock: Arc<dyn Clock>,
    audit_config: AuditConfig,
    raw_report_dir: Option<PathBuf>,
    run_log: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        scores: Arc<dyn ScoreSource>,
        browsers: Arc<dyn BrowserLauncher>,
        engine: Arc<dyn AuditEngine>,
        sink: Arc<dyn DocumentSink>,
    ) -> Self {
        Orchestrator {
            scores,
            browsers,
            engine,
            sink,
            clock: Arc::new(SystemClock),
            audit_config: AuditConfig::default(),
            raw_report_dir: None,
            run_log: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_audit_config(mut self, audit_config: AuditConfig) -> Self {
        self.audit_config = audit_config;
        self
    }

    pub fn with_raw_report_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.raw_report_dir = dir;
        self
    }

    pub fn with_run_log(mut self, path: Option<PathBuf>) -> Self {
        self.run_log = path;
        self
    }

    /// Waits for both pipelines to finish. Failures are logged and reported
    /// in the summary, never returned.
    pub async fn run(&self, url: &TargetUrl) -> RunSummary {
        info!("Starting audit run for {}", url);

        let (pagespeed, lighthouse) =
            join(self.pagespeed_pipeline(url), self.lighthouse_pipeline(url)).await;

        let summary = RunSummary {
            url: url.to_string(),
            pagespeed: self.record(url, Pipeline::PageSpeed, pagespeed).await,
            lighthouse: self.record(url, Pipeline::Lighthouse, lighthouse).await,
        };
        info!(
            "Audit run for {} finished with {} failed pipeline(s)",
            url,
            summary.failures()
        );
        summary
    }

    async fn pagespeed_pipeline(&self, url: &TargetUrl) -> Result<Ack, PipelineError> {
        let report = self.scores.fetch_score(url).await?;
        let document = to_document(PAGESPEED_COLLECTION, &report)?;
        Ok(self.sink.store(PAGESPEED_COLLECTION, document).await?)
    }

    async fn lighthouse_pipeline(&self, url: &TargetUrl) -> Result<Ack, PipelineError> {
        let mut handle = self.browsers.acquire().await?;
        let result = self.audit_and_store(url, &handle).await;
        self.browsers.release(&mut handle).await;
        result
    }

    async fn audit_and_store(
        &self,
        url: &TargetUrl,
        handle: &BrowserProcessHandle,
    ) -> Result<Ack, PipelineError> {
        let raw = self
            .engine
            .run_audit(url, handle, &self.audit_config)
            .await?;

        if let Some(dir) = &self.raw_report_dir {
            match save_raw_report(dir, url.as_str(), &raw).await {
                Ok(path) => info!("Raw lighthouse report saved to {}", path.display()),
                Err(e) => warn!("failed to save raw lighthouse report for {}: {}", url, e),
            }
        }

        let report = normalize(&raw, self.audit_config.metrics.as_slice(), self.clock.as_ref());
        let document = to_document(LIGHTHOUSE_COLLECTION, &report)?;
        Ok(self.sink.store(LIGHTHOUSE_COLLECTION, document).await?)
    }

    async fn record(
        &self,
        url: &TargetUrl,
        pipeline: Pipeline,
        result: Result<Ack, PipelineError>,
    ) -> PipelineOutcome {
        let outcome = match result {
            Ok(ack) => {
                info!("{} pipeline stored {}", pipeline, ack);
                PipelineOutcome::Stored { ack }
            }
            Err(e) => {
                error!("{} pipeline failed for {}: {}", pipeline, url, e);
                PipelineOutcome::Failed {
                    message: e.to_string(),
                }
            }
        };

        if let Some(path) = &self.run_log {
            if let Err(e) =
                append_run_log(path, self.clock.now(), url.as_str(), pipeline, &outcome).await
            {
                warn!("failed to append to run log {}: {}", path.display(), e);
            }
        }
        outcome
    }
}
