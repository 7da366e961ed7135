// Job Lifecycle Manager - client-side view of generation jobs

mod cancel;
pub mod constants;
mod subscription;

pub use cancel::{cancel_channel, CancelHandle, CancelToken};
pub use subscription::{PollOutcome, PollSubscription};

use crate::application::cache::{CachedJob, JobCache};
use crate::application::poll_policy::PollFailurePolicy;
use crate::domain::{
    reconcile, resolve_download, resolve_error_report, resolve_output_download, CreateJobRequest,
    DownloadTarget, DownloadedArtifact, Job, JobItem, JobItemStatus, JobKey, JobStats, JobStatus,
    Output, Reconciliation,
};
use crate::error::{AppError, Result};
use crate::port::JobGateway;
use constants::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Polling configuration
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_consecutive_failures: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

/// Maintains an eventually-consistent view of jobs by polling the backend,
/// and mediates the user actions (cancel, retry, download).
///
/// The manager never changes a job's status on its own: cached state only
/// ever comes from fetch responses.
pub struct JobLifecycleManager {
    gateway: Arc<dyn JobGateway>,
    cache: Arc<JobCache>,
    config: PollConfig,
}

impl JobLifecycleManager {
    pub fn new(gateway: Arc<dyn JobGateway>, cache: Arc<JobCache>, config: PollConfig) -> Self {
        Self {
            gateway,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<JobCache> {
        &self.cache
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Last cached view of a job, if any fetch has stored one
    pub fn cached(&self, job_id: &str) -> Option<CachedJob> {
        self.cache.get(job_id)
    }

    /// Fetch the current state of a job and refresh the cache
    pub async fn fetch(&self, key: &JobKey) -> Result<Job> {
        let job = self.gateway.get_job(key).await?;
        self.cache.store(job.clone());
        Ok(job)
    }

    /// Poll a job every `interval` until it reaches a terminal state.
    ///
    /// `on_update` runs after every successful fetch, including fetches that
    /// report an unchanged state.
    pub fn poll<F>(&self, key: JobKey, interval: Duration, on_update: F) -> PollSubscription
    where
        F: FnMut(&Job) + Send + 'static,
    {
        let interval = if interval < MIN_POLL_INTERVAL {
            debug!(
                requested_ms = interval.as_millis() as u64,
                "Poll interval below minimum, clamping"
            );
            MIN_POLL_INTERVAL
        } else {
            interval
        };

        PollSubscription::spawn(
            Arc::clone(&self.gateway),
            Arc::clone(&self.cache),
            key,
            interval,
            PollFailurePolicy::new(self.config.max_consecutive_failures),
            on_update,
        )
    }

    /// Poll with the configured default interval
    pub fn watch<F>(&self, key: JobKey, on_update: F) -> PollSubscription
    where
        F: FnMut(&Job) + Send + 'static,
    {
        self.poll(key, self.config.interval, on_update)
    }

    /// Cached status, fetching once if the job has never been seen
    async fn known_status(&self, key: &JobKey) -> Result<JobStatus> {
        match self.cache.job(&key.job_id) {
            Some(job) => Ok(job.status),
            None => Ok(self.fetch(key).await?.status),
        }
    }

    /// Ask the server to cancel a job.
    ///
    /// Fails fast with `NotReady` when the cached status does not accept a
    /// cancel. The server's response is returned but not cached: the next
    /// poll confirms the committed state.
    pub async fn cancel(&self, key: &JobKey) -> Result<Job> {
        let status = self.known_status(key).await?;
        if !status.accepts_cancel() {
            return Err(AppError::not_ready("cancel", status));
        }

        let job = self.gateway.cancel_job(&key.job_id).await?;
        info!(job = %key, status = %job.status, "Cancel requested");
        Ok(job)
    }

    /// Ask the server to re-enqueue the failed items of a job
    pub async fn retry(&self, key: &JobKey) -> Result<Job> {
        let status = self.known_status(key).await?;
        if !status.accepts_retry() {
            return Err(AppError::not_ready("retry", status));
        }

        let job = self.gateway.retry_job(&key.job_id).await?;
        info!(job = %key, status = %job.status, "Retry requested");
        Ok(job)
    }

    /// Create a job after client-side validation
    pub async fn create(&self, workspace_id: &str, request: &CreateJobRequest) -> Result<Job> {
        request.validate()?;
        let job = self.gateway.create_job(workspace_id, request).await?;
        self.cache.store(job.clone());
        info!(
            job_id = %job.id,
            workspace_id = %workspace_id,
            mode = %job.generation_mode,
            "Job created"
        );
        Ok(job)
    }

    /// List a workspace's jobs; every listed job refreshes the cache.
    ///
    /// Terminal entries older than [`SETTLED_ENTRY_TTL_MS`] are pruned first so
    /// a long-lived list view does not grow the cache without bound.
    pub async fn list(&self, workspace_id: &str, status: Option<JobStatus>) -> Result<Vec<Job>> {
        let jobs = self.gateway.list_jobs(workspace_id, status).await?;
        let pruned = self.cache.prune_settled(SETTLED_ENTRY_TTL_MS);
        if pruned > 0 {
            debug!(pruned, "Pruned settled cache entries");
        }
        for job in &jobs {
            self.cache.store(job.clone());
        }
        Ok(jobs)
    }

    /// Per-row outputs ordered by row index
    pub async fn outputs(&self, key: &JobKey) -> Result<Vec<Output>> {
        let mut outputs = self.gateway.list_outputs(key).await?;
        outputs.sort_by_key(|o| o.row_index);
        Ok(outputs)
    }

    pub async fn stats(&self, job_id: &str) -> Result<JobStats> {
        self.gateway.job_stats(job_id).await
    }

    /// Rows of a job ordered by row index, optionally filtered by status
    pub async fn items(&self, job_id: &str, status: Option<JobItemStatus>) -> Result<Vec<JobItem>> {
        let mut items = self.gateway.list_items(job_id, status).await?;
        items.sort_by_key(|i| i.row_index);
        Ok(items)
    }

    /// The rows a retry would re-enqueue
    pub async fn failed_items(&self, job_id: &str) -> Result<Vec<JobItem>> {
        self.items(job_id, Some(JobItemStatus::Failed)).await
    }

    /// Fetch a job and its outputs and compare the two views
    pub async fn reconcile(&self, key: &JobKey) -> Result<(Job, Reconciliation)> {
        let job = self.fetch(key).await?;
        let outputs = self.outputs(key).await?;
        let report = reconcile(&job, &outputs);
        Ok((job, report))
    }

    /// A completed job from the cache, or a fresh fetch otherwise
    async fn settled_job(&self, key: &JobKey) -> Result<Job> {
        match self.cache.job(&key.job_id) {
            Some(job) if job.status == JobStatus::Completed => Ok(job),
            _ => self.fetch(key).await,
        }
    }

    /// Download the bundle of a completed job (ZIP for per_row, PDF for per_datasource)
    pub async fn download(&self, key: &JobKey) -> Result<DownloadedArtifact> {
        let job = self.settled_job(key).await?;
        let target = resolve_download(&job, None)?;
        self.transfer(target).await
    }

    /// Download the CSV report of failed rows.
    ///
    /// Always fetches: the failed counter decides whether a report exists.
    pub async fn error_report(&self, key: &JobKey) -> Result<DownloadedArtifact> {
        let job = self.fetch(key).await?;
        let target = resolve_error_report(&job)?;
        self.transfer(target).await
    }

    async fn transfer(&self, target: DownloadTarget) -> Result<DownloadedArtifact> {
        let payload = self.gateway.download(&target.url).await?;
        let target = target.with_content_type(payload.content_type.as_deref());
        info!(
            url = %target.url,
            filename = %target.filename,
            bytes = payload.bytes.len(),
            "Artifact downloaded"
        );

        Ok(DownloadedArtifact {
            target,
            bytes: payload.bytes,
        })
    }

    /// Download one per-row output
    pub async fn download_output(&self, key: &JobKey, output_id: &str) -> Result<DownloadedArtifact> {
        let job = self.settled_job(key).await?;
        let outputs = self.outputs(key).await?;
        let output = outputs
            .iter()
            .find(|o| o.id == output_id)
            .ok_or_else(|| AppError::NotFound(format!("output {} of job {}", output_id, key)))?;
        let target = resolve_output_download(&job, output)?;
        self.transfer(target).await
    }
}
