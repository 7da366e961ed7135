//! Docbatch Client Implementation

use crate::config::ClientConfig;
use docbatch_core::application::{
    CachedJob, JobCache, JobLifecycleManager, PollConfig, PollOutcome, PollSubscription,
};
use docbatch_core::domain::{
    compute_progress, CreateJobRequest, DownloadedArtifact, Job, JobItem, JobItemStatus, JobKey,
    JobStats, JobStatus, Output, Progress, Reconciliation, Session,
};
use docbatch_core::error::{AppError, Result};
use docbatch_core::port::id_provider::UuidProvider;
use docbatch_core::port::time_provider::SystemTimeProvider;
use docbatch_core::port::JobGateway;
use docbatch_infra_http::HttpJobGateway;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Docbatch Client
///
/// Owns the session it was built with and a lifecycle manager wired to the
/// HTTP gateway. Multiple subscriptions share one job cache.
///
/// # Example
///
/// ```no_run
/// use docbatch_sdk::{ClientConfig, DocbatchClient, JobKey};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DocbatchClient::connect(ClientConfig::new("http://127.0.0.1:8000/api/v1"))?;
/// let job = client.fetch(&JobKey::new("ws-1", "job-1")).await?;
/// println!("{} is {}", job.id, job.status);
/// # Ok(())
/// # }
/// ```
pub struct DocbatchClient {
    session: Session,
    manager: JobLifecycleManager,
}

impl DocbatchClient {
    /// Build a client against the HTTP API.
    ///
    /// The session is restored from `config.access_token`, falling back to
    /// an ephemeral guest identity.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let session = Session::restore(config.access_token.clone(), &UuidProvider);
        let gateway = HttpJobGateway::new(config.http.clone(), session.clone())?;

        info!(
            api_url = %config.http.base_url,
            guest = session.is_guest(),
            "Docbatch client ready"
        );
        Ok(Self::with_gateway(Arc::new(gateway), session, config.poll))
    }

    /// Build a client over any gateway implementation
    pub fn with_gateway(gateway: Arc<dyn JobGateway>, session: Session, poll: PollConfig) -> Self {
        let cache = Arc::new(JobCache::new(Arc::new(SystemTimeProvider)));
        Self {
            session,
            manager: JobLifecycleManager::new(gateway, cache, poll),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn manager(&self) -> &JobLifecycleManager {
        &self.manager
    }

    /// Tear the session down; the client cannot be used afterwards
    pub fn logout(self) {
        info!(guest = self.session.is_guest(), "Session cleared");
    }

    pub async fn fetch(&self, key: &JobKey) -> Result<Job> {
        self.manager.fetch(key).await
    }

    pub fn cached(&self, job_id: &str) -> Option<CachedJob> {
        self.manager.cached(job_id)
    }

    pub fn poll<F>(&self, key: JobKey, interval: Duration, on_update: F) -> PollSubscription
    where
        F: FnMut(&Job) + Send + 'static,
    {
        self.manager.poll(key, interval, on_update)
    }

    /// Poll with the configured interval until the job reaches a terminal state
    pub async fn wait_for_completion<F>(&self, key: JobKey, on_update: F) -> Result<Job>
    where
        F: FnMut(&Job) + Send + 'static,
    {
        match self.manager.watch(key.clone(), on_update).join().await? {
            PollOutcome::Terminal(job) => Ok(job),
            PollOutcome::Cancelled => Err(AppError::Internal(format!(
                "subscription for {} cancelled before completion",
                key
            ))),
        }
    }

    pub async fn create(&self, workspace_id: &str, request: &CreateJobRequest) -> Result<Job> {
        self.manager.create(workspace_id, request).await
    }

    pub async fn list(&self, workspace_id: &str, status: Option<JobStatus>) -> Result<Vec<Job>> {
        self.manager.list(workspace_id, status).await
    }

    pub async fn outputs(&self, key: &JobKey) -> Result<Vec<Output>> {
        self.manager.outputs(key).await
    }

    pub async fn stats(&self, job_id: &str) -> Result<JobStats> {
        self.manager.stats(job_id).await
    }

    /// Per-row items, ordered by row
    pub async fn items(&self, job_id: &str, status: Option<JobItemStatus>) -> Result<Vec<JobItem>> {
        self.manager.items(job_id, status).await
    }

    pub async fn failed_items(&self, job_id: &str) -> Result<Vec<JobItem>> {
        self.manager.failed_items(job_id).await
    }

    pub async fn cancel(&self, key: &JobKey) -> Result<Job> {
        self.manager.cancel(key).await
    }

    pub async fn retry(&self, key: &JobKey) -> Result<Job> {
        self.manager.retry(key).await
    }

    pub async fn reconcile(&self, key: &JobKey) -> Result<(Job, Reconciliation)> {
        self.manager.reconcile(key).await
    }

    pub async fn download(&self, key: &JobKey) -> Result<DownloadedArtifact> {
        self.manager.download(key).await
    }

    pub async fn download_output(&self, key: &JobKey, output_id: &str) -> Result<DownloadedArtifact> {
        self.manager.download_output(key, output_id).await
    }

    /// CSV report of the rows that failed
    pub async fn error_report(&self, key: &JobKey) -> Result<DownloadedArtifact> {
        self.manager.error_report(key).await
    }

    pub fn progress(&self, job: &Job) -> Progress {
        compute_progress(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbatch_core::domain::job::fixtures;
    use docbatch_core::port::job_gateway::mocks::MockJobGateway;
    use docbatch_core::port::Payload;

    fn client(gateway: Arc<MockJobGateway>) -> DocbatchClient {
        DocbatchClient::with_gateway(
            gateway,
            Session::authenticated("tok"),
            PollConfig {
                interval: Duration::from_secs(1),
                max_consecutive_failures: 2,
            },
        )
    }

    #[tokio::test]
    async fn test_connect_restores_guest_without_token() {
        let client = DocbatchClient::connect(ClientConfig::new("http://127.0.0.1:8000")).unwrap();
        assert!(client.session().is_guest());
        client.logout();
    }

    #[tokio::test]
    async fn test_connect_with_token() {
        let client = DocbatchClient::connect(
            ClientConfig::new("http://127.0.0.1:8000").with_token("tok-1"),
        )
        .unwrap();
        assert_eq!(client.session().bearer_token(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        assert!(matches!(
            DocbatchClient::connect(ClientConfig::new("localhost:8000")),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_completion() {
        let gateway = Arc::new(MockJobGateway::with_jobs([
            fixtures::job("job-1", JobStatus::Processing, 2, 1, 0),
            fixtures::job("job-1", JobStatus::Completed, 2, 2, 0),
        ]));
        let client = client(gateway.clone());

        let job = client
            .wait_for_completion(JobKey::new("ws-1", "job-1"), |_| {})
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(client.progress(&job).percent, 100);
        assert_eq!(
            client.cached("job-1").unwrap().job.status,
            JobStatus::Completed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_surfaces_lost_connection() {
        let gateway = Arc::new(MockJobGateway::new());
        gateway.push_error(AppError::Transient("refused".into()));
        gateway.push_error(AppError::Transient("refused".into()));
        let client = client(gateway.clone());

        let err = client
            .wait_for_completion(JobKey::new("ws-1", "job-1"), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LostConnection { failures: 2, .. }));
        assert_eq!(gateway.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_rows_and_error_report() {
        let gateway = Arc::new(MockJobGateway::with_jobs([fixtures::job(
            "job-1",
            JobStatus::Completed,
            3,
            3,
            1,
        )]));
        gateway.set_items(vec![
            fixtures::item("job-1", 2, JobItemStatus::Failed),
            fixtures::item("job-1", 0, JobItemStatus::Completed),
        ]);
        gateway.set_payload(Payload {
            bytes: b"row,error\n2,missing field\n".to_vec(),
            content_type: Some("text/csv".into()),
        });
        let client = client(gateway.clone());

        let failed = client.failed_items("job-1").await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].row_index, 2);

        let report = client.error_report(&JobKey::new("ws-1", "job-1")).await.unwrap();
        assert_eq!(report.target.filename, "errors-job-1.csv");
        assert_eq!(gateway.downloaded_paths(), vec!["/jobs/job-1/errors"]);
    }
}
