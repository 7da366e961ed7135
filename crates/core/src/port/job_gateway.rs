// Job Gateway Port (Interface to the document-generation backend)

use crate::domain::{
    CreateJobRequest, Job, JobItem, JobItemStatus, JobKey, JobStats, JobStatus, Output,
};
use crate::error::Result;
use async_trait::async_trait;

/// Binary body of a download endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Vec<u8>,
    /// `Content-Type` response header, when the server sent one
    pub content_type: Option<String>,
}

/// Gateway interface for the REST backend.
///
/// Implementations map every non-2xx response into the `AppError` taxonomy;
/// callers never see raw status codes.
#[async_trait]
pub trait JobGateway: Send + Sync {
    /// `GET /workspaces/{ws}/jobs/{job}`
    async fn get_job(&self, key: &JobKey) -> Result<Job>;

    /// `GET /workspaces/{ws}/jobs[?status_filter=]`
    async fn list_jobs(&self, workspace_id: &str, status: Option<JobStatus>) -> Result<Vec<Job>>;

    /// `GET /workspaces/{ws}/jobs/{job}/outputs`
    async fn list_outputs(&self, key: &JobKey) -> Result<Vec<Output>>;

    /// `POST /workspaces/{ws}/jobs`
    async fn create_job(&self, workspace_id: &str, request: &CreateJobRequest) -> Result<Job>;

    /// `POST /jobs/{job}/cancel`
    async fn cancel_job(&self, job_id: &str) -> Result<Job>;

    /// `POST /jobs/{job}/retry`
    async fn retry_job(&self, job_id: &str) -> Result<Job>;

    /// `GET /jobs/{job}/stats`
    async fn job_stats(&self, job_id: &str) -> Result<JobStats>;

    /// `GET /jobs/{job}/items[?status_filter=]`
    async fn list_items(&self, job_id: &str, status: Option<JobItemStatus>) -> Result<Vec<JobItem>>;

    /// GET a binary endpoint by path relative to the API base
    async fn download(&self, path: &str) -> Result<Payload>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Scripted gateway.
    ///
    /// `get_job` pops scripted responses in order; once the script is empty it
    /// keeps returning the last job it served.
    #[derive(Default)]
    pub struct MockJobGateway {
        script: Mutex<VecDeque<Result<Job>>>,
        last_served: Mutex<Option<Job>>,
        fetch_gate: Mutex<Option<oneshot::Receiver<()>>>,
        jobs: Mutex<Vec<Job>>,
        outputs: Mutex<Vec<Output>>,
        items: Mutex<Vec<JobItem>>,
        action_response: Mutex<Option<Job>>,
        stats: Mutex<Option<JobStats>>,
        payload: Mutex<Option<Payload>>,
        created: Mutex<Vec<CreateJobRequest>>,
        downloaded_paths: Mutex<Vec<String>>,
        fetch_count: AtomicUsize,
        cancel_count: AtomicUsize,
        retry_count: AtomicUsize,
        download_count: AtomicUsize,
    }

    impl MockJobGateway {
        pub fn new() -> Self {
            Self::default()
        }

        /// Gateway whose fetches report the given sequence of jobs
        pub fn with_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
            let gateway = Self::new();
            for job in jobs {
                gateway.push_job(job);
            }
            gateway
        }

        pub fn push_job(&self, job: Job) {
            self.script.lock().unwrap().push_back(Ok(job));
        }

        pub fn push_error(&self, error: AppError) {
            self.script.lock().unwrap().push_back(Err(error));
        }

        /// Hold the next `get_job` call until the returned sender fires (or drops)
        pub fn gate_next_fetch(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            *self.fetch_gate.lock().unwrap() = Some(rx);
            tx
        }

        pub fn set_listed_jobs(&self, jobs: Vec<Job>) {
            *self.jobs.lock().unwrap() = jobs;
        }

        pub fn set_outputs(&self, outputs: Vec<Output>) {
            *self.outputs.lock().unwrap() = outputs;
        }

        pub fn set_items(&self, items: Vec<JobItem>) {
            *self.items.lock().unwrap() = items;
        }

        /// Body returned by cancel/retry/create
        pub fn set_action_response(&self, job: Job) {
            *self.action_response.lock().unwrap() = Some(job);
        }

        pub fn set_stats(&self, stats: JobStats) {
            *self.stats.lock().unwrap() = Some(stats);
        }

        pub fn set_payload(&self, payload: Payload) {
            *self.payload.lock().unwrap() = Some(payload);
        }

        pub fn fetch_count(&self) -> usize {
            self.fetch_count.load(Ordering::SeqCst)
        }

        pub fn cancel_count(&self) -> usize {
            self.cancel_count.load(Ordering::SeqCst)
        }

        pub fn retry_count(&self) -> usize {
            self.retry_count.load(Ordering::SeqCst)
        }

        pub fn download_count(&self) -> usize {
            self.download_count.load(Ordering::SeqCst)
        }

        pub fn created_requests(&self) -> Vec<CreateJobRequest> {
            self.created.lock().unwrap().clone()
        }

        pub fn downloaded_paths(&self) -> Vec<String> {
            self.downloaded_paths.lock().unwrap().clone()
        }

        fn action_job(&self, job_id: &str) -> Result<Job> {
            self.action_response
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AppError::NotFound(format!("job {}", job_id)))
        }
    }

    #[async_trait]
    impl JobGateway for MockJobGateway {
        async fn get_job(&self, key: &JobKey) -> Result<Job> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);

            let gate = self.fetch_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }

            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(job)) => {
                    *self.last_served.lock().unwrap() = Some(job.clone());
                    Ok(job)
                }
                Some(Err(e)) => Err(e),
                None => self
                    .last_served
                    .lock()
                    .unwrap()
                    .clone()
                    .ok_or_else(|| AppError::NotFound(format!("job {}", key))),
            }
        }

        async fn list_jobs(
            &self,
            _workspace_id: &str,
            status: Option<JobStatus>,
        ) -> Result<Vec<Job>> {
            let jobs = self.jobs.lock().unwrap().clone();
            Ok(jobs
                .into_iter()
                .filter(|j| status.map_or(true, |s| j.status == s))
                .collect())
        }

        async fn list_outputs(&self, _key: &JobKey) -> Result<Vec<Output>> {
            Ok(self.outputs.lock().unwrap().clone())
        }

        async fn create_job(&self, workspace_id: &str, request: &CreateJobRequest) -> Result<Job> {
            self.created.lock().unwrap().push(request.clone());
            self.action_job(workspace_id)
        }

        async fn cancel_job(&self, job_id: &str) -> Result<Job> {
            self.cancel_count.fetch_add(1, Ordering::SeqCst);
            self.action_job(job_id)
        }

        async fn retry_job(&self, job_id: &str) -> Result<Job> {
            self.retry_count.fetch_add(1, Ordering::SeqCst);
            self.action_job(job_id)
        }

        async fn job_stats(&self, job_id: &str) -> Result<JobStats> {
            self.stats
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AppError::NotFound(format!("stats for job {}", job_id)))
        }

        async fn list_items(
            &self,
            _job_id: &str,
            status: Option<JobItemStatus>,
        ) -> Result<Vec<JobItem>> {
            let items = self.items.lock().unwrap().clone();
            Ok(items
                .into_iter()
                .filter(|i| status.map_or(true, |s| i.status == s))
                .collect())
        }

        async fn download(&self, path: &str) -> Result<Payload> {
            self.download_count.fetch_add(1, Ordering::SeqCst);
            self.downloaded_paths.lock().unwrap().push(path.to_string());
            self.payload
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AppError::NotFound(format!("no payload at {}", path)))
        }
    }
}
