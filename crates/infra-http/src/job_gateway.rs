// HTTP JobGateway Implementation

use crate::client::{build_client, endpoint_url, HttpGatewayConfig};
use crate::error::{map_reqwest_error, map_status};
use async_trait::async_trait;
use docbatch_core::domain::{
    CreateJobRequest, Job, JobItem, JobItemStatus, JobKey, JobStats, JobStatus, Output, Session,
};
use docbatch_core::error::{AppError, Result};
use docbatch_core::port::{JobGateway, Payload};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Query parameter the backend reads for status filters
const STATUS_FILTER: &str = "status_filter";

/// JobGateway backed by the REST API
pub struct HttpJobGateway {
    client: reqwest::Client,
    config: HttpGatewayConfig,
    base: Url,
    session: Session,
}

impl HttpJobGateway {
    /// Create a gateway speaking as `session`
    pub fn new(config: HttpGatewayConfig, session: Session) -> Result<Self> {
        let client = build_client(&config)?;
        let base = config.parsed_base()?;
        Ok(Self {
            client,
            config,
            base,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.request_url(method, endpoint_url(&self.base, segments))
    }

    fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(method = %method, url = %url, "HTTP request");

        let builder = self.client.request(method, url);
        match self.session.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn list_jobs_request(&self, workspace_id: &str, status: Option<JobStatus>) -> RequestBuilder {
        let builder = self.request(Method::GET, &["workspaces", workspace_id, "jobs"]);
        match status {
            Some(status) => builder.query(&[(STATUS_FILTER, status.as_str())]),
            None => builder,
        }
    }

    fn list_items_request(&self, job_id: &str, status: Option<JobItemStatus>) -> RequestBuilder {
        let builder = self.request(Method::GET, &["jobs", job_id, "items"]);
        match status {
            Some(status) => builder.query(&[(STATUS_FILTER, status.as_str())]),
            None => builder,
        }
    }

    /// Send and turn any non-2xx response into a typed error
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        // An unreadable body falls back to the canonical reason
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(status = status.as_u16(), url = %url, error = %e, "Failed to read error body");
                String::new()
            }
        };
        let err = map_status(status, &body);
        warn!(status = status.as_u16(), url = %url, error = %err, "HTTP request failed");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        response.json::<T>().await.map_err(map_reqwest_error)
    }
}

#[async_trait]
impl JobGateway for HttpJobGateway {
    async fn get_job(&self, key: &JobKey) -> Result<Job> {
        self.send_json(self.request(
            Method::GET,
            &["workspaces", key.workspace_id.as_str(), "jobs", key.job_id.as_str()],
        ))
        .await
    }

    async fn list_jobs(&self, workspace_id: &str, status: Option<JobStatus>) -> Result<Vec<Job>> {
        self.send_json(self.list_jobs_request(workspace_id, status))
            .await
    }

    async fn list_outputs(&self, key: &JobKey) -> Result<Vec<Output>> {
        self.send_json(self.request(
            Method::GET,
            &["workspaces", key.workspace_id.as_str(), "jobs", key.job_id.as_str(), "outputs"],
        ))
        .await
    }

    async fn create_job(&self, workspace_id: &str, request: &CreateJobRequest) -> Result<Job> {
        let builder = self
            .request(Method::POST, &["workspaces", workspace_id, "jobs"])
            .json(request);
        self.send_json(builder).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<Job> {
        self.send_json(self.request(Method::POST, &["jobs", job_id, "cancel"]))
            .await
    }

    async fn retry_job(&self, job_id: &str) -> Result<Job> {
        self.send_json(self.request(Method::POST, &["jobs", job_id, "retry"]))
            .await
    }

    async fn job_stats(&self, job_id: &str) -> Result<JobStats> {
        self.send_json(self.request(Method::GET, &["jobs", job_id, "stats"]))
            .await
    }

    async fn list_items(&self, job_id: &str, status: Option<JobItemStatus>) -> Result<Vec<JobItem>> {
        self.send_json(self.list_items_request(job_id, status))
            .await
    }

    async fn download(&self, path: &str) -> Result<Payload> {
        // Download paths arrive with their ids already encoded
        let url = Url::parse(&self.config.endpoint(path))
            .map_err(|e| AppError::Config(format!("invalid download path {}: {}", path, e)))?;
        let response = self.send(self.request_url(Method::GET, url)).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(Payload {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
