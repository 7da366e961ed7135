// Job Domain Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job ID (opaque, server-assigned)
pub type JobId = String;

/// Workspace identifier
pub type WorkspaceId = String;

/// Output identifier
pub type OutputId = String;

/// Address of a job on the workspace-scoped endpoints
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub workspace_id: WorkspaceId,
    pub job_id: JobId,
}

impl JobKey {
    pub fn new(workspace_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            job_id: job_id.into(),
        }
    }
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.workspace_id, self.job_id)
    }
}

/// Job Status as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// No further automatic transition happens from a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn accepts_cancel(self) -> bool {
        matches!(
            self,
            JobStatus::Pending | JobStatus::Queued | JobStatus::Processing
        )
    }

    pub fn accepts_retry(self) -> bool {
        self == JobStatus::Failed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// Generation Mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// One document per data row, bundled as a ZIP
    PerRow,
    /// One multi-page document for the whole datasource
    PerDatasource,
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMode::PerRow => write!(f, "per_row"),
            GenerationMode::PerDatasource => write!(f, "per_datasource"),
        }
    }
}

impl std::str::FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_row" | "per-row" => Ok(GenerationMode::PerRow),
            "per_datasource" | "per-datasource" => Ok(GenerationMode::PerDatasource),
            other => Err(format!("unknown generation mode: {}", other)),
        }
    }
}

fn default_priority() -> i32 {
    5
}

fn default_output_format() -> String {
    "pdf".to_string()
}

/// Job Entity (client-observed projection of the server row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub workspace_id: WorkspaceId,
    pub template_id: String,
    pub datasource_id: String,

    pub status: JobStatus,
    pub generation_mode: GenerationMode,

    // Aggregate counters; may be transiently inconsistent, see progress.rs
    pub total_items: i64,
    pub completed_items: i64,
    pub failed_items: i64,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Job {
    pub fn key(&self) -> JobKey {
        JobKey::new(self.workspace_id.clone(), self.id.clone())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// First 8 characters of the id, used in download file names
    pub fn short_id(&self) -> String {
        self.id.chars().take(8).collect()
    }

    /// True when present timestamps are non-decreasing
    pub fn timestamps_ordered(&self) -> bool {
        let started_ok = self.started_at.map_or(true, |s| s >= self.created_at);
        let completed_ok = match (self.started_at, self.completed_at) {
            (Some(s), Some(c)) => c >= s,
            (None, Some(c)) => c >= self.created_at,
            _ => true,
        };
        started_ok && completed_ok
    }
}

/// Output Status (one generated row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl OutputStatus {
    /// Settled outputs will not change without a retry
    pub fn is_settled(self) -> bool {
        matches!(self, OutputStatus::Completed | OutputStatus::Failed)
    }
}

impl std::fmt::Display for OutputStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputStatus::Pending => write!(f, "pending"),
            OutputStatus::Processing => write!(f, "processing"),
            OutputStatus::Completed => write!(f, "completed"),
            OutputStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Output Entity (only meaningful for per_row jobs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub id: OutputId,
    pub row_index: u32,
    pub status: OutputStatus,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Status of one row of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl JobItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobItemStatus::Pending => "pending",
            JobItemStatus::Processing => "processing",
            JobItemStatus::Completed => "completed",
            JobItemStatus::Failed => "failed",
            JobItemStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for JobItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(JobItemStatus::Pending),
            "processing" => Ok(JobItemStatus::Processing),
            "completed" => Ok(JobItemStatus::Completed),
            "failed" => Ok(JobItemStatus::Failed),
            "skipped" => Ok(JobItemStatus::Skipped),
            other => Err(format!("unknown item status: {}", other)),
        }
    }
}

/// One row of a job, as listed by `GET /jobs/{id}/items`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobItem {
    pub id: String,
    pub job_id: JobId,
    pub row_index: u32,
    pub status: JobItemStatus,
    #[serde(default)]
    pub output_url: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Body of `POST /workspaces/{ws}/jobs`
#[derive(Debug, Clone, Serialize)]
pub struct CreateJobRequest {
    pub template_id: String,
    pub datasource_id: String,
    pub generation_mode: GenerationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// Allowed priority range accepted by the server
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i32> = 1..=10;

impl CreateJobRequest {
    pub fn new(
        template_id: impl Into<String>,
        datasource_id: impl Into<String>,
        generation_mode: GenerationMode,
    ) -> Self {
        Self {
            template_id: template_id.into(),
            datasource_id: datasource_id.into(),
            generation_mode,
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Client-side checks before the request leaves the process
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.template_id.trim().is_empty() {
            return Err(crate::error::AppError::Validation(
                "template_id cannot be empty".to_string(),
            ));
        }
        if self.datasource_id.trim().is_empty() {
            return Err(crate::error::AppError::Validation(
                "datasource_id cannot be empty".to_string(),
            ));
        }
        if let Some(priority) = self.priority {
            if !PRIORITY_RANGE.contains(&priority) {
                return Err(crate::error::AppError::Validation(format!(
                    "priority {} out of range ({}..={})",
                    priority,
                    PRIORITY_RANGE.start(),
                    PRIORITY_RANGE.end()
                )));
            }
        }
        Ok(())
    }
}

/// Response of `GET /jobs/{id}/stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    pub job_id: JobId,
    pub status: JobStatus,
    pub total_items: i64,
    #[serde(default)]
    pub status_breakdown: std::collections::BTreeMap<String, i64>,
    pub progress_percent: f64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Test fixtures shared by unit and integration tests
pub mod fixtures {
    use super::*;
    use chrono::TimeZone;

    /// Build a job with fixed timestamps and the given status and counters
    pub fn job(id: &str, status: JobStatus, total: i64, completed: i64, failed: i64) -> Job {
        let created_at = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_default();
        Job {
            id: id.to_string(),
            workspace_id: "ws-1".to_string(),
            template_id: "tpl-1".to_string(),
            datasource_id: "ds-1".to_string(),
            status,
            generation_mode: GenerationMode::PerRow,
            total_items: total,
            completed_items: completed,
            failed_items: failed,
            created_at,
            started_at: None,
            completed_at: None,
            priority: 5,
            output_format: "pdf".to_string(),
            error_message: None,
        }
    }

    pub fn item(job_id: &str, row_index: u32, status: JobItemStatus) -> JobItem {
        JobItem {
            id: format!("{}-item-{}", job_id, row_index),
            job_id: job_id.to_string(),
            row_index,
            status,
            output_url: None,
            error_message: (status == JobItemStatus::Failed)
                .then(|| format!("row {}: missing field", row_index)),
            retry_count: 0,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn output(id: &str, row_index: u32, status: OutputStatus) -> Output {
        Output {
            id: id.to_string(),
            row_index,
            status,
            file_path: (status == OutputStatus::Completed)
                .then(|| format!("outputs/{}.pdf", id)),
            error_message: (status == OutputStatus::Failed).then(|| "render failed".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_classification() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());

        assert!(JobStatus::Pending.accepts_cancel());
        assert!(JobStatus::Queued.accepts_cancel());
        assert!(JobStatus::Processing.accepts_cancel());
        assert!(!JobStatus::Completed.accepts_cancel());

        assert!(JobStatus::Failed.accepts_retry());
        assert!(!JobStatus::Completed.accepts_retry());
    }

    #[test]
    fn test_job_deserializes_server_payload() {
        let job: Job = serde_json::from_value(json!({
            "id": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "workspace_id": "ws-1",
            "template_id": "tpl-1",
            "datasource_id": "ds-1",
            "output_format": "pdf",
            "generation_mode": "per_datasource",
            "status": "processing",
            "priority": 5,
            "total_items": 12,
            "completed_items": 4,
            "failed_items": 1,
            "created_at": "2024-05-01T12:00:00Z",
            "started_at": "2024-05-01T12:00:03Z",
            "completed_at": null,
            "unknown_field": true
        }))
        .unwrap();

        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.generation_mode, GenerationMode::PerDatasource);
        assert_eq!(job.short_id(), "0f8fad5b");
        assert!(job.timestamps_ordered());
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_job_optional_fields_default() {
        let job: Job = serde_json::from_value(json!({
            "id": "abc",
            "workspace_id": "ws",
            "template_id": "t",
            "datasource_id": "d",
            "generation_mode": "per_row",
            "status": "pending",
            "total_items": 0,
            "completed_items": 0,
            "failed_items": 0,
            "created_at": "2024-05-01T12:00:00Z",
            "started_at": null,
            "completed_at": null
        }))
        .unwrap();

        assert_eq!(job.priority, 5);
        assert_eq!(job.output_format, "pdf");
        assert_eq!(job.short_id(), "abc");
    }

    #[test]
    fn test_timestamps_out_of_order() {
        let mut job = fixtures::job("j", JobStatus::Completed, 1, 1, 0);
        job.started_at = Some(job.created_at + chrono::Duration::seconds(10));
        job.completed_at = Some(job.created_at + chrono::Duration::seconds(5));
        assert!(!job.timestamps_ordered());
    }

    #[test]
    fn test_create_request_validation() {
        let ok = CreateJobRequest::new("tpl", "ds", GenerationMode::PerRow).with_priority(10);
        assert!(ok.validate().is_ok());

        let empty = CreateJobRequest::new(" ", "ds", GenerationMode::PerRow);
        assert!(empty.validate().unwrap_err().to_string().contains("template_id"));

        let bad_priority = CreateJobRequest::new("tpl", "ds", GenerationMode::PerRow).with_priority(11);
        assert!(bad_priority
            .validate()
            .unwrap_err()
            .to_string()
            .contains("out of range"));
    }

    #[test]
    fn test_create_request_wire_format() {
        let req = CreateJobRequest::new("tpl", "ds", GenerationMode::PerDatasource);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "template_id": "tpl",
                "datasource_id": "ds",
                "generation_mode": "per_datasource"
            })
        );
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Completed".parse::<JobStatus>().unwrap(), JobStatus::Completed);
        assert!("done".parse::<JobStatus>().is_err());
        assert_eq!(
            "per-row".parse::<GenerationMode>().unwrap(),
            GenerationMode::PerRow
        );
    }

    #[test]
    fn test_job_item_deserializes_server_payload() {
        let item: JobItem = serde_json::from_value(json!({
            "id": "item-1",
            "job_id": "job-1",
            "row_index": 4,
            "status": "skipped",
            "output_url": null,
            "error_message": "row skipped: empty",
            "retry_count": 2,
            "started_at": null,
            "completed_at": null
        }))
        .unwrap();

        assert_eq!(item.status, JobItemStatus::Skipped);
        assert_eq!(item.retry_count, 2);
        assert_eq!("FAILED".parse::<JobItemStatus>().unwrap(), JobItemStatus::Failed);
        assert!("done".parse::<JobItemStatus>().is_err());
    }
}
