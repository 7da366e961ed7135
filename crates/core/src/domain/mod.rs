// Domain Layer - Job model and pure derivations

pub mod download;
pub mod job;
pub mod progress;
pub mod reconcile;
pub mod session;

// Re-exports
pub use download::{
    resolve_download, resolve_error_report, resolve_output_download, BundleKind, DownloadTarget,
    DownloadedArtifact,
};
pub use job::{
    CreateJobRequest, GenerationMode, Job, JobId, JobItem, JobItemStatus, JobKey, JobStats,
    JobStatus, Output, OutputId, OutputStatus, WorkspaceId,
};
pub use progress::{compute_progress, Progress};
pub use reconcile::{reconcile, Discrepancy, OutputCounts, Reconciliation};
pub use session::{Identity, Session};
