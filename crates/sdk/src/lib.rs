//! Docbatch SDK - Rust Client Library
//!
//! Tracks document-generation jobs: create, poll until done, cancel, retry
//! and download the resulting bundle.
//!
//! # Example
//!
//! ```no_run
//! use docbatch_sdk::{ClientConfig, CreateJobRequest, DocbatchClient, GenerationMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DocbatchClient::connect(ClientConfig::from_env()?)?;
//!
//!     let job = client
//!         .create("workspace-1", &CreateJobRequest::new("tpl-1", "ds-1", GenerationMode::PerRow))
//!         .await?;
//!
//!     let finished = client.wait_for_completion(job.key(), |j| {
//!         println!("{}: {}%", j.status, docbatch_sdk::compute_progress(j).percent);
//!     }).await?;
//!
//!     println!("Job finished as {}", finished.status);
//!     Ok(())
//! }
//! ```

mod client;
mod config;

pub use client::DocbatchClient;
pub use config::ClientConfig;

pub use docbatch_core::application::{CachedJob, PollConfig, PollOutcome, PollSubscription};
pub use docbatch_core::domain::{
    compute_progress, resolve_download, CreateJobRequest, Discrepancy, DownloadTarget,
    DownloadedArtifact, GenerationMode, Job, JobItem, JobItemStatus, JobKey, JobStats, JobStatus,
    Output, OutputStatus, Progress, Reconciliation, Session,
};
pub use docbatch_core::error::{AppError, Result};
