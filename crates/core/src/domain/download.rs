// Download resolution: which artifact a completed job yields and how to name it

use super::job::{GenerationMode, Job, JobStatus};
use crate::error::{AppError, Result};
use tracing::warn;
use urlencoding::encode;

pub const PDF_MIME: &str = "application/pdf";
pub const ZIP_MIME: &str = "application/zip";
pub const CSV_MIME: &str = "text/csv";

/// Artifact kind, decided by the job's generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    /// Single combined document (per_datasource)
    Pdf,
    /// Archive of per-row documents (per_row)
    Zip,
    /// Error report listing failed rows
    Csv,
}

impl BundleKind {
    pub fn for_mode(mode: GenerationMode) -> Self {
        match mode {
            GenerationMode::PerDatasource => BundleKind::Pdf,
            GenerationMode::PerRow => BundleKind::Zip,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            BundleKind::Pdf => "pdf",
            BundleKind::Zip => "zip",
            BundleKind::Csv => "csv",
        }
    }

    pub fn default_mime(self) -> &'static str {
        match self {
            BundleKind::Pdf => PDF_MIME,
            BundleKind::Zip => ZIP_MIME,
            BundleKind::Csv => CSV_MIME,
        }
    }

    /// Whether a Content-Type header value describes this kind
    pub fn matches_content_type(self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            BundleKind::Pdf => essence == PDF_MIME,
            BundleKind::Zip => matches!(
                essence.as_str(),
                "application/zip" | "application/x-zip-compressed" | "application/x-zip"
            ),
            BundleKind::Csv => matches!(essence.as_str(), "text/csv" | "application/csv"),
        }
    }
}

/// Where and how a job bundle is downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Endpoint path, relative to the API base URL
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    pub kind: BundleKind,
}

impl DownloadTarget {
    /// Re-derive the mime type once the response header is known
    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        self.mime_type = mime_for(self.kind, content_type);
        self
    }
}

/// Downloaded payload plus the resolved naming
#[derive(Debug, Clone)]
pub struct DownloadedArtifact {
    pub target: DownloadTarget,
    pub bytes: Vec<u8>,
}

fn mime_for(kind: BundleKind, content_type: Option<&str>) -> String {
    match content_type.map(str::trim).filter(|ct| !ct.is_empty()) {
        Some(ct) if kind.matches_content_type(ct) => ct.to_string(),
        Some(ct) => {
            warn!(
                content_type = %ct,
                expected = %kind.default_mime(),
                "Content-Type disagrees with generation mode, using mode default"
            );
            kind.default_mime().to_string()
        }
        None => kind.default_mime().to_string(),
    }
}

/// Resolve the bundle download for a job.
///
/// The generation mode is the primary discriminant; the response header only
/// supplies the mime string when it agrees with the mode. Performs no I/O and
/// fails with `NotReady` unless the job is completed.
pub fn resolve_download(job: &Job, content_type: Option<&str>) -> Result<DownloadTarget> {
    if job.status != JobStatus::Completed {
        return Err(AppError::not_ready("download", job.status));
    }

    let kind = BundleKind::for_mode(job.generation_mode);
    Ok(DownloadTarget {
        url: format!("/jobs/{}/download", encode(&job.id)),
        filename: format!("documents-{}.{}", job.short_id(), kind.extension()),
        mime_type: mime_for(kind, content_type),
        kind,
    })
}

/// Resolve the download of one per-row output (always a PDF)
pub fn resolve_output_download(job: &Job, output: &super::job::Output) -> Result<DownloadTarget> {
    if output.status != super::job::OutputStatus::Completed {
        return Err(AppError::NotReady(format!(
            "output {} of job {} is {}",
            output.row_index, job.id, output.status
        )));
    }

    Ok(DownloadTarget {
        url: format!(
            "/workspaces/{}/jobs/{}/outputs/{}/download",
            encode(&job.workspace_id),
            encode(&job.id),
            encode(&output.id)
        ),
        filename: format!("document-{}-{}.pdf", job.short_id(), output.row_index),
        mime_type: PDF_MIME.to_string(),
        kind: BundleKind::Pdf,
    })
}

/// Resolve the CSV error report of a job.
///
/// Only jobs that report failed items have one; the report is available
/// while the job is still running.
pub fn resolve_error_report(job: &Job) -> Result<DownloadTarget> {
    if job.failed_items <= 0 {
        return Err(AppError::NotReady(format!(
            "job {} has no failed items to report",
            job.id
        )));
    }

    Ok(DownloadTarget {
        url: format!("/jobs/{}/errors", encode(&job.id)),
        filename: format!("errors-{}.csv", job.short_id()),
        mime_type: CSV_MIME.to_string(),
        kind: BundleKind::Csv,
    })
}
