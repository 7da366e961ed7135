//! Docbatch CLI - Command-line interface for document generation jobs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use docbatch_sdk::{
    compute_progress, ClientConfig, CreateJobRequest, DocbatchClient, DownloadedArtifact,
    GenerationMode, Job, JobItem, JobItemStatus, JobKey, JobStatus, Output, PollOutcome,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "docbatch")]
#[command(about = "Docbatch document generation CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL
    #[arg(long, env = "DOCBATCH_API_URL")]
    api_url: Option<String>,

    /// Access token (omit to act as a guest)
    #[arg(long, env = "DOCBATCH_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current state of a job
    Status { workspace: String, job_id: String },

    /// Poll a job until it finishes (Ctrl-C stops watching)
    Watch {
        workspace: String,
        job_id: String,

        /// Poll interval in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },

    /// List jobs in a workspace
    List {
        workspace: String,

        /// Only jobs with this status (pending, queued, processing, completed, failed, cancelled)
        #[arg(short, long)]
        status: Option<JobStatus>,
    },

    /// List per-row outputs of a job
    Outputs { workspace: String, job_id: String },

    /// List per-row items of a job
    Items {
        job_id: String,

        /// Only items with this status (pending, processing, completed, failed, skipped)
        #[arg(short, long)]
        status: Option<JobItemStatus>,
    },

    /// Download the CSV report of failed rows
    Errors {
        workspace: String,
        job_id: String,

        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Create a generation job
    Create {
        workspace: String,

        #[arg(short, long)]
        template: String,

        #[arg(short, long)]
        datasource: String,

        /// per_row or per_datasource
        #[arg(short, long, default_value = "per_row")]
        mode: GenerationMode,

        /// Priority (1-10)
        #[arg(short, long)]
        priority: Option<i32>,
    },

    /// Cancel a pending or processing job
    Cancel { workspace: String, job_id: String },

    /// Retry a failed job
    Retry { workspace: String, job_id: String },

    /// Server-side statistics for a job
    Stats { job_id: String },

    /// Compare job counters against its outputs
    Reconcile { workspace: String, job_id: String },

    /// Download the bundle of a completed job
    Download {
        workspace: String,
        job_id: String,

        /// Directory to write into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Download a single per-row document
    DownloadOutput {
        workspace: String,
        job_id: String,
        output_id: String,

        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Tabled)]
struct JobRow {
    id: String,
    status: String,
    mode: String,
    progress: String,
    total: i64,
    completed: i64,
    failed: i64,
    created: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.short_id(),
            status: job.status.to_string(),
            mode: job.generation_mode.to_string(),
            progress: format!("{}%", compute_progress(job).percent),
            total: job.total_items,
            completed: job.completed_items,
            failed: job.failed_items,
            created: job.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Tabled)]
struct OutputRow {
    row: u32,
    id: String,
    status: String,
    file: String,
    error: String,
}

impl From<&Output> for OutputRow {
    fn from(output: &Output) -> Self {
        Self {
            row: output.row_index,
            id: output.id.clone(),
            status: output.status.to_string(),
            file: output.file_path.clone().unwrap_or_default(),
            error: output.error_message.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct ItemRow {
    row: u32,
    status: String,
    retries: u32,
    error: String,
}

impl From<&JobItem> for ItemRow {
    fn from(item: &JobItem) -> Self {
        Self {
            row: item.row_index,
            status: item.status.to_string(),
            retries: item.retry_count,
            error: item.error_message.clone().unwrap_or_default(),
        }
    }
}

fn init_logging() {
    let log_format = std::env::var("DOCBATCH_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docbatch=info"));

    // Logs go to stderr so command output stays pipeable
    match log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
    }
}

fn colored_status(status: JobStatus) -> colored::ColoredString {
    match status {
        JobStatus::Completed => status.as_str().green(),
        JobStatus::Failed => status.as_str().red(),
        JobStatus::Cancelled => status.as_str().yellow(),
        JobStatus::Processing => status.as_str().cyan(),
        JobStatus::Pending | JobStatus::Queued => status.as_str().normal(),
    }
}

fn print_job(job: &Job) {
    println!("{}", Table::new([JobRow::from(job)]));
    if let Some(message) = &job.error_message {
        println!("  {} {}", "Error:".bold(), message.red());
    }
}

fn save(artifact: &DownloadedArtifact, dir: &Path) -> Result<()> {
    let path = dir.join(&artifact.target.filename);
    std::fs::write(&path, &artifact.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "{} {} ({} bytes, {})",
        "✓ Saved".green().bold(),
        path.display(),
        artifact.bytes.len(),
        artifact.target.mime_type
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("Invalid configuration")?;
    if let Some(url) = cli.api_url {
        config.http.base_url = url;
    }
    if let Some(token) = cli.token {
        config = config.with_token(token);
    }
    let client = DocbatchClient::connect(config)?;

    match cli.command {
        Commands::Status { workspace, job_id } => {
            let job = client.fetch(&JobKey::new(workspace, job_id)).await?;
            print_job(&job);
        }

        Commands::Watch {
            workspace,
            job_id,
            interval_ms,
        } => {
            let key = JobKey::new(workspace, job_id);
            let on_update = |job: &Job| {
                let p = compute_progress(job);
                println!(
                    "{:>3}% {} ok={} failed={} remaining={}",
                    p.percent,
                    colored_status(job.status),
                    p.successful,
                    p.failed,
                    p.remaining
                );
            };
            let subscription = match interval_ms {
                Some(ms) => client.poll(key, Duration::from_millis(ms), on_update),
                None => client.manager().watch(key, on_update),
            };

            // Dropping the join future drops the subscription, which cancels it
            tokio::select! {
                outcome = subscription.join() => match outcome? {
                    PollOutcome::Terminal(job) => {
                        println!();
                        println!("{} {}", "Finished:".bold(), colored_status(job.status));
                    }
                    PollOutcome::Cancelled => println!("{}", "Stopped".yellow()),
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping watch");
                    println!("{}", "Stopped watching".yellow());
                }
            }
        }

        Commands::List { workspace, status } => {
            let jobs = client.list(&workspace, status).await?;
            if jobs.is_empty() {
                println!("{}", "No jobs".yellow());
            } else {
                println!("{}", Table::new(jobs.iter().map(JobRow::from)));
            }
        }

        Commands::Outputs { workspace, job_id } => {
            let outputs = client.outputs(&JobKey::new(workspace, job_id)).await?;
            if outputs.is_empty() {
                println!("{}", "No outputs".yellow());
            } else {
                println!("{}", Table::new(outputs.iter().map(OutputRow::from)));
            }
        }

        Commands::Items { job_id, status } => {
            let items = client.items(&job_id, status).await?;
            if items.is_empty() {
                println!("{}", "No items".yellow());
            } else {
                println!("{}", Table::new(items.iter().map(ItemRow::from)));
            }
        }

        Commands::Errors {
            workspace,
            job_id,
            out,
        } => {
            let artifact = client.error_report(&JobKey::new(workspace, job_id)).await?;
            save(&artifact, &out)?;
        }

        Commands::Create {
            workspace,
            template,
            datasource,
            mode,
            priority,
        } => {
            let mut request = CreateJobRequest::new(template, datasource, mode);
            if let Some(priority) = priority {
                request = request.with_priority(priority);
            }
            let job = client.create(&workspace, &request).await?;

            println!("{}", "✓ Job created".green().bold());
            println!();
            print_job(&job);
            println!("  {} {}", "ID:".bold(), job.id);
        }

        Commands::Cancel { workspace, job_id } => {
            let job = client.cancel(&JobKey::new(workspace, job_id)).await?;
            println!(
                "{} (server reports {})",
                format!("✓ Cancel requested for {}", job.id).green().bold(),
                colored_status(job.status)
            );
        }

        Commands::Retry { workspace, job_id } => {
            let job = client.retry(&JobKey::new(workspace, job_id)).await?;
            println!(
                "{} (server reports {})",
                format!("✓ Retry requested for {}", job.id).green().bold(),
                colored_status(job.status)
            );
        }

        Commands::Stats { job_id } => {
            let stats = client.stats(&job_id).await?;
            println!("{}", format!("Job {}", stats.job_id).cyan().bold());
            println!();
            println!("  {} {}", "Status:".bold(), colored_status(stats.status));
            println!("  {} {}", "Total:".bold(), stats.total_items);
            println!("  {} {:.1}%", "Progress:".bold(), stats.progress_percent);
            for (status, count) in &stats.status_breakdown {
                println!("  {} {}", format!("{}:", status).bold(), count);
            }
        }

        Commands::Reconcile { workspace, job_id } => {
            let (job, report) = client.reconcile(&JobKey::new(workspace, job_id)).await?;
            print_job(&job);
            println!(
                "  {} pending={} processing={} completed={} failed={}",
                "Outputs:".bold(),
                report.counts.pending,
                report.counts.processing,
                report.counts.completed,
                report.counts.failed
            );
            if report.is_consistent() {
                println!("{}", "✓ Counters agree with outputs".green());
            } else {
                for discrepancy in &report.discrepancies {
                    println!("  {} {:?}", "⚠".yellow(), discrepancy);
                }
            }
        }

        Commands::Download {
            workspace,
            job_id,
            out,
        } => {
            let artifact = client.download(&JobKey::new(workspace, job_id)).await?;
            save(&artifact, &out)?;
        }

        Commands::DownloadOutput {
            workspace,
            job_id,
            output_id,
            out,
        } => {
            let artifact = client
                .download_output(&JobKey::new(workspace, job_id), &output_id)
                .await?;
            save(&artifact, &out)?;
        }
    }

    Ok(())
}
