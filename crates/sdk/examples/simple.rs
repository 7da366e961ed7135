//! Simple SDK Example
//!
//! Creates a generation job, follows its progress and downloads the bundle.
//!
//! # Usage
//!
//! ```bash
//! DOCBATCH_API_URL=http://127.0.0.1:8000/api/v1 \
//! DOCBATCH_TOKEN=... \
//!     cargo run --example simple -- <workspace_id> <template_id> <datasource_id>
//! ```

use docbatch_sdk::{
    compute_progress, ClientConfig, CreateJobRequest, DocbatchClient, GenerationMode, JobStatus,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(workspace), Some(template), Some(datasource)) = (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: simple <workspace_id> <template_id> <datasource_id>");
        std::process::exit(2);
    };

    println!("Docbatch SDK - Simple Example");
    println!("=============================\n");

    // 1. Connect
    let client = DocbatchClient::connect(ClientConfig::from_env()?)?;
    println!("1. Connected (guest: {})\n", client.session().is_guest());

    // 2. Create a job
    let request = CreateJobRequest::new(template, datasource, GenerationMode::PerRow).with_priority(5);
    let job = client.create(&workspace, &request).await?;
    println!("2. Created job {} ({} items)\n", job.id, job.total_items);

    // 3. Follow progress until the job settles
    println!("3. Waiting for completion...");
    let finished = client
        .wait_for_completion(job.key(), |j| {
            let p = compute_progress(j);
            println!(
                "   {:>3}% [{}] ok={} failed={} remaining={}",
                p.percent, j.status, p.successful, p.failed, p.remaining
            );
        })
        .await?;
    println!();

    if finished.status != JobStatus::Completed {
        println!("Job ended as {}; nothing to download", finished.status);
        return Ok(());
    }

    // 4. Download the bundle
    let artifact = client.download(&finished.key()).await?;
    std::fs::write(&artifact.target.filename, &artifact.bytes)?;
    println!(
        "4. Saved {} ({} bytes, {})",
        artifact.target.filename,
        artifact.bytes.len(),
        artifact.target.mime_type
    );

    Ok(())
}
