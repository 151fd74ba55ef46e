//! # Meipian Docx
//!
//! Batch converter that downloads articles from meipian.cn and renders each
//! one into a formatted Word (`.docx`) document, text, images and video
//! links included.
//!
//! ## Usage
//!
//! ```sh
//! meipian_docx -t task.txt -o output -w 4
//! ```
//!
//! ## Architecture
//!
//! 1. **Tasks**: Read the link file, drop invalid and duplicate lines, deal
//!    the rest round-robin to the workers
//! 2. **Fetching**: Download the article page and pull the embedded
//!    `ARTICLE_DETAIL` record out of its scripts
//! 3. **Rendering**: Map content blocks to styled paragraphs and images
//! 4. **Output**: Download the images and write `{output}/{title}.docx`
//!
//! Workers run concurrently; the articles of one worker run in order.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod document;
mod docx;
mod error;
mod fetch;
mod models;
mod render;
mod runner;
mod scrapers;
mod tasks;
mod utils;

use cli::Cli;
use config::Settings;
use docx::DocxWriter;
use fetch::HttpFetcher;
use runner::{PipelineContext, WorkerOutcome};
use utils::{ensure_writable_dir, truncate_for_log};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "meipian_docx starting up");

    let args = Cli::parse();
    let settings = Settings::load(&args).await?;
    debug!(?settings, "Resolved settings");

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&settings.output_dir).await {
        error!(
            path = %settings.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Tasks ----
    let tasks = match tasks::load_tasks(&settings.task_file).await {
        Ok(tasks) => tasks,
        Err(e) => {
            error!(path = %settings.task_file.display(), error = %e, "Cannot read task file");
            return Err(e.into());
        }
    };
    if tasks.urls.is_empty() {
        warn!(path = %settings.task_file.display(), "No valid links in task file; nothing to do");
        return Ok(());
    }
    info!(
        links = tasks.urls.len(),
        duplicates = tasks.duplicates(),
        skipped = tasks.skipped.len(),
        "Task list ready"
    );

    let partition = tasks::partition(tasks.urls, settings.workers);
    info!(
        requested = partition.requested_workers,
        workers = partition.effective_workers,
        "Starting workers"
    );

    // ---- Run ----
    let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout)?;
    let ctx = Arc::new(PipelineContext {
        fetcher: Arc::new(fetcher),
        writer: Arc::new(DocxWriter),
        output_dir: settings.output_dir.clone(),
        dump_dir: settings.dump_dir.clone(),
        policy: settings.policy,
    });
    let summary = runner::run(partition.batches, ctx).await;

    for outcome in &summary.outcomes {
        match outcome {
            WorkerOutcome::Finished(report) => {
                for failure in &report.failures {
                    warn!(
                        worker = report.worker,
                        url = %failure.url,
                        error = %truncate_for_log(&failure.error.to_string(), 300),
                        "Not converted"
                    );
                }
                for url in &report.abandoned {
                    warn!(worker = report.worker, %url, "Not attempted");
                }
            }
            WorkerOutcome::Crashed { worker, reason } => {
                error!(worker, %reason, "Worker crashed");
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        saved = summary.saved(),
        failed = summary.failed(),
        abandoned = summary.abandoned(),
        clean = summary.is_clean(),
        "Execution complete"
    );

    Ok(())
}
