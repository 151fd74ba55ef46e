//! Concurrent batch execution.
//!
//! Every [`TaskBatch`] runs on its own tokio task. Inside a worker the URLs
//! are processed one after the other: fetch, extract, render, assemble,
//! save. Workers share nothing but the immutable [`PipelineContext`].
//!
//! The supervisor joins all workers and collects one [`WorkerOutcome`] per
//! worker; a panicking worker is recorded as crashed and does not affect its
//! siblings. Completion is announced once, after the last worker is joined.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::fs;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::docx::DocumentWriter;
use crate::document::{assemble, save_document};
use crate::error::PipelineError;
use crate::fetch::Fetcher;
use crate::models::Article;
use crate::render::render;
use crate::scrapers::meipian::extract_article;
use crate::tasks::TaskBatch;
use crate::utils::slugify_url;

/// What a worker does after an article fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Give up on the rest of the batch.
    #[default]
    AbortBatch,
    /// Log the failure and move on to the next URL.
    SkipArticle,
}

/// Shared, read-only state of a run.
pub struct PipelineContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub writer: Arc<dyn DocumentWriter>,
    pub output_dir: PathBuf,
    /// Where to keep the fetched HTML and extracted JSON, if anywhere.
    pub dump_dir: Option<PathBuf>,
    pub policy: FailurePolicy,
}

#[derive(Debug)]
pub struct ArticleFailure {
    pub url: String,
    pub error: PipelineError,
}

/// What one worker got done.
#[derive(Debug, Default)]
pub struct WorkerReport {
    pub worker: usize,
    pub saved: Vec<PathBuf>,
    pub failures: Vec<ArticleFailure>,
    /// URLs never attempted because the batch was aborted.
    pub abandoned: Vec<String>,
}

#[derive(Debug)]
pub enum WorkerOutcome {
    Finished(WorkerReport),
    /// The worker task panicked or was cancelled.
    Crashed { worker: usize, reason: String },
}

/// Aggregate of all workers of a run.
#[derive(Debug)]
pub struct RunSummary {
    pub outcomes: Vec<WorkerOutcome>,
    pub elapsed: Duration,
}

impl RunSummary {
    fn reports(&self) -> impl Iterator<Item = &WorkerReport> {
        self.outcomes.iter().filter_map(|o| match o {
            WorkerOutcome::Finished(r) => Some(r),
            WorkerOutcome::Crashed { .. } => None,
        })
    }

    pub fn saved(&self) -> usize {
        self.reports().map(|r| r.saved.len()).sum()
    }

    pub fn failed(&self) -> usize {
        self.reports().map(|r| r.failures.len()).sum()
    }

    pub fn abandoned(&self) -> usize {
        self.reports().map(|r| r.abandoned.len()).sum()
    }

    pub fn crashed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, WorkerOutcome::Crashed { .. }))
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && self.abandoned() == 0 && self.crashed() == 0
    }
}

/// Run every batch on its own task and wait for all of them.
pub async fn run(batches: Vec<TaskBatch>, ctx: Arc<PipelineContext>) -> RunSummary {
    let t0 = Instant::now();
    let workers: Vec<usize> = batches.iter().map(|b| b.worker).collect();

    let handles: Vec<_> = batches
        .into_iter()
        .map(|batch| {
            let ctx = Arc::clone(&ctx);
            let span = info_span!("worker", id = batch.worker);
            tokio::spawn(process_batch(batch, ctx).instrument(span))
        })
        .collect();
    info!(workers = handles.len(), "Workers started");

    let outcomes: Vec<WorkerOutcome> = join_all(handles)
        .await
        .into_iter()
        .zip(workers)
        .map(|(joined, worker)| match joined {
            Ok(report) => WorkerOutcome::Finished(report),
            Err(e) => {
                error!(worker, error = %e, "Worker crashed");
                WorkerOutcome::Crashed {
                    worker,
                    reason: e.to_string(),
                }
            }
        })
        .collect();

    let summary = RunSummary {
        outcomes,
        elapsed: t0.elapsed(),
    };
    info!(
        workers = summary.outcomes.len(),
        saved = summary.saved(),
        failed = summary.failed(),
        abandoned = summary.abandoned(),
        crashed = summary.crashed(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "All workers finished"
    );
    summary
}

/// Process a batch sequentially, honoring the failure policy.
pub async fn process_batch(batch: TaskBatch, ctx: Arc<PipelineContext>) -> WorkerReport {
    let mut report = WorkerReport {
        worker: batch.worker,
        ..Default::default()
    };
    let total = batch.urls.len();
    let mut urls = batch.urls.into_iter();

    while let Some(url) = urls.next() {
        match process_article(&url, &ctx).await {
            Ok(path) => report.saved.push(path),
            Err(e) => {
                let status = match &e {
                    PipelineError::Fetch(f) => f.status(),
                    _ => None,
                };
                error!(%url, ?status, error = %e, "Article failed");
                report.failures.push(ArticleFailure { url, error: e });
                if ctx.policy == FailurePolicy::AbortBatch {
                    report.abandoned = urls.by_ref().collect();
                    if !report.abandoned.is_empty() {
                        warn!(
                            abandoned = report.abandoned.len(),
                            "Aborting the rest of the batch"
                        );
                    }
                    break;
                }
            }
        }
    }

    info!(
        total,
        saved = report.saved.len(),
        failed = report.failures.len(),
        abandoned = report.abandoned.len(),
        "Worker done"
    );
    report
}

/// Fetch one article and write it out as a document.
pub async fn process_article(url: &str, ctx: &PipelineContext) -> Result<PathBuf, PipelineError> {
    info!(%url, "Processing article");
    let html = ctx.fetcher.fetch_text(url).await?;
    dump(ctx, url, "html", html.as_bytes()).await;

    let record = extract_article(&html)?;
    if ctx.dump_dir.is_some() {
        if let Ok(pretty) = serde_json::to_vec_pretty(&record) {
            dump(ctx, url, "json", &pretty).await;
        }
    }

    let article = Article::from_record(record);
    match article.author() {
        Ok(author) => debug!(?author, "Author profile"),
        Err(e) => debug!(error = %e, "Author profile incomplete"),
    }
    debug!(
        cover = ?article.cover_image_url().ok(),
        modified = ?article.last_modify_time().ok(),
        music = ?article.music_desc().ok().flatten(),
        music_url = ?article.music_url().ok().flatten(),
        "Article metadata"
    );

    let rendering = render(&article)?;
    debug!(%url, elements = rendering.elements().count(), "Rendered article");
    if !rendering.anomalies.is_empty() {
        warn!(%url, anomalies = rendering.anomalies.len(), "Article has empty content blocks");
    }
    let doc = assemble(&article, rendering, &ctx.output_dir)?;
    save_document(&doc, ctx.fetcher.as_ref(), ctx.writer.as_ref()).await
}

/// Best effort copy of an intermediate artifact into the dump directory.
async fn dump(ctx: &PipelineContext, url: &str, ext: &str, bytes: &[u8]) {
    let Some(dir) = &ctx.dump_dir else {
        return;
    };
    let path = dir.join(format!("{}.{ext}", slugify_url(url)));
    let result = match fs::create_dir_all(dir).await {
        Ok(()) => fs::write(&path, bytes).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => debug!(path = %path.display(), "Dumped {ext}"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to write dump"),
    }
}
