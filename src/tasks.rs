//! Task list loading and partitioning across workers.
//!
//! The task file holds one article URL per line. Lines that do not start
//! with `http://` or `https://` and exact duplicates are skipped with a
//! warning. Accepted URLs are then dealt round-robin into one
//! [`TaskBatch`] per worker.

use std::collections::HashSet;
use std::path::Path;

use itertools::Itertools;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

const ACCEPTED_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Why a task line was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Blank, or not starting with an accepted URL scheme.
    Invalid,
    /// Same string as an earlier accepted line.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line_no: usize,
    pub line: String,
    pub reason: SkipReason,
}

/// Result of reading a task list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskList {
    pub urls: Vec<String>,
    pub skipped: Vec<SkippedLine>,
}

impl TaskList {
    pub fn duplicates(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| s.reason == SkipReason::Duplicate)
            .count()
    }
}

/// The URLs assigned to one worker, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBatch {
    pub worker: usize,
    pub urls: Vec<String>,
}

/// Output of [`partition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub requested_workers: usize,
    /// Number of batches actually created.
    pub effective_workers: usize,
    pub batches: Vec<TaskBatch>,
}

/// Parse task file contents.
pub fn parse_tasks(content: &str) -> TaskList {
    let mut list = TaskList::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for (i, raw) in content.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let line_no = i + 1;

        let reason = if !ACCEPTED_SCHEMES.iter().any(|s| line.starts_with(s)) {
            warn!(line_no, %line, "Invalid link");
            SkipReason::Invalid
        } else if !seen.insert(line) {
            warn!(line_no, %line, "Duplicate link");
            SkipReason::Duplicate
        } else {
            list.urls.push(line.to_string());
            continue;
        };

        list.skipped.push(SkippedLine {
            line_no,
            line: line.to_string(),
            reason,
        });
    }

    info!(count = list.urls.len(), skipped = list.skipped.len(), "Loaded links");
    list
}

/// Read and parse the task file at `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_tasks(path: &Path) -> std::io::Result<TaskList> {
    let content = fs::read_to_string(path).await?;
    Ok(parse_tasks(&content))
}

/// Deal `urls` round-robin into at most `worker_count` batches.
///
/// URL `i` goes to batch `i % W`, where `W` is `worker_count` clamped to
/// `1..=urls.len()`. An empty list yields no batches.
pub fn partition(urls: Vec<String>, worker_count: usize) -> Partition {
    let requested_workers = worker_count;
    let mut workers = worker_count.max(1);
    if workers > urls.len() {
        warn!(
            jobs = urls.len(),
            workers,
            "Fewer tasks than workers; reducing worker count to task count"
        );
        workers = urls.len();
    }

    let mut batches: Vec<TaskBatch> = (0..workers)
        .map(|worker| TaskBatch {
            worker,
            urls: Vec::new(),
        })
        .collect();
    for (i, url) in urls.into_iter().enumerate() {
        batches[i % workers].urls.push(url);
    }

    debug!(
        workers,
        sizes = %batches.iter().map(|b| format!("[{}]", b.urls.len())).join(" "),
        "Allocated tasks to workers"
    );

    Partition {
        requested_workers,
        effective_workers: workers,
        batches,
    }
}
