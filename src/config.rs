//! Run settings.
//!
//! Values are taken from the command line (or its environment variables)
//! first, then from the optional YAML settings file, then from built-in
//! defaults.
//!
//! ```yaml
//! task_file: task.txt
//! output_dir: output
//! workers: 4
//! user_agent: "Mozilla/5.0 ..."
//! timeout_secs: 30
//! keep_going: false
//! dump_dir: debug
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::cli::Cli;
use crate::fetch::DEFAULT_USER_AGENT;
use crate::runner::FailurePolicy;

pub const DEFAULT_TASK_FILE: &str = "task.txt";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_WORKERS: usize = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Contents of the YAML settings file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub task_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
    pub keep_going: Option<bool>,
    pub dump_dir: Option<PathBuf>,
}

/// Fully resolved settings of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub task_file: PathBuf,
    pub output_dir: PathBuf,
    pub workers: usize,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub policy: FailurePolicy,
    pub dump_dir: Option<PathBuf>,
}

impl FileSettings {
    pub fn from_yaml(path: &Path, yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let settings = Self::from_yaml(path, &yaml)?;
        debug!(?settings, "Loaded settings file");
        Ok(settings)
    }
}

impl Settings {
    /// Merge command-line values over file values over defaults.
    pub fn resolve(cli: &Cli, file: FileSettings) -> Result<Self, ConfigError> {
        let workers = match cli.workers {
            Some(w) => usize::from(w),
            None => file.workers.unwrap_or(DEFAULT_WORKERS),
        };
        if workers == 0 {
            return Err(ConfigError::Invalid {
                key: "workers",
                reason: "must be at least 1".to_string(),
            });
        }

        let keep_going = cli.keep_going || file.keep_going.unwrap_or(false);

        Ok(Self {
            task_file: cli
                .task_file
                .clone()
                .or(file.task_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TASK_FILE)),
            output_dir: cli
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            workers,
            user_agent: cli
                .user_agent
                .clone()
                .or(file.user_agent)
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout: cli
                .timeout_secs
                .or(file.timeout_secs)
                .map(Duration::from_secs),
            policy: if keep_going {
                FailurePolicy::SkipArticle
            } else {
                FailurePolicy::AbortBatch
            },
            dump_dir: cli.dump_dir.clone().or(file.dump_dir),
        })
    }

    /// Resolve settings for `cli`, reading its settings file if one was given.
    pub async fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileSettings::load(path).await?,
            None => FileSettings::default(),
        };
        Self::resolve(cli, file)
    }
}
