//! Command-line interface definitions.
//!
//! Every option can also come from an environment variable or, for values
//! left unset, from the YAML file given with `--config` (see
//! [`crate::config`]).

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Read task.txt, write to ./output with one worker
/// meipian_docx
///
/// # Four workers, keep going past failed articles
/// meipian_docx -t links.txt -o ./docs -w 4 --keep-going
///
/// # Defaults from a settings file
/// meipian_docx -c settings.yaml
/// ```
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Text file with one article URL per line [default: task.txt]
    #[arg(short, long, env = "TASK_FILE")]
    pub task_file: Option<PathBuf>,

    /// Directory the documents are written to [default: output]
    #[arg(short, long, env = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of concurrent workers [default: 1]
    #[arg(short, long, env = "WORKERS", value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,

    /// User-Agent header sent with every request
    #[arg(long, env = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Per-request HTTP timeout in seconds (no timeout when unset)
    #[arg(long, env = "HTTP_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Continue with the next URL of a batch after an article fails
    #[arg(long)]
    pub keep_going: bool,

    /// Save the fetched HTML and extracted JSON of each article here
    #[arg(long, env = "DUMP_DIR")]
    pub dump_dir: Option<PathBuf>,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
