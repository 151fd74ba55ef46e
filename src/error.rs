//! Error types for every stage of the article pipeline.
//!
//! Each stage owns a small error enum so callers can tell a network failure
//! from a malformed page or an incomplete article record. All of them roll up
//! into [`PipelineError`], which is what a worker sees when an article fails.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while fetching a page or an image.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}: {body}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Response body, kept for diagnosis.
        body: String,
    },

    /// DNS, connection, TLS or timeout failure.
    #[error("network error fetching {url}: {source}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Creates a transport error from a reqwest error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }
}

/// Errors raised while locating the article payload inside a page.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No script on the page assigns the article variable.
    #[error("no script assigning `{variable}` found in page")]
    ScriptNotFound {
        /// Name of the JavaScript variable that was looked for.
        variable: &'static str,
    },

    /// The assigned value is not valid JSON.
    #[error("malformed article JSON: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
    },
}

/// A required field is absent from the article record.
#[derive(Debug, Error)]
#[error("missing field `{field}` in record {record}")]
pub struct MissingFieldError {
    /// Dotted path of the field, e.g. `author.nickname`.
    pub field: String,
    /// Truncated JSON of the record the field was expected in.
    pub record: String,
}

/// Errors raised while reading the article record.
#[derive(Debug, Error)]
pub enum ArticleError {
    #[error(transparent)]
    Missing(#[from] MissingFieldError),

    /// The field exists but holds a value of the wrong shape.
    #[error("invalid value for `{field}`: {value}")]
    InvalidField {
        /// Dotted path of the field.
        field: String,
        /// Truncated JSON of the offending value.
        value: String,
    },
}

/// A text/image content block that carries neither text nor an image.
///
/// Recoverable: reported and skipped, rendering of the article continues.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("content block #{index} has neither text nor image: {record}")]
pub struct AnomalousBlockError {
    /// Position of the block within the article content.
    pub index: usize,
    /// Truncated JSON of the block.
    pub record: String,
}

/// Errors raised while serializing a document package.
#[derive(Debug, Error)]
pub enum DocxError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml error: {0}")]
    Xml(String),

    #[error("IO error writing document part: {0}")]
    Io(#[from] std::io::Error),

    /// The document references an image that was never downloaded.
    #[error("image {url} was not provided to the writer")]
    MissingImage { url: String },

    /// The downloaded bytes are not an image format Word can embed.
    #[error("image {url} is not in a supported format")]
    UnsupportedImage { url: String },
}

/// Any failure that ends the processing of a single article.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Article(#[from] ArticleError),

    #[error(transparent)]
    Document(#[from] DocxError),

    /// File system error while creating or writing the output.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Creates an IO error bound to the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<MissingFieldError> for PipelineError {
    fn from(e: MissingFieldError) -> Self {
        Self::Article(ArticleError::Missing(e))
    }
}
