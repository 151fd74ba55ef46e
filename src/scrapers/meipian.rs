//! meipian article page scraper.
//!
//! Article pages carry their full content as a JavaScript assignment inside
//! an inline script:
//!
//! ```text
//! <script>
//!     var ARTICLE_DETAIL = { "article": { ... }, "author": { ... } };
//!     var OTHER = ...;
//! </script>
//! ```
//!
//! The value is parsed as exactly one JSON document starting right after the
//! `=`; whatever follows it in the script is ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::ExtractionError;

/// JavaScript variable holding the article record.
pub const ARTICLE_VARIABLE: &str = "ARTICLE_DETAIL";

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"var\s+{ARTICLE_VARIABLE}\s*=\s*")).expect("static regex")
});

static SCRIPT: Lazy<Selector> = Lazy::new(|| Selector::parse("script").expect("static selector"));

/// Extract the raw article record from a page.
#[instrument(level = "debug", skip_all, fields(bytes = html.len()))]
pub fn extract_article(html: &str) -> Result<Value, ExtractionError> {
    let document = Html::parse_document(html);

    for script in document.select(&SCRIPT) {
        let body: String = script.text().collect();
        let Some(found) = ASSIGNMENT.find(&body) else {
            continue;
        };

        let mut de = serde_json::Deserializer::from_str(&body[found.end()..]);
        let value = Value::deserialize(&mut de)
            .map_err(|source| ExtractionError::MalformedJson { source })?;
        debug!(offset = found.end(), "Located article record");
        return Ok(value);
    }

    Err(ExtractionError::ScriptNotFound {
        variable: ARTICLE_VARIABLE,
    })
}
