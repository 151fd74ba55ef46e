//! Small helpers shared across the pipeline.
//!
//! - String truncation for log fields
//! - File name sanitization for article titles
//! - URL slugs for debug dumps
//! - Output directory validation

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Turn an article title into a file name stem.
///
/// Characters that are not allowed in file names on common platforms are
/// replaced with `_`. Everything else, CJK text included, is kept as is.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_filename("Test"), "Test");
/// assert_eq!(sanitize_filename("a/b: c?"), "a_b_ c_");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Lowercase, hyphenated form of a URL without its scheme, used to name
/// debug dumps.
///
/// ```ignore
/// assert_eq!(slugify_url("https://www.meipian.cn/4rzrnq2b"), "www-meipian-cn-4rzrnq2b");
/// ```
pub fn slugify_url(url: &str) -> String {
    let without_scheme = match Url::parse(url) {
        Ok(parsed) => {
            let mut s = format!("{}{}", parsed.host_str().unwrap_or(""), parsed.path());
            if let Some(q) = parsed.query() {
                s.push('-');
                s.push_str(q);
            }
            s
        }
        Err(_) => url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(url)
            .to_string(),
    };
    let slug = without_scheme
        .to_lowercase()
        .replace(|c: char| !c.is_ascii_alphanumeric(), "-");
    slug.trim_matches('-').to_string()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // each CJK char is 3 bytes; cutting at 4 must back off to 3
        let result = truncate_for_log("美篇文章", 4);
        assert!(result.starts_with("美…"));
        assert!(result.contains("(+9 bytes)"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Test"), "Test");
        assert_eq!(sanitize_filename("春天的故事"), "春天的故事");
        assert_eq!(sanitize_filename("a/b: c?"), "a_b_ c_");
        assert_eq!(sanitize_filename("  spaced  "), "spaced");
        assert_eq!(sanitize_filename("line\nbreak"), "line_break");
        assert_eq!(sanitize_filename(""), "untitled");
        assert_eq!(sanitize_filename("..."), "untitled");
    }

    #[test]
    fn test_slugify_url() {
        assert_eq!(
            slugify_url("https://www.meipian.cn/4rzrnq2b"),
            "www-meipian-cn-4rzrnq2b"
        );
        assert_eq!(slugify_url("http://A/B?c=1"), "a-b-c-1");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested/output");
        ensure_writable_dir(&target).await.unwrap();
        assert!(target.is_dir());
    }
}
