//! Document assembly.
//!
//! Puts the title, the byline and the rendered body together with the page
//! setup and metadata, picks the output path, and hands the result to a
//! [`DocumentWriter`] once every referenced image has been downloaded.

use std::path::{Path, PathBuf};

use chrono::Datelike;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::docx::{DocumentWriter, ImageStore};
use crate::error::{ArticleError, PipelineError};
use crate::fetch::Fetcher;
use crate::models::Article;
use crate::render::style::Role;
use crate::render::{RenderedElement, Rendering, text_elements};
use crate::utils::sanitize_filename;

/// Author recorded in the document metadata.
pub const DOCUMENT_AUTHOR: &str = "Administrator";
pub const PAGE_MARGIN_CM: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMargins {
    pub top_cm: f64,
    pub bottom_cm: f64,
    pub left_cm: f64,
    pub right_cm: f64,
}

impl PageMargins {
    pub fn uniform(cm: f64) -> Self {
        Self {
            top_cm: cm,
            bottom_cm: cm,
            left_cm: cm,
            right_cm: cm,
        }
    }
}

/// Document metadata (`docProps/core.xml`).
#[derive(Debug, Clone, PartialEq)]
pub struct CoreProperties {
    pub title: String,
    pub author: String,
    pub comments: String,
}

/// Everything the writer needs to produce one file.
#[derive(Debug, Clone)]
pub struct DocumentSpec {
    pub elements: Vec<RenderedElement>,
    pub margins: PageMargins,
    pub properties: CoreProperties,
    pub output_path: PathBuf,
}

impl DocumentSpec {
    /// Distinct image URLs, in document order.
    pub fn image_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for element in &self.elements {
            if let RenderedElement::Image(img) = element {
                if !urls.contains(&img.url.as_str()) {
                    urls.push(&img.url);
                }
            }
        }
        urls
    }
}

/// `{output_dir}/{sanitized title}.docx`
pub fn output_path(output_dir: &Path, title: &str) -> PathBuf {
    output_dir.join(format!("{}.docx", sanitize_filename(title)))
}

/// `{author} {MM}-{DD}` of the creation date.
pub fn byline(author: &str, created: &impl Datelike) -> String {
    format!("{} {:02}-{:02}", author, created.month(), created.day())
}

/// Lay out a full document for `article`.
pub fn assemble(
    article: &Article,
    rendering: Rendering,
    output_dir: &Path,
) -> Result<DocumentSpec, ArticleError> {
    let title = article.title()?;
    let author = article.author_name()?;
    let created = article.create_time()?;

    let mut elements = text_elements(Role::Heading, title);
    elements.extend(text_elements(Role::Byline, &byline(author, &created)));
    elements.extend(rendering.into_elements());

    Ok(DocumentSpec {
        elements,
        margins: PageMargins::uniform(PAGE_MARGIN_CM),
        properties: CoreProperties {
            title: title.to_string(),
            author: DOCUMENT_AUTHOR.to_string(),
            comments: String::new(),
        },
        output_path: output_path(output_dir, title),
    })
}

/// Download every image of `doc`, in order. The first failure aborts.
pub async fn download_images(
    doc: &DocumentSpec,
    fetcher: &dyn Fetcher,
) -> Result<ImageStore, PipelineError> {
    let mut images = ImageStore::new();
    for url in doc.image_urls() {
        let bytes = fetcher.fetch_bytes(url).await?;
        debug!(%url, bytes = bytes.len(), "Downloaded image");
        images.insert(url.to_string(), bytes);
    }
    Ok(images)
}

/// Write `doc` to its output path, creating the output directory if needed.
#[instrument(level = "info", skip_all, fields(path = %doc.output_path.display()))]
pub async fn save_document(
    doc: &DocumentSpec,
    fetcher: &dyn Fetcher,
    writer: &dyn DocumentWriter,
) -> Result<PathBuf, PipelineError> {
    if let Some(dir) = doc.output_path.parent() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| PipelineError::io(dir, e))?;
    }

    let images = download_images(doc, fetcher).await?;
    let bytes = writer.write(doc, &images)?;
    fs::write(&doc.output_path, bytes)
        .await
        .map_err(|e| PipelineError::io(&doc.output_path, e))?;

    info!(path = %doc.output_path.display(), "Article saved");
    Ok(doc.output_path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::DocxWriter;
    use crate::docx::testing::{read_part, tiny_png};
    use crate::fetch::testing::StubFetcher;
    use crate::models::fixtures::sample_record;
    use crate::render::{TextElement, render};
    use chrono::NaiveDate;

    fn text(e: &RenderedElement) -> &TextElement {
        match e {
            RenderedElement::Text(t) => t,
            other => panic!("expected text element, got {other:?}"),
        }
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("output"), "Test"),
            PathBuf::from("output/Test.docx")
        );
        assert_eq!(
            output_path(Path::new("output"), "a/b"),
            PathBuf::from("output/a_b.docx")
        );
    }

    #[test]
    fn test_byline_pads_month_and_day() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 5).unwrap();
        assert_eq!(byline("小明", &date), "小明 06-05");
    }

    #[test]
    fn test_assemble_orders_heading_byline_body() {
        let article = Article::from_record(sample_record());
        let rendering = render(&article).unwrap();
        let body_len = rendering.elements().count();
        let doc = assemble(&article, rendering, Path::new("output")).unwrap();

        assert_eq!(doc.elements.len(), body_len + 2);
        let heading = text(&doc.elements[0]);
        assert_eq!(heading.role, Role::Heading);
        assert_eq!(heading.text, "春游记");
        let by = text(&doc.elements[1]);
        assert_eq!(by.role, Role::Byline);
        assert!(by.text.starts_with("小明 06-1"));
        assert_eq!(text(&doc.elements[2]).role, Role::Subtitle);

        assert_eq!(doc.margins, PageMargins::uniform(2.0));
        assert_eq!(doc.properties.author, "Administrator");
        assert_eq!(doc.properties.comments, "");
        assert_eq!(doc.output_path, PathBuf::from("output/春游记.docx"));
    }

    #[test]
    fn test_assemble_requires_title() {
        let mut record = sample_record();
        record["article"].as_object_mut().unwrap().remove("title");
        let article = Article::from_record(record);
        let err = assemble(&article, Rendering::default(), Path::new("output")).unwrap_err();
        assert!(matches!(err, ArticleError::Missing(ref e) if e.field == "article.title"));
    }

    #[test]
    fn test_image_urls_are_distinct_and_ordered() {
        let article = Article::from_record(sample_record());
        let doc = assemble(&article, render(&article).unwrap(), Path::new("o")).unwrap();
        assert_eq!(doc.image_urls(), vec!["https://img/a.png", "https://img/v.jpg"]);
    }

    #[tokio::test]
    async fn test_save_document_creates_directory_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested");
        let article = Article::from_record(sample_record());
        let doc = assemble(&article, render(&article).unwrap(), &out).unwrap();
        let fetcher = StubFetcher::default()
            .with("https://img/a.png", tiny_png())
            .with("https://img/v.jpg", tiny_png());

        let saved = save_document(&doc, &fetcher, &DocxWriter).await.unwrap();

        assert_eq!(saved, out.join("春游记.docx"));
        let bytes = std::fs::read(&saved).unwrap();
        let document = read_part(&bytes, "word/document.xml");
        assert!(document.contains("春游记"));
        assert!(document.contains("(链接：https://video/v.mp4)"));
    }

    #[tokio::test]
    async fn test_save_document_fails_on_image_fetch_error() {
        let tmp = tempfile::tempdir().unwrap();
        let article = Article::from_record(sample_record());
        let doc = assemble(&article, render(&article).unwrap(), tmp.path()).unwrap();
        let fetcher = StubFetcher::default().with("https://img/a.png", tiny_png());

        let err = save_document(&doc, &fetcher, &DocxWriter).await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(ref e) if e.status() == Some(404)));
        assert!(!doc.output_path.exists());
    }
}
