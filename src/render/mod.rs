//! Content block rendering.
//!
//! Turns the ordered content blocks of an [`Article`] into rendering-ready
//! elements. Every block maps to one group of zero or more elements, and
//! groups keep the order of the blocks they came from:
//!
//! | block | produces |
//! |-------|----------|
//! | text + image | body text, then the image |
//! | image only | the image |
//! | text only | body text |
//! | neither | nothing; an [`AnomalousBlockError`] is reported |
//! | video | thumbnail image, then a caption with the video link |
//! | subtitle | bold centered subtitle |
//! | link | body text |
//! | unrecognized | nothing |
//!
//! Text is flattened by [`text::paragraphs`]; each fragment becomes its own
//! paragraph with the same style.

pub mod style;
pub mod text;

use tracing::{debug, error};

use crate::error::{AnomalousBlockError, ArticleError};
use crate::models::{Article, ContentBlock, TextOrImage};
use crate::utils::truncate_for_log;
use style::{Alignment, CENTER_MARKER, DisplaySize, Role, TextStyle, display_size};

/// A single paragraph or picture, ready for the document writer.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedElement {
    Text(TextElement),
    Image(ImageElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub role: Role,
    pub text: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageElement {
    pub url: String,
    pub size: DisplaySize,
    pub alignment: Alignment,
    /// `(height, width)` as declared by the platform, if both were given.
    pub declared: Option<(f64, f64)>,
}

/// Output of one rendering pass over an article.
#[derive(Debug, Default)]
pub struct Rendering {
    /// One entry per content block, in content order.
    pub groups: Vec<Vec<RenderedElement>>,
    pub anomalies: Vec<AnomalousBlockError>,
}

impl Rendering {
    pub fn elements(&self) -> impl Iterator<Item = &RenderedElement> {
        self.groups.iter().flatten()
    }

    pub fn into_elements(self) -> Vec<RenderedElement> {
        self.groups.into_iter().flatten().collect()
    }
}

/// Render the content of `article`.
///
/// Fails only when a block cannot be read from the record; empty text/image
/// blocks are reported in [`Rendering::anomalies`] and rendering carries on.
pub fn render(article: &Article) -> Result<Rendering, ArticleError> {
    let blocks = article.content()?;
    Ok(render_blocks(&blocks))
}

pub fn render_blocks(blocks: &[ContentBlock]) -> Rendering {
    let mut rendering = Rendering::default();
    for (index, block) in blocks.iter().enumerate() {
        match render_block(index, block) {
            Ok(group) => rendering.groups.push(group),
            Err(anomaly) => {
                error!(index, record = %anomaly.record, "Content block has neither text nor image");
                rendering.anomalies.push(anomaly);
                rendering.groups.push(Vec::new());
            }
        }
    }
    debug!(
        blocks = blocks.len(),
        unrecognized = blocks.iter().filter(|b| !b.is_recognized()).count(),
        anomalies = rendering.anomalies.len(),
        "Rendered content"
    );
    rendering
}

fn render_block(
    index: usize,
    block: &ContentBlock,
) -> Result<Vec<RenderedElement>, AnomalousBlockError> {
    let elements = match block {
        ContentBlock::TextOrImage(b) => render_text_or_image(index, b)?,
        ContentBlock::Video {
            thumbnail_url,
            video_url,
        } => {
            let mut out = vec![image(thumbnail_url, None, None)];
            out.extend(text_elements(Role::Caption, &link_caption(video_url)));
            out
        }
        ContentBlock::Subtitle { text } => text_elements(Role::Subtitle, text),
        ContentBlock::Link { text } => text_elements(Role::BodyText, text),
        ContentBlock::Unrecognized { kind, raw } => {
            debug!(index, ?kind, block = %truncate_for_log(&raw.to_string(), 200), "Skipping unrecognized content block");
            Vec::new()
        }
    };
    Ok(elements)
}

fn render_text_or_image(
    index: usize,
    b: &TextOrImage,
) -> Result<Vec<RenderedElement>, AnomalousBlockError> {
    match (&b.text, &b.image_url) {
        (Some(text), Some(url)) => {
            let mut out = text_elements(Role::BodyText, text);
            out.push(image(url, b.image_height, b.image_width));
            Ok(out)
        }
        (None, Some(url)) => Ok(vec![image(url, b.image_height, b.image_width)]),
        (Some(text), None) => Ok(text_elements(Role::BodyText, text)),
        (None, None) => Err(AnomalousBlockError {
            index,
            record: truncate_for_log(&b.raw.to_string(), 200),
        }),
    }
}

/// Caption text for a video link.
pub fn link_caption(url: &str) -> String {
    format!("(链接：{url})")
}

/// One text element per paragraph of `raw`, styled for `role`.
///
/// A center marker anywhere in the raw markup centers every paragraph.
pub fn text_elements(role: Role, raw: &str) -> Vec<RenderedElement> {
    let mut style = role.style();
    if raw.contains(CENTER_MARKER) {
        style = style.centered();
    }
    text::paragraphs(raw)
        .into_iter()
        .map(|text| RenderedElement::Text(TextElement { role, text, style }))
        .collect()
}

fn image(url: &str, height: Option<f64>, width: Option<f64>) -> RenderedElement {
    RenderedElement::Image(ImageElement {
        url: url.to_string(),
        size: display_size(height, width),
        alignment: Alignment::Center,
        declared: height.zip(width),
    })
}
