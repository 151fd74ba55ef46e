//! Data model over the article record embedded in a meipian page.
//!
//! The platform delivers a loosely typed JSON object. [`Article`] keeps that
//! object as received and exposes read-only accessors; every accessor for a
//! required field fails with [`MissingFieldError`] instead of handing back a
//! default. Content blocks are decoded into the closed [`ContentBlock`] enum,
//! with [`ContentBlock::Unrecognized`] catching kinds that are not rendered.
//!
//! Record layout:
//!
//! ```text
//! { "article": { "title", "create_time", "last_modify_time", "cover_img_url",
//!                "ext": { "ip" }, "music_desc", "music_url",
//!                "content": { "content": [ block, ... ] } },
//!   "author":  { "nickname", "head_img_url", "country", "province", "city",
//!                "ip_address", "phone_num", "wechat_id" } }
//! ```

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::error::{ArticleError, MissingFieldError};
use crate::utils::truncate_for_log;

const RECORD_PREVIEW_BYTES: usize = 200;

/// Numeric tags of the `type` field of a content block.
pub mod kind {
    pub const TEXT_OR_IMAGE: i64 = 1;
    pub const VIDEO: i64 = 3;
    pub const SUBTITLE: i64 = 6;
    pub const LINK: i64 = 7;
}

/// A fetched article record.
///
/// Immutable once constructed; accessors borrow from the underlying JSON.
#[derive(Debug, Clone)]
pub struct Article {
    raw: Value,
}

/// Author profile as published alongside the article.
#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub name: String,
    pub avatar_url: String,
    /// `{country}{province}省{city}市`
    pub location: String,
    pub wechat_id: String,
    /// IP recorded when the article was written.
    pub ip_when_written: String,
    /// IP of the author's last login.
    pub ip_when_logged_in: String,
    pub phone: Option<String>,
}

/// One unit of article body, in the order the platform lists them.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Tag 1: text, image, or both.
    TextOrImage(TextOrImage),
    /// Tag 3: video, rendered as its thumbnail plus a link.
    Video {
        thumbnail_url: String,
        video_url: String,
    },
    /// Tag 6.
    Subtitle { text: String },
    /// Tag 7.
    Link { text: String },
    /// Any other tag. `kind` is `None` when the tag is not an integer.
    Unrecognized { kind: Option<i64>, raw: Value },
}

/// Payload of a text/image block. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextOrImage {
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub image_height: Option<f64>,
    pub image_width: Option<f64>,
    /// The block as received, kept for diagnostics.
    pub raw: Value,
}

impl Article {
    /// Wrap a raw record as extracted from the page.
    pub fn from_record(raw: Value) -> Self {
        Self { raw }
    }

    pub fn title(&self) -> Result<&str, ArticleError> {
        str_field(self.section("article")?, "article", "title")
    }

    pub fn create_time(&self) -> Result<DateTime<Local>, ArticleError> {
        timestamp_field(self.section("article")?, "article", "create_time")
    }

    pub fn last_modify_time(&self) -> Result<DateTime<Local>, ArticleError> {
        timestamp_field(self.section("article")?, "article", "last_modify_time")
    }

    pub fn cover_image_url(&self) -> Result<&str, ArticleError> {
        str_field(self.section("article")?, "article", "cover_img_url")
    }

    /// Background music title, when the article has one.
    pub fn music_desc(&self) -> Result<Option<&str>, ArticleError> {
        opt_str_field(self.section("article")?, "article", "music_desc")
    }

    pub fn music_url(&self) -> Result<Option<&str>, ArticleError> {
        opt_str_field(self.section("article")?, "article", "music_url")
    }

    pub fn author_name(&self) -> Result<&str, ArticleError> {
        str_field(self.section("author")?, "author", "nickname")
    }

    /// Full author profile. Fails on the first absent required field.
    pub fn author(&self) -> Result<Author, ArticleError> {
        let author = self.section("author")?;
        let article = self.section("article")?;
        let ext = field(article, "article", "ext")?;

        let location = format!(
            "{}{}省{}市",
            str_field(author, "author", "country")?,
            str_field(author, "author", "province")?,
            str_field(author, "author", "city")?,
        );

        Ok(Author {
            name: str_field(author, "author", "nickname")?.to_string(),
            avatar_url: str_field(author, "author", "head_img_url")?.to_string(),
            location,
            wechat_id: str_field(author, "author", "wechat_id")?.to_string(),
            ip_when_written: str_field(ext, "article.ext", "ip")?.to_string(),
            ip_when_logged_in: str_field(author, "author", "ip_address")?.to_string(),
            phone: opt_str_field(author, "author", "phone_num")?.map(str::to_string),
        })
    }

    /// Decode the ordered content blocks.
    pub fn content(&self) -> Result<Vec<ContentBlock>, ArticleError> {
        let article = self.section("article")?;
        let wrapper = field(article, "article", "content")?;
        let blocks = field(wrapper, "article.content", "content")?;
        let blocks = blocks.as_array().ok_or_else(|| ArticleError::InvalidField {
            field: "article.content.content".to_string(),
            value: preview(blocks),
        })?;

        blocks
            .iter()
            .enumerate()
            .map(|(i, block)| ContentBlock::from_value(i, block))
            .collect()
    }

    fn section(&self, name: &str) -> Result<&Value, MissingFieldError> {
        match self.raw.get(name) {
            Some(v) if !v.is_null() => Ok(v),
            _ => Err(MissingFieldError {
                field: name.to_string(),
                record: preview(&self.raw),
            }),
        }
    }
}

impl ContentBlock {
    /// Decode one block. `index` is its position in the content list and only
    /// serves error messages.
    pub fn from_value(index: usize, value: &Value) -> Result<Self, ArticleError> {
        let path = format!("article.content.content[{index}]");
        let tag = field(value, &path, "type")?;

        let Some(tag) = tag.as_i64() else {
            return Ok(Self::Unrecognized {
                kind: None,
                raw: value.clone(),
            });
        };

        let block = match tag {
            kind::TEXT_OR_IMAGE => Self::TextOrImage(TextOrImage {
                text: opt_str_field(value, &path, "text")?.map(str::to_string),
                image_url: opt_str_field(value, &path, "img_url")?.map(str::to_string),
                image_height: opt_number_field(value, &path, "img_height")?,
                image_width: opt_number_field(value, &path, "img_width")?,
                raw: value.clone(),
            }),
            kind::VIDEO => Self::Video {
                thumbnail_url: str_field(value, &path, "video_thumbnail")?.to_string(),
                video_url: str_field(value, &path, "video_url")?.to_string(),
            },
            kind::SUBTITLE => Self::Subtitle {
                text: str_field(value, &path, "text")?.to_string(),
            },
            kind::LINK => Self::Link {
                text: str_field(value, &path, "text")?.to_string(),
            },
            other => Self::Unrecognized {
                kind: Some(other),
                raw: value.clone(),
            },
        };
        Ok(block)
    }

    /// Whether the renderer produces output for this block kind.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized { .. })
    }
}

fn preview(v: &Value) -> String {
    truncate_for_log(&v.to_string(), RECORD_PREVIEW_BYTES)
}

/// A present, non-null field. `null` counts as absent.
fn field<'a>(obj: &'a Value, path: &str, key: &str) -> Result<&'a Value, MissingFieldError> {
    match obj.get(key) {
        Some(v) if !v.is_null() => Ok(v),
        _ => Err(MissingFieldError {
            field: format!("{path}.{key}"),
            record: preview(obj),
        }),
    }
}

fn str_field<'a>(obj: &'a Value, path: &str, key: &str) -> Result<&'a str, ArticleError> {
    let v = field(obj, path, key)?;
    v.as_str().ok_or_else(|| ArticleError::InvalidField {
        field: format!("{path}.{key}"),
        value: preview(v),
    })
}

fn opt_str_field<'a>(
    obj: &'a Value,
    path: &str,
    key: &str,
) -> Result<Option<&'a str>, ArticleError> {
    match field(obj, path, key) {
        Ok(_) => str_field(obj, path, key).map(Some),
        Err(_) => Ok(None),
    }
}

/// Numbers arrive either as JSON numbers or as numeric strings.
fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn opt_number_field(obj: &Value, path: &str, key: &str) -> Result<Option<f64>, ArticleError> {
    match field(obj, path, key) {
        Ok(v) => number(v).map(Some).ok_or_else(|| ArticleError::InvalidField {
            field: format!("{path}.{key}"),
            value: preview(v),
        }),
        Err(_) => Ok(None),
    }
}

fn timestamp_field(obj: &Value, path: &str, key: &str) -> Result<DateTime<Local>, ArticleError> {
    let v = field(obj, path, key)?;
    let invalid = || ArticleError::InvalidField {
        field: format!("{path}.{key}"),
        value: preview(v),
    };
    let secs = number(v).filter(|s| s.is_finite()).ok_or_else(invalid)?;
    let whole = secs.trunc() as i64;
    let nanos = ((secs - secs.trunc()) * 1e9) as u32;
    DateTime::from_timestamp(whole, nanos)
        .map(|utc| utc.with_timezone(&Local))
        .ok_or_else(invalid)
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_record;
    use super::*;
    use chrono::{Datelike, Utc};
    use serde_json::json;

    #[test]
    fn test_scalar_accessors() {
        let article = Article::from_record(sample_record());
        assert_eq!(article.title().unwrap(), "春游记");
        assert_eq!(article.author_name().unwrap(), "小明");
        assert_eq!(
            article.cover_image_url().unwrap(),
            "https://static.meipian.cn/cover.jpg"
        );
        assert_eq!(article.music_desc().unwrap(), Some("春之歌"));
        assert_eq!(article.music_url().unwrap(), None);
    }

    #[test]
    fn test_timestamps_accept_strings_and_numbers() {
        let article = Article::from_record(sample_record());
        let created = article.create_time().unwrap().with_timezone(&Utc);
        assert_eq!((created.year(), created.month(), created.day()), (2023, 6, 15));
        let modified = article.last_modify_time().unwrap().with_timezone(&Utc);
        assert_eq!(modified.timestamp(), 1686834000);
    }

    #[test]
    fn test_author_profile() {
        let author = Article::from_record(sample_record()).author().unwrap();
        assert_eq!(author.name, "小明");
        assert_eq!(author.location, "中国浙江省杭州市");
        assert_eq!(author.ip_when_written, "1.2.3.4");
        assert_eq!(author.ip_when_logged_in, "5.6.7.8");
        assert_eq!(author.phone, None);
    }

    #[test]
    fn test_missing_title_names_the_field() {
        let mut record = sample_record();
        record["article"].as_object_mut().unwrap().remove("title");
        let err = Article::from_record(record).title().unwrap_err();
        match err {
            ArticleError::Missing(e) => {
                assert_eq!(e.field, "article.title");
                assert!(e.record.contains("cover_img_url"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_null_counts_as_missing() {
        let mut record = sample_record();
        record["author"]["nickname"] = Value::Null;
        let err = Article::from_record(record).author_name().unwrap_err();
        assert!(matches!(err, ArticleError::Missing(ref e) if e.field == "author.nickname"));
    }

    #[test]
    fn test_missing_section() {
        let err = Article::from_record(json!({ "article": {} }))
            .author_name()
            .unwrap_err();
        assert!(matches!(err, ArticleError::Missing(ref e) if e.field == "author"));
    }

    #[test]
    fn test_invalid_timestamp() {
        let mut record = sample_record();
        record["article"]["create_time"] = json!("yesterday");
        let err = Article::from_record(record).create_time().unwrap_err();
        assert!(matches!(err, ArticleError::InvalidField { ref field, .. } if field == "article.create_time"));
    }

    #[test]
    fn test_non_finite_timestamp_is_invalid() {
        for bad in ["NaN", "inf", "-infinity"] {
            let mut record = sample_record();
            record["article"]["create_time"] = json!(bad);
            let err = Article::from_record(record).create_time().unwrap_err();
            assert!(
                matches!(err, ArticleError::InvalidField { ref field, .. } if field == "article.create_time"),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_content_decodes_every_kind_in_order() {
        let blocks = Article::from_record(sample_record()).content().unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(
            blocks[0],
            ContentBlock::Subtitle {
                text: "第一章".to_string()
            }
        );
        assert_eq!(
            blocks[1],
            ContentBlock::TextOrImage(TextOrImage {
                text: Some("<p>hello</p>".to_string()),
                image_url: Some("https://img/a.png".to_string()),
                image_height: Some(200.0),
                image_width: Some(100.0),
                raw: sample_record()["article"]["content"]["content"][1].clone(),
            })
        );
        assert!(matches!(blocks[2], ContentBlock::Video { .. }));
        assert!(matches!(blocks[3], ContentBlock::Link { .. }));
        assert!(matches!(
            blocks[4],
            ContentBlock::Unrecognized { kind: Some(2), .. }
        ));
    }

    #[test]
    fn test_block_without_type_is_missing_field() {
        let err = ContentBlock::from_value(4, &json!({ "text": "x" })).unwrap_err();
        assert!(
            matches!(err, ArticleError::Missing(ref e) if e.field == "article.content.content[4].type")
        );
    }

    #[test]
    fn test_non_integer_type_is_unrecognized() {
        let block = ContentBlock::from_value(0, &json!({ "type": "1" })).unwrap();
        assert!(matches!(block, ContentBlock::Unrecognized { kind: None, .. }));
        assert!(!block.is_recognized());
    }

    #[test]
    fn test_video_requires_both_urls() {
        let err = ContentBlock::from_value(0, &json!({ "type": 3, "video_url": "v" })).unwrap_err();
        assert!(matches!(err, ArticleError::Missing(ref e) if e.field.ends_with("video_thumbnail")));
    }

    #[test]
    fn test_empty_text_or_image_block_decodes() {
        let block = ContentBlock::from_value(0, &json!({ "type": 1 })).unwrap();
        assert_eq!(
            block,
            ContentBlock::TextOrImage(TextOrImage {
                raw: json!({ "type": 1 }),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_image_dimensions_as_strings() {
        let block = ContentBlock::from_value(
            0,
            &json!({ "type": 1, "img_url": "u", "img_height": "300", "img_width": "400" }),
        )
        .unwrap();
        let ContentBlock::TextOrImage(b) = block else {
            panic!("expected text/image block");
        };
        assert_eq!(b.image_height, Some(300.0));
        assert_eq!(b.image_width, Some(400.0));
    }
}
