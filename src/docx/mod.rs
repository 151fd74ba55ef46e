//! `.docx` package writer.
//!
//! A [`DocumentWriter`] turns a [`DocumentSpec`] plus the bytes of every
//! image it references into a finished file. [`DocxWriter`] is the only
//! implementation: it emits a minimal OOXML package with `zip`, generating
//! the XML parts in [`xml`].
//!
//! # Package layout
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! docProps/core.xml
//! docProps/app.xml
//! word/document.xml
//! word/styles.xml
//! word/_rels/document.xml.rels
//! word/media/image1.png ...
//! ```

pub mod xml;

use std::collections::HashMap;
use std::io::{Cursor, Write};

use imagesize::ImageType;
use tracing::debug;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

use crate::document::DocumentSpec;
use crate::error::DocxError;
use crate::render::RenderedElement;
use crate::render::style::DisplaySize;
use xml::{BodyItem, EMU_PER_INCH, PlacedImage};

/// Downloaded image bytes keyed by source URL.
pub type ImageStore = HashMap<String, Vec<u8>>;

/// Default Latin font of the document.
pub const DEFAULT_LATIN_FONT: &str = "Times New Roman";
/// Default East Asian font of the document.
pub const DEFAULT_EAST_ASIAN_FONT: &str = "宋体";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXTENDED_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Serializes a document description into file bytes.
pub trait DocumentWriter: Send + Sync {
    fn write(&self, doc: &DocumentSpec, images: &ImageStore) -> Result<Vec<u8>, DocxError>;
}

/// Writes Office Open XML word-processing packages.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxWriter;

struct MediaPart {
    path: String,
    bytes: Vec<u8>,
}

impl DocumentWriter for DocxWriter {
    fn write(&self, doc: &DocumentSpec, images: &ImageStore) -> Result<Vec<u8>, DocxError> {
        let mut body = Vec::with_capacity(doc.elements.len());
        let mut media: Vec<MediaPart> = Vec::new();
        let mut media_types: Vec<(&'static str, &'static str)> = Vec::new();
        let mut doc_rels = vec![(
            "rId1".to_string(),
            REL_STYLES,
            "styles.xml".to_string(),
        )];
        // one media part per distinct URL
        let mut placed: HashMap<&str, (String, String)> = HashMap::new();

        for element in &doc.elements {
            match element {
                RenderedElement::Text(p) => body.push(BodyItem::Paragraph(p)),
                RenderedElement::Image(img) => {
                    let bytes = images
                        .get(&img.url)
                        .ok_or_else(|| DocxError::MissingImage {
                            url: img.url.clone(),
                        })?;
                    let (ext, mime) = media_type(bytes).ok_or_else(|| {
                        DocxError::UnsupportedImage {
                            url: img.url.clone(),
                        }
                    })?;

                    let (rel_id, file_name) = match placed.get(img.url.as_str()) {
                        Some(p) => p.clone(),
                        None => {
                            let n = media.len() + 1;
                            let file_name = format!("image{n}.{ext}");
                            let rel_id = format!("rId{}", doc_rels.len() + 1);
                            doc_rels.push((rel_id.clone(), REL_IMAGE, format!("media/{file_name}")));
                            media.push(MediaPart {
                                path: format!("word/media/{file_name}"),
                                bytes: bytes.clone(),
                            });
                            if !media_types.iter().any(|(e, _)| *e == ext) {
                                media_types.push((ext, mime));
                            }
                            placed.insert(&img.url, (rel_id.clone(), file_name.clone()));
                            (rel_id, file_name)
                        }
                    };

                    let pixels = pixel_size(bytes).or(img.declared);
                    let (cx_emu, cy_emu) = extent_emu(img.size, pixels);
                    body.push(BodyItem::Picture(
                        PlacedImage {
                            rel_id,
                            doc_pr_id: body.len() as u32 + 1,
                            file_name,
                            cx_emu,
                            cy_emu,
                        },
                        img.alignment,
                    ));
                }
            }
        }

        let package_rels = vec![
            (
                "rId1".to_string(),
                REL_OFFICE_DOCUMENT,
                "word/document.xml".to_string(),
            ),
            (
                "rId2".to_string(),
                REL_CORE_PROPERTIES,
                "docProps/core.xml".to_string(),
            ),
            (
                "rId3".to_string(),
                REL_EXTENDED_PROPERTIES,
                "docProps/app.xml".to_string(),
            ),
        ];

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut put = |name: &str, data: &[u8]| -> Result<(), DocxError> {
            zip.start_file(name, options)?;
            zip.write_all(data)?;
            Ok(())
        };

        put("[Content_Types].xml", &xml::content_types_xml(&media_types)?)?;
        put("_rels/.rels", &xml::relationships_xml(&package_rels)?)?;
        put("docProps/core.xml", &xml::core_xml(&doc.properties)?)?;
        put("docProps/app.xml", &xml::app_xml()?)?;
        put(
            "word/document.xml",
            &xml::document_xml(&body, &doc.margins)?,
        )?;
        put(
            "word/styles.xml",
            &xml::styles_xml(DEFAULT_LATIN_FONT, DEFAULT_EAST_ASIAN_FONT)?,
        )?;
        put(
            "word/_rels/document.xml.rels",
            &xml::relationships_xml(&doc_rels)?,
        )?;
        for part in &media {
            put(&part.path, &part.bytes)?;
        }

        let bytes = zip.finish()?.into_inner();
        debug!(
            bytes = bytes.len(),
            paragraphs = doc.elements.len(),
            media = media.len(),
            "Packaged document"
        );
        Ok(bytes)
    }
}

/// File extension and content type for image formats Word can embed.
fn media_type(bytes: &[u8]) -> Option<(&'static str, &'static str)> {
    match imagesize::image_type(bytes).ok()? {
        ImageType::Png => Some(("png", "image/png")),
        ImageType::Jpeg => Some(("jpeg", "image/jpeg")),
        ImageType::Gif => Some(("gif", "image/gif")),
        ImageType::Bmp => Some(("bmp", "image/bmp")),
        ImageType::Tiff => Some(("tiff", "image/tiff")),
        _ => None,
    }
}

/// Intrinsic `(height, width)` in pixels.
fn pixel_size(bytes: &[u8]) -> Option<(f64, f64)> {
    imagesize::blob_size(bytes)
        .ok()
        .filter(|s| s.width > 0 && s.height > 0)
        .map(|s| (s.height as f64, s.width as f64))
}

/// Page extent `(cx, cy)` in EMU. The free dimension keeps the aspect ratio
/// of `pixels`; without any known size the picture is square.
fn extent_emu(size: DisplaySize, pixels: Option<(f64, f64)>) -> (u64, u64) {
    let (h, w) = pixels
        .filter(|(h, w)| *h > 0.0 && *w > 0.0)
        .unwrap_or((1.0, 1.0));
    match size {
        DisplaySize::Height(inches) => {
            let cy = inches * EMU_PER_INCH;
            ((cy * w / h).round() as u64, cy.round() as u64)
        }
        DisplaySize::Width(inches) => {
            let cx = inches * EMU_PER_INCH;
            (cx.round() as u64, (cx * h / w).round() as u64)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    /// A valid 2x1 (width x height) PNG.
    pub fn tiny_png() -> Vec<u8> {
        vec![
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // signature
            0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR
            0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, // 2 x 1
            0x08, 0x02, 0x00, 0x00, 0x00, 0x7B, 0x40, 0xE8, 0xDD, //
            0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, // IDAT
            0x08, 0xD7, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x03, 0x01, 0x01, 0x00, //
            0x18, 0xDD, 0x8D, 0xB0, //
            0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82, // IEND
        ]
    }

    /// Names of the parts in a zip archive.
    pub fn part_names(bytes: &[u8]) -> Vec<String> {
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    /// Contents of one part as UTF-8.
    pub fn read_part(bytes: &[u8], name: &str) -> String {
        use std::io::Read;
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        s
    }
}
