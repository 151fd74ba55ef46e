//! WordprocessingML generation for the document body and package parts.

use std::borrow::Cow;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::document::{CoreProperties, PageMargins};
use crate::error::DocxError;
use crate::render::TextElement;
use crate::render::style::Alignment;

pub const EMU_PER_INCH: f64 = 914_400.0;
const TWIPS_PER_CM: f64 = 1440.0 / 2.54;

// US Letter, the default page of a blank Word document.
const PAGE_WIDTH_TWIPS: u32 = 12_240;
const PAGE_HEIGHT_TWIPS: u32 = 15_840;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

fn xml_err(e: impl std::fmt::Display) -> DocxError {
    DocxError::Xml(e.to_string())
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// `s` without the characters XML 1.0 does not allow in a document.
fn xml_chars(s: &str) -> Cow<'_, str> {
    if s.chars().all(is_xml_char) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

fn cm_to_twips(cm: f64) -> u32 {
    (cm * TWIPS_PER_CM).round() as u32
}

/// Thin event writer over an in-memory buffer.
pub struct XmlBuilder {
    w: Writer<Vec<u8>>,
}

impl XmlBuilder {
    pub fn new() -> Result<Self, DocxError> {
        let mut w = Writer::new(Vec::new());
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_err)?;
        Ok(Self { w })
    }

    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self, DocxError> {
        let el = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.w.write_event(Event::Start(el)).map_err(xml_err)?;
        Ok(self)
    }

    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self, DocxError> {
        let el = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.w.write_event(Event::Empty(el)).map_err(xml_err)?;
        Ok(self)
    }

    pub fn end(&mut self, name: &str) -> Result<&mut Self, DocxError> {
        self.w
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_err)?;
        Ok(self)
    }

    /// Escaped character data. Characters XML 1.0 forbids are dropped.
    pub fn text(&mut self, s: &str) -> Result<&mut Self, DocxError> {
        let s = xml_chars(s);
        self.w
            .write_event(Event::Text(BytesText::new(&s)))
            .map_err(xml_err)?;
        Ok(self)
    }

    /// `<name>text</name>`
    pub fn leaf(&mut self, name: &str, text: &str) -> Result<&mut Self, DocxError> {
        self.start(name, &[])?.text(text)?.end(name)
    }

    pub fn finish(self) -> Vec<u8> {
        self.w.into_inner()
    }
}

/// A picture already placed in the package.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub rel_id: String,
    pub doc_pr_id: u32,
    pub file_name: String,
    pub cx_emu: u64,
    pub cy_emu: u64,
}

/// Item of the document body, in order.
pub enum BodyItem<'a> {
    Paragraph(&'a TextElement),
    Picture(PlacedImage, Alignment),
}

/// `word/document.xml`
pub fn document_xml(body: &[BodyItem<'_>], margins: &PageMargins) -> Result<Vec<u8>, DocxError> {
    let mut x = XmlBuilder::new()?;
    x.start(
        "w:document",
        &[
            ("xmlns:w", NS_W),
            ("xmlns:r", NS_R),
            ("xmlns:wp", NS_WP),
            ("xmlns:a", NS_A),
            ("xmlns:pic", NS_PIC),
        ],
    )?;
    x.start("w:body", &[])?;

    for item in body {
        match item {
            BodyItem::Paragraph(p) => write_paragraph(&mut x, p)?,
            BodyItem::Picture(img, alignment) => write_picture(&mut x, img, *alignment)?,
        }
    }

    write_section(&mut x, margins)?;
    x.end("w:body")?.end("w:document")?;
    Ok(x.finish())
}

fn write_alignment(x: &mut XmlBuilder, alignment: Alignment) -> Result<(), DocxError> {
    if alignment == Alignment::Center {
        x.empty("w:jc", &[("w:val", "center")])?;
    }
    Ok(())
}

fn write_paragraph(x: &mut XmlBuilder, p: &TextElement) -> Result<(), DocxError> {
    let style = &p.style;
    let line = ((style.line_spacing_pt * 20.0).round() as u32).to_string();
    let indent = cm_to_twips(f64::from(style.first_line_indent_cm)).to_string();
    let half_points = ((style.size_pt * 2.0).round() as u32).to_string();

    x.start("w:p", &[])?.start("w:pPr", &[])?;
    x.empty("w:spacing", &[("w:line", line.as_str()), ("w:lineRule", "exact")])?;
    x.empty("w:ind", &[("w:firstLine", indent.as_str())])?;
    write_alignment(x, style.alignment)?;
    x.end("w:pPr")?;

    x.start("w:r", &[])?.start("w:rPr", &[])?;
    x.empty(
        "w:rFonts",
        &[
            ("w:ascii", style.font),
            ("w:hAnsi", style.font),
            ("w:eastAsia", style.font),
        ],
    )?;
    if style.bold {
        x.empty("w:b", &[])?;
    }
    x.empty("w:sz", &[("w:val", half_points.as_str())])?;
    x.empty("w:szCs", &[("w:val", half_points.as_str())])?;
    x.end("w:rPr")?;
    x.start("w:t", &[("xml:space", "preserve")])?
        .text(&p.text)?
        .end("w:t")?;
    x.end("w:r")?.end("w:p")?;
    Ok(())
}

fn write_picture(x: &mut XmlBuilder, img: &PlacedImage, alignment: Alignment) -> Result<(), DocxError> {
    let cx = img.cx_emu.to_string();
    let cy = img.cy_emu.to_string();
    let id = img.doc_pr_id.to_string();
    let name = format!("Picture {id}");

    x.start("w:p", &[])?.start("w:pPr", &[])?;
    write_alignment(x, alignment)?;
    x.end("w:pPr")?;
    x.start("w:r", &[])?.start("w:drawing", &[])?;
    x.start(
        "wp:inline",
        &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
    )?;
    x.empty("wp:extent", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    x.empty("wp:docPr", &[("id", id.as_str()), ("name", name.as_str())])?;
    x.start("wp:cNvGraphicFramePr", &[])?
        .empty("a:graphicFrameLocks", &[("noChangeAspect", "1")])?
        .end("wp:cNvGraphicFramePr")?;
    x.start("a:graphic", &[])?
        .start("a:graphicData", &[("uri", NS_PIC)])?
        .start("pic:pic", &[])?;

    x.start("pic:nvPicPr", &[])?
        .empty("pic:cNvPr", &[("id", id.as_str()), ("name", img.file_name.as_str())])?
        .empty("pic:cNvPicPr", &[])?
        .end("pic:nvPicPr")?;
    x.start("pic:blipFill", &[])?
        .empty("a:blip", &[("r:embed", img.rel_id.as_str())])?
        .start("a:stretch", &[])?
        .empty("a:fillRect", &[])?
        .end("a:stretch")?
        .end("pic:blipFill")?;
    x.start("pic:spPr", &[])?
        .start("a:xfrm", &[])?
        .empty("a:off", &[("x", "0"), ("y", "0")])?
        .empty("a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?
        .end("a:xfrm")?
        .start("a:prstGeom", &[("prst", "rect")])?
        .empty("a:avLst", &[])?
        .end("a:prstGeom")?
        .end("pic:spPr")?;

    x.end("pic:pic")?.end("a:graphicData")?.end("a:graphic")?;
    x.end("wp:inline")?.end("w:drawing")?.end("w:r")?.end("w:p")?;
    Ok(())
}

fn write_section(x: &mut XmlBuilder, m: &PageMargins) -> Result<(), DocxError> {
    let top = cm_to_twips(m.top_cm).to_string();
    let bottom = cm_to_twips(m.bottom_cm).to_string();
    let left = cm_to_twips(m.left_cm).to_string();
    let right = cm_to_twips(m.right_cm).to_string();
    let page_w = PAGE_WIDTH_TWIPS.to_string();
    let page_h = PAGE_HEIGHT_TWIPS.to_string();

    x.start("w:sectPr", &[])?;
    x.empty("w:pgSz", &[("w:w", page_w.as_str()), ("w:h", page_h.as_str())])?;
    x.empty(
        "w:pgMar",
        &[
            ("w:top", top.as_str()),
            ("w:right", right.as_str()),
            ("w:bottom", bottom.as_str()),
            ("w:left", left.as_str()),
            ("w:header", "720"),
            ("w:footer", "720"),
            ("w:gutter", "0"),
        ],
    )?;
    x.end("w:sectPr")?;
    Ok(())
}

/// `word/styles.xml`: the Normal style carries the document default fonts.
pub fn styles_xml(latin_font: &str, east_asian_font: &str) -> Result<Vec<u8>, DocxError> {
    let mut x = XmlBuilder::new()?;
    x.start("w:styles", &[("xmlns:w", NS_W)])?;
    x.start("w:docDefaults", &[])?
        .start("w:rPrDefault", &[])?
        .start("w:rPr", &[])?
        .empty(
            "w:rFonts",
            &[
                ("w:ascii", latin_font),
                ("w:hAnsi", latin_font),
                ("w:eastAsia", east_asian_font),
                ("w:cs", latin_font),
            ],
        )?
        .end("w:rPr")?
        .end("w:rPrDefault")?
        .end("w:docDefaults")?;
    x.start(
        "w:style",
        &[("w:type", "paragraph"), ("w:default", "1"), ("w:styleId", "Normal")],
    )?
    .empty("w:name", &[("w:val", "Normal")])?
    .empty("w:qFormat", &[])?
    .start("w:rPr", &[])?
    .empty(
        "w:rFonts",
        &[
            ("w:ascii", latin_font),
            ("w:hAnsi", latin_font),
            ("w:eastAsia", east_asian_font),
        ],
    )?
    .end("w:rPr")?
    .end("w:style")?;
    x.end("w:styles")?;
    Ok(x.finish())
}

/// `docProps/core.xml`
pub fn core_xml(props: &CoreProperties) -> Result<Vec<u8>, DocxError> {
    let mut x = XmlBuilder::new()?;
    x.start(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    x.leaf("dc:title", &props.title)?;
    x.leaf("dc:creator", &props.author)?;
    x.leaf("dc:description", &props.comments)?;
    x.end("cp:coreProperties")?;
    Ok(x.finish())
}

/// `docProps/app.xml`
pub fn app_xml() -> Result<Vec<u8>, DocxError> {
    let mut x = XmlBuilder::new()?;
    x.start(
        "Properties",
        &[(
            "xmlns",
            "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
        )],
    )?;
    x.leaf("Application", env!("CARGO_PKG_NAME"))?;
    x.end("Properties")?;
    Ok(x.finish())
}

/// `[Content_Types].xml`; `media` lists `(extension, mime)` pairs in use.
pub fn content_types_xml(media: &[(&str, &str)]) -> Result<Vec<u8>, DocxError> {
    let mut x = XmlBuilder::new()?;
    x.start(
        "Types",
        &[(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/content-types",
        )],
    )?;
    x.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    x.empty(
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;
    for &(ext, mime) in media {
        x.empty("Default", &[("Extension", ext), ("ContentType", mime)])?;
    }
    let overrides = [
        (
            "/word/document.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
        ),
        (
            "/word/styles.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
        ),
        (
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml",
        ),
        (
            "/docProps/app.xml",
            "application/vnd.openxmlformats-officedocument.extended-properties+xml",
        ),
    ];
    for (part, mime) in overrides {
        x.empty("Override", &[("PartName", part), ("ContentType", mime)])?;
    }
    x.end("Types")?;
    Ok(x.finish())
}

/// A `.rels` part; each entry is `(id, type, target)`.
pub fn relationships_xml(rels: &[(String, &str, String)]) -> Result<Vec<u8>, DocxError> {
    let mut x = XmlBuilder::new()?;
    x.start(
        "Relationships",
        &[(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/relationships",
        )],
    )?;
    for (id, kind, target) in rels {
        x.empty(
            "Relationship",
            &[("Id", id.as_str()), ("Type", *kind), ("Target", target.as_str())],
        )?;
    }
    x.end("Relationships")?;
    Ok(x.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::style::Role;

    fn body_text(text: &str) -> TextElement {
        TextElement {
            role: Role::BodyText,
            text: text.to_string(),
            style: Role::BodyText.style(),
        }
    }

    fn margins() -> PageMargins {
        PageMargins::uniform(2.0)
    }

    #[test]
    fn test_cm_to_twips() {
        assert_eq!(cm_to_twips(2.0), 1134);
        assert_eq!(cm_to_twips(0.75), 425);
    }

    #[test]
    fn test_paragraph_markup() {
        let p = body_text("一 & 二");
        let xml = String::from_utf8(document_xml(&[BodyItem::Paragraph(&p)], &margins()).unwrap())
            .unwrap();
        assert!(xml.contains(r#"<w:spacing w:line="600" w:lineRule="exact"/>"#));
        assert!(xml.contains(r#"<w:ind w:firstLine="425"/>"#));
        assert!(xml.contains(r#"w:eastAsia="仿宋""#));
        assert!(xml.contains(r#"<w:sz w:val="24"/>"#));
        assert!(xml.contains("一 &amp; 二"));
        assert!(!xml.contains("<w:b/>"));
        assert!(!xml.contains("w:jc"));
    }

    #[test]
    fn test_control_characters_are_dropped() {
        let p = body_text("a\u{0008}b\u{000B}c\u{FFFF}\td");
        let bytes = document_xml(&[BodyItem::Paragraph(&p)], &margins()).unwrap();
        assert!(!bytes.iter().any(|&b| b == 0x08 || b == 0x0B));
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.contains("abc\td"));
    }

    #[test]
    fn test_xml_chars_borrows_clean_text() {
        assert!(matches!(xml_chars("春游记\n"), Cow::Borrowed(_)));
        assert_eq!(xml_chars("x\u{0}y"), "xy");
    }

    #[test]
    fn test_centered_bold_paragraph() {
        let p = TextElement {
            role: Role::Heading,
            text: "标题".to_string(),
            style: Role::Heading.style(),
        };
        let xml = String::from_utf8(document_xml(&[BodyItem::Paragraph(&p)], &margins()).unwrap())
            .unwrap();
        assert!(xml.contains(r#"<w:jc w:val="center"/>"#));
        assert!(xml.contains("<w:b/>"));
        assert!(xml.contains(r#"<w:sz w:val="32"/>"#));
    }

    #[test]
    fn test_picture_markup() {
        let img = PlacedImage {
            rel_id: "rId7".to_string(),
            doc_pr_id: 3,
            file_name: "image3.png".to_string(),
            cx_emu: 100,
            cy_emu: 200,
        };
        let xml = String::from_utf8(
            document_xml(&[BodyItem::Picture(img, Alignment::Center)], &margins()).unwrap(),
        )
        .unwrap();
        assert!(xml.contains(r#"<wp:extent cx="100" cy="200"/>"#));
        assert!(xml.contains(r#"<a:blip r:embed="rId7"/>"#));
        assert!(xml.contains(r#"<w:jc w:val="center"/>"#));
    }

    #[test]
    fn test_section_margins() {
        let xml = String::from_utf8(document_xml(&[], &margins()).unwrap()).unwrap();
        assert!(xml.contains(r#"w:top="1134" w:right="1134" w:bottom="1134" w:left="1134""#));
    }

    #[test]
    fn test_core_properties() {
        let props = CoreProperties {
            title: "春游记".to_string(),
            author: "Administrator".to_string(),
            comments: String::new(),
        };
        let xml = String::from_utf8(core_xml(&props).unwrap()).unwrap();
        assert!(xml.contains("<dc:creator>Administrator</dc:creator>"));
        assert!(xml.contains("<dc:title>春游记</dc:title>"));
        assert!(xml.contains("<dc:description></dc:description>"));
    }
}
