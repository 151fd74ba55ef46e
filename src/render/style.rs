//! Layout policy: style presets per semantic role and the image sizing rule.

/// Font used for headings, bylines and subtitles (SimSun).
pub const SONG: &str = "宋体";
/// Font used for body text and captions (FangSong).
pub const FANGSONG: &str = "仿宋";

/// Marker in platform markup that forces a paragraph to be centered.
pub const CENTER_MARKER: &str = "text-align: center";

/// Portrait threshold for `height / width`.
pub const ASPECT_THRESHOLD: f64 = 1.5;
/// Display height of portrait images, in inches.
pub const PORTRAIT_HEIGHT_IN: f64 = 9.0;
/// Display width of every other image, in inches.
pub const LANDSCAPE_WIDTH_IN: f64 = 6.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// No explicit alignment; the paragraph flows with the document default.
    Inherit,
    Center,
}

/// Semantic role of a text paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Heading,
    Byline,
    Subtitle,
    BodyText,
    Caption,
}

/// Fully resolved paragraph style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: &'static str,
    pub size_pt: f32,
    pub bold: bool,
    pub alignment: Alignment,
    pub first_line_indent_cm: f32,
    /// Exact line height.
    pub line_spacing_pt: f32,
}

const FIRST_LINE_INDENT_CM: f32 = 0.75;
const LINE_SPACING_PT: f32 = 30.0;

impl TextStyle {
    const fn preset(font: &'static str, size_pt: f32, bold: bool, alignment: Alignment) -> Self {
        Self {
            font,
            size_pt,
            bold,
            alignment,
            first_line_indent_cm: FIRST_LINE_INDENT_CM,
            line_spacing_pt: LINE_SPACING_PT,
        }
    }

    /// Copy of this style with the alignment forced to centered.
    pub fn centered(self) -> Self {
        Self {
            alignment: Alignment::Center,
            ..self
        }
    }
}

impl Role {
    pub fn style(self) -> TextStyle {
        match self {
            Role::Heading => TextStyle::preset(SONG, 16.0, true, Alignment::Center),
            Role::Byline => TextStyle::preset(SONG, 12.0, false, Alignment::Center),
            Role::Subtitle => TextStyle::preset(SONG, 12.0, true, Alignment::Center),
            Role::BodyText => TextStyle::preset(FANGSONG, 12.0, false, Alignment::Inherit),
            Role::Caption => TextStyle::preset(FANGSONG, 10.0, false, Alignment::Center),
        }
    }
}

/// How an image is scaled on the page. The other dimension follows the
/// image's own aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplaySize {
    /// Fixed height, in inches.
    Height(f64),
    /// Fixed width, in inches.
    Width(f64),
}

/// Pick the display size from the dimensions the platform declared.
///
/// Portrait images (`height / width > 1.5`) get a fixed height, everything
/// else, including images with an unknown dimension, a fixed width.
pub fn display_size(height: Option<f64>, width: Option<f64>) -> DisplaySize {
    match (height, width) {
        (Some(h), Some(w)) if w > 0.0 && h / w > ASPECT_THRESHOLD => {
            DisplaySize::Height(PORTRAIT_HEIGHT_IN)
        }
        _ => DisplaySize::Width(LANDSCAPE_WIDTH_IN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let heading = Role::Heading.style();
        assert_eq!((heading.font, heading.size_pt, heading.bold), (SONG, 16.0, true));
        assert_eq!(heading.alignment, Alignment::Center);

        let byline = Role::Byline.style();
        assert!(!byline.bold);
        assert_eq!(byline.alignment, Alignment::Center);

        let subtitle = Role::Subtitle.style();
        assert!(subtitle.bold);
        assert_eq!(subtitle.size_pt, 12.0);

        let body = Role::BodyText.style();
        assert_eq!((body.font, body.size_pt, body.bold), (FANGSONG, 12.0, false));
        assert_eq!(body.alignment, Alignment::Inherit);

        let caption = Role::Caption.style();
        assert_eq!(caption.size_pt, 10.0);
        assert_eq!(caption.alignment, Alignment::Center);
    }

    #[test]
    fn test_every_role_shares_indent_and_spacing() {
        for role in [
            Role::Heading,
            Role::Byline,
            Role::Subtitle,
            Role::BodyText,
            Role::Caption,
        ] {
            let style = role.style();
            assert_eq!(style.first_line_indent_cm, 0.75);
            assert_eq!(style.line_spacing_pt, 30.0);
        }
    }

    #[test]
    fn test_display_size_threshold() {
        assert_eq!(
            display_size(Some(200.0), Some(100.0)),
            DisplaySize::Height(9.0)
        );
        // exactly 1.5 is not portrait
        assert_eq!(
            display_size(Some(150.0), Some(100.0)),
            DisplaySize::Width(6.5)
        );
        assert_eq!(
            display_size(Some(151.0), Some(100.0)),
            DisplaySize::Height(9.0)
        );
        assert_eq!(display_size(Some(100.0), Some(200.0)), DisplaySize::Width(6.5));
    }

    #[test]
    fn test_display_size_unknown_dimension_uses_width() {
        assert_eq!(display_size(None, Some(100.0)), DisplaySize::Width(6.5));
        assert_eq!(display_size(Some(900.0), None), DisplaySize::Width(6.5));
        assert_eq!(display_size(Some(900.0), Some(0.0)), DisplaySize::Width(6.5));
    }
}
