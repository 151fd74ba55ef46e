//! Flattening of platform rich text into plain paragraphs.

use scraper::Html;

/// Split `text` into whitespace-trimmed, non-empty text fragments.
///
/// Markup is parsed as an HTML fragment and every text node becomes its own
/// fragment, so `<p>a</p><p>b</p>` yields `["a", "b"]`. Plain text yields a
/// single fragment.
pub fn paragraphs(text: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(text);
    fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_one_paragraph() {
        assert_eq!(paragraphs("  hello  "), vec!["hello"]);
    }

    #[test]
    fn test_markup_splits_on_text_nodes() {
        let html = r#"<p style="text-align: center">第一段</p><p> 第二段 <b>加粗</b></p>"#;
        assert_eq!(paragraphs(html), vec!["第一段", "第二段", "加粗"]);
    }

    #[test]
    fn test_blank_input_yields_nothing() {
        assert!(paragraphs("").is_empty());
        assert!(paragraphs("<p>   </p><br/>").is_empty());
    }

    #[test]
    fn test_entities_are_decoded() {
        assert_eq!(paragraphs("a &amp; b"), vec!["a & b"]);
    }
}
