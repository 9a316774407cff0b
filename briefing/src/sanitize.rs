use scraper::Html;

/// Strips markup from a feed summary, returning its text content.
///
/// All text nodes are concatenated in document order, entities are decoded
/// by the HTML parser and surrounding whitespace is trimmed. Inner whitespace
/// is left as the feed wrote it.
pub fn plain_text(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

/// Length used by the summary threshold: Unicode scalar values, not bytes.
pub fn text_len(text: &str) -> usize {
    text.chars().count()
}
