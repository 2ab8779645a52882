//! Utility functions.

/// Escape text for HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Format a correlation id for inclusion in a user-facing failure message.
///
/// The id appears both here and in the corresponding log entry, so an
/// operator can find the log line from a user's screenshot.
pub fn embed_correlation_id(id: &str) -> String {
    format!("\n(<code>{id}</code>)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_special_characters() {
        assert_eq!(escape_html("a <b> & c"), "a &lt;b&gt; &amp; c");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn correlation_id_is_wrapped_in_code_tags() {
        assert_eq!(embed_correlation_id("abc"), "\n(<code>abc</code>)");
    }
}
