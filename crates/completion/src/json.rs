/// Locates the outermost `open`..`close` pair in a model reply.
///
/// Markdown fences and explanatory prose around the payload are dropped: the
/// span runs from the first `open` to the last `close`.
#[must_use]
pub fn extract_json_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..end + close.len_utf8()])
}

#[must_use]
pub fn extract_json_array(text: &str) -> Option<&str> {
    extract_json_span(text, '[', ']')
}

#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    extract_json_span(text, '{', '}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fences() {
        let reply = "```json\n[{\"requirement_text\": \"a\"}]\n```";
        assert_eq!(
            extract_json_array(reply),
            Some("[{\"requirement_text\": \"a\"}]")
        );
    }

    #[test]
    fn strips_surrounding_prose() {
        let reply = "Sure, here is the verdict:\n{\"status\": \"PRESENT\", \"justification\": \"{ok}\"}\nLet me know.";
        assert_eq!(
            extract_json_object(reply),
            Some("{\"status\": \"PRESENT\", \"justification\": \"{ok}\"}")
        );
    }

    #[test]
    fn missing_or_reversed_brackets_yield_none() {
        assert_eq!(extract_json_array("NORMALIZATION_FAILED"), None);
        assert_eq!(extract_json_array("] then ["), None);
        assert_eq!(extract_json_object("{ unterminated"), None);
    }
}
