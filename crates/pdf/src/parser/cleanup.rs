use unicode_normalization::UnicodeNormalization;

const LIGATURES: [(char, &str); 7] = [
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Clean up the text of one extracted span.
///
/// Applies NFC normalization, expands ligatures, drops replacement and
/// control characters, and turns line breaks and tabs into spaces. Leading
/// and trailing spaces are kept; titles are trimmed later.
pub fn clean_span_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfc() {
        match c {
            '\n' | '\r' | '\t' => out.push(' '),
            '\u{FFFD}' => {}
            c if c.is_control() => {}
            c => match LIGATURES.iter().find(|(lig, _)| *lig == c) {
                Some((_, expanded)) => out.push_str(expanded),
                None => out.push(c),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        assert_eq!(clean_span_text(" Hello world. "), " Hello world. ");
    }

    #[test]
    fn test_ligatures() {
        assert_eq!(clean_span_text("\u{FB01}nd"), "find");
        assert_eq!(clean_span_text("a\u{FB04}e"), "affle");
    }

    #[test]
    fn test_replacement_and_control_chars_removed() {
        assert_eq!(clean_span_text("Hello\u{FFFD}\u{0}World"), "HelloWorld");
    }

    #[test]
    fn test_line_breaks_become_spaces() {
        assert_eq!(clean_span_text("Chapter\n1"), "Chapter 1");
    }

    #[test]
    fn test_nfc_normalization() {
        assert_eq!(clean_span_text("cafe\u{0301}"), "caf\u{00E9}");
    }
}
