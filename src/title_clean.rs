/// Soft hyphen the extractor leaves between shelf-location letters.
const SOFT_HYPHEN: char = '\u{AD}';

fn is_code_char(ch: char) -> bool {
    ch.is_ascii_uppercase() || ch.is_ascii_digit()
}

/// `[A-Z]\u{AD}[A-Z0-9]+` at the start, e.g. `B­12 Title`.
fn starts_with_lettered_code(title: &str) -> bool {
    let mut chars = title.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(letter), Some(SOFT_HYPHEN), Some(code))
            if letter.is_ascii_uppercase() && is_code_char(code)
    )
}

/// `\u{AD}[A-Z0-9]+` at the start.
fn starts_with_bare_code(title: &str) -> bool {
    let mut chars = title.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(SOFT_HYPHEN), Some(code)) if is_code_char(code)
    )
}

fn starts_with_two_digits(title: &str) -> bool {
    let bytes = title.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_digit() && bytes[1].is_ascii_digit()
}

/// Everything after the first `words` single-space-separated words; empty if
/// there is nothing after them.
fn drop_leading_words(title: &str, words: usize) -> String {
    title
        .splitn(words + 1, ' ')
        .nth(words)
        .unwrap_or_default()
        .to_string()
}

/// Removes shelf-location codes that the tokenizer left at the front of a
/// title. The rules run in order, each on the previous result.
#[must_use]
pub fn strip_location_codes(title: &str) -> String {
    let mut title = title.to_string();
    if starts_with_lettered_code(&title) {
        title = drop_leading_words(&title, 1);
    }
    if starts_with_bare_code(&title) {
        title = drop_leading_words(&title, 1);
    }
    if title.starts_with('/') {
        title = drop_leading_words(&title, 2);
    }
    if starts_with_two_digits(&title) {
        title = drop_leading_words(&title, 1);
    }
    title
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::strip_location_codes;

    #[test]
    fn strips_each_code_shape() {
        assert_eq!(strip_location_codes("B\u{AD}12 Night Garden"), "Night Garden");
        assert_eq!(strip_location_codes("\u{AD}C4 Night Garden"), "Night Garden");
        assert_eq!(strip_location_codes("/ 7A Night Garden"), "Night Garden");
        assert_eq!(strip_location_codes("14 Night Garden"), "Night Garden");
    }

    #[test]
    fn rules_chain_in_order() {
        assert_eq!(strip_location_codes("B\u{AD}12 / 7 Night"), "Night");
        assert_eq!(strip_location_codes("\u{AD}A1 22 Night"), "Night");
    }

    #[test]
    fn leaves_plain_titles_alone() {
        assert_eq!(strip_location_codes("Night Garden"), "Night Garden");
        assert_eq!(strip_location_codes("7 Wonders"), "7 Wonders");
        assert_eq!(strip_location_codes("B-12 Bomber"), "B-12 Bomber");
        assert_eq!(strip_location_codes(""), "");
    }

    #[test]
    fn code_without_a_title_leaves_nothing() {
        assert_eq!(strip_location_codes("B\u{AD}12"), "");
    }
}
