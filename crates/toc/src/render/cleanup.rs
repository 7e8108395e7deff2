use unicode_normalization::UnicodeNormalization;

const LIGATURES: [(char, &str); 5] = [
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Clean up a title recovered from a PDF.
///
/// Applies NFC normalization, expands ligatures, drops replacement
/// characters and soft hyphens, and collapses whitespace (control characters
/// count as whitespace).
pub fn clean_title(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.nfc() {
        match LIGATURES.iter().find(|(lig, _)| *lig == c) {
            Some((_, expanded)) => result.push_str(expanded),
            None if c == '\u{FFFD}' || c == '\u{00AD}' => {}
            None if c.is_control() => result.push(' '),
            None => result.push(c),
        }
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}
