use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

pub trait Preprocessor {
    // Default query cleanup
    fn process(&self, text: &str) -> String {
        let text = text.trim();

        if text.is_empty() {
            return String::new();
        }

        // Unicode normalization (NFKC), then collapse whitespace and newlines
        let text: String = text.nfkc().collect();
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

pub struct DefaultPreprocessor;
impl Preprocessor for DefaultPreprocessor {}

/// Case folding used for headword identity
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Strips combining marks: "café" becomes "cafe"
pub fn fold_diacritics(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Key for collation within a match tier: accents and case only break ties
pub fn collation_key(text: &str) -> String {
    fold_case(&fold_diacritics(text))
}

pub fn collate(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| fold_case(a).cmp(&fold_case(b)))
        .then_with(|| a.cmp(b))
}

/// Splits on anything that is not a letter or digit
pub fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Token transform shared by full-text queries and the indexes they run against
pub fn normalize_token(token: &str, ignore_diacritics: bool) -> String {
    if ignore_diacritics {
        collation_key(token)
    } else {
        fold_case(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preprocessor_collapses_whitespace() {
        assert_eq!(DefaultPreprocessor.process("  big\n\r  cat "), "big cat");
        assert_eq!(DefaultPreprocessor.process("   "), "");
        // full-width letters fold under NFKC
        assert_eq!(DefaultPreprocessor.process("ｔｅｓｔ"), "test");
    }

    #[test]
    fn folds_diacritics() {
        assert_eq!(fold_diacritics("café"), "cafe");
        assert_eq!(fold_diacritics("Ångström"), "Angstrom");
        assert_eq!(collation_key("Éclair"), "eclair");
    }

    #[test]
    fn collation_orders_accents_next_to_base_letters() {
        let mut list = vec!["zebra", "Éclair", "eagle", "ecru"];
        list.sort_by(|a, b| collate(a, b));
        assert_eq!(list, vec!["eagle", "Éclair", "ecru", "zebra"]);
    }

    #[test]
    fn splits_words() {
        assert_eq!(words("river-bank, (old)"), vec!["river", "bank", "old"]);
    }
}
