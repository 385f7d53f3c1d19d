//! Language codes the card database can localise cards into.

/// Language codes accepted for localised card lookups.
pub const KNOWN_LANGUAGES: [&str; 10] = [
    "en", "es", "fr", "de", "it", "pt", "ja", "ko", "zhs", "zht",
];

/// Whether `code` is one of the known language codes.
pub fn is_known_language(code: &str) -> bool {
    KNOWN_LANGUAGES.contains(&code)
}

/// Comma-separated list of known codes for help output.
pub fn available_languages() -> String {
    KNOWN_LANGUAGES.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_validate() {
        for code in KNOWN_LANGUAGES {
            assert!(is_known_language(code), "{code} should be accepted");
        }
    }

    #[test]
    fn unknown_codes_rejected() {
        assert!(!is_known_language("xx"));
        assert!(!is_known_language(""));
        assert!(!is_known_language("EN"));
    }

    #[test]
    fn available_languages_lists_all() {
        let listed = available_languages();
        assert!(listed.starts_with("en, "));
        assert!(listed.ends_with("zht"));
    }
}
