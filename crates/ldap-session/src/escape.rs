//! DN and filter escaping pass-throughs.
//!
//! Thin wrappers over the underlying library's escaping with fixed flag
//! sets; no logic of their own.

/// Escapes a value for use as a DN component.
#[must_use]
pub fn escape_dn(value: &str) -> String {
    ldap3::dn_escape(value).into_owned()
}

/// Escapes a value for use inside a search filter.
#[must_use]
pub fn escape_filter(value: &str) -> String {
    ldap3::ldap_escape(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_metacharacters_are_escaped() {
        assert_eq!(escape_filter("a*(b)\\"), "a\\2a\\28b\\29\\5c");
        assert_eq!(escape_filter("plain"), "plain");
    }

    #[test]
    fn dn_special_characters_are_escaped() {
        let escaped = escape_dn("Doe, John");
        assert_ne!(escaped, "Doe, John");
        assert!(escaped.to_lowercase().contains("\\2c") || escaped.contains("\\,"));
    }
}
