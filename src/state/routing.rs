//! `#/<index>` fragment routing.
//!
//! The fragment is the only URL-encoded view of the selected tab. Parsing is
//! strict: anything but a slash followed by decimal digits is not a route.

use std::sync::OnceLock;

use regex::Regex;

fn route_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^#?/(\d+)$").ok())
        .as_ref()
}

/// Tab index encoded in a fragment such as `"#/3"`.
#[must_use]
pub fn parse_hash(fragment: &str) -> Option<usize> {
    let captures = route_pattern()?.captures(fragment.trim())?;
    captures.get(1)?.as_str().parse().ok()
}

/// Fragment for a tab index.
#[must_use]
pub fn hash_for(index: usize) -> String {
    format!("#/{index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_index_routes() {
        assert_eq!(parse_hash("#/3"), Some(3));
        assert_eq!(parse_hash("/0"), Some(0));
        assert_eq!(parse_hash(" #/12 "), Some(12));
    }

    #[test]
    fn rejects_everything_else() {
        for bad in ["", "#", "#/", "#/-1", "#/1a", "#/1/2", "#3", "#/ 3", "#/99999999999999999999999"] {
            assert_eq!(parse_hash(bad), None, "{bad:?} should not parse");
        }
    }

    #[test]
    fn hash_for_roundtrips() {
        assert_eq!(hash_for(7), "#/7");
        assert_eq!(parse_hash(&hash_for(42)), Some(42));
    }
}
