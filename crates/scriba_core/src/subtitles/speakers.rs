//! Speaker name mapping from the CLI string format.

use std::collections::BTreeMap;

/// Parse `A=Marcel,B=Agustin` into a label-to-name map.
///
/// Only the first `=` in each token splits, so values may contain `=`.
/// Tokens without `=` are skipped. Empty input gives an empty map.
pub fn parse_speaker_names(raw: &str) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();

    for token in raw.split(',') {
        if let Some((key, value)) = token.trim().split_once('=') {
            result.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    result
}

/// Map a raw speaker label through the name map, falling back to the
/// label itself.
pub fn display_name<'a>(label: &'a str, names: &'a BTreeMap<String, String>) -> &'a str {
    names.get(label).map(String::as_str).unwrap_or(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_mapping() {
        let names = parse_speaker_names("A=Marcel,B=Agustin");
        assert_eq!(names.get("A").map(String::as_str), Some("Marcel"));
        assert_eq!(names.get("B").map(String::as_str), Some("Agustin"));
    }

    #[test]
    fn values_may_contain_equals() {
        let names = parse_speaker_names("A=x=y");
        assert_eq!(names.get("A").map(String::as_str), Some("x=y"));
    }

    #[test]
    fn tokens_without_equals_are_skipped() {
        let names = parse_speaker_names("A=Marcel,oops,B=Agustin");
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn whitespace_is_trimmed() {
        let names = parse_speaker_names(" A = Marcel , B = Agustin ");
        assert_eq!(names.get("A").map(String::as_str), Some("Marcel"));
        assert_eq!(names.get("B").map(String::as_str), Some("Agustin"));
    }

    #[test]
    fn empty_input_gives_empty_map() {
        assert!(parse_speaker_names("").is_empty());
    }

    #[test]
    fn display_name_falls_back_to_label() {
        let names = parse_speaker_names("A=Marcel");
        assert_eq!(display_name("A", &names), "Marcel");
        assert_eq!(display_name("B", &names), "B");
    }
}
