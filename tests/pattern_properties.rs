// tests/pattern_properties.rs

use proptest::prelude::*;
use trigger::watch::{Pattern, PatternKind, PatternSet, classify};

proptest! {
    #[test]
    fn slash_delimited_strings_are_regexes(s in ".*") {
        let expected = s.len() >= 2 && s.starts_with('/') && s.ends_with('/');
        prop_assert_eq!(classify(&s) == PatternKind::Regex, expected);
    }

    #[test]
    fn compiled_kind_follows_classification(s in "/?[a-z0-9 ]{0,8}/?") {
        prop_assume!(!s.is_empty());
        let pattern = Pattern::compile(&s).unwrap();
        prop_assert_eq!(pattern.kind(), classify(&s));
        prop_assert_eq!(pattern.as_str(), s.as_str());
    }

    #[test]
    fn star_glob_matches_any_line_whole(line in "[^\r\n]*") {
        let set = PatternSet::compile(&["*"]).unwrap();
        prop_assert_eq!(set.find(line.as_bytes()), Some(line.clone()));
    }

    #[test]
    fn literal_regex_reports_exactly_the_literal(
        prefix in "[a-z ]{0,10}",
        suffix in "[a-z ]{0,10}",
    ) {
        let set = PatternSet::compile(&["/ERROR/"]).unwrap();
        let line = format!("{prefix}ERROR{suffix}");
        prop_assert_eq!(set.find(line.as_bytes()), Some("ERROR".to_string()));
    }
}
