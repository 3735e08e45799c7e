use proptest::prelude::*;

use relsync::files::parse_patterns;
use relsync::release::merge_body;

fn body() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-zA-Z0-9 ]{0,24}")
}

proptest! {
    #[test]
    fn replace_mode_never_keeps_old_text_when_new_is_given(
        existing in body(),
        supplied in "[a-zA-Z0-9 ]{1,24}",
    ) {
        let merged = merge_body(existing.as_deref(), Some(&supplied), false);
        prop_assert_eq!(merged, supplied);
    }

    #[test]
    fn append_mode_keeps_both_sides(
        existing in "[a-zA-Z0-9 ]{1,24}",
        supplied in "[a-zA-Z0-9 ]{1,24}",
    ) {
        let merged = merge_body(Some(&existing), Some(&supplied), true);
        prop_assert_eq!(merged, format!("{existing}\n{supplied}"));
    }

    #[test]
    fn missing_supplied_body_keeps_existing(existing in body(), append in any::<bool>()) {
        let merged = merge_body(existing.as_deref(), None, append);
        prop_assert_eq!(merged, existing.unwrap_or_default());
    }

    #[test]
    fn parsed_patterns_are_trimmed_and_non_empty(input in "[a-z*., \n]{0,40}") {
        for pattern in parse_patterns(&input) {
            prop_assert!(!pattern.is_empty());
            prop_assert_eq!(pattern.trim(), pattern.as_str());
            prop_assert!(!pattern.contains(','));
            prop_assert!(!pattern.contains('\n'));
        }
    }
}
