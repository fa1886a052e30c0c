// tests/property.rs

use proptest::prelude::*;
use serde_json::{Map, Value};

use hookrun::config::parse_rule_string;
use hookrun::env::project;
use hookrun::types::ExecSpec;

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        ".{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
            prop::collection::btree_map(".{0,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

proptest! {
    #[test]
    fn projected_names_are_env_safe(payload in json_value()) {
        for name in project(&payload, "gh_").keys() {
            prop_assert!(name.starts_with("gh_"));
            prop_assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }
    }

    #[test]
    fn compact_rules_split_on_first_two_colons(
        event in "[a-z_*]{1,12}",
        match_expr in "[a-z .=]{1,20}",
        exec in "[a-z :$/]{1,30}",
    ) {
        let rule = parse_rule_string(&format!("{event}:{match_expr}:{exec}")).unwrap();
        prop_assert_eq!(rule.event, event);
        prop_assert_eq!(rule.match_expr, match_expr);
        prop_assert_eq!(rule.exec, ExecSpec::Shell(exec));
    }

    #[test]
    fn strings_without_two_colons_are_discarded(s in "[^:]{0,20}(:[^:]{0,20})?") {
        prop_assert!(parse_rule_string(&s).is_none());
    }
}
