// src/env/mod.rs

//! Payload → process environment projection.
//!
//! Every run gets a private environment: the [`BaseEnv`] snapshot taken at
//! startup, overlaid with the flattened event payload. Nothing here touches
//! the real process environment, so projections are reproducible in tests.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Default prefix for projected variables (`gh_ref`, `gh_branch`, ...).
pub const DEFAULT_PREFIX: &str = "gh_";

/// Ref prefix from which the branch short name is derived.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Immutable snapshot of a base environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseEnv {
    vars: BTreeMap<String, String>,
}

impl BaseEnv {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Build a private environment for one run: base entries overlaid with
    /// `projected` (projected wins on collision).
    pub fn overlay(&self, projected: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut env = self.vars.clone();
        env.extend(projected.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BaseEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Name of the variable carrying captured output into a report command.
pub fn output_var(prefix: &str) -> String {
    format!("{prefix}output")
}

/// Make `value` usable as an environment value.
///
/// Process environments cannot hold NUL bytes, so they are removed.
pub fn env_value(value: &str) -> String {
    value.replace('\0', "")
}

/// Flatten a JSON payload into environment variables.
///
/// - scalars are stringified under `prefix + path` (path segments joined by `_`)
/// - NUL characters are dropped from string values
/// - nested objects recurse
/// - arrays and `null` are skipped
/// - a `ref` string starting with `refs/heads/` adds `<prefix>branch`
pub fn project(payload: &Value, prefix: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Value::Object(map) = payload {
        project_object(map, prefix, &mut out);
    }
    out
}

fn project_object(map: &Map<String, Value>, prefix: &str, out: &mut BTreeMap<String, String>) {
    for (key, value) in map {
        let name = format!("{prefix}{}", sanitize(key));
        match value {
            Value::String(s) => {
                out.insert(name, env_value(s));
            }
            Value::Number(n) => {
                out.insert(name, n.to_string());
            }
            Value::Bool(b) => {
                out.insert(name, b.to_string());
            }
            Value::Object(child) => project_object(child, &format!("{name}_"), out),
            Value::Array(_) | Value::Null => {}
        }
    }

    // Derived after the fields so an explicit `branch` in the payload wins.
    if let Some(Value::String(r)) = map.get("ref") {
        if let Some(branch) = r.strip_prefix(BRANCH_REF_PREFIX) {
            out.entry(format!("{prefix}branch"))
                .or_insert_with(|| env_value(branch));
        }
    }
}

/// Replace anything that is not `[A-Za-z0-9_]` with `_`.
fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flattens_nested_payload_with_branch() {
        let payload = json!({ "ref": "refs/heads/main", "a": { "b": 1 } });
        let env = project(&payload, "gh_");

        assert_eq!(env.get("gh_ref").map(String::as_str), Some("refs/heads/main"));
        assert_eq!(env.get("gh_branch").map(String::as_str), Some("main"));
        assert_eq!(env.get("gh_a_b").map(String::as_str), Some("1"));
        assert_eq!(env.len(), 3);
    }

    #[test]
    fn skips_arrays_and_nulls() {
        let payload = json!({
            "commits": [{ "id": "abc" }],
            "before": null,
            "forced": false,
            "size": 1.5
        });
        let env = project(&payload, "gh_");

        assert_eq!(env.get("gh_forced").map(String::as_str), Some("false"));
        assert_eq!(env.get("gh_size").map(String::as_str), Some("1.5"));
        assert!(!env.contains_key("gh_commits"));
        assert!(!env.contains_key("gh_before"));
    }

    #[test]
    fn tag_refs_do_not_derive_a_branch() {
        let env = project(&json!({ "ref": "refs/tags/v1.0" }), "gh_");
        assert!(!env.contains_key("gh_branch"));
    }

    #[test]
    fn nested_refs_derive_under_their_own_prefix() {
        let payload = json!({ "pull_request": { "head": { "ref": "refs/heads/feature/x" } } });
        let env = project(&payload, "gh_");
        assert_eq!(
            env.get("gh_pull_request_head_branch").map(String::as_str),
            Some("feature/x")
        );
    }

    #[test]
    fn explicit_branch_field_wins() {
        let payload = json!({ "ref": "refs/heads/main", "branch": "custom" });
        let env = project(&payload, "gh_");
        assert_eq!(env.get("gh_branch").map(String::as_str), Some("custom"));
    }

    #[test]
    fn keys_are_sanitized() {
        let env = project(&json!({ "head-commit": { "a.b": "x" } }), "gh_");
        assert_eq!(env.get("gh_head_commit_a_b").map(String::as_str), Some("x"));
    }

    #[test]
    fn nul_characters_never_reach_the_environment() {
        let payload = json!({
            "ref": "refs/heads/ma\u{0}in",
            "head_commit": { "message": "fix\u{0}bug" },
            "we\u{0}ird": "x"
        });
        let env = project(&payload, "gh_");

        assert_eq!(
            env.get("gh_head_commit_message").map(String::as_str),
            Some("fixbug")
        );
        assert_eq!(env.get("gh_branch").map(String::as_str), Some("main"));
        assert_eq!(env.get("gh_we_ird").map(String::as_str), Some("x"));
        assert!(env.iter().all(|(k, v)| !k.contains('\0') && !v.contains('\0')));
    }

    #[test]
    fn non_object_payloads_project_nothing() {
        assert!(project(&json!([1, 2]), "gh_").is_empty());
        assert!(project(&json!("x"), "gh_").is_empty());
    }

    #[test]
    fn overlay_prefers_projected_values() {
        let base: BaseEnv = [("PATH", "/bin"), ("gh_ref", "stale")].into_iter().collect();
        let projected = project(&json!({ "ref": "refs/heads/dev" }), "gh_");
        let env = base.overlay(&projected);

        assert_eq!(env.get("PATH").map(String::as_str), Some("/bin"));
        assert_eq!(env.get("gh_ref").map(String::as_str), Some("refs/heads/dev"));
        assert_eq!(base.get("gh_ref"), Some("stale"));
    }

    #[test]
    fn output_var_uses_prefix() {
        assert_eq!(output_var(DEFAULT_PREFIX), "gh_output");
    }
}
