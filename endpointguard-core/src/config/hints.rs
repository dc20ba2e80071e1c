//! User-supplied recognition hints (spec §4.2, §6).
//!
//! These are the *user's* additions; the dependency scanner derives a base
//! set from the detected ecosystem and union-merges it with these at scan
//! time (spec §4.2: "de-duplicated, order irrelevant").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthHints {
    pub functions: Vec<String>,
    pub middleware_files: Vec<String>,
    pub allowlist_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimitHints {
    pub wrappers: Vec<String>,
    pub allowlist_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TenancyHints {
    pub org_field_names: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HintsConfig {
    pub auth: AuthHints,
    pub rate_limit: RateLimitHints,
    pub tenancy: TenancyHints,
}

/// De-duplicated, order-irrelevant union merge (spec §4.2).
pub fn union_merge(base: &[String], extra: &[String]) -> Vec<String> {
    let mut set: std::collections::BTreeSet<String> = base.iter().cloned().collect();
    set.extend(extra.iter().cloned());
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_merge_dedupes() {
        let merged = union_merge(
            &["a".to_string(), "b".to_string()],
            &["b".to_string(), "c".to_string()],
        );
        assert_eq!(merged, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }
}
