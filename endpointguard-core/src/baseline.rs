//! Baseline file format and diffing (spec §4.10, §6, scenario S8).
//!
//! A baseline is a snapshot of a prior scan's findings, keyed by
//! `ruleId::file::line` (line `0` when a finding has no specific line).
//! Diffing against a fresh finding set yields the findings newly introduced
//! since the baseline and the previously-known findings that have since been
//! resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::BaselineError;

pub const BASELINE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub version: u32,
    pub tool_version: String,
    pub config_hash: String,
    pub index_version: u32,
    pub created_at: DateTime<Utc>,
    pub score: f64,
    pub finding_keys: Vec<String>,
}

/// `ruleId::file::line`, with line `0` for findings with no specific line
/// (spec §6).
pub fn finding_key(rule_id: &str, file: &str, line: Option<u32>) -> String {
    format!("{rule_id}::{file}::{}", line.unwrap_or(0))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselineDiff {
    pub new_finding_keys: Vec<String>,
    pub resolved_finding_keys: Vec<String>,
}

impl BaselineDiff {
    pub fn new_count(&self) -> usize {
        self.new_finding_keys.len()
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved_finding_keys.len()
    }
}

/// Diff a fresh set of finding keys against a previously-recorded baseline.
///
/// Order of `current_keys` is preserved in `new_finding_keys`; `resolved`
/// keys follow the baseline's original order.
pub fn diff(baseline: &Baseline, current_keys: &[String]) -> BaselineDiff {
    let previous: std::collections::HashSet<&str> =
        baseline.finding_keys.iter().map(String::as_str).collect();
    let current: std::collections::HashSet<&str> = current_keys.iter().map(String::as_str).collect();

    let new_finding_keys = current_keys
        .iter()
        .filter(|k| !previous.contains(k.as_str()))
        .cloned()
        .collect();
    let resolved_finding_keys = baseline
        .finding_keys
        .iter()
        .filter(|k| !current.contains(k.as_str()))
        .cloned()
        .collect();

    BaselineDiff {
        new_finding_keys,
        resolved_finding_keys,
    }
}

pub fn read_baseline(path: &std::path::Path) -> Result<Option<Baseline>, BaselineError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).map_err(|e| BaselineError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let baseline = serde_json::from_str(&text).map_err(|e| BaselineError::ParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(baseline))
}

pub fn write_baseline(path: &std::path::Path, baseline: &Baseline) -> Result<(), BaselineError> {
    let json = serde_json::to_string_pretty(baseline).map_err(|e| BaselineError::ParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| BaselineError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(keys: &[&str]) -> Baseline {
        Baseline {
            version: BASELINE_VERSION,
            tool_version: "0.1.0".to_string(),
            config_hash: "deadbeef".to_string(),
            index_version: 1,
            created_at: Utc::now(),
            score: 80.0,
            finding_keys: keys.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn finding_key_defaults_line_to_zero() {
        assert_eq!(finding_key("R", "f.ts", None), "R::f.ts::0");
        assert_eq!(finding_key("R", "f.ts", Some(12)), "R::f.ts::12");
    }

    #[test]
    fn diff_identifies_new_and_resolved() {
        let b = baseline(&["R::a.ts::0", "R::b.ts::0"]);
        let current = vec!["R::a.ts::0".to_string(), "R::c.ts::0".to_string()];
        let d = diff(&b, &current);
        assert_eq!(d.new_finding_keys, vec!["R::c.ts::0".to_string()]);
        assert_eq!(d.resolved_finding_keys, vec!["R::b.ts::0".to_string()]);
    }

    #[test]
    fn diff_against_identical_set_is_empty() {
        let b = baseline(&["R::a.ts::0"]);
        let current = vec!["R::a.ts::0".to_string()];
        let d = diff(&b, &current);
        assert!(d.new_finding_keys.is_empty());
        assert!(d.resolved_finding_keys.is_empty());
    }

    #[test]
    fn round_trip_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let b = baseline(&["R::a.ts::0"]);
        write_baseline(&path, &b).unwrap();
        let back = read_baseline(&path).unwrap().unwrap();
        assert_eq!(back.finding_keys, b.finding_keys);
        assert_eq!(back.score, b.score);
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(read_baseline(&path).unwrap().is_none());
    }
}
