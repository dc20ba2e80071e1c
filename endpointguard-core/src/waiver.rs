//! Waiver file format (spec §3, §4.10, §6).
//!
//! A waiver matches a finding when rule-id and file are equal; an expiry in
//! the past disables the waiver. The on-disk format accepts either the
//! versioned shape or a legacy bare array, and is always written versioned.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::WaiverError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waiver {
    pub rule_id: String,
    pub file: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Waiver {
    /// A waiver with an expiry strictly in the past (relative to `now`) is disabled.
    pub fn is_active(&self, now: NaiveDate) -> bool {
        match &self.expiry {
            None => true,
            Some(expiry) => match NaiveDate::parse_from_str(expiry, "%Y-%m-%d") {
                Ok(date) => date >= now,
                // An unparsable expiry is treated conservatively as expired,
                // not as a hard error — the waiver file is otherwise valid.
                Err(_) => false,
            },
        }
    }

    /// Does this waiver apply to a finding with the given rule id and file?
    pub fn matches(&self, rule_id: &str, file: &str, now: NaiveDate) -> bool {
        self.is_active(now) && self.rule_id == rule_id && self.file == file
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionedWaiverFile {
    version: u32,
    waivers: Vec<Waiver>,
}

/// Read a waiver file, accepting either the versioned `{version, waivers}`
/// shape or a legacy bare JSON array (spec §6).
pub fn read_waivers(path: &std::path::Path) -> Result<Vec<Waiver>, WaiverError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path).map_err(|e| WaiverError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_waivers(&text, &path.display().to_string())
}

pub fn parse_waivers(text: &str, path_for_errors: &str) -> Result<Vec<Waiver>, WaiverError> {
    if let Ok(versioned) = serde_json::from_str::<VersionedWaiverFile>(text) {
        return Ok(versioned.waivers);
    }
    if let Ok(legacy) = serde_json::from_str::<Vec<Waiver>>(text) {
        return Ok(legacy);
    }
    Err(WaiverError::ParseError {
        path: path_for_errors.to_string(),
        message: "neither {version, waivers} nor a bare array".to_string(),
    })
}

/// Always written in versioned form, per spec §6.
pub fn write_waivers(path: &std::path::Path, waivers: &[Waiver]) -> Result<(), WaiverError> {
    let versioned = VersionedWaiverFile {
        version: 1,
        waivers: waivers.to_vec(),
    };
    let json = serde_json::to_string_pretty(&versioned).map_err(|e| WaiverError::ParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| WaiverError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiver(rule_id: &str, file: &str, expiry: Option<&str>) -> Waiver {
        Waiver {
            rule_id: rule_id.to_string(),
            file: file.to_string(),
            reason: "test".to_string(),
            expiry: expiry.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn legacy_bare_array_parses() {
        let text = r#"[{"ruleId":"R","file":"f.ts","reason":"x","createdAt":"2024-01-01T00:00:00Z"}]"#;
        let waivers = parse_waivers(text, "test").unwrap();
        assert_eq!(waivers.len(), 1);
        assert_eq!(waivers[0].rule_id, "R");
    }

    #[test]
    fn versioned_shape_parses() {
        let text = r#"{"version":1,"waivers":[]}"#;
        let waivers = parse_waivers(text, "test").unwrap();
        assert!(waivers.is_empty());
    }

    #[test]
    fn expired_waiver_is_inactive() {
        let w = waiver("R", "f.ts", Some("2000-01-01"));
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(!w.is_active(today));
        assert!(!w.matches("R", "f.ts", today));
    }

    #[test]
    fn future_expiry_is_active() {
        let w = waiver("R", "f.ts", Some("2999-01-01"));
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(w.matches("R", "f.ts", today));
    }

    #[test]
    fn no_expiry_never_expires() {
        let w = waiver("R", "f.ts", None);
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(w.matches("R", "f.ts", today));
    }

    #[test]
    fn round_trip_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waivers.json");
        let waivers = vec![waiver("AUTH-BOUNDARY-MISSING", "app/api/x/route.ts", None)];
        write_waivers(&path, &waivers).unwrap();
        let back = read_waivers(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].rule_id, waivers[0].rule_id);
        assert_eq!(back[0].file, waivers[0].file);
    }
}
