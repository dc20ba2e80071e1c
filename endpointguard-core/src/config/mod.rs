//! Configuration schema for endpointguard (spec §6).
//!
//! Loading a config file from disk is one of the thin, out-of-scope
//! collaborators (spec §1) — this module defines the shape and a minimal
//! `Config::load` that merges a discovered JSON file over the compiled
//! defaults, the way `DriftConfig::load` layers a project file over defaults,
//! just without the CLI/env layers (those live in the out-of-scope front end).

mod hints;
mod rules;
mod scoring;
mod ci;

pub use hints::{union_merge, AuthHints, HintsConfig, RateLimitHints, TenancyHints};
pub use rules::RuleConfig;
pub use scoring::ScoringConfig;
pub use ci::CiConfig;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Filenames searched near the project root, in order; first match wins
/// (spec §6: "discovered by name near the root, first match wins").
pub const CONFIG_FILE_CANDIDATES: &[&str] =
    &["endpointguard.config.json", ".endpointguardrc.json", ".endpointguardrc"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    pub key: Option<String>,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self { key: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub framework: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub ci: CiConfig,
    pub scoring: ScoringConfig,
    pub hints: HintsConfig,
    pub rules: HashMap<String, RuleConfig>,
    pub waivers_file: String,
    pub license: Option<LicenseConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            framework: "next".to_string(),
            include: Vec::new(),
            exclude: Vec::new(),
            ci: CiConfig::default(),
            scoring: ScoringConfig::default(),
            hints: HintsConfig::default(),
            rules: HashMap::new(),
            waivers_file: ".endpointguard/waivers.json".to_string(),
            license: None,
        }
    }
}

impl Config {
    /// Parse a config from a JSON string (unknown keys ignored, the way the
    /// teacher's TOML merge is forward-compatible).
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Discover and load the first matching config file under `root`,
    /// falling back to compiled defaults if none is present.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        for candidate in CONFIG_FILE_CANDIDATES {
            let path = root.join(candidate);
            if path.exists() {
                let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                    path: path.display().to_string(),
                    source: e,
                })?;
                let config = Self::from_json(&text).map_err(|_| ConfigError::ParseError {
                    path: path.display().to_string(),
                    message: "invalid JSON".to_string(),
                })?;
                Self::validate(&config)?;
                return Ok(config);
            }
        }
        Ok(Self::default())
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.scoring.start <= 0.0 {
            return Err(ConfigError::ValidationFailed {
                field: "scoring.start".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if let Some(min_score) = config.ci.min_score {
            if min_score > config.scoring.start as i64 {
                return Err(ConfigError::ValidationFailed {
                    field: "ci.minScore".to_string(),
                    message: "cannot exceed scoring.start".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back = Config::from_json(&json).unwrap();
        assert_eq!(back.framework, config.framework);
        assert_eq!(back.waivers_file, config.waivers_file);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = Config::from_json(r#"{"framework":"next","futureField":true}"#).unwrap();
        assert_eq!(config.framework, "next");
    }

    #[test]
    fn rejects_min_score_above_start() {
        let mut config = Config::default();
        config.ci.min_score = Some(9999);
        assert!(Config::validate(&config).is_err());
    }
}
