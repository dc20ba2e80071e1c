//! Top-level orchestration (spec §2, §5): wires the ten-step data flow
//! together behind a single entry point. Waiver and baseline file I/O are
//! out of scope (spec §1) — callers load a `Vec<Waiver>` and an optional
//! `Baseline` themselves and hand them to [`Engine::scan`].

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use endpointguard_core::baseline::{self, Baseline, BaselineDiff};
use endpointguard_core::config::Config;
use endpointguard_core::errors::{EngineError, SkippedFile};
use endpointguard_core::traits::{Cancellable, CancellationToken, ProgressCallback};
use endpointguard_core::waiver::Waiver;

use crate::endpoints;
use crate::middleware;
use crate::model::{Endpoint, ScanResult, INDEX_VERSION, SCAN_RESULT_VERSION};
use crate::protection;
use crate::resolver::{load_tsconfig_chain, ModuleResolver, TsConfig};
use crate::rules;
use crate::scanner;
use crate::scoring;
use crate::wrappers;

/// Per-call inputs that don't belong to project configuration: previously
/// loaded waivers/baseline, and the optional progress/cancellation hooks
/// (spec §5).
#[derive(Default)]
pub struct ScanOptions<'a> {
    pub waivers: Vec<Waiver>,
    pub baseline: Option<Baseline>,
    pub progress: Option<ProgressCallback<'a>>,
    pub cancellation: Option<CancellationToken>,
}

pub struct ScanOutcome {
    pub result: ScanResult,
    pub baseline_diff: Option<BaselineDiff>,
}

pub struct Engine {
    root: PathBuf,
    config: Config,
}

impl Engine {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self { root: root.into(), config }
    }

    /// Run the full protection inference pipeline once (spec §2's ten steps).
    #[instrument(skip(self, options), fields(root = %self.root.display()))]
    pub fn scan(&self, mut options: ScanOptions<'_>) -> Result<ScanOutcome, EngineError> {
        let mut skipped_files = Vec::new();

        debug!(step = "detect_project");
        let detection = scanner::detect_project(&self.root, &self.config.framework);
        if !detection.ok {
            let reason = detection.reason.expect("detect_project sets a reason whenever ok=false");
            return Err(EngineError::Scan(reason));
        }
        let app_dir = detection.app_dir.expect("ok detection always carries an app_dir");
        check_cancelled(&options.cancellation)?;

        debug!(step = "scan_dependencies");
        let deps = scanner::scan_dependencies(&self.root, &self.config.hints);
        check_cancelled(&options.cancellation)?;

        debug!(step = "analyze_middleware");
        let middleware = middleware::analyze(&self.root, deps.workspace_root.as_deref());
        check_cancelled(&options.cancellation)?;

        let tsconfig = load_tsconfig(&self.root);
        let resolver = ModuleResolver::new(self.root.clone(), tsconfig);

        report(&options.progress, "indexing routes");
        debug!(step = "discover_endpoints");
        let mut endpoints = endpoints::discover_all(&self.root, &app_dir, &resolver);
        check_cancelled(&options.cancellation)?;

        report(&options.progress, "resolving wrappers");
        debug!(step = "build_wrapper_index");
        let route_handlers: Vec<_> = endpoints
            .iter()
            .filter_map(|e| match e {
                Endpoint::RouteHandler(r) => Some(r.clone()),
                _ => None,
            })
            .collect();
        let wrapper_index = wrappers::build_index(&route_handlers, &self.root, &resolver, &deps.hints);
        check_cancelled(&options.cancellation)?;

        debug!(step = "compute_protection");
        let protections: Vec<(usize, crate::model::ProtectionSummary, Option<SkippedFile>)> = endpoints
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e {
                Endpoint::RouteHandler(r) => Some((i, r.clone())),
                _ => None,
            })
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(i, route)| {
                let path = self.root.join(&route.file);
                match std::fs::read_to_string(&path) {
                    Ok(text) => {
                        let summary = protection::compute(&route, &text, &wrapper_index, &middleware, &deps.hints);
                        (i, summary, None)
                    }
                    Err(e) => (
                        i,
                        crate::model::ProtectionSummary::default(),
                        Some(SkippedFile { path: route.file.clone(), reason: e.to_string() }),
                    ),
                }
            })
            .collect();

        for (i, summary, skip) in protections {
            if let Endpoint::RouteHandler(r) = &mut endpoints[i] {
                r.protection = Some(summary);
            }
            if let Some(skip) = skip {
                warn!(file = %skip.path, reason = %skip.reason, "skipped unreadable route file");
                skipped_files.push(skip);
            }
        }
        check_cancelled(&options.cancellation)?;

        report(&options.progress, "running rules");
        debug!(step = "run_rules");
        let findings = rules::run_all(&self.root, &endpoints, &wrapper_index, &deps.bitmap, &self.config, &deps.hints);
        check_cancelled(&options.cancellation)?;

        report(&options.progress, "applying waivers");
        debug!(step = "score");
        let now = chrono::Utc::now().date_naive();
        let scored = scoring::score(findings, &options.waivers, &self.config.scoring, now);
        check_cancelled(&options.cancellation)?;

        let config_hash = config_hash(&self.config);
        let tool_version = env!("CARGO_PKG_VERSION").to_string();

        let result = ScanResult {
            version: SCAN_RESULT_VERSION,
            tool_version: tool_version.clone(),
            config_hash: config_hash.clone(),
            index_version: INDEX_VERSION,
            timestamp: chrono::Utc::now(),
            framework: self.config.framework.clone(),
            dependencies: deps.bitmap,
            waived_count: scored.waived.len() as u32,
            severity_counts: scored.severity_counts,
            score: scored.score,
            status: scored.status,
            active_findings: scored.active,
            waived_findings: scored.waived,
            skipped_files,
        };

        let baseline_diff = options.baseline.take().map(|b| {
            let current_keys: Vec<String> = result
                .active_findings
                .iter()
                .map(|f| baseline::finding_key(f.rule_id.as_str(), &f.file, f.line))
                .collect();
            baseline::diff(&b, &current_keys)
        });

        Ok(ScanOutcome { result, baseline_diff })
    }
}

fn load_tsconfig(root: &Path) -> TsConfig {
    let path = root.join("tsconfig.json");
    if !path.is_file() {
        return TsConfig::default();
    }
    load_tsconfig_chain(&path).unwrap_or_default()
}

fn check_cancelled(token: &Option<CancellationToken>) -> Result<(), EngineError> {
    match token {
        Some(t) if t.is_cancelled() => Err(EngineError::Cancelled),
        _ => Ok(()),
    }
}

fn report(progress: &Option<ProgressCallback<'_>>, step: &str) {
    if let Some(cb) = progress {
        cb(step);
    }
}

/// A stable content hash of the config, used to detect a stale baseline
/// (spec §3: baseline keys must stay comparable across equivalent scans).
/// Hashed through `serde_json::Value` so the `rules` map's keys come out in
/// sorted order regardless of `HashMap` iteration order.
fn config_hash(config: &Config) -> String {
    let canonical = serde_json::to_value(config)
        .map(|v| v.to_string())
        .unwrap_or_default();
    let mut hasher = rustc_hash::FxHasher::default();
    std::hash::Hasher::write(&mut hasher, canonical.as_bytes());
    format!("{:016x}", std::hash::Hasher::finish(&hasher))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture_project(dir: &Path) {
        std::fs::write(dir.join("package.json"), r#"{"dependencies":{"next":"14.0.0"}}"#).unwrap();
        std::fs::create_dir_all(dir.join("app/api/users")).unwrap();
        std::fs::write(
            dir.join("app/api/users/route.ts"),
            r#"export async function POST(req: Request) {
  const body = await req.json();
  await db.user.create({ data: body });
  return Response.json({ ok: true });
}
"#,
        )
        .unwrap();
    }

    #[test]
    fn scans_a_minimal_fixture_project_and_flags_missing_auth() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture_project(dir.path());

        let engine = Engine::new(dir.path(), Config::default());
        let outcome = engine.scan(ScanOptions::default()).unwrap();

        assert_eq!(outcome.result.framework, "next");
        assert!(outcome
            .result
            .active_findings
            .iter()
            .any(|f| f.rule_id.as_str() == "AUTH-BOUNDARY-MISSING"));
    }

    #[test]
    fn fails_fast_when_project_detection_fails() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(dir.path(), Config::default());
        assert!(engine.scan(ScanOptions::default()).is_err());
    }

    #[test]
    fn config_hash_is_stable_across_calls() {
        let config = Config::default();
        assert_eq!(config_hash(&config), config_hash(&config));
    }

    #[test]
    fn respects_a_pre_cancelled_token() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture_project(dir.path());

        let token = CancellationToken::new();
        token.cancel();
        let engine = Engine::new(dir.path(), Config::default());
        let result = engine.scan(ScanOptions {
            cancellation: Some(token),
            ..Default::default()
        });
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }
}
