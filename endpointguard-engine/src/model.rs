//! Core records produced by the pipeline: endpoints, wrapper analyses,
//! protection summaries, and findings (spec §3).

use std::collections::BTreeMap;

use endpointguard_core::{Confidence, Severity};
use serde::{Deserialize, Serialize};

/// Textual evidence that a handler writes to persistent state or ingests
/// user input. `mutation_evidence` is derived, never set directly — it
/// always equals `db_write_evidence || payment_write_evidence || body_read`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSignals {
    pub mutation_evidence: bool,
    pub db_write_evidence: bool,
    pub payment_write_evidence: bool,
    pub body_read: bool,
    pub details: Vec<String>,
}

impl MutationSignals {
    pub fn new() -> Self {
        Self::default()
    }

    fn recompute(&mut self) {
        self.mutation_evidence = self.db_write_evidence || self.payment_write_evidence || self.body_read;
    }

    pub fn mark_db_write(&mut self, detail: impl Into<String>) {
        self.db_write_evidence = true;
        self.details.push(detail.into());
        self.recompute();
    }

    pub fn mark_payment_write(&mut self, detail: impl Into<String>) {
        self.payment_write_evidence = true;
        self.details.push(detail.into());
        self.recompute();
    }

    pub fn mark_body_read(&mut self, detail: impl Into<String>) {
        self.body_read = true;
        self.details.push(detail.into());
        self.recompute();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RpcProcedureType {
    Public,
    Protected,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RpcProcedureKind {
    Mutation,
    Query,
    Subscription,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIntent {
    pub reason: String,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MalformedPublicIntent {
    pub line: u32,
    pub raw_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHandler {
    pub file: String,
    pub methods: Option<String>,
    pub pathname: Option<String>,
    pub is_api: bool,
    pub signals: MutationSignals,
    pub public_intent: Option<PublicIntent>,
    pub malformed_public_intent: Option<MalformedPublicIntent>,
    /// Written exactly once, before rules run (spec §3 lifecycle).
    pub protection: Option<ProtectionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAction {
    pub file: String,
    pub exported_name: Option<String>,
    pub signals: MutationSignals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcProcedure {
    pub name: String,
    pub file: String,
    pub line: u32,
    pub procedure_type: RpcProcedureType,
    pub procedure_kind: RpcProcedureKind,
    pub signals: MutationSignals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Endpoint {
    RouteHandler(RouteHandler),
    ServerAction(ServerAction),
    RpcProcedure(RpcProcedure),
}

impl Endpoint {
    pub fn file(&self) -> &str {
        match self {
            Endpoint::RouteHandler(r) => &r.file,
            Endpoint::ServerAction(a) => &a.file,
            Endpoint::RpcProcedure(p) => &p.file,
        }
    }

    pub fn signals(&self) -> &MutationSignals {
        match self {
            Endpoint::RouteHandler(r) => &r.signals,
            Endpoint::ServerAction(a) => &a.signals,
            Endpoint::RpcProcedure(p) => &p.signals,
        }
    }

    pub fn is_mutation(&self) -> bool {
        match self {
            Endpoint::RpcProcedure(p) => {
                matches!(p.procedure_kind, RpcProcedureKind::Mutation) || self.signals().mutation_evidence
            }
            _ => self.signals().mutation_evidence,
        }
    }
}

/// Evidence accumulated while analyzing a wrapper's definition body (spec §3, §4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperEvidence {
    pub auth_call_present: bool,
    pub auth_enforced: bool,
    pub rate_limit_call_present: bool,
    pub rate_limit_enforced: bool,
    pub auth_details: Vec<String>,
    pub rate_limit_details: Vec<String>,
}

impl WrapperEvidence {
    /// Invariant: `authEnforced ⇒ authCallPresent` (and the rate-limit analogue).
    pub fn set_auth_enforced(&mut self, detail: impl Into<String>) {
        self.auth_call_present = true;
        self.auth_enforced = true;
        self.auth_details.push(detail.into());
    }

    pub fn set_auth_call(&mut self, detail: impl Into<String>) {
        self.auth_call_present = true;
        self.auth_details.push(detail.into());
    }

    pub fn set_rate_limit_enforced(&mut self, detail: impl Into<String>) {
        self.rate_limit_call_present = true;
        self.rate_limit_enforced = true;
        self.rate_limit_details.push(detail.into());
    }

    pub fn set_rate_limit_call(&mut self, detail: impl Into<String>) {
        self.rate_limit_call_present = true;
        self.rate_limit_details.push(detail.into());
    }
}

/// One record per distinct wrapper name encountered in the project, keyed
/// by that name in an arena-style hash map (spec §9: "arena + indices").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperAnalysis {
    pub name: String,
    pub definition_file: Option<String>,
    pub resolved: bool,
    pub evidence: WrapperEvidence,
    pub usage_count: u32,
    pub usage_files: Vec<String>,
    pub mutation_route_count: u32,
}

impl WrapperAnalysis {
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition_file: None,
            resolved: false,
            evidence: WrapperEvidence::default(),
            usage_count: 0,
            usage_files: Vec::new(),
            mutation_route_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtectionSource {
    Direct,
    Hint,
    Wrapper,
    Middleware,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionStatus {
    pub satisfied: bool,
    pub enforced: bool,
    pub sources: Vec<ProtectionSource>,
    pub details: Vec<String>,
    pub unverified_wrappers: Vec<String>,
}

impl ProtectionStatus {
    pub fn satisfy(&mut self, source: ProtectionSource, enforced: bool, detail: impl Into<String>) {
        self.satisfied = true;
        self.enforced = enforced;
        self.sources.push(source);
        self.details.push(detail.into());
    }

    pub fn defer_to_wrapper(&mut self, wrapper_detail: impl Into<String>) {
        self.unverified_wrappers.push(wrapper_detail.into());
    }

    /// Strongly-enforced auth is `satisfied ∧ enforced` (spec glossary).
    pub fn is_strong(&self) -> bool {
        self.satisfied && self.enforced
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionSummary {
    pub auth: ProtectionStatus,
    pub rate_limit: ProtectionStatus,
}

/// Closed rule-id vocabulary (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleId {
    #[serde(rename = "AUTH-BOUNDARY-MISSING")]
    AuthBoundaryMissing,
    #[serde(rename = "RATE-LIMIT-MISSING")]
    RateLimitMissing,
    #[serde(rename = "TENANCY-SCOPE-MISSING")]
    TenancyScopeMissing,
    #[serde(rename = "INPUT-VALIDATION-MISSING")]
    InputValidationMissing,
    #[serde(rename = "WRAPPER-UNRECOGNIZED")]
    WrapperUnrecognized,
    #[serde(rename = "PUBLIC-INTENT-MISSING-REASON")]
    PublicIntentMissingReason,
}

impl RuleId {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::AuthBoundaryMissing => "AUTH-BOUNDARY-MISSING",
            RuleId::RateLimitMissing => "RATE-LIMIT-MISSING",
            RuleId::TenancyScopeMissing => "TENANCY-SCOPE-MISSING",
            RuleId::InputValidationMissing => "INPUT-VALIDATION-MISSING",
            RuleId::WrapperUnrecognized => "WRAPPER-UNRECOGNIZED",
            RuleId::PublicIntentMissingReason => "PUBLIC-INTENT-MISSING-REASON",
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule_id: RuleId,
    pub severity: Severity,
    pub confidence: Confidence,
    pub message: String,
    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub end_line: Option<u32>,
    pub end_column: Option<u32>,
    pub snippet: Option<String>,
    pub evidence: Vec<String>,
    pub confidence_rationale: String,
    pub remediation: Vec<String>,
    pub tags: Vec<String>,
}

impl Finding {
    /// `ruleId::file::line|0` (spec §3, §6).
    pub fn key(&self) -> String {
        endpointguard_core::baseline::finding_key(self.rule_id.as_str(), &self.file, self.line)
    }
}

/// Bit-set of recognized ecosystem dependencies (spec §4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyBitmap {
    pub auth_providers: Vec<String>,
    pub rate_limit_packages: Vec<String>,
    pub orms: Vec<String>,
    pub has_typed_rpc: bool,
}

impl DependencyBitmap {
    pub fn has_any_auth_provider(&self) -> bool {
        !self.auth_providers.is_empty()
    }

    pub fn has_any_orm(&self) -> bool {
        !self.orms.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pass,
    Warn,
    Fail,
}

impl ScanStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ScanStatus::Pass
        } else if score >= 50.0 {
            ScanStatus::Warn
        } else {
            ScanStatus::Fail
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityCounts {
    pub critical: u32,
    pub high: u32,
    pub med: u32,
    pub low: u32,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Med => self.med += 1,
            Severity::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub version: u32,
    pub tool_version: String,
    pub config_hash: String,
    pub index_version: u32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub framework: String,
    pub dependencies: DependencyBitmap,
    pub active_findings: Vec<Finding>,
    pub waived_findings: Vec<Finding>,
    pub severity_counts: SeverityCounts,
    pub waived_count: u32,
    pub score: f64,
    pub status: ScanStatus,
    pub skipped_files: Vec<endpointguard_core::errors::SkippedFile>,
}

pub const SCAN_RESULT_VERSION: u32 = 1;
pub const INDEX_VERSION: u32 = 1;

/// Ordering keys used for deterministic output (spec §5): sort by
/// `(ruleId, file, line, column)`.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.rule_id
            .cmp(&b.rule_id)
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line.unwrap_or(0).cmp(&b.line.unwrap_or(0)))
            .then_with(|| a.column.unwrap_or(0).cmp(&b.column.unwrap_or(0)))
    });
}

/// Wrappers are merged deterministically into a map keyed by name (spec §5, §9).
pub type WrapperIndex = BTreeMap<String, WrapperAnalysis>;
