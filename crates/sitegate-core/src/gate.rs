//! Release gate: reduces a QA report to a weighted PASS/WARN/FAIL verdict.
//!
//! The scorer never errors. A signal that could not be gathered degrades its
//! gate to `warn`.

use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::qa::report::{ArtifactPresence, DiffOutcome, QaReport, ReportSummary};

pub const ARTIFACTS_WEIGHT: u32 = 35;
pub const PAGES_WEIGHT: u32 = 30;
pub const HTML_WEIGHT: u32 = 20;
pub const SITEMAP_WEIGHT: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Pass,
    Warn,
    Fail,
}

impl GateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warn => "warn",
            Self::Fail => "fail",
        }
    }

    /// Weight credited for this status: full, half or nothing.
    pub fn earned(self, weight: u32) -> f64 {
        match self {
            Self::Pass => f64::from(weight),
            Self::Warn => f64::from(weight) * 0.5,
            Self::Fail => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    pub id: String,
    pub label: String,
    pub status: GateStatus,
    pub weight: u32,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateTotals {
    pub total_weight: u32,
    pub earned_weight: f64,
    pub pass_count: usize,
    pub warn_count: usize,
    pub fail_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSummary {
    pub verdict: Verdict,
    /// 0..=100
    pub score: u32,
    pub gates: Vec<GateResult>,
    pub totals: GateTotals,
}

/// One-line explanation of a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryReason {
    pub title: String,
    pub detail: String,
}

pub fn compute_summary(gates: Vec<GateResult>) -> GateSummary {
    let total_weight: u32 = gates.iter().map(|g| g.weight).sum();
    let earned_weight: f64 = gates.iter().map(|g| g.status.earned(g.weight)).sum();
    let score = if total_weight > 0 {
        (earned_weight / f64::from(total_weight) * 100.0).round() as u32
    } else {
        0
    };
    let count = |status: GateStatus| gates.iter().filter(|g| g.status == status).count();
    let totals = GateTotals {
        total_weight,
        earned_weight,
        pass_count: count(GateStatus::Pass),
        warn_count: count(GateStatus::Warn),
        fail_count: count(GateStatus::Fail),
    };
    let verdict = if totals.fail_count > 0 {
        Verdict::Fail
    } else if totals.warn_count > 0 {
        Verdict::Warn
    } else {
        Verdict::Pass
    };
    GateSummary {
        verdict,
        score: score.min(100),
        gates,
        totals,
    }
}

impl GateSummary {
    pub fn primary_reason(&self) -> PrimaryReason {
        let first = |status: GateStatus| self.gates.iter().find(|g| g.status == status);
        if let Some(g) = first(GateStatus::Fail) {
            return PrimaryReason {
                title: format!("FAIL: {}", g.label),
                detail: g.detail.clone(),
            };
        }
        if let Some(g) = first(GateStatus::Warn) {
            return PrimaryReason {
                title: format!("WARN: {}", g.label),
                detail: g.detail.clone(),
            };
        }
        PrimaryReason {
            title: "PASS: All gates satisfied".to_string(),
            detail: "No blocking issues detected by the current gate rules.".to_string(),
        }
    }
}

pub fn artifacts_gate(presence: &ArtifactPresence) -> GateResult {
    let missing = &presence.missing;
    let (status, detail) = if missing.is_empty() && presence.error.is_none() {
        (GateStatus::Pass, "All required artifact keys present.".to_string())
    } else {
        let shown: Vec<&str> = missing.iter().take(4).map(String::as_str).collect();
        let mut detail = format!("Missing {}: {}", missing.len(), shown.join(", "));
        if missing.len() > 4 {
            detail.push_str(", ...");
        }
        (GateStatus::Fail, detail)
    };
    GateResult {
        id: "artifacts_must_have".to_string(),
        label: "Must-have artifacts present".to_string(),
        status,
        weight: ARTIFACTS_WEIGHT,
        detail,
    }
}

pub fn pages_gate(summary: &ReportSummary, min_pct: u32) -> GateResult {
    let checked = summary.pages_checked;
    let ok = summary.pages_ok;
    let (status, detail) = if checked == 0 {
        (GateStatus::Warn, "No pages checked.".to_string())
    } else {
        let pct = (ok as f64 / checked as f64 * 100.0).round() as u32;
        if pct >= min_pct {
            (GateStatus::Pass, format!("{}/{} ({}%) pages ok.", ok, checked, pct))
        } else {
            (
                GateStatus::Fail,
                format!(
                    "{}/{} ({}%) pages ok. Failed: {}. Required >= {}%.",
                    ok, checked, pct, summary.pages_failed, min_pct
                ),
            )
        }
    };
    GateResult {
        id: "pages_smoke".to_string(),
        label: format!("Live pages smoke test (>= {}% pass)", min_pct),
        status,
        weight: PAGES_WEIGHT,
        detail,
    }
}

fn match_gate(
    id: &str,
    subject: &str,
    weight: u32,
    outcome: &DiffOutcome,
    mismatch_fail: bool,
    match_detail: &str,
) -> GateResult {
    let mode = if mismatch_fail { "FAIL" } else { "WARN" };
    let (status, detail) = match outcome {
        DiffOutcome::Compared { matched: true, .. } => {
            (GateStatus::Pass, match_detail.to_string())
        }
        DiffOutcome::Compared { diff_count, .. } => (
            if mismatch_fail {
                GateStatus::Fail
            } else {
                GateStatus::Warn
            },
            format!("Mismatch at {} line(s) ({} mode).", diff_count, mode),
        ),
        DiffOutcome::Unavailable { reason } => (
            GateStatus::Warn,
            format!("{} diff not available: {}", subject, reason),
        ),
        DiffOutcome::NotRun => (GateStatus::Warn, format!("{} diff not available.", subject)),
    };
    GateResult {
        id: id.to_string(),
        label: format!("{} match ({} on mismatch)", subject, mode),
        status,
        weight,
        detail,
    }
}

/// The four release gates, in fixed order.
pub fn build_gates(report: &QaReport, config: &GateConfig) -> Vec<GateResult> {
    vec![
        artifacts_gate(&report.artifacts),
        pages_gate(&report.summary, config.min_pages_ok_pct),
        match_gate(
            "html_match",
            "Generated vs published HTML",
            HTML_WEIGHT,
            &report.diffs.html,
            config.html_mismatch_fail,
            "Generated and published HTML match.",
        ),
        match_gate(
            "sitemap_match",
            "Live sitemap.xml vs stored sitemapXml",
            SITEMAP_WEIGHT,
            &report.diffs.sitemap,
            config.sitemap_mismatch_fail,
            "Live sitemap.xml matches stored sitemapXml.",
        ),
    ]
}

pub fn evaluate(report: &QaReport, config: &GateConfig) -> GateSummary {
    compute_summary(build_gates(report, config))
}

fn opt_bool(v: Option<bool>) -> &'static str {
    match v {
        Some(true) => "true",
        Some(false) => "false",
        None => "null",
    }
}

/// Plain-text summary for sharing.
pub fn summary_text(report: &QaReport, summary: &GateSummary, at: DateTime<Utc>) -> String {
    let primary = summary.primary_reason();
    let mut out = String::from("# RELEASE GATE SUMMARY\n");
    let _ = writeln!(out, "projectId: {}", report.project_id);
    let _ = writeln!(out, "time: {}", at.to_rfc3339());
    let _ = writeln!(out, "verdict: {}", summary.verdict);
    let _ = writeln!(out, "score: {}/100", summary.score);
    let _ = writeln!(out, "primary: {}", primary.title);
    let _ = writeln!(out, "primaryDetail: {}", primary.detail);
    let _ = writeln!(
        out,
        "counts: pass={} warn={} fail={}",
        summary.totals.pass_count, summary.totals.warn_count, summary.totals.fail_count
    );
    out.push_str("\n## Gates\n");
    for g in &summary.gates {
        let _ = writeln!(
            out,
            "- [{}] {}: {}",
            g.status.as_str().to_uppercase(),
            g.label,
            g.detail
        );
    }
    let s = &report.summary;
    out.push_str("\n## Quick stats\n");
    let _ = writeln!(out, "artifactsOk: {}", s.artifacts_ok);
    let _ = writeln!(out, "htmlMatch: {}", opt_bool(s.html_match));
    let _ = writeln!(out, "sitemapMatch: {}", opt_bool(s.sitemap_match));
    let _ = writeln!(out, "pages: {}/{} ok", s.pages_ok, s.pages_checked);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(id: &str, status: GateStatus, weight: u32) -> GateResult {
        GateResult {
            id: id.into(),
            label: id.into(),
            status,
            weight,
            detail: format!("{id} detail"),
        }
    }

    fn all_pass() -> Vec<GateResult> {
        vec![
            gate("a", GateStatus::Pass, ARTIFACTS_WEIGHT),
            gate("p", GateStatus::Pass, PAGES_WEIGHT),
            gate("h", GateStatus::Pass, HTML_WEIGHT),
            gate("s", GateStatus::Pass, SITEMAP_WEIGHT),
        ]
    }

    #[test]
    fn test_all_pass_scores_100() {
        let s = compute_summary(all_pass());
        assert_eq!(s.verdict, Verdict::Pass);
        assert_eq!(s.score, 100);
        assert_eq!(s.primary_reason().title, "PASS: All gates satisfied");
    }

    #[test]
    fn test_warn_earns_half() {
        let mut gates = all_pass();
        gates[3].status = GateStatus::Warn;
        let s = compute_summary(gates);
        assert_eq!(s.verdict, Verdict::Warn);
        assert_eq!(s.totals.earned_weight, 92.5);
        assert_eq!(s.score, 93);
        assert_eq!(s.primary_reason().title, "WARN: s");
    }

    #[test]
    fn test_first_fail_is_primary_even_after_warn() {
        let gates = vec![
            gate("a", GateStatus::Warn, 35),
            gate("p", GateStatus::Fail, 30),
            gate("h", GateStatus::Fail, 20),
        ];
        let s = compute_summary(gates);
        assert_eq!(s.verdict, Verdict::Fail);
        assert_eq!(s.primary_reason().title, "FAIL: p");
        assert_eq!(s.primary_reason().detail, "p detail");
        assert_eq!(s.totals.fail_count, 2);
    }

    #[test]
    fn test_no_gates_scores_zero() {
        let s = compute_summary(Vec::new());
        assert_eq!(s.score, 0);
        assert_eq!(s.verdict, Verdict::Pass);
    }

    #[test]
    fn test_score_bounds_and_verdict_rules() {
        let statuses = [GateStatus::Pass, GateStatus::Warn, GateStatus::Fail];
        for a in statuses {
            for p in statuses {
                for h in statuses {
                    for sm in statuses {
                        let gates = vec![
                            gate("a", a, 35),
                            gate("p", p, 30),
                            gate("h", h, 20),
                            gate("s", sm, 15),
                        ];
                        let any_fail = gates.iter().any(|g| g.status == GateStatus::Fail);
                        let all_pass = gates.iter().all(|g| g.status == GateStatus::Pass);
                        let s = compute_summary(gates);
                        assert!(s.score <= 100);
                        assert_eq!(s.verdict == Verdict::Fail, any_fail);
                        assert_eq!(s.verdict == Verdict::Pass, all_pass);
                    }
                }
            }
        }
    }

    #[test]
    fn test_missing_artifacts_fail_and_earn_nothing() {
        let expected: Vec<String> = ["g", "p", "x", "ps", "seo"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let present: Vec<String> = ["g", "p", "ps"].iter().map(|s| s.to_string()).collect();
        let presence = ArtifactPresence::evaluate(&expected, &present, None);

        let g = artifacts_gate(&presence);
        assert_eq!(g.status, GateStatus::Fail);
        assert_eq!(g.detail, "Missing 2: x, seo");

        let mut gates = all_pass();
        gates[0] = g;
        let s = compute_summary(gates);
        assert_eq!(s.totals.earned_weight, 65.0);
        assert_eq!(s.verdict, Verdict::Fail);
    }

    #[test]
    fn test_pages_below_threshold_fail_with_ratio() {
        let summary = ReportSummary {
            pages_checked: 10,
            pages_ok: 9,
            pages_failed: 1,
            ..ReportSummary::default()
        };
        let g = pages_gate(&summary, 100);
        assert_eq!(g.status, GateStatus::Fail);
        assert!(g.detail.contains("9/10 (90%)"), "{}", g.detail);

        assert_eq!(pages_gate(&summary, 90).status, GateStatus::Pass);
        assert_eq!(
            pages_gate(&ReportSummary::default(), 100).status,
            GateStatus::Warn
        );
    }

    #[test]
    fn test_match_gate_policy() {
        let mismatch = DiffOutcome::Compared {
            matched: false,
            diff_count: 3,
            a_len: 1,
            b_len: 2,
        };
        assert_eq!(
            match_gate("html_match", "HTML", 20, &mismatch, true, "ok").status,
            GateStatus::Fail
        );
        assert_eq!(
            match_gate("html_match", "HTML", 20, &mismatch, false, "ok").status,
            GateStatus::Warn
        );
        let unreadable = DiffOutcome::Unavailable {
            reason: "published missing".into(),
        };
        assert_eq!(
            match_gate("html_match", "HTML", 20, &unreadable, true, "ok").status,
            GateStatus::Warn
        );
    }

    #[test]
    fn test_summary_text_sections() {
        let mut report = QaReport::new("acme", GateConfig::default());
        report.artifacts = ArtifactPresence::unavailable(&["project:acme:seoPlan".into()], "down");
        let s = evaluate(&report, &GateConfig::default());
        let text = summary_text(&report, &s, Utc::now());
        assert!(text.starts_with("# RELEASE GATE SUMMARY\nprojectId: acme\n"));
        assert!(text.contains("verdict: FAIL"));
        assert!(text.contains("## Gates\n- [FAIL] Must-have artifacts present"));
        assert!(text.contains("htmlMatch: null"));
    }
}
