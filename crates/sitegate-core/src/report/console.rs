use std::fmt::Write as _;

use crate::gate::{GateStatus, GateSummary, Verdict};
use crate::model::{Run, RunStatus, StepStatus};
use crate::qa::{HistoryItem, QaReport};

fn run_icon(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Running => "⏳",
        RunStatus::Success => "✅",
        RunStatus::Error => "❌",
        RunStatus::Cancelled => "⏹️ ",
    }
}

fn step_icon(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Running => "⏳",
        StepStatus::Success => "✅",
        StepStatus::Error => "❌",
    }
}

fn gate_icon(status: GateStatus) -> &'static str {
    match status {
        GateStatus::Pass => "✅",
        GateStatus::Warn => "⚠️ ",
        GateStatus::Fail => "❌",
    }
}

fn verdict_icon(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Pass => "✅",
        Verdict::Warn => "⚠️ ",
        Verdict::Fail => "❌",
    }
}

/// Run header plus one line per step; a failed step shows its error text.
#[must_use]
pub fn format_run(run: &Run) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {} project={} preset={}",
        run_icon(run.status),
        run.run_id,
        run.status,
        run.project_id,
        run.preset
    );
    for step in &run.steps {
        let ms = step
            .ms
            .map(|ms| format!("({:.1}s)", ms as f64 / 1000.0))
            .unwrap_or_default();
        let http = step
            .response
            .as_ref()
            .and_then(|r| r.http_status)
            .map(|s| format!("HTTP {}", s))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {} {:<16} {:<8} {:<8} {}",
            step_icon(step.status),
            step.name.as_str(),
            step.status.as_str(),
            http,
            ms
        );
        if let Some(error) = &step.error {
            let _ = writeln!(out, "      error: {}", error);
        }
    }
    let pending: Vec<&str> = run
        .config
        .selected()
        .into_iter()
        .skip(run.steps.len())
        .map(|s| s.as_str())
        .collect();
    if !pending.is_empty() && run.status.is_terminal() {
        let _ = writeln!(out, "  not attempted: {}", pending.join(", "));
    }
    out
}

/// Verdict line, primary reason and the gate table.
#[must_use]
pub fn format_gate(summary: &GateSummary) -> String {
    let primary = summary.primary_reason();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} Release gate: {} (score {}/100)",
        verdict_icon(summary.verdict),
        summary.verdict,
        summary.score
    );
    let _ = writeln!(out, "   {}", primary.title);
    let _ = writeln!(out, "   {}", primary.detail);
    out.push('\n');
    for g in &summary.gates {
        let _ = writeln!(
            out,
            "{} {:<20} w={:<3} {}",
            gate_icon(g.status),
            g.id,
            g.weight,
            g.detail
        );
    }
    let t = &summary.totals;
    let _ = writeln!(
        out,
        "\nSummary: {} pass, {} warn, {} fail (earned {:.1}/{})",
        t.pass_count, t.warn_count, t.fail_count, t.earned_weight, t.total_weight
    );
    out
}

/// Audit outcome: gate table, failing pages and notes; or the assembly error.
#[must_use]
pub fn format_audit(report: &QaReport) -> String {
    let mut out = String::new();
    if let Some(error) = &report.error {
        let _ = writeln!(out, "❌ Audit failed for {}: {}", report.project_id, error);
    }
    if let Some(summary) = &report.release_gate {
        out.push_str(&format_gate(summary));
    }
    let failed: Vec<_> = report.pages.iter().filter(|p| !p.ok).collect();
    if !failed.is_empty() {
        out.push_str("\nFailed pages:\n");
        for p in failed {
            let status = p
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".into());
            let reason = p.error.clone().unwrap_or_else(|| {
                let c = &p.checks;
                let mut why = Vec::new();
                if !c.status_ok {
                    why.push("status");
                }
                if !c.title_ok {
                    why.push("title");
                }
                if !c.canonical_ok {
                    why.push("canonical");
                }
                if !c.robots_meta_ok {
                    why.push("robots");
                }
                why.join(", ")
            });
            let _ = writeln!(out, "  {:<24} {:<4} {}", p.path, status, reason);
        }
    }
    for note in &report.notes {
        let _ = writeln!(out, "note: {}", note);
    }
    out
}

/// One line per history entry, newest first.
#[must_use]
pub fn format_history(items: &[HistoryItem]) -> String {
    if items.is_empty() {
        return "No audits recorded.\n".to_string();
    }
    let mut out = String::new();
    for item in items {
        let _ = writeln!(
            out,
            "{} {}  {:<4} {:>3}/100  pages {}/{}  {}",
            verdict_icon(item.verdict),
            item.at.format("%Y-%m-%d %H:%M:%S"),
            item.verdict,
            item.score,
            item.summary.pages_ok,
            item.summary.pages_checked,
            item.id
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::gate;
    use crate::model::{Preset, RunMode, StepName};

    #[test]
    fn test_format_run_shows_failed_step_and_skipped_tail() {
        let mut run = Run::new("run_1", "acme", RunMode::Run, Preset::Full, Preset::Full.defaults());
        let i = run.begin_step(StepName::Seed).unwrap();
        run.finish_step(i, StepStatus::Error, 1500, Some("HTTP 500: boom".into()), None);
        run.finish(RunStatus::Error);

        let text = format_run(&run);
        assert!(text.contains("run_1 error project=acme preset=full"));
        assert!(text.contains("error: HTTP 500: boom"));
        assert!(text.contains("not attempted: seo, content-finish, sitemap, publish"));
    }

    #[test]
    fn test_format_gate_lists_every_gate() {
        let report = QaReport::new("acme", GateConfig::default());
        let summary = gate::evaluate(&report, &GateConfig::default());
        let text = format_gate(&summary);
        for id in ["artifacts_must_have", "pages_smoke", "html_match", "sitemap_match"] {
            assert!(text.contains(id), "missing {id}");
        }
    }

    #[test]
    fn test_format_history_empty() {
        assert_eq!(format_history(&[]), "No audits recorded.\n");
    }
}
