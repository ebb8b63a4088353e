//! Human-readable report rendering (`report.md`, `report.html`).

use crate::config::Profile;
use crate::errors::TrustBenchError;
use crate::gate::GateVerdict;
use crate::model::{AgentResult, PillarName};
use std::collections::BTreeMap;
use std::path::Path;

/// Render and write `report.md` and `report.html` into `dir`.
pub fn write_reports(
    dir: &Path,
    profile: &Profile,
    results: &BTreeMap<PillarName, AgentResult>,
    verdict: &GateVerdict,
) -> Result<(), TrustBenchError> {
    let markdown = render_markdown(profile, results, verdict);
    std::fs::write(dir.join("report.md"), &markdown)
        .map_err(|e| TrustBenchError::Storage(format!("failed to write report.md: {e}")))?;

    let html = render_html(&markdown);
    std::fs::write(dir.join("report.html"), html)
        .map_err(|e| TrustBenchError::Storage(format!("failed to write report.html: {e}")))?;
    Ok(())
}

fn render_markdown(
    profile: &Profile,
    results: &BTreeMap<PillarName, AgentResult>,
    verdict: &GateVerdict,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("# TrustBench report — {}\n\n", profile.name));
    out.push_str(&format!(
        "**Decision:** {:?}  \n**Composite:** {:.3}  \n**Confidence:** {:?}\n\n",
        verdict.decision, verdict.composite, verdict.confidence
    ));

    out.push_str("## Drivers\n\n");
    for driver in &verdict.drivers {
        out.push_str(&format!("- {driver}\n"));
    }

    out.push_str("\n## Recommended actions\n\n");
    for action in &verdict.actions {
        out.push_str(&format!("- {action}\n"));
    }

    out.push_str("\n## Pillars\n\n");
    out.push_str("| Pillar | Passed | Score | Summary |\n|---|---|---|---|\n");
    for pillar in PillarName::DECLARATION_ORDER {
        if let Some(p) = verdict.pillars.get(&pillar) {
            out.push_str(&format!(
                "| {pillar} | {} | {:.3} | {} |\n",
                p.passed, p.score, p.summary
            ));
        }
    }

    out.push_str("\n## Failures\n\n");
    let mut any_failure = false;
    for pillar in PillarName::DECLARATION_ORDER {
        if let Some(result) = results.get(&pillar) {
            for failure in &result.failures {
                any_failure = true;
                out.push_str(&format!("- `{}` [{}] {}\n", failure.pillar, failure.id, failure.reason));
            }
        }
    }
    if !any_failure {
        out.push_str("None.\n");
    }

    out
}

fn render_html(markdown: &str) -> String {
    let escaped = markdown
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>TrustBench report</title></head>\n<body><pre>{escaped}</pre></body></html>\n")
}
