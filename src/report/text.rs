//! Human-readable text output

use super::{DispatchReport, NodeReport, ReportDuration};
use std::fmt::Write;

/// Print a dispatch report to the console
pub fn print_report(report: &DispatchReport) {
    print!("{}", format_report(report));
}

/// Render a dispatch report as console text
pub fn format_report(report: &DispatchReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(out, "                    DISPATCH RESULTS");
    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(out);
    let _ = writeln!(out, "Command:  {}", report.command);
    let _ = writeln!(out, "Selector: {}", report.selector);
    let _ = writeln!(out, "Taken at: {}", report.generated_at);
    let _ = writeln!(out);

    let _ = writeln!(out, "Nodes:");
    for node in &report.nodes {
        let _ = writeln!(out, "  {}", format_node(node));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Summary:");
    let _ = writeln!(
        out,
        "  Total: {}  Succeeded: {}  Failed: {}  Cancelled: {}  Pending: {}",
        summary.total, summary.succeeded, summary.failed, summary.cancelled, summary.pending
    );
    let _ = writeln!(out, "  Success: {:.2}%", summary.success_rate);

    if let (Some(p50), Some(p99)) = (&summary.p50, &summary.p99) {
        let _ = writeln!(out);
        let _ = writeln!(out, "Latency:");
        let _ = writeln!(out, "  min: {}", human(&summary.min));
        let _ = writeln!(out, "  p50: {}", p50.human);
        let _ = writeln!(out, "  p99: {}", p99.human);
        let _ = writeln!(out, "  max: {}", human(&summary.max));
    }

    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    out
}

fn format_node(node: &NodeReport) -> String {
    let detail = match (&node.value, &node.error) {
        (Some(value), _) => value.clone(),
        (None, Some(error)) => error.clone(),
        (None, None) => "-".to_string(),
    };
    format!(
        "{:<12} {:<22} {:<8} {:<10} {:>10}  {}",
        node.id,
        node.endpoint,
        node.role,
        node.state,
        human(&node.latency),
        detail
    )
}

fn human(duration: &Option<ReportDuration>) -> &str {
    duration.as_ref().map(|d| d.human.as_str()).unwrap_or("-")
}
