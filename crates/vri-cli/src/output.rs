//! Output formatting for reports

use crate::error::CliResult;
use console::style;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use vri::{FileOutcome, ModuleFieldSet, RetypeReport, RunReport};

/// Render any report as pretty JSON
pub fn render_json<T: Serialize>(value: &T) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn relative<'p>(path: &'p Path, root: &Path) -> &'p Path {
    path.strip_prefix(root).unwrap_or(path)
}

/// Render an instrumentation run for the terminal
#[must_use]
pub fn render_run_report(report: &RunReport) -> String {
    let mut out = String::new();
    let instrumented = report.instrumented().count();
    let _ = writeln!(
        out,
        "{} {instrumented} of {} files in {} ({} modules, {} watched fields)",
        style("Instrumented").green().bold(),
        report.files.len(),
        report.root.display(),
        report.modules,
        report.watched_fields,
    );
    for file in &report.files {
        let path = relative(&file.path, &report.root).display();
        match file.outcome {
            FileOutcome::Instrumented { bodies, stats } => {
                let _ = writeln!(
                    out,
                    "  {} {path} ({bodies} bodies, {} coverage points, {} toggle counters)",
                    style("✓").green(),
                    stats.coverage_points,
                    stats.toggle_counters,
                );
            }
            FileOutcome::Skipped => {
                let _ = writeln!(out, "  {} {path} (skipped)", style("-").dim());
            }
        }
    }
    let runtime: Vec<String> = report
        .runtime_files
        .iter()
        .map(|path| relative(path, &report.root).display().to_string())
        .collect();
    let _ = writeln!(out, "Runtime: {}", runtime.join(", "));
    let _ = writeln!(
        out,
        "Build list: {}",
        relative(&report.build_list, &report.root).display()
    );
    let _ = writeln!(
        out,
        "Total: {} coverage points, {} toggle counters",
        report.totals.coverage_points, report.totals.toggle_counters
    );
    out
}

/// Render the watched fields of every module
#[must_use]
pub fn render_field_set(fields: &ModuleFieldSet) -> String {
    let mut out = String::new();
    for module in fields.modules() {
        let watched = fields.fields(module);
        let _ = writeln!(out, "{} ({} fields)", style(module).bold(), watched.len());
        for name in watched {
            let _ = writeln!(out, "  {name}");
        }
    }
    if fields.is_empty() {
        let _ = writeln!(out, "{}", style("No declaration files found").yellow());
    }
    out
}

/// Render a retyping run
#[must_use]
pub fn render_retype_report(report: &RetypeReport, root: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} fields in {} headers",
        style("Retyped").green().bold(),
        report.fields,
        report.headers.len()
    );
    for header in &report.headers {
        let _ = writeln!(out, "  {} {}", style("✓").green(), relative(header, root).display());
    }
    out
}
