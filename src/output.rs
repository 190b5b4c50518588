//! Run output: assembled document, plan JSON, summary, clipboard

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{CompressionLevel, FileReport, RunReport};
use crate::error::FitResult;

/// Name of the assembled document
pub const OUTPUT_FILE: &str = "fitcode.out";
/// Name of the plan dump written for budget runs
pub const PLAN_FILE: &str = "fitcode_plan.json";

/// Output knobs
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Directory the result files land in
    pub output_dir: PathBuf,
    /// Copy the document to the clipboard as well
    pub clipboard: bool,
}

/// Writes the final document and reports run statistics
pub struct OutputWriter {
    options: OutputOptions,
}

impl OutputWriter {
    pub fn new(options: OutputOptions) -> Self {
        Self { options }
    }

    /// Write the document (and plan JSON for budget runs), log the
    /// completion summary, and return the document path.
    pub fn write(&self, report: &RunReport, elapsed: Duration) -> FitResult<PathBuf> {
        fs::create_dir_all(&self.options.output_dir)?;

        let document = assemble_document(report);
        let output_path = self.options.output_dir.join(OUTPUT_FILE);
        fs::write(&output_path, &document)?;

        if report.budget.is_some() {
            let plan_path = self.options.output_dir.join(PLAN_FILE);
            let json = serde_json::to_string_pretty(report)
                .expect("report serialization cannot fail");
            fs::write(plan_path, json)?;
        }

        self.log_summary(report, elapsed);
        info!("Output written to: {}", output_path.display());

        if self.options.clipboard {
            copy_to_clipboard(&document);
        }

        Ok(output_path)
    }

    fn log_summary(&self, report: &RunReport, elapsed: Duration) {
        let baseline_total: usize = report.files.iter().map(|f| f.baseline_tokens).sum();
        let failures = report.failure_count();

        info!(
            "Compressed {} files: {} -> {} tokens ({:.1}% reduction) in {:.1}s",
            report.files.len(),
            baseline_total,
            report.total_rendered_tokens,
            reduction_percent(baseline_total, report.total_rendered_tokens),
            elapsed.as_secs_f64(),
        );

        if let Some(budget) = report.budget {
            let usage = if budget > 0 {
                report.total_rendered_tokens as f64 / budget as f64 * 100.0
            } else {
                f64::INFINITY
            };
            info!(
                "Budget: {} tokens, usage {:.1}%, feasible: {}, rounds: {}",
                budget, usage, report.feasible, report.rounds_used
            );
        }

        for (level, count) in report_level_distribution(report) {
            info!("  {:<8}: {:>4} files", level.name(), count);
        }

        if failures > 0 {
            warn!("{} files fell back to baseline content after render failures", failures);
            for file in report.files.iter().filter(|f| f.render_failure.is_some()) {
                warn!(
                    "  {}: {}",
                    file.path.display(),
                    file.render_failure.as_deref().unwrap_or("unknown")
                );
            }
        }
    }
}

fn report_level_distribution(
    report: &RunReport,
) -> std::collections::BTreeMap<CompressionLevel, usize> {
    let mut counts = std::collections::BTreeMap::new();
    for file in &report.files {
        *counts.entry(file.level).or_insert(0) += 1;
    }
    counts
}

/// Build the whole output document: one section per file, separated by
/// horizontal rules
pub fn assemble_document(report: &RunReport) -> String {
    let mut out = String::new();
    for (index, file) in report.files.iter().enumerate() {
        write_section(&mut out, file);
        if index + 1 < report.files.len() {
            out.push_str("\n\n---\n\n");
        }
    }
    out
}

fn write_section(out: &mut String, file: &FileReport) {
    let _ = writeln!(out, "## {}", file.path.display());
    if file.level == CompressionLevel::None {
        let _ = writeln!(
            out,
            "**Original:** {} tokens | **Preserved as-is (none)**\n",
            file.baseline_tokens
        );
    } else {
        let _ = writeln!(
            out,
            "**Original:** {} tokens | **Compressed:** {} tokens ({:.1}% actual compression, {})\n",
            file.baseline_tokens,
            file.rendered_tokens,
            reduction_percent(file.baseline_tokens, file.rendered_tokens),
            file.level,
        );
    }
    out.push_str(&file.content);
}

fn reduction_percent(before: usize, after: usize) -> f64 {
    if before == 0 {
        return 0.0;
    }
    (before.saturating_sub(after)) as f64 / before as f64 * 100.0
}

fn copy_to_clipboard(text: &str) {
    match arboard::Clipboard::new() {
        Ok(mut clipboard) => match clipboard.set_text(text.to_string()) {
            Ok(()) => info!("Output copied to clipboard"),
            Err(e) => debug!("clipboard copy failed: {e}"),
        },
        Err(e) => debug!("clipboard unavailable: {e}"),
    }
}
