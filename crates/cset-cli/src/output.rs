//! Run report rendering and CI step outputs.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use cset_core::orchestrator::RunReport;
use cset_core::types::ChangesetFile;

pub fn print_report_table(report: &RunReport) {
    if report.results.is_empty() {
        println!("No changeset files were processed.");
        return;
    }

    println!("{:<32} {:<10} Error", "File", "Status");
    println!("{}", "-".repeat(70));
    for result in &report.results {
        println!(
            "{:<32} {:<10} {}",
            result.file,
            result.status.as_str(),
            result.error.as_deref().unwrap_or("-")
        );
    }
    println!();
    println!("Status: {}", report.status());
}

pub fn print_report_json(report: &RunReport) -> Result<()> {
    let output = serde_json::json!({
        "status": report.status(),
        "results": report.results,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn print_plan_table(files: &[ChangesetFile]) {
    println!("{:<4} {:<6} Path", "#", "Format");
    println!("{}", "-".repeat(70));
    for (i, file) in files.iter().enumerate() {
        println!("{:<4} {:<6} {}", i + 1, file.format().as_str(), file.path().display());
    }
}

pub fn print_plan_json(files: &[ChangesetFile]) -> Result<()> {
    let output: Vec<_> = files
        .iter()
        .map(|f| {
            serde_json::json!({
                "file": f.file_name(),
                "path": f.path().display().to_string(),
                "format": f.format(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// `status=` and `results=` lines in the step-output file format.
pub fn step_outputs(report: &RunReport) -> Result<String> {
    let results = serde_json::to_string(&report.results)?;
    Ok(format!("status={}\nresults={}\n", report.status(), results))
}

/// Append the step outputs to `path`, creating it if needed.
pub fn append_step_outputs(path: &Path, report: &RunReport) -> Result<()> {
    let outputs = step_outputs(report)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open output file {}", path.display()))?;
    file.write_all(outputs.as_bytes())
        .with_context(|| format!("Failed to write output file {}", path.display()))?;
    Ok(())
}
