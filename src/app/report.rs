//! End-of-run summary in text or JSON

use crate::core::styles::StyleRole;
use crate::scanner::command::ScannerCommand;
use crate::scanner::types::{DispositionOutcome, ScanResult};
use crate::scanner::updater::UpdateOutcome;
use serde::Serialize;
use std::fmt::Write;
use std::str::FromStr;

/// Scan errors listed individually in the text summary
const MAX_LISTED_ERRORS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "Unknown output format '{}' (expected text or json)",
                other
            )),
        }
    }
}

/// How the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Complete,
    Cancelled,
    Aborted,
}

/// Everything the summary reports on
#[derive(Debug, Clone)]
pub struct RunSummary<'a> {
    pub result: &'a ScanResult,
    pub status: RunStatus,
    /// Pool failure reason when aborted
    pub failure: Option<&'a str>,
    pub scanner: &'a ScannerCommand,
    pub update: Option<&'a UpdateOutcome>,
    pub enumeration_warnings: usize,
}

impl<'a> RunSummary<'a> {
    pub fn new(result: &'a ScanResult, scanner: &'a ScannerCommand) -> Self {
        let status = if result.cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::Complete
        };
        Self {
            result,
            status,
            failure: None,
            scanner,
            update: None,
            enumeration_warnings: 0,
        }
    }

    pub fn aborted(mut self, reason: &'a str) -> Self {
        self.status = RunStatus::Aborted;
        self.failure = Some(reason);
        self
    }

    pub fn with_update(mut self, update: Option<&'a UpdateOutcome>) -> Self {
        self.update = update;
        self
    }

    pub fn with_enumeration_warnings(mut self, count: usize) -> Self {
        self.enumeration_warnings = count;
        self
    }
}

pub fn render(summary: &RunSummary<'_>, format: OutputFormat, color: bool) -> String {
    match format {
        OutputFormat::Text => render_text(summary, color),
        OutputFormat::Json => render_json(summary).unwrap_or_else(|e| {
            log::error!("Failed to serialize summary: {}", e);
            "{\"error\":\"Failed to serialize summary\"}".to_string()
        }),
    }
}

pub fn render_text(summary: &RunSummary<'_>, color: bool) -> String {
    let result = summary.result;
    let mut out = String::new();

    let headline = match (summary.status, summary.failure) {
        (RunStatus::Complete, _) => StyleRole::Header.paint("Scan complete.", color),
        (RunStatus::Cancelled, _) => StyleRole::Warning.paint("Scan cancelled.", color),
        (RunStatus::Aborted, reason) => StyleRole::Error.paint(
            &format!("Scan aborted: {}", reason.unwrap_or("worker pool failure")),
            color,
        ),
    };
    let _ = writeln!(out, "{}", headline);

    let _ = writeln!(
        out,
        "Scanner: {} ({})",
        summary.scanner.program().display(),
        summary.scanner.mode()
    );
    if let Some(update) = summary.update {
        let line = format!("Signature database: {}", update);
        let role = if update.is_warning() {
            StyleRole::Warning
        } else {
            StyleRole::Value
        };
        let _ = writeln!(out, "{}", role.paint(&line, color));
    }

    let _ = writeln!(out, "Total files scanned: {}", result.total_files);
    if result.total_files < result.enumerated {
        let _ = writeln!(
            out,
            "Files not scanned: {}",
            result.enumerated - result.total_files
        );
    }
    let _ = writeln!(
        out,
        "Total scan time: {:.2} seconds",
        result.elapsed.as_secs_f64()
    );
    let _ = writeln!(out, "Files per second: {:.2}", result.files_per_second());

    let infected_line = format!("Total infected files: {}", result.infected.len());
    let role = if result.has_infections() {
        StyleRole::Infected
    } else {
        StyleRole::Clean
    };
    let _ = writeln!(out, "{}", role.paint(&infected_line, color));

    if result.has_infections() {
        let _ = writeln!(out, "Infected files:");
        for record in &result.infected {
            let _ = writeln!(
                out,
                "- {}",
                StyleRole::Path.paint(&record.path.display().to_string(), color)
            );
            for line in record.output.lines() {
                let _ = writeln!(out, "  {}", line);
            }
            let action = match &record.disposition {
                DispositionOutcome::Quarantined { destination } => {
                    format!("quarantined to {}", destination.display())
                }
                DispositionOutcome::Deleted => "deleted".to_string(),
                DispositionOutcome::Failed { action, reason } => StyleRole::Warning
                    .paint(&format!("could not {}: {}", action, reason), color),
            };
            let _ = writeln!(out, "  -> {}", action);
        }
    }

    if !result.errors.is_empty() {
        let _ = writeln!(
            out,
            "{}",
            StyleRole::Warning.paint(
                &format!("Files that could not be scanned: {}", result.errors.len()),
                color
            )
        );
        for failure in result.errors.iter().take(MAX_LISTED_ERRORS) {
            let _ = writeln!(out, "- {}: {}", failure.path.display(), failure.reason);
        }
        if result.errors.len() > MAX_LISTED_ERRORS {
            let _ = writeln!(
                out,
                "{}",
                StyleRole::Dim.paint(
                    &format!("  ... and {} more", result.errors.len() - MAX_LISTED_ERRORS),
                    color
                )
            );
        }
    }

    if summary.enumeration_warnings > 0 {
        let _ = writeln!(
            out,
            "{}",
            StyleRole::Dim.paint(
                &format!(
                    "{} paths could not be read while collecting files",
                    summary.enumeration_warnings
                ),
                color
            )
        );
    }

    out
}

#[derive(Serialize)]
struct JsonScanner {
    program: String,
    mode: String,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<&'a str>,
    scanner: JsonScanner,
    #[serde(skip_serializing_if = "Option::is_none")]
    database_update: Option<String>,
    enumeration_warnings: usize,
    files_per_second: f64,
    #[serde(flatten)]
    result: &'a ScanResult,
}

pub fn render_json(summary: &RunSummary<'_>) -> Result<String, serde_json::Error> {
    let report = JsonReport {
        status: summary.status,
        failure: summary.failure,
        scanner: JsonScanner {
            program: summary.scanner.program().display().to_string(),
            mode: summary.scanner.mode().to_string(),
        },
        database_update: summary.update.map(ToString::to_string),
        enumeration_warnings: summary.enumeration_warnings,
        files_per_second: summary.result.files_per_second(),
        result: summary.result,
    };
    serde_json::to_string_pretty(&report)
}
