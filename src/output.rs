//! Output and Reporting
//!
//! Renders batch results for people (coloured when stdout is a terminal) or machines. Reports
//! are built from the self-describing diagnostic entries only.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::diagnostics::Severity;
use crate::model::ParsedMetadata;
use crate::result::{BatchSummary, FileValidationResult};
use crate::validator::BatchResults;

/// Output formatter for validation results
pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    timestamp: DateTime<Utc>,
    summary: JsonSummary,
    files: &'a [FileValidationResult],
}

#[derive(Serialize)]
struct JsonSummary {
    total_files: usize,
    valid_files: usize,
    invalid_files: usize,
    fatal_files: usize,
    total_errors: usize,
    total_warnings: usize,
    success_rate: f64,
    duration_ms: u128,
}

impl From<&BatchSummary> for JsonSummary {
    fn from(summary: &BatchSummary) -> Self {
        Self {
            total_files: summary.total_files,
            valid_files: summary.valid_files,
            invalid_files: summary.invalid_files,
            fatal_files: summary.fatal_files,
            total_errors: summary.total_errors,
            total_warnings: summary.total_warnings,
            success_rate: summary.success_rate(),
            duration_ms: summary.total_duration.as_millis(),
        }
    }
}

#[derive(Serialize)]
struct ParsedReport<'a> {
    path: &'a Path,
    model: &'a ParsedMetadata,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_results(&self, results: &BatchResults) -> Result<String, serde_json::Error> {
        match self.format {
            OutputFormat::Json => self.format_json(results, Utc::now()),
            OutputFormat::Summary => Ok(self.format_summary(&results.summary)),
            OutputFormat::Human => Ok(self.format_human(results)),
        }
    }

    pub fn format_json(
        &self,
        results: &BatchResults,
        timestamp: DateTime<Utc>,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&JsonReport {
            timestamp,
            summary: JsonSummary::from(&results.summary),
            files: &results.files,
        })
    }

    fn format_human(&self, results: &BatchResults) -> String {
        let mut output = String::new();

        for file in &results.files {
            let noteworthy = !file.result.valid
                || (!file.result.warnings.is_empty() && self.verbosity >= VerbosityLevel::Normal);
            if noteworthy || self.verbosity >= VerbosityLevel::Verbose {
                output.push_str(&self.format_file_result(file));
                output.push('\n');
            }
        }

        if self.verbosity == VerbosityLevel::Quiet {
            if results.summary.has_errors() {
                output.push_str(&format!(
                    "Invalid: {} of {}\n",
                    results.summary.invalid_files, results.summary.total_files
                ));
            }
        } else {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&self.format_summary(&results.summary));
        }

        output
    }

    pub fn format_file_result(&self, file: &FileValidationResult) -> String {
        let result = &file.result;
        let duration_str =
            format_duration(Duration::from_millis(result.metrics.validation_duration_ms));

        let mut output = if result.valid {
            format!(
                "{}  {} ({})",
                self.colorize("✓ VALID", "32"),
                file.path.display(),
                duration_str
            )
        } else {
            let count = result.errors.iter().filter(|e| e.is_blocking()).count();
            format!(
                "{}  {} ({}) - {} error{}",
                self.colorize("✗ INVALID", "31"),
                file.path.display(),
                duration_str,
                count,
                if count == 1 { "" } else { "s" }
            )
        };

        for error in &result.errors {
            let line = self.colorize(&error.to_string(), severity_color(error.severity));
            output.push_str(&format!("\n    {}", line));
        }

        if self.verbosity > VerbosityLevel::Quiet {
            for warning in &result.warnings {
                if warning.severity == Severity::Info && self.verbosity < VerbosityLevel::Verbose {
                    continue;
                }
                let line = self.colorize(&warning.to_string(), severity_color(warning.severity));
                output.push_str(&format!("\n    {}", line));
            }
        }

        output
    }

    pub fn format_summary(&self, summary: &BatchSummary) -> String {
        let mut output = String::new();
        output.push_str("Validation Summary:\n");
        output.push_str(&format!("  Total files: {}\n", summary.total_files));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Valid:", "32"),
            summary.valid_files
        ));

        if summary.invalid_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Invalid:", "31"),
                summary.invalid_files
            ));
        }
        if summary.fatal_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Unreadable or malformed:", "35"),
                summary.fatal_files
            ));
        }
        if summary.total_warnings > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Warnings:", "33"),
                summary.total_warnings
            ));
        }

        output.push_str(&format!("  Success rate: {:.1}%\n", summary.success_rate()));
        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(summary.total_duration)
        ));

        output
    }

    /// JSON rendering of a parsed model
    pub fn format_parsed(
        &self,
        path: &Path,
        model: &ParsedMetadata,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&ParsedReport { path, model })
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Fatal => "35",
        Severity::Error => "31",
        Severity::Warning => "33",
        Severity::Info => "36",
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
