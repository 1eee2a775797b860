use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{ErrorCode, ValidationError, ValidationWarning};

/// Label of the structural rule set applied by the schema stage
pub const SCHEMA_VERSION: &str = "procdef-1.0";

/// Measurements taken while validating one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    /// End-to-end duration of the validation computation
    pub validation_duration_ms: u64,
    /// Size of the input in bytes
    pub file_size_bytes: u64,
    /// Number of elements in the document tree
    pub element_count: usize,
    /// Number of attributes across all elements
    pub attribute_count: usize,
    /// Whether the input was syntactically valid markup
    pub well_formed: bool,
    /// Whether the schema stage reported no violations
    pub schema_valid: bool,
}

impl ValidationMetrics {
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.validation_duration_ms = duration.as_millis().min(u64::MAX as u128) as u64;
        self
    }
}

/// Aggregate outcome of validating one process definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaValidationResult {
    /// True iff no FATAL or ERROR diagnostics were recorded
    pub valid: bool,
    pub schema_version: String,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub metrics: ValidationMetrics,
}

impl SchemaValidationResult {
    /// Build a result from stage errors; validity is derived from their severities
    pub fn from_errors(errors: Vec<ValidationError>, metrics: ValidationMetrics) -> Self {
        let valid = !errors.iter().any(ValidationError::is_blocking);
        Self {
            valid,
            schema_version: SCHEMA_VERSION.to_string(),
            errors,
            warnings: Vec::new(),
            metrics,
        }
    }

    /// Build the short-circuit result for a single fatal error
    pub fn fatal(error: ValidationError, metrics: ValidationMetrics) -> Self {
        Self {
            valid: false,
            schema_version: SCHEMA_VERSION.to_string(),
            errors: vec![error],
            warnings: Vec::new(),
            metrics: ValidationMetrics {
                well_formed: false,
                schema_valid: false,
                ..metrics
            },
        }
    }

    /// Attach advisory warnings during assembly
    pub fn with_warnings(mut self, warnings: Vec<ValidationWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn has_fatal(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.severity == crate::diagnostics::Severity::Fatal)
    }

    pub fn has_error_code(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn has_warning_code(&self, code: ErrorCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    /// Error codes in report order
    pub fn error_codes(&self) -> Vec<ErrorCode> {
        self.errors.iter().map(|e| e.code).collect()
    }

    /// Same verdict and diagnostics, ignoring timing
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.valid == other.valid
            && self.errors == other.errors
            && self.warnings == other.warnings
            && ValidationMetrics {
                validation_duration_ms: 0,
                ..self.metrics.clone()
            } == ValidationMetrics {
                validation_duration_ms: 0,
                ..other.metrics.clone()
            }
    }
}

/// Result of validating one file inside a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileValidationResult {
    pub path: PathBuf,
    pub result: SchemaValidationResult,
}

/// Aggregated results of validating multiple files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub valid_files: usize,
    pub invalid_files: usize,
    /// Files that failed with a FATAL error (unreadable or malformed)
    pub fatal_files: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_duration: Duration,
}

impl BatchSummary {
    /// Aggregate individual file results into a summary
    pub fn aggregate(file_results: &[FileValidationResult], total_duration: Duration) -> Self {
        let mut summary = Self {
            total_files: file_results.len(),
            total_duration,
            ..Self::default()
        };

        for file in file_results {
            if file.result.valid {
                summary.valid_files += 1;
            } else {
                summary.invalid_files += 1;
            }
            if file.result.has_fatal() {
                summary.fatal_files += 1;
            }
            summary.total_errors += file.result.error_count();
            summary.total_warnings += file.result.warning_count();
        }

        summary
    }

    /// Check if all files validated successfully
    pub fn all_valid(&self) -> bool {
        self.valid_files == self.total_files && self.total_files > 0
    }

    pub fn has_errors(&self) -> bool {
        self.invalid_files > 0
    }

    /// Get success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.valid_files as f64 / self.total_files as f64) * 100.0
        }
    }
}
