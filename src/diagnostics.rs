//! Diagnostic records produced by the validation stages.
//!
//! Diagnostics are data, not Rust errors: each stage returns them in a list and the
//! orchestrator folds them into a [`SchemaValidationResult`](crate::result::SchemaValidationResult).
//! Every entry is self-describing (severity, stable code, message, locator) so a report can be
//! rendered from the list alone.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Advisory only, never affects validity
    Info,
    /// Non-blocking concern
    Warning,
    /// Schema or business-rule violation; later checks still run
    Error,
    /// The pipeline cannot continue
    Fatal,
}

impl Severity {
    /// Whether a diagnostic of this severity makes a document invalid
    pub fn is_blocking(self) -> bool {
        matches!(self, Severity::Error | Severity::Fatal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Pipeline
    FileNotFound,
    MalformedXml,

    // Schema conformance
    InvalidRootElement,
    MissingElement,
    MissingAttribute,
    InvalidProcessType,
    InvalidConnectionType,
    InvalidAuthenticationType,
    InvalidTransformationType,
    InvalidHttpMethod,
    InvalidParameterLocation,
    InvalidValue,

    // Business rules
    DuplicateId,
    InvalidConnectionRef,
    InvalidTransformationRef,

    // Advisories
    UnusedConnection,
    UnusedTransformation,
    EmptyExpression,
    MissingResponses,
    MissingDescription,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::MalformedXml => "MALFORMED_XML",
            ErrorCode::InvalidRootElement => "INVALID_ROOT_ELEMENT",
            ErrorCode::MissingElement => "MISSING_ELEMENT",
            ErrorCode::MissingAttribute => "MISSING_ATTRIBUTE",
            ErrorCode::InvalidProcessType => "INVALID_PROCESS_TYPE",
            ErrorCode::InvalidConnectionType => "INVALID_CONNECTION_TYPE",
            ErrorCode::InvalidAuthenticationType => "INVALID_AUTHENTICATION_TYPE",
            ErrorCode::InvalidTransformationType => "INVALID_TRANSFORMATION_TYPE",
            ErrorCode::InvalidHttpMethod => "INVALID_HTTP_METHOD",
            ErrorCode::InvalidParameterLocation => "INVALID_PARAMETER_LOCATION",
            ErrorCode::InvalidValue => "INVALID_VALUE",
            ErrorCode::DuplicateId => "DUPLICATE_ID",
            ErrorCode::InvalidConnectionRef => "INVALID_CONNECTION_REF",
            ErrorCode::InvalidTransformationRef => "INVALID_TRANSFORMATION_REF",
            ErrorCode::UnusedConnection => "UNUSED_CONNECTION",
            ErrorCode::UnusedTransformation => "UNUSED_TRANSFORMATION",
            ErrorCode::EmptyExpression => "EMPTY_EXPRESSION",
            ErrorCode::MissingResponses => "MISSING_RESPONSES",
            ErrorCode::MissingDescription => "MISSING_DESCRIPTION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the source document a diagnostic applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub xpath: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Locator {
    pub fn at(xpath: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            xpath: Some(xpath.into()),
            line: Some(line),
            column: Some(column),
        }
    }

    pub fn position(line: u32, column: u32) -> Self {
        Self {
            xpath: None,
            line: Some(line),
            column: Some(column),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.xpath, self.line, self.column) {
            (Some(xpath), Some(line), Some(column)) => write!(f, "{} ({}:{})", xpath, line, column),
            (Some(xpath), _, _) => f.write_str(xpath),
            (None, Some(line), Some(column)) => write!(f, "{}:{}", line, column),
            (None, Some(line), None) => write!(f, "line {}", line),
            _ => Ok(()),
        }
    }
}

/// A blocking or non-blocking violation reported by a validation stage.
///
/// Only `Fatal`, `Error` and `Warning` severities are produced for errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    pub xpath: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            xpath: None,
            line: None,
            column: None,
            suggestion: None,
        }
    }

    pub fn fatal(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, code, message)
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn at(mut self, locator: Locator) -> Self {
        self.xpath = locator.xpath;
        self.line = locator.line;
        self.column = locator.column;
        self
    }

    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }

    pub fn locator(&self) -> Locator {
        Locator {
            xpath: self.xpath.clone(),
            line: self.line,
            column: self.column,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)?;
        let locator = self.locator();
        if locator != Locator::default() {
            write!(f, " at {}", locator)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// A non-blocking concern; never affects `valid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    pub xpath: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub recommendation: Option<String>,
}

impl ValidationWarning {
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            xpath: None,
            line: None,
            column: None,
            recommendation: None,
        }
    }

    pub fn info(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::warning(code, message)
        }
    }

    pub fn at(mut self, locator: Locator) -> Self {
        self.xpath = locator.xpath;
        self.line = locator.line;
        self.column = locator.column;
        self
    }

    pub fn recommend(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    pub fn locator(&self) -> Locator {
        Locator {
            xpath: self.xpath.clone(),
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)?;
        let locator = self.locator();
        if locator != Locator::default() {
            write!(f, " at {}", locator)?;
        }
        if let Some(recommendation) = &self.recommendation {
            write!(f, " ({})", recommendation)?;
        }
        Ok(())
    }
}
