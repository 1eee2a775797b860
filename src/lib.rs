//! # procdef-validate Library
//!
//! An async-first validation and parsing engine for XML integration process definitions.
//!
//! Documents move through a fixed pipeline: well-formedness, schema conformance for the
//! declared process type, then business rules (identifier uniqueness and referential
//! integrity). Results are plain data carrying every diagnostic with its code, severity and
//! location, and are memoized by file identity and content. A separate parser turns valid
//! documents into a typed [`ParsedMetadata`] model.

pub mod business;
pub mod cache;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod file_discovery;
pub mod model;
pub mod output;
pub mod parser;
pub mod result;
pub mod schema;
pub mod suggest;
pub mod tree;
pub mod validator;
pub mod wellformed;

pub use business::{BusinessRuleValidator, EntityKind, IdNamespace};
pub use cache::{CacheConfig, CacheStats, Fingerprint, ValidationCache};
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use diagnostics::{ErrorCode, Locator, Severity, ValidationError, ValidationWarning};
pub use error::{DiscoveryError, EngineError, ParseError};
pub use file_discovery::FileDiscovery;
pub use model::{
    AuthenticationType, Connection, ConnectionType, DataFlow, HttpMethod, OpenApiEndpoint,
    ParameterLocation, ParsedMetadata, ProcessType, Transformation, TransformationType,
};
pub use output::Output;
pub use parser::ProcessParser;
pub use result::{
    BatchSummary, FileValidationResult, SCHEMA_VERSION, SchemaValidationResult, ValidationMetrics,
};
pub use schema::SchemaValidator;
pub use validator::{BatchResults, EngineConfig, StageRuns, ValidationEngine};
pub use wellformed::{WellFormedness, WellFormednessChecker};
