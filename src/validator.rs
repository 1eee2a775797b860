//! Validation orchestrator
//!
//! Sequences the three stages over one shared document tree:
//! - **Well-formedness**: builds the tree or short-circuits with a single FATAL error
//! - **Schema conformance**: structural rules selected by the declared process type
//! - **Business rules**: uniqueness and referential integrity, plus advisory warnings
//!
//! Results are memoized per [`Fingerprint`]. The only await points are the file read and the
//! cache; the stages themselves are synchronous and run directly inside the calling task.

use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::business::BusinessRuleValidator;
use crate::cache::{CacheConfig, CacheStats, Fingerprint, ValidationCache};
use crate::diagnostics::{ErrorCode, ValidationError};
use crate::error::EngineResult;
use crate::result::{BatchSummary, FileValidationResult, SchemaValidationResult, ValidationMetrics};
use crate::schema::{SchemaValidator, declared_process_type};
use crate::wellformed::{WellFormedness, WellFormednessChecker};

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of files validated concurrently in a batch
    pub max_concurrent_validations: usize,
    /// Accept documents carrying a DTD
    pub allow_dtd: bool,
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_validations: num_cpus::get(),
            allow_dtd: false,
            cache: CacheConfig::default(),
        }
    }
}

/// How many times each stage has run since the engine was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageRuns {
    pub well_formedness: u64,
    pub schema: u64,
    pub business_rules: u64,
}

#[derive(Debug, Default)]
struct StageCounters {
    well_formedness: AtomicU64,
    schema: AtomicU64,
    business_rules: AtomicU64,
}

/// Per-file results of a batch, in input order, with their aggregate
#[derive(Debug, Clone)]
pub struct BatchResults {
    pub files: Vec<FileValidationResult>,
    pub summary: BatchSummary,
}

/// Validation engine for process definitions
///
/// Cheap to clone; clones share the cache and the stage counters.
#[derive(Clone)]
pub struct ValidationEngine {
    cache: Arc<ValidationCache>,
    checker: WellFormednessChecker,
    schema: SchemaValidator,
    business: BusinessRuleValidator,
    stages: Arc<StageCounters>,
    config: EngineConfig,
}

impl ValidationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            cache: Arc::new(ValidationCache::new(&config.cache)),
            checker: WellFormednessChecker::new(config.allow_dtd),
            schema: SchemaValidator::new(),
            business: BusinessRuleValidator::new(),
            stages: Arc::new(StageCounters::default()),
            config,
        }
    }

    /// Validate one file through all stages, consulting the cache first.
    ///
    /// Unreadable paths produce a single FATAL `FILE_NOT_FOUND` result, which is not cached.
    pub async fn validate_complete(&self, path: &Path) -> SchemaValidationResult {
        let started = Instant::now();

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read process definition");
                return SchemaValidationResult::fatal(
                    ValidationError::fatal(
                        ErrorCode::FileNotFound,
                        format!("Cannot read {}: {}", path.display(), e),
                    ),
                    ValidationMetrics::default().with_duration(started.elapsed()),
                );
            }
        };

        let canonical = tokio::fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());
        let fingerprint = Fingerprint::new(canonical, &bytes);

        let mut computed = false;
        let result = self
            .cache
            .get_or_compute(fingerprint.clone(), async {
                computed = true;
                self.run_pipeline(&bytes, started)
            })
            .await;

        if computed {
            debug!(%fingerprint, valid = result.valid, errors = result.error_count(), "validated");
        } else {
            debug!(%fingerprint, "cache hit");
        }

        (*result).clone()
    }

    /// Run the stages over in-memory bytes, bypassing the cache
    pub fn validate_bytes(&self, bytes: &[u8]) -> SchemaValidationResult {
        self.run_pipeline(bytes, Instant::now())
    }

    fn run_pipeline(&self, bytes: &[u8], started: Instant) -> SchemaValidationResult {
        let file_size_bytes = bytes.len() as u64;

        self.stages.well_formedness.fetch_add(1, Ordering::Relaxed);
        let tree = match self.checker.check(bytes) {
            WellFormedness::WellFormed(tree) => tree,
            WellFormedness::Malformed(error) => {
                debug!(error = %error, "not well-formed");
                let metrics = ValidationMetrics {
                    file_size_bytes,
                    ..ValidationMetrics::default()
                };
                return SchemaValidationResult::fatal(error, metrics.with_duration(started.elapsed()));
            }
        };

        self.stages.schema.fetch_add(1, Ordering::Relaxed);
        let declared = declared_process_type(&tree);
        let mut errors = self.schema.validate(&tree, declared);
        let schema_valid = !errors.iter().any(ValidationError::is_blocking);
        debug!(errors = errors.len(), "schema stage finished");

        self.stages.business_rules.fetch_add(1, Ordering::Relaxed);
        let business_errors = self.business.validate(&tree);
        debug!(errors = business_errors.len(), "business-rule stage finished");
        errors.extend(business_errors);
        let warnings = self.business.advise(&tree);

        let metrics = ValidationMetrics {
            validation_duration_ms: 0,
            file_size_bytes,
            element_count: tree.element_count(),
            attribute_count: tree.attribute_count(),
            well_formed: true,
            schema_valid,
        };

        SchemaValidationResult::from_errors(errors, metrics.with_duration(started.elapsed()))
            .with_warnings(warnings)
    }

    /// Validate a list of files concurrently; results keep the input order
    pub async fn validate_files(&self, files: Vec<PathBuf>) -> EngineResult<BatchResults> {
        let batch_started = Instant::now();

        // Create a semaphore to limit concurrent validations
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_validations.max(1)));

        let validation_tasks: Vec<_> = files
            .into_iter()
            .map(|path| {
                let engine = self.clone();
                let semaphore = Arc::clone(&semaphore);

                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await?;
                    let result = engine.validate_complete(&path).await;
                    EngineResult::Ok(FileValidationResult { path, result })
                })
            })
            .collect();

        let task_results = try_join_all(validation_tasks).await?;

        let mut file_results = Vec::with_capacity(task_results.len());
        for result in task_results {
            file_results.push(result?);
        }

        let summary = BatchSummary::aggregate(&file_results, batch_started.elapsed());
        info!(
            total = summary.total_files,
            valid = summary.valid_files,
            invalid = summary.invalid_files,
            errors = summary.total_errors,
            warnings = summary.total_warnings,
            "batch validated"
        );

        Ok(BatchResults {
            files: file_results,
            summary,
        })
    }

    pub fn stage_runs(&self) -> StageRuns {
        StageRuns {
            well_formedness: self.stages.well_formedness.load(Ordering::Relaxed),
            schema: self.stages.schema.load(Ordering::Relaxed),
            business_rules: self.stages.business_rules.load(Ordering::Relaxed),
        }
    }

    pub fn cache(&self) -> &ValidationCache {
        &self.cache
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const VALID: &str = r#"<process name="orders" type="application-integration">
  <metadata><description>Order sync</description></metadata>
  <connections><connection id="api" type="REST"><url>https://api.example.com</url></connection></connections>
</process>"#;

    fn create_test_xml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_valid_file() {
        let engine = ValidationEngine::default();
        let file = create_test_xml_file(VALID);

        let result = engine.validate_complete(file.path()).await;
        assert!(result.valid, "unexpected errors: {:?}", result.errors);
        assert!(result.metrics.well_formed);
        assert!(result.metrics.schema_valid);
        assert_eq!(result.metrics.element_count, 6);
        assert_eq!(result.metrics.file_size_bytes, VALID.len() as u64);
    }

    #[tokio::test]
    async fn test_malformed_file_short_circuits() {
        let engine = ValidationEngine::default();
        let file = create_test_xml_file("<process><metadata></process>");

        let result = engine.validate_complete(file.path()).await;
        assert!(!result.valid);
        assert_eq!(result.error_codes(), vec![ErrorCode::MalformedXml]);
        assert!(!result.metrics.well_formed);
        assert!(!result.metrics.schema_valid);

        let runs = engine.stage_runs();
        assert_eq!(runs.well_formedness, 1);
        assert_eq!(runs.schema, 0);
        assert_eq!(runs.business_rules, 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_reported_and_not_cached() {
        let engine = ValidationEngine::default();
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.xml");

        let first = engine.validate_complete(&missing).await;
        let second = engine.validate_complete(&missing).await;

        assert_eq!(first.error_codes(), vec![ErrorCode::FileNotFound]);
        assert!(first.errors[0].message.contains("absent.xml"));
        assert!(first.same_outcome(&second));
        assert_eq!(engine.cache().computations(), 0);
        assert_eq!(engine.stage_runs(), StageRuns::default());
    }

    #[tokio::test]
    async fn test_repeat_validation_hits_cache() {
        let engine = ValidationEngine::default();
        let file = create_test_xml_file(VALID);

        let first = engine.validate_complete(file.path()).await;
        let second = engine.validate_complete(file.path()).await;

        assert_eq!(first, second);
        assert_eq!(engine.cache().computations(), 1);
        assert_eq!(engine.stage_runs().well_formedness, 1);
    }

    #[tokio::test]
    async fn test_edited_file_is_revalidated() {
        let engine = ValidationEngine::default();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.xml");

        tokio::fs::write(&path, VALID).await.unwrap();
        assert!(engine.validate_complete(&path).await.valid);

        tokio::fs::write(&path, VALID.replace("type=\"REST\"", "type=\"Rest\""))
            .await
            .unwrap();
        let result = engine.validate_complete(&path).await;
        assert_eq!(result.error_codes(), vec![ErrorCode::InvalidConnectionType]);
        assert_eq!(engine.cache().computations(), 2);
    }

    #[tokio::test]
    async fn test_validate_files_keeps_input_order() {
        let engine = ValidationEngine::new(EngineConfig {
            max_concurrent_validations: 2,
            ..EngineConfig::default()
        });
        let dir = TempDir::new().unwrap();

        let mut files = Vec::new();
        for i in 0..6 {
            let path = dir.path().join(format!("p{}.xml", i));
            let content = if i % 2 == 0 { VALID } else { "<process>" };
            tokio::fs::write(&path, content).await.unwrap();
            files.push(path);
        }

        let batch = engine.validate_files(files.clone()).await.unwrap();
        let paths: Vec<PathBuf> = batch.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, files);
        assert_eq!(batch.summary.total_files, 6);
        assert_eq!(batch.summary.valid_files, 3);
        assert_eq!(batch.summary.fatal_files, 3);
        assert!(batch.files[0].result.valid);
        assert!(!batch.files[1].result.valid);
    }

    #[tokio::test]
    async fn test_validate_files_empty() {
        let engine = ValidationEngine::default();
        let batch = engine.validate_files(Vec::new()).await.unwrap();
        assert!(batch.files.is_empty());
        assert_eq!(batch.summary.total_files, 0);
    }

    #[test]
    fn test_validate_bytes_bypasses_cache() {
        let engine = ValidationEngine::default();
        let result = engine.validate_bytes(VALID.as_bytes());
        assert!(result.valid);
        assert_eq!(engine.cache().computations(), 0);
    }
}
