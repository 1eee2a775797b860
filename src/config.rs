use crate::cache::CacheConfig;
use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use crate::file_discovery::FileDiscovery;
use crate::validator::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const CONFIG_FILE_NAMES: [&str; 4] = [
    "procdef-validate.toml",
    "procdef-validate.json",
    ".procdef-validate.toml",
    ".procdef-validate.json",
];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub validation: ValidationConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
    pub files: FileConfig,
}

/// Validation-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ValidationConfig {
    /// Number of files validated concurrently
    pub threads: Option<usize>,
    /// Accept documents that carry a DTD
    pub allow_dtd: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormatConfig,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (invalid files only)
    pub quiet: bool,
}

/// File discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// File extensions to process
    pub extensions: Vec<String>,
    /// Maximum directory depth; unlimited when absent
    pub max_depth: Option<usize>,
    /// Follow symbolic links while discovering
    pub follow_symlinks: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["xml".to_string()],
            max_depth: None,
            follow_symlinks: false,
        }
    }
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    #[default]
    Human,
    Json,
    Summary,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
            OutputFormat::Summary => OutputFormatConfig::Summary,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
            OutputFormatConfig::Summary => OutputFormat::Summary,
        }
    }
}

impl Config {
    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.output.verbose, self.output.quiet)
    }

    /// Engine settings derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_concurrent_validations: ConfigManager::get_thread_count(self),
            allow_dtd: self.validation.allow_dtd,
            cache: self.cache.clone(),
        }
    }

    /// File discovery derived from this configuration
    pub fn file_discovery(&self) -> FileDiscovery {
        FileDiscovery::new()
            .with_extensions(self.files.extensions.clone())
            .with_max_depth(self.files.max_depth)
            .with_follow_symlinks(self.files.follow_symlinks)
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(cli, &SystemEnvProvider).await
    }

    /// Load configuration with a custom environment provider
    pub async fn load_config_with(cli: &Cli, env: &impl EnvProvider) -> Result<Config> {
        // Start with default configuration
        let mut config = Config::default();

        // Load from configuration file if specified
        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        // Apply environment variable overrides
        config = Self::apply_environment_overrides_with(env, config)?;

        // Apply CLI argument overrides (highest precedence)
        config = Self::merge_with_cli(config, cli);

        // Validate the final configuration
        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let mut candidates: Vec<PathBuf> = CONFIG_FILE_NAMES.iter().map(PathBuf::from).collect();
        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("procdef-validate");
            candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| app_config_dir.join(name)));
        }
        Self::find_config_in(&candidates).await
    }

    /// Load the first existing file among `candidates`
    pub async fn find_config_in(candidates: &[PathBuf]) -> Result<Option<Config>> {
        for path in candidates {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Ok(Some(Self::load_from_file(path).await?));
            }
        }
        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        fn parsed<T: std::str::FromStr>(env: &impl EnvProvider, key: &str) -> Result<Option<T>> {
            match env.get(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, raw))),
                None => Ok(None),
            }
        }

        // Validation settings
        if let Some(threads) = parsed(env, "PROCDEF_THREADS")? {
            config.validation.threads = Some(threads);
        }
        if let Some(allow_dtd) = parsed(env, "PROCDEF_ALLOW_DTD")? {
            config.validation.allow_dtd = allow_dtd;
        }

        // Cache settings
        if let Some(capacity) = parsed(env, "PROCDEF_CACHE_CAPACITY")? {
            config.cache.max_entries = capacity;
        }

        // Output settings
        if let Some(verbose) = parsed(env, "PROCDEF_VERBOSE")? {
            config.output.verbose = verbose;
        }
        if let Some(quiet) = parsed(env, "PROCDEF_QUIET")? {
            config.output.quiet = quiet;
        }
        if let Some(format) = env.get("PROCDEF_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                "summary" => OutputFormatConfig::Summary,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid PROCDEF_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        // File settings
        if let Some(extensions) = env.get("PROCDEF_EXTENSIONS") {
            config.files.extensions = extensions
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(depth) = parsed(env, "PROCDEF_MAX_DEPTH")? {
            config.files.max_depth = Some(depth);
        }
        if let Some(follow) = parsed(env, "PROCDEF_FOLLOW_SYMLINKS")? {
            config.files.follow_symlinks = follow;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence where given)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        // Validation settings
        if cli.threads.is_some() {
            config.validation.threads = cli.threads;
        }
        if cli.allow_dtd {
            config.validation.allow_dtd = true;
        }

        // Cache settings
        if let Some(capacity) = cli.cache_capacity {
            config.cache.max_entries = capacity;
        }

        // Output settings
        if let Some(format) = cli.output_format {
            config.output.format = format.into();
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        // File settings
        if let Some(extensions) = cli.get_extensions() {
            config.files.extensions = extensions;
        }
        if cli.max_depth.is_some() {
            config.files.max_depth = cli.max_depth;
        }
        if cli.follow_symlinks {
            config.files.follow_symlinks = true;
        }

        config
    }

    /// Merge two configurations (second takes precedence for non-None values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        // Validation settings
        if override_config.validation.threads.is_some() {
            base.validation.threads = override_config.validation.threads;
        }
        base.validation.allow_dtd = override_config.validation.allow_dtd;

        // Cache settings
        base.cache = override_config.cache;

        // Output settings
        base.output = override_config.output;

        // File settings
        if !override_config.files.extensions.is_empty() {
            base.files.extensions = override_config.files.extensions;
        }
        if override_config.files.max_depth.is_some() {
            base.files.max_depth = override_config.files.max_depth;
        }
        base.files.follow_symlinks = override_config.files.follow_symlinks;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        // Validate threads
        if let Some(threads) = config.validation.threads {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of threads must be greater than 0".to_string(),
                ));
            }
            if threads > 1000 {
                return Err(ConfigError::Validation(
                    "Number of threads cannot exceed 1000".to_string(),
                ));
            }
        }

        // Validate cache settings
        if config.cache.max_entries == 0 {
            return Err(ConfigError::Validation(
                "Cache capacity must be greater than 0".to_string(),
            ));
        }

        // Validate output settings
        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        // Validate file settings
        if config.files.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "At least one file extension must be specified".to_string(),
            ));
        }

        // Validate that extensions don't contain invalid characters
        for ext in &config.files.extensions {
            if ext.is_empty() || ext.contains('/') || ext.contains('\\') || ext.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "Invalid file extension: {}",
                    ext
                )));
            }
        }

        Ok(())
    }

    /// Get the effective thread count
    pub fn get_thread_count(config: &Config) -> usize {
        config.validation.threads.unwrap_or_else(num_cpus::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
            }
        }

        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.validation.threads, None);
        assert!(!config.validation.allow_dtd);
        assert_eq!(config.cache.max_entries, 10_000);
        assert_eq!(config.output.format, OutputFormatConfig::Human);
        assert!(!config.output.verbose);
        assert!(!config.output.quiet);
        assert_eq!(config.files.extensions, vec!["xml"]);
        assert_eq!(config.files.max_depth, None);
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("procdef-validate.toml");

        let toml_content = r#"
[validation]
threads = 8
allow_dtd = true

[cache]
max_entries = 500

[output]
format = "json"
verbose = true

[files]
extensions = ["xml", "procdef"]
max_depth = 3
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.validation.threads, Some(8));
        assert!(config.validation.allow_dtd);
        assert_eq!(config.cache.max_entries, 500);
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert!(config.output.verbose);
        assert!(!config.output.quiet);
        assert_eq!(config.files.extensions, vec!["xml", "procdef"]);
        assert_eq!(config.files.max_depth, Some(3));
        assert!(!config.files.follow_symlinks);
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("procdef-validate.json");

        let json_content = r#"{
  "validation": { "threads": 4 },
  "output": { "format": "summary", "quiet": true },
  "files": { "follow_symlinks": true }
}"#;
        fs::write(&config_path, json_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.validation.threads, Some(4));
        assert_eq!(config.output.format, OutputFormatConfig::Summary);
        assert!(config.output.quiet);
        assert!(config.files.follow_symlinks);
        assert_eq!(config.files.extensions, vec!["xml"]);
        assert_eq!(config.cache.max_entries, 10_000);
    }

    #[tokio::test]
    async fn test_unsupported_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(&config_path, "invalid: yaml").unwrap();

        match ConfigManager::load_from_file(&config_path).await.unwrap_err() {
            ConfigError::UnsupportedFormat(ext) => assert_eq!(ext, "yaml"),
            other => panic!("Expected UnsupportedFormat error, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        fs::write(&config_path, "invalid toml [[[").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result.unwrap_err(), ConfigError::TomlParsing(_)));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        fs::write(&config_path, "{ invalid json }").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result.unwrap_err(), ConfigError::JsonParsing(_)));
    }

    #[tokio::test]
    async fn test_find_config_in_takes_first_existing() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("procdef-validate.toml");
        let present = temp_dir.path().join(".procdef-validate.json");
        fs::write(&present, r#"{ "cache": { "max_entries": 7 } }"#).unwrap();

        let config = ConfigManager::find_config_in(&[missing.clone(), present])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.cache.max_entries, 7);

        assert!(ConfigManager::find_config_in(&[missing]).await.unwrap().is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let mut mock_env = MockEnvProvider::new();
        mock_env.set("PROCDEF_THREADS", "16");
        mock_env.set("PROCDEF_ALLOW_DTD", "true");
        mock_env.set("PROCDEF_CACHE_CAPACITY", "64");
        mock_env.set("PROCDEF_VERBOSE", "true");
        mock_env.set("PROCDEF_FORMAT", "JSON");
        mock_env.set("PROCDEF_EXTENSIONS", "xml, procdef");
        mock_env.set("PROCDEF_MAX_DEPTH", "2");

        let config =
            ConfigManager::apply_environment_overrides_with(&mock_env, Config::default()).unwrap();

        assert_eq!(config.validation.threads, Some(16));
        assert!(config.validation.allow_dtd);
        assert_eq!(config.cache.max_entries, 64);
        assert!(config.output.verbose);
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert_eq!(config.files.extensions, vec!["xml", "procdef"]);
        assert_eq!(config.files.max_depth, Some(2));
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut mock_env = MockEnvProvider::new();
        mock_env.set("PROCDEF_THREADS", "invalid");

        let result = ConfigManager::apply_environment_overrides_with(&mock_env, Config::default());
        match result.unwrap_err() {
            ConfigError::Environment(message) => assert!(message.contains("PROCDEF_THREADS")),
            other => panic!("Expected Environment error, got {}", other),
        }

        let mut mock_env = MockEnvProvider::new();
        mock_env.set("PROCDEF_FORMAT", "xml");
        assert!(
            ConfigManager::apply_environment_overrides_with(&mock_env, Config::default()).is_err()
        );
    }

    #[test]
    fn test_merge_with_cli() {
        let cli = Cli::try_parse_from([
            "procdef-validate",
            "--threads",
            "12",
            "--verbose",
            "--cache-capacity",
            "99",
            "--extensions",
            "xml,procdef",
            "--format",
            "summary",
            "--allow-dtd",
            "defs",
        ])
        .unwrap();

        let mut base = Config::default();
        base.output.quiet = true;
        let config = ConfigManager::merge_with_cli(base, &cli);

        assert_eq!(config.validation.threads, Some(12));
        assert!(config.validation.allow_dtd);
        assert!(config.output.verbose);
        assert!(!config.output.quiet);
        assert_eq!(config.cache.max_entries, 99);
        assert_eq!(config.files.extensions, vec!["xml", "procdef"]);
        assert_eq!(config.output.format, OutputFormatConfig::Summary);
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let cli = Cli::try_parse_from(["procdef-validate", "defs"]).unwrap();

        let mut base = Config::default();
        base.validation.threads = Some(3);
        base.files.extensions = vec!["procdef".to_string()];
        base.output.format = OutputFormatConfig::Json;

        let config = ConfigManager::merge_with_cli(base.clone(), &cli);
        assert_eq!(config, base);
    }

    #[test]
    fn test_merge_configs() {
        let mut base = Config::default();
        base.validation.threads = Some(4);
        base.files.max_depth = Some(1);

        let mut override_config = Config::default();
        override_config.cache.max_entries = 12;

        let merged = ConfigManager::merge_configs(base, override_config);

        assert_eq!(merged.validation.threads, Some(4)); // None does not override
        assert_eq!(merged.files.max_depth, Some(1));
        assert_eq!(merged.cache.max_entries, 12);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.validation.threads = Some(0);
        assert!(ConfigManager::validate_config(&config).is_err());
        config.validation.threads = Some(1001);
        assert!(ConfigManager::validate_config(&config).is_err());
        config.validation.threads = Some(4);

        config.cache.max_entries = 0;
        assert!(ConfigManager::validate_config(&config).is_err());
        config.cache.max_entries = 10;

        config.output.verbose = true;
        config.output.quiet = true;
        assert!(ConfigManager::validate_config(&config).is_err());
        config.output.quiet = false;

        config.files.extensions = vec![];
        assert!(ConfigManager::validate_config(&config).is_err());
        config.files.extensions = vec!["invalid/ext".to_string()];
        assert!(ConfigManager::validate_config(&config).is_err());
        config.files.extensions = vec![".xml".to_string()];
        assert!(ConfigManager::validate_config(&config).is_err());

        config.files.extensions = vec!["xml".to_string()];
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_load_config_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(
            &config_path,
            r#"
[validation]
threads = 6

[cache]
max_entries = 800

[files]
extensions = ["procdef"]
"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "procdef-validate",
            "--config",
            config_path.to_str().unwrap(),
            "--threads",
            "8",
            temp_dir.path().to_str().unwrap(),
        ])
        .unwrap();

        let mut env = MockEnvProvider::new();
        env.set("PROCDEF_CACHE_CAPACITY", "900");
        env.set("PROCDEF_THREADS", "7");

        let config = ConfigManager::load_config_with(&cli, &env).await.unwrap();

        assert_eq!(config.validation.threads, Some(8)); // CLI over env over file
        assert_eq!(config.cache.max_entries, 900); // env over file
        assert_eq!(config.files.extensions, vec!["procdef"]); // file over default
    }

    #[tokio::test]
    async fn test_load_config_rejects_invalid_result() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "[cache]\nmax_entries = 0\n").unwrap();

        let cli = Cli::try_parse_from([
            "procdef-validate",
            "--config",
            config_path.to_str().unwrap(),
            "defs",
        ])
        .unwrap();

        let result = ConfigManager::load_config_with(&cli, &MockEnvProvider::default()).await;
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_derived_settings() {
        let mut config = Config::default();
        config.validation.threads = Some(3);
        config.validation.allow_dtd = true;
        config.cache.max_entries = 5;

        let engine = config.engine_config();
        assert_eq!(engine.max_concurrent_validations, 3);
        assert!(engine.allow_dtd);
        assert_eq!(engine.cache.max_entries, 5);

        assert!(ConfigManager::get_thread_count(&Config::default()) >= 1);
        assert_eq!(config.verbosity(), VerbosityLevel::Normal);
    }

    #[test]
    fn test_output_format_conversion() {
        for format in [OutputFormat::Human, OutputFormat::Json, OutputFormat::Summary] {
            assert_eq!(OutputFormat::from(OutputFormatConfig::from(format)), format);
        }
    }
}
