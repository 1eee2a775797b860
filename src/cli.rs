use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show invalid files
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show every diagnostic, including warnings on valid files
    Verbose,
}

impl VerbosityLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Default `tracing` filter directive for this verbosity
    pub fn log_directive(self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "procdef_validate=debug",
        }
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Per-file diagnostics followed by a summary
    #[default]
    Human,
    /// Machine-readable report
    Json,
    /// Summary block only
    Summary,
}

/// Validate integration process definitions
#[derive(Parser, Debug, Clone)]
#[command(name = "procdef-validate")]
#[command(about = "Validate XML process definitions: well-formedness, schema and business rules")]
#[command(version)]
pub struct Cli {
    /// Files or directories to validate
    #[arg(required = true, help = "Process definition files or directories")]
    pub paths: Vec<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// File extensions to process (comma-separated)
    #[arg(
        short = 'e',
        long = "extensions",
        help = "File extensions to process (e.g., 'xml,procdef')"
    )]
    pub extensions: Option<String>,

    /// Maximum directory depth to descend into
    #[arg(short = 'd', long = "max-depth")]
    pub max_depth: Option<usize>,

    /// Follow symbolic links while discovering files
    #[arg(long = "follow-symlinks")]
    pub follow_symlinks: bool,

    /// Number of files validated concurrently
    #[arg(
        short = 't',
        long = "threads",
        help = "Number of concurrent validations"
    )]
    pub threads: Option<usize>,

    /// Maximum number of cached validation results
    #[arg(long = "cache-capacity")]
    pub cache_capacity: Option<u64>,

    /// Accept documents that carry a DTD
    #[arg(long = "allow-dtd")]
    pub allow_dtd: bool,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Print the parsed model of each valid file as JSON
    #[arg(long = "parse")]
    pub parse: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (invalid files only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn get_extensions(&self) -> Option<Vec<String>> {
        self.extensions.as_ref().map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        for path in &self.paths {
            if !path.exists() {
                return Err(format!("Path does not exist: {}", path.display()));
            }
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cli_parsing() {
        let cli = Cli::try_parse_from(["procdef-validate", "/tmp"]).unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from("/tmp")]);
        assert_eq!(cli.output_format, None);
        assert_eq!(cli.get_extensions(), None);
        assert!(!cli.parse);
    }

    #[test]
    fn test_full_cli_parsing() {
        let cli = Cli::try_parse_from([
            "procdef-validate",
            "-e",
            "xml, procdef",
            "-t",
            "4",
            "--format",
            "json",
            "--max-depth",
            "2",
            "--parse",
            "-v",
            "a.xml",
            "defs",
        ])
        .unwrap();

        assert_eq!(cli.paths.len(), 2);
        assert_eq!(
            cli.get_extensions(),
            Some(vec!["xml".to_string(), "procdef".to_string()])
        );
        assert_eq!(cli.threads, Some(4));
        assert_eq!(cli.output_format, Some(OutputFormat::Json));
        assert_eq!(cli.max_depth, Some(2));
        assert!(cli.parse);
        assert!(cli.verbose);
    }

    #[test]
    fn test_paths_are_required() {
        assert!(Cli::try_parse_from(["procdef-validate"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["procdef-validate", "-v", "-q", "a.xml"]).is_err());
    }

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(VerbosityLevel::from_flags(false, true), VerbosityLevel::Quiet);
        assert_eq!(VerbosityLevel::from_flags(true, false), VerbosityLevel::Verbose);
        assert_eq!(VerbosityLevel::from_flags(false, false), VerbosityLevel::Normal);
        assert!(VerbosityLevel::Verbose > VerbosityLevel::Normal);
    }

    #[test]
    fn test_validate_rejects_missing_path() {
        let cli = Cli::try_parse_from(["procdef-validate", "/definitely/not/here.xml"]).unwrap();
        assert!(cli.validate().is_err());
    }
}
