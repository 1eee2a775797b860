use anyhow::{Context, Result};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use procdef_validate::cli::OutputFormat;
use procdef_validate::config::ConfigManager;
use procdef_validate::output::Output;
use procdef_validate::parser::ProcessParser;
use procdef_validate::validator::ValidationEngine;
use procdef_validate::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.validate().map_err(anyhow::Error::msg)?;

    let config = ConfigManager::load_config(&cli)
        .await
        .context("Failed to load configuration")?;
    let verbosity = config.verbosity();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    debug!(?config, "configuration loaded");

    let files = config
        .file_discovery()
        .discover_all(&cli.paths)
        .await
        .context("Failed to discover input files")?;
    if files.is_empty() {
        warn!("no process definition files found");
    }

    let engine = ValidationEngine::new(config.engine_config());
    let results = engine.validate_files(files).await?;

    let format = OutputFormat::from(config.output.format);
    let output = Output::new(format, verbosity);
    print!("{}", output.format_results(&results)?);
    if format == OutputFormat::Json {
        println!();
    }

    if cli.parse {
        let parser = ProcessParser::new(config.validation.allow_dtd);
        for file in results.files.iter().filter(|f| f.result.valid) {
            match parser.parse(&file.path).await {
                Ok(model) => println!("{}", output.format_parsed(&file.path, &model)?),
                Err(e) => warn!(path = %file.path.display(), error = %e, "cannot build model"),
            }
        }
    }

    let stats = engine.cache_stats().await;
    debug!(
        entries = stats.entry_count,
        hits = stats.hits,
        misses = stats.misses,
        "cache statistics"
    );

    if results.summary.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}
