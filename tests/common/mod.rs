#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::fs;

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn valid_dir(&self) -> PathBuf {
        self.fixtures_dir.join("valid")
    }

    pub fn invalid_dir(&self) -> PathBuf {
        self.fixtures_dir.join("invalid")
    }

    pub fn malformed_dir(&self) -> PathBuf {
        self.fixtures_dir.join("malformed")
    }

    pub fn customer_sync(&self) -> PathBuf {
        self.valid_dir().join("customer_sync.xml")
    }

    pub fn order_api(&self) -> PathBuf {
        self.valid_dir().join("order_api.xml")
    }

    pub fn broken_reference(&self) -> PathBuf {
        self.invalid_dir().join("broken_reference.xml")
    }

    pub fn duplicate_id(&self) -> PathBuf {
        self.invalid_dir().join("duplicate_id.xml")
    }

    pub fn schema_errors(&self) -> PathBuf {
        self.invalid_dir().join("schema_errors.xml")
    }

    pub fn unclosed(&self) -> PathBuf {
        self.malformed_dir().join("unclosed.xml")
    }
}

/// Copy a fixture into `dir`, returning the new path
pub async fn copy_fixture(fixture: &Path, dir: &Path) -> std::io::Result<PathBuf> {
    let target = dir.join(fixture.file_name().unwrap_or_default());
    fs::copy(fixture, &target).await?;
    Ok(target)
}

/// A temporary directory holding every fixture, flattened
pub async fn create_fixture_tree() -> std::io::Result<TempDir> {
    let fixtures = TestFixtures::new();
    let temp_dir = TempDir::new()?;
    for fixture in [
        fixtures.customer_sync(),
        fixtures.order_api(),
        fixtures.broken_reference(),
        fixtures.duplicate_id(),
        fixtures.schema_errors(),
        fixtures.unclosed(),
    ] {
        copy_fixture(&fixture, temp_dir.path()).await?;
    }
    Ok(temp_dir)
}

/// Replace every occurrence of `from` with `to` in a file
pub async fn edit_file(path: &Path, from: &str, to: &str) -> std::io::Result<()> {
    let content = fs::read_to_string(path).await?;
    fs::write(path, content.replace(from, to)).await
}
