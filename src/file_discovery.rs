use crate::error::{DiscoveryError, DiscoveryResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Async file discovery for process definition files
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// File extensions to include, lowercase without the dot (e.g., ["xml"])
    extensions: Vec<String>,
    /// Maximum depth for directory traversal (None = unlimited)
    max_depth: Option<usize>,
    /// Follow symbolic links
    follow_symlinks: bool,
}

impl FileDiscovery {
    /// Create a new FileDiscovery instance
    pub fn new() -> Self {
        Self {
            extensions: vec!["xml".to_string()],
            max_depth: None,
            follow_symlinks: false,
        }
    }

    /// Set file extensions to discover
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    /// Set maximum traversal depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set whether to follow symbolic links
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Discover files under every root, dropping duplicates while keeping first-seen order
    pub async fn discover_all(&self, roots: &[PathBuf]) -> DiscoveryResult<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for root in roots {
            for file in self.discover_files(root).await? {
                if seen.insert(file.clone()) {
                    files.push(file);
                }
            }
        }
        Ok(files)
    }

    /// Discover files in the given path (file or directory), sorted by path.
    ///
    /// A path naming a file is returned as-is, whatever its extension.
    pub async fn discover_files(&self, path: &Path) -> DiscoveryResult<Vec<PathBuf>> {
        let metadata = fs::metadata(path).await.map_err(|source| DiscoveryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if metadata.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }

        let mut files = Vec::new();
        self.discover_files_recursive(path, 0, &mut files).await?;
        files.sort();
        Ok(files)
    }

    /// Recursive helper for discovering files; entries of `dir` sit at `depth`
    fn discover_files_recursive<'a>(
        &'a self,
        dir: &'a Path,
        depth: usize,
        files: &'a mut Vec<PathBuf>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = DiscoveryResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let io_error = |source| DiscoveryError::Io {
                path: dir.to_path_buf(),
                source,
            };
            let mut read_dir = fs::read_dir(dir).await.map_err(io_error)?;

            while let Some(entry) = read_dir.next_entry().await.map_err(io_error)? {
                let entry_path = entry.path();

                // Handle symlinks
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(e) => {
                        warn!(path = %entry_path.display(), error = %e, "skipping unreadable entry");
                        continue;
                    }
                };
                if file_type.is_symlink() && !self.follow_symlinks {
                    continue;
                }

                let metadata = match fs::metadata(&entry_path).await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!(path = %entry_path.display(), error = %e, "skipping unreadable entry");
                        continue;
                    }
                };

                if metadata.is_file() {
                    if self.should_process(&entry_path) {
                        files.push(entry_path);
                    }
                } else if metadata.is_dir() {
                    // Only recurse into directories if we can still go deeper
                    if self.max_depth.is_some_and(|max_depth| depth >= max_depth) {
                        continue;
                    }
                    if let Err(e) = self
                        .discover_files_recursive(&entry_path, depth + 1, files)
                        .await
                    {
                        // Log error but continue processing other files
                        warn!(path = %entry_path.display(), error = %e, "error while discovering files");
                    }
                }
            }

            Ok(())
        })
    }

    /// Check if a file should be processed based on its extension
    pub fn should_process(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}
