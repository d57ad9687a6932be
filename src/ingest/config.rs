//! Configuration for streaming ingestion runs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for a streaming ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory the relative filepaths are resolved against
    pub images_dir: PathBuf,
    /// Glob pattern, relative to `images_dir`
    pub pattern: String,
    /// Extension of items to analyse (case-insensitive, without the dot)
    pub extension: String,
    /// Number of worker threads
    pub workers: usize,
    /// Drop and recreate the store tables before the run
    pub drop_existing: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("."),
            pattern: "**/*".to_string(),
            extension: "bmp".to_string(),
            workers: 4,
            drop_existing: false,
        }
    }
}

impl IngestConfig {
    /// Create a new builder for IngestConfig
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Check whether a relative filepath carries the configured extension
    pub fn accepts(&self, rel_filepath: &str) -> bool {
        rel_filepath
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(&self.extension))
    }
}

/// Builder for IngestConfig
#[derive(Debug, Default)]
pub struct IngestConfigBuilder {
    images_dir: Option<PathBuf>,
    pattern: Option<String>,
    extension: Option<String>,
    workers: Option<usize>,
    drop_existing: bool,
}

impl IngestConfigBuilder {
    /// Set the images directory
    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images_dir = Some(dir.into());
        self
    }

    /// Set the file pattern
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// Set the accepted extension
    pub fn extension(mut self, extension: &str) -> Self {
        self.extension = Some(extension.trim_start_matches('.').to_string());
        self
    }

    /// Set the number of worker threads
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Drop and recreate tables on startup
    pub fn drop_existing(mut self, drop_existing: bool) -> Self {
        self.drop_existing = drop_existing;
        self
    }

    /// Build the IngestConfig
    pub fn build(self) -> Result<IngestConfig, String> {
        let defaults = IngestConfig::default();
        let workers = self.workers.unwrap_or(defaults.workers);
        if workers == 0 {
            return Err("At least one worker is required".to_string());
        }
        let extension = self.extension.unwrap_or(defaults.extension);
        if extension.is_empty() {
            return Err("Extension must not be empty".to_string());
        }

        Ok(IngestConfig {
            images_dir: self.images_dir.unwrap_or(defaults.images_dir),
            pattern: self.pattern.unwrap_or(defaults.pattern),
            extension,
            workers,
            drop_existing: self.drop_existing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = IngestConfig::builder().build().unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.extension, "bmp");
        assert!(!config.drop_existing);
    }

    #[test]
    fn test_builder_validation() {
        assert!(IngestConfig::builder().workers(0).build().is_err());
        assert!(IngestConfig::builder().extension(".").build().is_err());
    }

    #[test]
    fn test_accepts_extension() {
        let config = IngestConfig::builder().extension(".bmp").build().unwrap();
        assert!(config.accepts("a/TC--20230415--00042.bmp"));
        assert!(config.accepts("a/frame.BMP"));
        assert!(!config.accepts("a/frame.png"));
        assert!(!config.accepts("a/bmp"));
    }
}
