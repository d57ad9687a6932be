//! Image analysis boundary

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::IngestError;

/// Exit code recorded when the analyzer fails on an image
pub const SENTINEL_EXIT_CODE: i32 = 8;

/// Measurements produced for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub exit_code: i32,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub tilt: Option<f64>,
    #[serde(default)]
    pub leading_row: Option<i32>,
    #[serde(default)]
    pub center_row: Option<f64>,
    #[serde(default)]
    pub center_column: Option<f64>,
    /// Processed image bytes, stored alongside the original
    #[serde(skip)]
    pub analysis_image: Option<Vec<u8>>,
}

impl AnalysisReport {
    /// Report persisted when analysis fails: sentinel exit code, no measurements
    pub fn degraded() -> Self {
        Self {
            exit_code: SENTINEL_EXIT_CODE,
            ..Default::default()
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.exit_code == SENTINEL_EXIT_CODE
    }
}

/// The analyzer could not process an image
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Image analysis failed: {0}")]
pub struct AnalysisFailure(pub String);

/// Produces measurements for one image
pub trait ImageAnalyzer: Send + Sync {
    fn analyze(&self, rel_filepath: &str, image: &[u8]) -> Result<AnalysisReport, AnalysisFailure>;
}

/// One line of an analysis manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub rel_filepath: String,
    #[serde(flatten)]
    pub report: AnalysisReport,
    /// Processed image file, relative to the manifest
    #[serde(default)]
    pub analysis_image: Option<PathBuf>,
}

/// Analyzer backed by precomputed results
///
/// Frames without an entry count as analysis failures.
#[derive(Debug, Default)]
pub struct ManifestAnalyzer {
    entries: HashMap<String, ManifestEntry>,
    base_dir: PathBuf,
}

impl ManifestAnalyzer {
    pub fn from_entries(entries: Vec<ManifestEntry>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.rel_filepath.clone(), e))
                .collect(),
            base_dir: base_dir.into(),
        }
    }

    /// Load a JSONL manifest; blank lines are skipped
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let manifest_error = |reason: String| IngestError::Manifest {
            path: path.display().to_string(),
            reason,
        };
        let file = File::open(path).map_err(|e| manifest_error(e.to_string()))?;
        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: ManifestEntry = serde_json::from_str(&line)
                .map_err(|e| manifest_error(format!("line {}: {}", line_num + 1, e)))?;
            entries.push(entry);
        }
        debug!(entries = entries.len(), path = %path.display(), "Loaded analysis manifest");
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self::from_entries(entries, base_dir))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ImageAnalyzer for ManifestAnalyzer {
    fn analyze(&self, rel_filepath: &str, _image: &[u8]) -> Result<AnalysisReport, AnalysisFailure> {
        let entry = self
            .entries
            .get(rel_filepath)
            .ok_or_else(|| AnalysisFailure(format!("no manifest entry for {rel_filepath}")))?;
        let mut report = entry.report.clone();
        if let Some(image) = &entry.analysis_image {
            let path = self.base_dir.join(image);
            report.analysis_image = Some(
                std::fs::read(&path)
                    .map_err(|e| AnalysisFailure(format!("{}: {}", path.display(), e)))?,
            );
        }
        Ok(report)
    }
}
