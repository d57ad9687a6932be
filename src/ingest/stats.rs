//! Run statistics for streaming ingestion

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ItemOutcome;

/// Maximum number of error messages kept
const MAX_ERRORS: usize = 100;

/// Maximum number of processed filepaths kept
const MAX_LATEST: usize = 50;

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Items fetched from the source
    pub received: usize,
    /// Items that were ignored (wrong extension)
    pub ignored: usize,
    /// Items already present in the store
    pub duplicates: usize,
    /// Items persisted with a result row
    pub persisted: usize,
    /// Persisted items whose analysis failed
    pub degraded: usize,
    /// Persisted items linked to an anchor
    pub linked: usize,
    /// Persisted items whose anchor link was ambiguous
    pub ambiguous: usize,
    /// Number of errors encountered
    pub errors_count: usize,
    /// List of errors (limited to first 100)
    pub errors: Vec<String>,
    /// Most recently persisted filepaths
    pub latest_filepaths: Vec<String>,
    /// Duration of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl IngestStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error (limited to 100)
    pub fn add_error(&mut self, error: String) {
        self.errors_count += 1;
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
    }

    /// Count the outcome of one item
    pub fn record(&mut self, rel_filepath: &str, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Ignored => self.ignored += 1,
            ItemOutcome::Duplicate => self.duplicates += 1,
            ItemOutcome::Persisted { degraded, link, .. } => {
                self.persisted += 1;
                if *degraded {
                    self.degraded += 1;
                }
                if link.anchor_id().is_some() {
                    self.linked += 1;
                }
                if link.is_ambiguous() {
                    self.ambiguous += 1;
                }
                self.push_latest(rel_filepath.to_string());
            }
        }
    }

    fn push_latest(&mut self, rel_filepath: String) {
        self.latest_filepaths.push(rel_filepath);
        if self.latest_filepaths.len() > MAX_LATEST {
            let excess = self.latest_filepaths.len() - MAX_LATEST;
            self.latest_filepaths.drain(..excess);
        }
    }

    /// Fold another worker's stats into these
    pub fn merge(&mut self, other: IngestStats) {
        self.received += other.received;
        self.ignored += other.ignored;
        self.duplicates += other.duplicates;
        self.persisted += other.persisted;
        self.degraded += other.degraded;
        self.linked += other.linked;
        self.ambiguous += other.ambiguous;
        self.errors_count += other.errors_count;
        for error in other.errors {
            if self.errors.len() >= MAX_ERRORS {
                break;
            }
            self.errors.push(error);
        }
        for path in other.latest_filepaths {
            self.push_latest(path);
        }
        self.duration = self.duration.max(other.duration);
    }

    /// Items processed without error
    pub fn processed(&self) -> usize {
        self.ignored + self.duplicates + self.persisted
    }

    /// Get persisted items per second throughput
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.persisted as f64 / secs
        }
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let secs = self.duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }

    /// Multi-line run report naming the store target
    pub fn summary(&self, target: &str) -> String {
        let mut msg = format!("{} total items were received", self.received);
        if self.persisted > 0 {
            msg.push_str(&format!(
                ", {} were processed successfully, and {} file{} had analysis results added to {} \
                 (latest listed below)",
                self.processed(),
                self.persisted,
                if self.persisted == 1 { "" } else { "s" },
                target
            ));
        } else {
            msg.push_str(&format!(
                " and {} were processed successfully",
                self.processed()
            ));
        }
        msg.push_str(&format!(" in {}", self.duration_string()));
        for path in &self.latest_filepaths {
            msg.push_str(&format!("\n\t{path}"));
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AnchorResolution;

    fn persisted(link: AnchorResolution, degraded: bool) -> ItemOutcome {
        ItemOutcome::Persisted {
            result_id: 1,
            degraded,
            link,
        }
    }

    #[test]
    fn test_record_outcomes() {
        let mut stats = IngestStats::new();
        stats.record("a.bmp", &persisted(AnchorResolution::Created(1), false));
        stats.record("b.bmp", &persisted(AnchorResolution::Ambiguous { matches: 2 }, true));
        stats.record("a.bmp", &ItemOutcome::Duplicate);
        stats.record("c.txt", &ItemOutcome::Ignored);

        assert_eq!(stats.persisted, 2);
        assert_eq!(stats.linked, 1);
        assert_eq!(stats.ambiguous, 1);
        assert_eq!(stats.degraded, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.processed(), 4);
        assert_eq!(stats.latest_filepaths, vec!["a.bmp", "b.bmp"]);
    }

    #[test]
    fn test_error_and_latest_caps() {
        let mut stats = IngestStats::new();
        for i in 0..150 {
            stats.add_error(format!("error {i}"));
            stats.record(&format!("{i}.bmp"), &persisted(AnchorResolution::Unlinked, false));
        }
        assert_eq!(stats.errors_count, 150);
        assert_eq!(stats.errors.len(), 100);
        assert_eq!(stats.latest_filepaths.len(), 50);
        assert_eq!(stats.latest_filepaths[0], "100.bmp");
    }

    #[test]
    fn test_merge() {
        let mut a = IngestStats::new();
        a.received = 2;
        a.record("a.bmp", &persisted(AnchorResolution::Existing(3), false));
        let mut b = IngestStats::new();
        b.received = 1;
        b.add_error("boom".to_string());
        b.duration = Duration::from_secs(5);

        a.merge(b);
        assert_eq!(a.received, 3);
        assert_eq!(a.persisted, 1);
        assert_eq!(a.errors, vec!["boom"]);
        assert_eq!(a.duration_string(), "5s");
    }

    #[test]
    fn test_summary() {
        let mut stats = IngestStats::new();
        stats.received = 1;
        stats.record("run/TC--20230415--00042.bmp", &persisted(AnchorResolution::Unlinked, false));
        let summary = stats.summary("flyers.duckdb");
        assert!(summary.starts_with("1 total items were received, 1 were processed"));
        assert!(summary.contains("1 file had analysis results added to flyers.duckdb"));
        assert!(summary.ends_with("\n\trun/TC--20230415--00042.bmp"));
    }
}
