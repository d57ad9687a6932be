//! Conversion run reports

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum number of error messages kept
const MAX_ERRORS: usize = 100;

/// Outcome of converting one layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutReport {
    pub layout: String,
    pub table: String,
    /// Records fetched from the source
    pub fetched: usize,
    /// Rows inserted
    pub inserted: usize,
    /// Records with no populated fields
    pub empty: usize,
    /// Records excluded because they failed normalization
    pub rejected: usize,
    /// Homogeneous batches inserted
    pub batches: usize,
    /// Rows linked to a metadata anchor
    pub linked: usize,
    /// Rows whose anchor link was ambiguous
    pub ambiguous: usize,
}

/// Outcome of a full conversion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertReport {
    pub run_id: String,
    pub layouts: Vec<LayoutReport>,
    /// Tables dropped before conversion
    pub dropped_tables: Vec<String>,
    pub errors_count: usize,
    /// List of errors (limited to first 100)
    pub errors: Vec<String>,
    #[serde(skip)]
    pub duration: Duration,
}

impl ConvertReport {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    /// Add an error (limited to 100)
    pub fn add_error(&mut self, error: String) {
        self.errors_count += 1;
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
    }

    pub fn total_inserted(&self) -> usize {
        self.layouts.iter().map(|l| l.inserted).sum()
    }

    pub fn total_rejected(&self) -> usize {
        self.layouts.iter().map(|l| l.rejected).sum()
    }

    pub fn layout(&self, name: &str) -> Option<&LayoutReport> {
        self.layouts.iter().find(|l| l.layout == name)
    }

    /// One line per layout plus totals
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Conversion {}", self.run_id)];
        if !self.dropped_tables.is_empty() {
            lines.push(format!("Dropped tables: {}", self.dropped_tables.join(", ")));
        }
        for l in &self.layouts {
            lines.push(format!(
                "  - {} -> {}: {} inserted, {} empty, {} rejected ({} batches)",
                l.layout, l.table, l.inserted, l.empty, l.rejected, l.batches
            ));
        }
        lines.push(format!(
            "Total: {} rows inserted, {} rejected in {:.1}s",
            self.total_inserted(),
            self.total_rejected(),
            self.duration.as_secs_f64()
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_and_summary() {
        let mut report = ConvertReport::new("run-1");
        report.layouts.push(LayoutReport {
            layout: "Glass ID".to_string(),
            table: "GlassID".to_string(),
            inserted: 3,
            rejected: 1,
            batches: 2,
            ..Default::default()
        });
        report.layouts.push(LayoutReport {
            layout: "Sample".to_string(),
            table: "Sample".to_string(),
            inserted: 2,
            ..Default::default()
        });
        assert_eq!(report.total_inserted(), 5);
        assert_eq!(report.total_rejected(), 1);
        assert_eq!(report.layout("Sample").unwrap().inserted, 2);

        let summary = report.summary();
        assert!(summary.contains("Glass ID -> GlassID: 3 inserted, 0 empty, 1 rejected (2 batches)"));
        assert!(summary.contains("Total: 5 rows inserted, 1 rejected"));
    }
}
