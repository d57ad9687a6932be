//! Output formatting for CLI

use flyer_ingest::bulk::ConvertReport;
use flyer_ingest::ingest::IngestStats;

/// Format a conversion report with its error list
pub fn format_convert_report(report: &ConvertReport) -> String {
    let mut output = String::new();

    if !report.errors.is_empty() {
        output.push_str(&format!("\n⚠️  Rejected records ({}):\n", report.errors_count));
        for error in &report.errors {
            output.push_str(&format!("  - {}\n", error));
        }
        if report.errors_count > report.errors.len() {
            output.push_str(&format!(
                "  ... and {} more\n",
                report.errors_count - report.errors.len()
            ));
        }
    }

    let ambiguous: usize = report.layouts.iter().map(|l| l.ambiguous).sum();
    if ambiguous > 0 {
        output.push_str(&format!("\n⚠️  {} record(s) had ambiguous anchor links\n", ambiguous));
    }

    output.push_str(&format!("\n✅ {}\n", report.summary()));
    output
}

/// Format ingestion statistics with their error list
pub fn format_ingest_stats(stats: &IngestStats, target: &str) -> String {
    let mut output = String::new();

    if !stats.errors.is_empty() {
        output.push_str(&format!("\n⚠️  Failed items ({}):\n", stats.errors_count));
        for error in &stats.errors {
            output.push_str(&format!("  - {}\n", error));
        }
    }

    if stats.degraded > 0 {
        output.push_str(&format!(
            "\n⚠️  {} frame(s) stored with degraded analysis\n",
            stats.degraded
        ));
    }

    output.push_str(&format!("\n✅ {}\n", stats.summary(target)));
    output
}
