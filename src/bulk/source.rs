//! Record sources for bulk conversion

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::ConvertError;
use crate::normalize::ExternalRecord;

/// A source of records, fetched one layout at a time
pub trait RecordSource {
    fn fetch_layout(&self, layout: &str) -> Result<Vec<ExternalRecord>, ConvertError>;
}

/// Reads `<dir>/<layout name>.jsonl`, one JSON object per line
#[derive(Debug, Clone)]
pub struct JsonlRecordSource {
    dir: PathBuf,
}

impl JsonlRecordSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File holding the records of a layout
    pub fn layout_path(&self, layout: &str) -> PathBuf {
        self.dir.join(format!("{layout}.jsonl"))
    }
}

impl RecordSource for JsonlRecordSource {
    fn fetch_layout(&self, layout: &str) -> Result<Vec<ExternalRecord>, ConvertError> {
        let path = self.layout_path(layout);
        parse_jsonl_records(&path, layout)
    }
}

/// Parse a JSONL file of flat records
pub fn parse_jsonl_records(path: &Path, layout: &str) -> Result<Vec<ExternalRecord>, ConvertError> {
    let source_error = |reason: String| ConvertError::Source {
        layout: layout.to_string(),
        reason,
    };
    let file =
        File::open(path).map_err(|e| source_error(format!("{}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| source_error(e.to_string()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(fields)) => records.push(ExternalRecord::new(layout, fields)),
            Ok(_) => {
                return Err(source_error(format!(
                    "line {}: expected a JSON object",
                    line_num + 1
                )));
            }
            Err(e) => return Err(source_error(format!("line {}: {}", line_num + 1, e))),
        }
    }

    Ok(records)
}

/// Serves records held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    layouts: HashMap<String, Vec<ExternalRecord>>,
}

impl MemoryRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records for a layout from JSON objects; other values are skipped
    pub fn with_layout(mut self, layout: &str, rows: Vec<Value>) -> Self {
        let records = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(fields) => Some(ExternalRecord::new(layout, fields)),
                _ => None,
            })
            .collect();
        self.layouts.insert(layout.to_string(), records);
        self
    }
}

impl RecordSource for MemoryRecordSource {
    fn fetch_layout(&self, layout: &str) -> Result<Vec<ExternalRecord>, ConvertError> {
        self.layouts
            .get(layout)
            .cloned()
            .ok_or_else(|| ConvertError::Source {
                layout: layout.to_string(),
                reason: "no records registered".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_jsonl_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Glass ID.jsonl"),
            "{\"Glass ID\": \"G1\"}\n\n{\"Glass ID\": \"G2\", \"Vendor\": \"Acme\"}\n",
        )
        .unwrap();

        let source = JsonlRecordSource::new(dir.path());
        let records = source.fetch_layout("Glass ID").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].layout, "Glass ID");
        assert_eq!(records[1].get("Vendor"), Some(&json!("Acme")));
    }

    #[test]
    fn test_jsonl_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonlRecordSource::new(dir.path());
        assert!(matches!(
            source.fetch_layout("Missing"),
            Err(ConvertError::Source { .. })
        ));

        std::fs::write(dir.path().join("Bad.jsonl"), "[1, 2]\n").unwrap();
        let err = source.fetch_layout("Bad").unwrap_err();
        assert!(err.to_string().contains("line 1: expected a JSON object"));
    }

    #[test]
    fn test_memory_source() {
        let source = MemoryRecordSource::new().with_layout("Sample", vec![json!({"a": 1}), json!(3)]);
        assert_eq!(source.fetch_layout("Sample").unwrap().len(), 1);
        assert!(source.fetch_layout("Other").is_err());
    }
}
