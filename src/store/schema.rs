//! Table definitions for the analysis store

/// Table holding one row per experiment/video session
pub const ANCHOR_TABLE: &str = "metadata_anchors";

/// Table holding one row per analysed frame
pub const RESULT_TABLE: &str = "analysis_results";

/// Table holding the image bytes for each analysis result
pub const ARTIFACT_TABLE: &str = "image_artifacts";

/// Core tables in creation order (dependents last)
pub const CORE_TABLES: [&str; 3] = [ANCHOR_TABLE, RESULT_TABLE, ARTIFACT_TABLE];

/// Schema for the core store tables
pub struct StoreSchema;

impl StoreSchema {
    /// DDL for creating all core tables (DuckDB syntax)
    pub fn create_tables() -> &'static str {
        r#"
CREATE SEQUENCE IF NOT EXISTS metadata_anchors_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS analysis_results_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS image_artifacts_id_seq START 1;

-- One row per experiment/video session
CREATE TABLE IF NOT EXISTS metadata_anchors (
    id BIGINT PRIMARY KEY,
    datestamp DATE,
    day_counter INTEGER,
    camera_tag VARCHAR
);

-- One row per analysed frame
CREATE TABLE IF NOT EXISTS analysis_results (
    id BIGINT PRIMARY KEY,
    anchor_id BIGINT REFERENCES metadata_anchors(id),
    rel_filepath VARCHAR(896) NOT NULL UNIQUE,
    exit_code INTEGER NOT NULL,
    radius DOUBLE,
    tilt DOUBLE,
    leading_row INTEGER,
    center_row DOUBLE,
    center_column DOUBLE
);

-- Original and processed images for each result
CREATE TABLE IF NOT EXISTS image_artifacts (
    id BIGINT PRIMARY KEY,
    result_id BIGINT NOT NULL REFERENCES analysis_results(id),
    camera_image BLOB,
    analysis_image BLOB
);

CREATE INDEX IF NOT EXISTS idx_anchors_datestamp ON metadata_anchors(datestamp);
"#
    }

    /// DDL for dropping all core tables (dependents first)
    pub fn drop_tables() -> &'static str {
        r#"
DROP TABLE IF EXISTS image_artifacts;
DROP TABLE IF EXISTS analysis_results;
DROP TABLE IF EXISTS metadata_anchors;
DROP SEQUENCE IF EXISTS image_artifacts_id_seq;
DROP SEQUENCE IF EXISTS analysis_results_id_seq;
DROP SEQUENCE IF EXISTS metadata_anchors_id_seq;
"#
    }

    /// Query checking whether a table exists
    pub fn select_table_exists() -> &'static str {
        "SELECT COUNT(*) FROM information_schema.tables WHERE lower(table_name) = lower(?1)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_contains_core_tables() {
        let ddl = StoreSchema::create_tables();
        for table in CORE_TABLES {
            assert!(ddl.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
        }
        assert!(ddl.contains("rel_filepath VARCHAR(896) NOT NULL UNIQUE"));
    }

    #[test]
    fn test_drop_order_is_reverse_of_creation() {
        let ddl = StoreSchema::drop_tables();
        let artifacts = ddl.find("DROP TABLE IF EXISTS image_artifacts").unwrap();
        let results = ddl.find("DROP TABLE IF EXISTS analysis_results").unwrap();
        let anchors = ddl.find("DROP TABLE IF EXISTS metadata_anchors").unwrap();
        assert!(artifacts < results && results < anchors);
    }
}
