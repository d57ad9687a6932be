//! Table synthesis from layouts and observed records

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};

use super::{ColumnSpec, TableSpec};
use crate::inference::{CanonicalType, ColumnProfile};
use crate::layout::{ForeignKeyTarget, Layout, SchemaError, normalize_column_name};
use crate::normalize::{ExternalRecord, clean_value};
use crate::store::{ANCHOR_TABLE, CORE_TABLES};

/// Normalized column names that always get [`IDENTIFIER_WIDTH`]
pub const IDENTIFIER_COLUMNS: [&str; 10] = [
    "glass_id",
    "foil_id",
    "epoxy_id",
    "spacer_id",
    "flyer_cutting_program",
    "spacer_cutting_program",
    "flyer_stack",
    "sample",
    "launch_package",
    "experiment",
];

/// Fixed width of identifier columns
pub const IDENTIFIER_WIDTH: usize = 64;

/// Name of the derived anchor link column
pub const ANCHOR_ID_COLUMN: &str = "anchor_id";

/// Column observations for one layout, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct LayoutProfile {
    order: Vec<String>,
    columns: BTreeMap<String, ColumnProfile>,
}

impl LayoutProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile a full set of records
    pub fn from_records(layout: &Layout, records: &[ExternalRecord]) -> Self {
        let mut profile = Self::new();
        for record in records {
            profile.observe_record(layout, record);
        }
        profile
    }

    /// Observe the cleaned fields of one record
    ///
    /// Values whose transform fails are not profiled; normalization reports
    /// them later.
    pub fn observe_record(&mut self, layout: &Layout, record: &ExternalRecord) {
        for (source, raw) in &record.fields {
            let directives = layout.directives(source);
            if directives.ignore {
                continue;
            }
            let column = self.entry(source);
            if let Ok(Some(value)) = clean_value(source, raw, &directives) {
                column.observe(&value);
            }
        }
    }

    fn entry(&mut self, source: &str) -> &mut ColumnProfile {
        if !self.columns.contains_key(source) {
            self.order.push(source.to_string());
        }
        self.columns.entry(source.to_string()).or_default()
    }

    pub fn get(&self, source: &str) -> Option<&ColumnProfile> {
        self.columns.get(source)
    }

    /// Source column names in first-seen order
    pub fn columns(&self) -> &[String] {
        &self.order
    }
}

/// Builds table definitions layout by layout
///
/// Foreign keys may only point at core store tables or tables synthesized
/// earlier by the same synthesizer.
pub struct SchemaSynthesizer {
    known_tables: HashSet<String>,
}

impl Default for SchemaSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaSynthesizer {
    pub fn new() -> Self {
        Self {
            known_tables: CORE_TABLES.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Check whether a table may be referenced by later layouts
    pub fn is_known(&self, table: &str) -> bool {
        self.known_tables.contains(&table.to_lowercase())
    }

    /// Synthesize the table for a layout from its profile
    pub fn synthesize(
        &mut self,
        layout: &Layout,
        profile: &LayoutProfile,
    ) -> Result<TableSpec, SchemaError> {
        let table = layout.table_name.clone();

        // Observed columns first, then declared-but-unobserved ones
        let mut sources: Vec<&str> = profile.columns().iter().map(String::as_str).collect();
        for declared in layout.columns.keys() {
            if !sources.contains(&declared.as_str()) {
                sources.push(declared);
            }
        }
        if !sources.iter().any(|s| layout.is_primary_key(s)) {
            sources.push(&layout.pk_key);
        }

        let mut columns = Vec::new();
        for source in sources {
            let directives = layout.directives(source);
            let is_pk = layout.is_primary_key(source);
            let name = normalize_column_name(source);

            if directives.ignore {
                if is_pk {
                    return Err(SchemaError::UndefinedPrimaryKey {
                        table,
                        column: name,
                    });
                }
                continue;
            }

            let empty = ColumnProfile::new();
            let column_profile = profile.get(source).unwrap_or(&empty);
            let Some(canonical_type) = column_profile.resolve(directives.force_datetime) else {
                if is_pk {
                    return Err(SchemaError::UndefinedPrimaryKey {
                        table,
                        column: name,
                    });
                }
                if directives.not_null {
                    return Err(SchemaError::UndefinedRequiredColumn {
                        table,
                        column: name,
                    });
                }
                debug!(table = %table, column = %name, "Skipping column with no values");
                continue;
            };

            if let Some(fk) = &directives.foreign_key {
                if !self.is_known(&fk.table) {
                    return Err(SchemaError::UnresolvableForeignKey {
                        table,
                        column: name,
                        target: fk.table.clone(),
                    });
                }
            }

            let width = match canonical_type {
                CanonicalType::String if IDENTIFIER_COLUMNS.contains(&name.as_str()) => {
                    IDENTIFIER_WIDTH
                }
                CanonicalType::String => column_profile.max_len.max(1),
                _ => 0,
            };

            let spec = ColumnSpec {
                name,
                source_name: Some(source.to_string()),
                canonical_type,
                nullable: !(is_pk || directives.not_null),
                unique: directives.unique,
                primary_key: is_pk,
                foreign_key: directives.foreign_key.clone(),
                width,
            };
            if is_pk {
                columns.insert(0, spec);
            } else {
                columns.push(spec);
            }
        }

        if layout.anchor_link.is_some() {
            columns.push(ColumnSpec {
                name: ANCHOR_ID_COLUMN.to_string(),
                source_name: None,
                canonical_type: CanonicalType::Integer,
                nullable: true,
                unique: false,
                primary_key: false,
                foreign_key: Some(ForeignKeyTarget {
                    table: ANCHOR_TABLE.to_string(),
                    column: "id".to_string(),
                }),
                width: 0,
            });
        }

        info!(
            layout = %layout.name,
            table = %table,
            columns = columns.len(),
            "Synthesized table"
        );
        self.known_tables.insert(table.to_lowercase());
        Ok(TableSpec { name: table, columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutConfig;
    use serde_json::{Value, json};

    const LAYOUTS: &str = r#"
[[layout]]
name = "Glass ID"
pk_key = "Glass ID"

[layout.custom_columns]
"Notes" = ["ignore"]
"Vendor" = ["not_null"]

[[layout]]
name = "Sample"
pk_key = "Sample ID"

[layout.custom_columns]
"Glass ID" = ["fk-GlassID.glass_id"]
"Date" = ["astype-datetime"]
"Never Filled" = ["unique"]

[layout.anchor_link]
date_column = "Date"
"#;

    fn records(layout: &str, rows: Vec<Value>) -> Vec<ExternalRecord> {
        rows.into_iter()
            .map(|v| ExternalRecord::new(layout, v.as_object().unwrap().clone()))
            .collect()
    }

    fn glass_records() -> Vec<ExternalRecord> {
        records(
            "Glass ID",
            vec![
                json!({"Glass ID": "G1", "Vendor": "Acme", "Thickness": "1", "Notes": "x"}),
                json!({"Glass ID": "G2", "Vendor": "Acme Glassworks", "Thickness": "1.5", "Notes": "y"}),
                json!({"Glass ID": "G3", "Vendor": "B", "Thickness": "N/A", "Empty": ""}),
            ],
        )
    }

    #[test]
    fn test_synthesize_types_widths_and_flags() {
        let config = LayoutConfig::from_toml_str(LAYOUTS).unwrap();
        let layout = &config.layouts[0];
        let profile = LayoutProfile::from_records(layout, &glass_records());

        let mut synth = SchemaSynthesizer::new();
        let table = synth.synthesize(layout, &profile).unwrap();

        assert_eq!(table.name, "GlassID");
        assert_eq!(table.column_names(), vec!["glass_id", "thickness", "vendor"]);

        let pk = table.primary_key().unwrap();
        assert_eq!(pk.name, "glass_id");
        assert_eq!(pk.width, IDENTIFIER_WIDTH);
        assert!(!pk.nullable);

        let thickness = table.column("thickness").unwrap();
        assert_eq!(thickness.canonical_type, CanonicalType::Float);

        let vendor = table.column("vendor").unwrap();
        assert_eq!(vendor.width, "Acme Glassworks".len());
        assert!(!vendor.nullable);

        assert!(table.column("notes").is_none());
        assert!(table.column("empty").is_none());
        assert!(synth.is_known("glassid"));
    }

    #[test]
    fn test_foreign_key_must_point_backwards() {
        let config = LayoutConfig::from_toml_str(LAYOUTS).unwrap();
        let sample = &config.layouts[1];
        let sample_records = records(
            "Sample",
            vec![json!({"Sample ID": 1, "Glass ID": "G1", "Date": "04/15/2023"})],
        );
        let profile = LayoutProfile::from_records(sample, &sample_records);

        let err = SchemaSynthesizer::new()
            .synthesize(sample, &profile)
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvableForeignKey { ref target, .. } if target == "GlassID"));

        let mut synth = SchemaSynthesizer::new();
        let glass = &config.layouts[0];
        synth
            .synthesize(glass, &LayoutProfile::from_records(glass, &glass_records()))
            .unwrap();
        let table = synth.synthesize(sample, &profile).unwrap();

        assert_eq!(
            table.column_names(),
            vec!["sample_id", "date", "glass_id", "anchor_id"]
        );
        assert_eq!(
            table.column("date").unwrap().canonical_type,
            CanonicalType::Datetime
        );
        assert_eq!(
            table.column("anchor_id").unwrap().foreign_key.as_ref().unwrap().table,
            ANCHOR_TABLE
        );
        assert!(table.column("never_filled").is_none());
    }

    #[test]
    fn test_undefined_required_columns() {
        let config = LayoutConfig::from_toml_str(LAYOUTS).unwrap();
        let layout = &config.layouts[0];

        let no_vendor = records("Glass ID", vec![json!({"Glass ID": "G1", "Vendor": "N/A"})]);
        let err = SchemaSynthesizer::new()
            .synthesize(layout, &LayoutProfile::from_records(layout, &no_vendor))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UndefinedRequiredColumn { ref column, .. } if column == "vendor"));

        let no_pk = records("Glass ID", vec![json!({"Vendor": "Acme"})]);
        let err = SchemaSynthesizer::new()
            .synthesize(layout, &LayoutProfile::from_records(layout, &no_pk))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UndefinedPrimaryKey { ref column, .. } if column == "glass_id"));
    }

    #[test]
    fn test_create_sql_renders() {
        let config = LayoutConfig::from_toml_str(LAYOUTS).unwrap();
        let layout = &config.layouts[0];
        let table = SchemaSynthesizer::new()
            .synthesize(layout, &LayoutProfile::from_records(layout, &glass_records()))
            .unwrap();
        let sql = table.create_sql();
        assert!(sql.contains("\"glass_id\" VARCHAR(64) PRIMARY KEY"));
        assert!(sql.contains("\"vendor\" VARCHAR(15) NOT NULL"));
    }
}
