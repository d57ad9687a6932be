//! Layout configuration loading and validation

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ColumnDirectives, SchemaError};

/// Source columns of a layout that carry anchor link fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorLinkSpec {
    /// Column holding the experiment date
    #[serde(default)]
    pub date_column: Option<String>,
    /// Column holding the day counter
    #[serde(default)]
    pub day_counter_column: Option<String>,
    /// Column holding a camera filename or bare `hh_mm_ss` tag
    #[serde(default)]
    pub camera_column: Option<String>,
}

impl AnchorLinkSpec {
    pub fn is_empty(&self) -> bool {
        self.date_column.is_none()
            && self.day_counter_column.is_none()
            && self.camera_column.is_none()
    }
}

/// One layout as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    /// Layout name in the external source
    pub name: String,
    /// Target table; defaults to the layout name with spaces removed
    #[serde(default)]
    pub sql_table_name: Option<String>,
    /// Source column holding the primary key
    pub pk_key: String,
    /// Source column name to directive tokens
    #[serde(default)]
    pub custom_columns: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub anchor_link: Option<AnchorLinkSpec>,
}

#[derive(Debug, Deserialize)]
struct LayoutFile {
    #[serde(rename = "layout", default)]
    layouts: Vec<LayoutDescriptor>,
}

/// A validated layout with parsed directives
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub name: String,
    pub table_name: String,
    pub pk_key: String,
    /// Directives keyed by source column name
    pub columns: BTreeMap<String, ColumnDirectives>,
    pub anchor_link: Option<AnchorLinkSpec>,
}

impl Layout {
    /// Validate a descriptor and parse its directives
    pub fn from_descriptor(descriptor: LayoutDescriptor) -> Result<Self, SchemaError> {
        let table_name = match descriptor.sql_table_name {
            Some(name) => name.trim().to_string(),
            None => descriptor.name.replace(' ', ""),
        };
        if table_name.is_empty() {
            return Err(SchemaError::EmptyTableName(descriptor.name));
        }

        let mut columns = BTreeMap::new();
        for (column, tokens) in &descriptor.custom_columns {
            let directives = ColumnDirectives::parse(&descriptor.name, column, tokens)?;
            columns.insert(column.clone(), directives);
        }

        Ok(Self {
            name: descriptor.name,
            table_name,
            pk_key: descriptor.pk_key,
            columns,
            anchor_link: descriptor.anchor_link.filter(|link| !link.is_empty()),
        })
    }

    /// Directives for a source column (defaults if none are declared)
    pub fn directives(&self, source_column: &str) -> ColumnDirectives {
        self.columns.get(source_column).cloned().unwrap_or_default()
    }

    /// Check whether a source column is the primary key
    pub fn is_primary_key(&self, source_column: &str) -> bool {
        normalize_column_name(source_column) == normalize_column_name(&self.pk_key)
    }

    /// Source columns consumed by anchor linking
    pub fn anchor_columns(&self) -> Vec<&str> {
        self.anchor_link
            .iter()
            .flat_map(|link| {
                [
                    link.date_column.as_deref(),
                    link.day_counter_column.as_deref(),
                    link.camera_column.as_deref(),
                ]
            })
            .flatten()
            .collect()
    }
}

/// Ordered list of layouts to convert
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutConfig {
    pub layouts: Vec<Layout>,
}

impl LayoutConfig {
    /// Validate descriptors in order
    pub fn from_descriptors(descriptors: Vec<LayoutDescriptor>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        let mut layouts = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let layout = Layout::from_descriptor(descriptor)?;
            if !seen.insert(layout.table_name.to_lowercase()) {
                return Err(SchemaError::DuplicateTable(layout.table_name));
            }
            layouts.push(layout);
        }
        Ok(Self { layouts })
    }

    /// Parse a TOML document with `[[layout]]` entries
    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let file: LayoutFile =
            toml::from_str(content).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::from_descriptors(file.layouts)
    }

    /// Parse a JSON array of layout descriptors
    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        let descriptors: Vec<LayoutDescriptor> =
            serde_json::from_str(content).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::from_descriptors(descriptors)
    }

    /// Load from a `.toml` or `.json` file
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.layouts.iter().map(|l| l.table_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

/// Normalize a source column name: lower-cased, spaces become underscores
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUTS: &str = r#"
[[layout]]
name = "Glass ID"
pk_key = "Glass ID"

[layout.custom_columns]
"Glass ID" = ["not_null", "unique"]
"Notes" = ["ignore"]

[[layout]]
name = "Experiment"
sql_table_name = "experiments"
pk_key = "Experiment ID"

[layout.custom_columns]
"Glass ID" = ["fk-GlassID.glass_id"]
"Date" = ["astype-datetime"]

[layout.anchor_link]
date_column = "Date"
camera_column = "Camera Filename"
"#;

    #[test]
    fn test_load_toml() {
        let config = LayoutConfig::from_toml_str(LAYOUTS).unwrap();
        assert_eq!(config.len(), 2);
        assert_eq!(config.table_names(), vec!["GlassID", "experiments"]);

        let glass = config.get("Glass ID").unwrap();
        assert!(glass.directives("Notes").ignore);
        assert!(glass.directives("Glass ID").unique);
        assert!(glass.is_primary_key("glass id"));
        assert!(glass.anchor_link.is_none());

        let experiment = config.get("Experiment").unwrap();
        assert!(experiment.directives("Date").force_datetime);
        assert_eq!(experiment.anchor_columns(), vec!["Date", "Camera Filename"]);
    }

    #[test]
    fn test_load_json() {
        let config = LayoutConfig::from_json_str(
            r#"[{"name": "Foil ID", "pk_key": "Foil ID", "custom_columns": {"Foil ID": ["unique"]}}]"#,
        )
        .unwrap();
        assert_eq!(config.table_names(), vec!["FoilID"]);
    }

    #[test]
    fn test_duplicate_table_is_rejected() {
        let err = LayoutConfig::from_toml_str(
            r#"
[[layout]]
name = "Glass ID"
pk_key = "id"

[[layout]]
name = "Glass  ID"
sql_table_name = "glassid"
pk_key = "id"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateTable(_)));
    }

    #[test]
    fn test_empty_table_name_is_rejected() {
        let err = LayoutConfig::from_toml_str(
            r#"
[[layout]]
name = "Sample"
sql_table_name = "  "
pk_key = "id"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::EmptyTableName(name) if name == "Sample"));
    }

    #[test]
    fn test_invalid_directive_is_rejected() {
        let err = LayoutConfig::from_toml_str(
            r#"
[[layout]]
name = "Sample"
pk_key = "id"
custom_columns = { "id" = ["primary"] }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDirective { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.toml");
        std::fs::write(&path, LAYOUTS).unwrap();
        assert_eq!(LayoutConfig::load(&path).unwrap().len(), 2);

        let missing = LayoutConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, SchemaError::Io { .. }));
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("Glass ID"), "glass_id");
        assert_eq!(normalize_column_name(" Flyer Stack "), "flyer_stack");
    }
}
