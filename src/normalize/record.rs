//! Record normalization into canonical rows

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{NormalizationError, cast_value, clean_value};
use crate::inference::ScalarValue;
use crate::layout::{Layout, normalize_column_name};
use crate::synthesis::{ColumnSpec, TableSpec};

/// A raw record pulled from the external source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRecord {
    /// Name of the layout the record came from
    pub layout: String,
    pub fields: Map<String, Value>,
}

impl ExternalRecord {
    pub fn new(layout: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            layout: layout.into(),
            fields,
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }
}

/// A normalized row: column name to typed value, absent fields omitted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CanonicalRow {
    values: BTreeMap<String, ScalarValue>,
}

impl CanonicalRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: ScalarValue) {
        self.values.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&ScalarValue> {
        self.values.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Populated column names, sorted
    pub fn columns(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in the order of the given columns
    pub fn values_for<'a, S: AsRef<str>>(&'a self, columns: &[S]) -> Vec<&'a ScalarValue> {
        columns
            .iter()
            .filter_map(|c| self.values.get(c.as_ref()))
            .collect()
    }
}

/// Normalizes records of one layout against its synthesized table
pub struct RecordNormalizer {
    layout: Layout,
    /// Source column name to column spec
    columns: BTreeMap<String, ColumnSpec>,
    /// Names of not-null and primary-key columns
    required: Vec<String>,
}

impl RecordNormalizer {
    pub fn new(layout: &Layout, table: &TableSpec) -> Self {
        let mut columns = BTreeMap::new();
        let mut required = Vec::new();
        for spec in &table.columns {
            let Some(source) = &spec.source_name else {
                continue;
            };
            if !spec.nullable {
                required.push(spec.name.clone());
            }
            columns.insert(source.clone(), spec.clone());
        }
        Self {
            layout: layout.clone(),
            columns,
            required,
        }
    }

    /// Normalize one record
    ///
    /// Returns `Ok(None)` when every non-ignored field is absent. A populated
    /// field without a synthesized column is an error, so a value is never
    /// dropped silently.
    pub fn normalize(
        &self,
        record: &ExternalRecord,
    ) -> Result<Option<CanonicalRow>, NormalizationError> {
        let mut cleaned = Vec::new();
        for (source, raw) in &record.fields {
            let directives = self.layout.directives(source);
            if directives.ignore {
                continue;
            }
            let column = normalize_column_name(source);
            let Some(value) = clean_value(&column, raw, &directives)? else {
                continue;
            };
            let Some(spec) = self.columns.get(source) else {
                return Err(NormalizationError::UnknownColumn {
                    column,
                    value: value_text(&value),
                });
            };
            cleaned.push((spec, value));
        }
        if cleaned.is_empty() {
            return Ok(None);
        }

        let mut row = CanonicalRow::new();
        for (spec, value) in cleaned {
            row.insert(
                spec.name.clone(),
                cast_value(&spec.name, &value, spec.canonical_type)?,
            );
        }

        for column in &self.required {
            if !row.contains(column) {
                return Err(NormalizationError::MissingRequired {
                    column: column.clone(),
                });
            }
        }
        Ok(Some(row))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
