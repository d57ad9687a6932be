//! Synthesized table definitions and their DDL

use serde::Serialize;

use crate::inference::{CanonicalType, StorageType};
use crate::layout::ForeignKeyTarget;
use crate::store::quote_identifier;

/// One column of a synthesized table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    /// Normalized column name
    pub name: String,
    /// Column name in the external source (`None` for derived columns)
    pub source_name: Option<String>,
    pub canonical_type: CanonicalType,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub foreign_key: Option<ForeignKeyTarget>,
    /// Declared width for string columns
    pub width: usize,
}

impl ColumnSpec {
    pub fn storage_type(&self) -> StorageType {
        self.canonical_type.storage_type(self.width)
    }

    /// Render the column definition
    pub fn definition(&self) -> String {
        let mut def = format!(
            "{} {}",
            quote_identifier(&self.name),
            self.storage_type().sql()
        );
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        } else {
            if !self.nullable {
                def.push_str(" NOT NULL");
            }
            if self.unique {
                def.push_str(" UNIQUE");
            }
        }
        if let Some(fk) = &self.foreign_key {
            def.push_str(&format!(
                " REFERENCES {}({})",
                quote_identifier(&fk.table),
                quote_identifier(&fk.column)
            ));
        }
        def
    }

    /// Placeholder for this column in an insert statement
    fn placeholder(&self) -> &'static str {
        match self.canonical_type {
            CanonicalType::Datetime => "CAST(? AS TIMESTAMP)",
            _ => "?",
        }
    }
}

/// A synthesized table definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.primary_key)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Render the `CREATE TABLE` statement
    pub fn create_sql(&self) -> String {
        let defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("  {}", c.definition()))
            .collect();
        format!(
            "CREATE TABLE {} (\n{}\n);\n",
            quote_identifier(&self.name),
            defs.join(",\n")
        )
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {};", quote_identifier(&self.name))
    }

    /// Render an insert statement for the given subset of columns
    ///
    /// Columns unknown to the table are skipped.
    pub fn insert_sql<S: AsRef<str>>(&self, columns: &[S]) -> String {
        let specs: Vec<&ColumnSpec> = columns
            .iter()
            .filter_map(|name| self.column(name.as_ref()))
            .collect();
        let names: Vec<String> = specs.iter().map(|c| quote_identifier(&c.name)).collect();
        let placeholders: Vec<&str> = specs.iter().map(|c| c.placeholder()).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&self.name),
            names.join(", "),
            placeholders.join(", ")
        )
    }
}
