//! Table synthesis
//!
//! Combines a layout's directives with the column types inferred from its
//! records into a [`TableSpec`] that renders to `CREATE TABLE` DDL.

mod synthesizer;
mod table;

pub use synthesizer::{
    ANCHOR_ID_COLUMN, IDENTIFIER_COLUMNS, IDENTIFIER_WIDTH, LayoutProfile, SchemaSynthesizer,
};
pub use table::{ColumnSpec, TableSpec};
