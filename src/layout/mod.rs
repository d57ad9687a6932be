//! Layout configuration
//!
//! A layout describes one table of the external record source: the target
//! table name, its primary-key column, per-column directives and, optionally,
//! which columns link its rows to metadata anchors.

mod config;
mod directive;
mod error;

pub use config::{
    AnchorLinkSpec, Layout, LayoutConfig, LayoutDescriptor, normalize_column_name,
};
pub use directive::{ColumnDirectives, ForeignKeyTarget};
pub use error::SchemaError;
