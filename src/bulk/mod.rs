//! Bulk conversion of external records into relational tables
//!
//! For every configured layout, in order: fetch its records, infer column
//! types, synthesize and create the table, normalize the records, link them
//! to metadata anchors where the layout asks for it and insert them in
//! homogeneous batches.

mod config;
mod converter;
mod error;
mod report;
mod source;

pub use config::{ConvertConfig, ConvertConfigBuilder};
pub use converter::BulkConverter;
pub use error::ConvertError;
pub use report::{ConvertReport, LayoutReport};
pub use source::{JsonlRecordSource, MemoryRecordSource, RecordSource, parse_jsonl_records};
