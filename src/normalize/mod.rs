//! Record normalization
//!
//! Turns raw external records into typed canonical rows: whitespace is
//! stripped, sentinel tokens become absent fields, declared transforms run
//! and every value is cast to its column's canonical type. Rows are then
//! grouped into batches that share the same populated columns.

mod batch;
mod error;
mod record;
mod value;

pub use batch::{Batch, BatchGrouper};
pub use error::NormalizationError;
pub use record::{CanonicalRow, ExternalRecord, RecordNormalizer};
pub use value::{
    DATE_FORMATS, DATETIME_FORMATS, SENTINELS, cast_value, clean_value, is_sentinel,
    parse_datetime,
};
