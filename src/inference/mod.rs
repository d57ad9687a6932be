//! Column type inference
//!
//! Decides a canonical type for each column from the values observed in a
//! layout, and maps canonical types onto store types.
//!
//! ## Precedence
//!
//! - any text token makes the column a string
//! - otherwise any fractional value makes it a float
//! - otherwise it is an integer
//!
//! A forced datetime directive overrides all of the above. Columns with no
//! observed values have no type.

mod engine;
mod types;

pub use engine::{ColumnProfile, infer_column_type};
pub use types::{CanonicalType, DATETIME_SQL_FORMAT, ScalarValue, StorageType, ValueKind};
