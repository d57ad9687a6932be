//! Identity resolution
//!
//! Derives link fields (date, day counter, camera tag) from filename
//! conventions or record columns and resolves them to a row in
//! `metadata_anchors`, creating one when nothing matches.

mod anchor;
mod patterns;

pub use anchor::{AnchorResolution, AnchorResolver};
pub use patterns::LinkFields;
