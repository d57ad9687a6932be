//! Column type inference

use serde::Serialize;

use super::types::{CanonicalType, ValueKind};

/// Accumulated observations for one column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    /// Number of non-null values observed
    pub observed: usize,
    pub saw_integer: bool,
    pub saw_fractional: bool,
    pub saw_text: bool,
    /// Longest rendered value, in characters
    pub max_len: usize,
}

impl ColumnProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one cleaned value
    pub fn observe(&mut self, value: &serde_json::Value) {
        let Some(kind) = ValueKind::of(value) else {
            return;
        };
        self.observed += 1;
        match kind {
            ValueKind::Integer => self.saw_integer = true,
            ValueKind::Fractional => self.saw_fractional = true,
            ValueKind::Text => self.saw_text = true,
        }
        let len = match value {
            serde_json::Value::String(s) => s.chars().count(),
            other => other.to_string().chars().count(),
        };
        self.max_len = self.max_len.max(len);
    }

    /// Combine with another profile of the same column
    pub fn merge(&mut self, other: &ColumnProfile) {
        self.observed += other.observed;
        self.saw_integer |= other.saw_integer;
        self.saw_fractional |= other.saw_fractional;
        self.saw_text |= other.saw_text;
        self.max_len = self.max_len.max(other.max_len);
    }

    pub fn is_empty(&self) -> bool {
        self.observed == 0
    }

    /// Resolve the canonical type
    ///
    /// Any text wins, then any fractional value, then integer. A column
    /// with no observations has no type unless datetime is forced.
    pub fn resolve(&self, force_datetime: bool) -> Option<CanonicalType> {
        if force_datetime {
            return Some(CanonicalType::Datetime);
        }
        if self.is_empty() {
            return None;
        }
        if self.saw_text {
            Some(CanonicalType::String)
        } else if self.saw_fractional {
            Some(CanonicalType::Float)
        } else {
            Some(CanonicalType::Integer)
        }
    }
}

/// Infer the canonical type of a column from its cleaned values
pub fn infer_column_type<'a, I>(values: I, force_datetime: bool) -> Option<CanonicalType>
where
    I: IntoIterator<Item = &'a serde_json::Value>,
{
    let mut profile = ColumnProfile::new();
    for value in values {
        profile.observe(value);
    }
    profile.resolve(force_datetime)
}
