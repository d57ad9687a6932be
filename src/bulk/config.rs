//! Configuration for bulk conversion runs

use serde::{Deserialize, Serialize};

/// Configuration for a bulk conversion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Drop existing layout tables before converting
    pub drop_existing: bool,
    /// Abort on the first record that fails normalization
    pub strict: bool,
}

impl ConvertConfig {
    /// Create a new builder for ConvertConfig
    pub fn builder() -> ConvertConfigBuilder {
        ConvertConfigBuilder::default()
    }
}

/// Builder for ConvertConfig
#[derive(Debug, Default)]
pub struct ConvertConfigBuilder {
    drop_existing: bool,
    strict: bool,
}

impl ConvertConfigBuilder {
    /// Drop existing layout tables before converting
    pub fn drop_existing(mut self, drop_existing: bool) -> Self {
        self.drop_existing = drop_existing;
        self
    }

    /// Abort on invalid records instead of skipping them
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn build(self) -> ConvertConfig {
        ConvertConfig {
            drop_existing: self.drop_existing,
            strict: self.strict,
        }
    }
}
