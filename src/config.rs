use serde::{Deserialize, Serialize};

use crate::error::{KnnError, Result};

pub const DEFAULT_SEGMENT_CAPACITY: u32 = 8192;

/// Engine-wide settings shared by every table of a [`crate::Database`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Rows per segment before a new one is opened.
    pub segment_capacity: u32,
    /// Scan segments on the rayon pool during brute-force search.
    pub parallel_scan: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            segment_capacity: DEFAULT_SEGMENT_CAPACITY,
            parallel_scan: true,
        }
    }
}

impl DatabaseConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: DatabaseConfig = serde_json::from_str(text)
            .map_err(|e| KnnError::InvalidArgument(format!("database config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.segment_capacity == 0 {
            return Err(KnnError::InvalidArgument(
                "segment_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
