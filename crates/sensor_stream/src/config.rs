use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::classify::{NoiseDenylist, ShapeTolerance};
use crate::schema::{FieldSchema, SchemaError, DEFAULT_DELIMITER, IMU_GPS_FIELDS};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("part-count band [{min_parts}, {max_parts}] is empty")]
    EmptyPartBand { min_parts: usize, max_parts: usize },
    #[error("min_numeric_ratio must be within (0, 1], got {0}")]
    NumericRatio(f64),
    #[error("summary_interval_secs must be greater than zero")]
    ZeroSummaryInterval,
    #[error("max_line_bytes must be greater than zero")]
    ZeroLineLimit,
}

/// Tunables of the classification and session layers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    pub max_line_bytes: usize,
    pub min_parts: usize,
    pub max_parts: usize,
    pub min_numeric_ratio: f64,
    pub summary_interval_secs: u64,
    pub noise_keywords: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let tolerance = ShapeTolerance::default();
        Self {
            max_line_bytes: 4 * 1024,
            min_parts: tolerance.min_parts,
            max_parts: tolerance.max_parts,
            min_numeric_ratio: tolerance.min_numeric_ratio,
            summary_interval_secs: 15,
            noise_keywords: NoiseDenylist::DEFAULT_KEYWORDS
                .iter()
                .map(|keyword| (*keyword).to_string())
                .collect(),
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_parts > self.max_parts {
            return Err(ConfigError::EmptyPartBand {
                min_parts: self.min_parts,
                max_parts: self.max_parts,
            });
        }
        if !(self.min_numeric_ratio > 0.0 && self.min_numeric_ratio <= 1.0) {
            return Err(ConfigError::NumericRatio(self.min_numeric_ratio));
        }
        if self.summary_interval_secs == 0 {
            return Err(ConfigError::ZeroSummaryInterval);
        }
        if self.max_line_bytes == 0 {
            return Err(ConfigError::ZeroLineLimit);
        }
        Ok(())
    }

    pub fn tolerance(&self) -> ShapeTolerance {
        ShapeTolerance {
            min_parts: self.min_parts,
            max_parts: self.max_parts,
            min_numeric_ratio: self.min_numeric_ratio,
        }
    }

    pub fn denylist(&self) -> NoiseDenylist {
        NoiseDenylist::new(&self.noise_keywords)
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_secs(self.summary_interval_secs)
    }
}

/// Serialized form of a [`FieldSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    pub fields: Vec<String>,
    pub delimiter: char,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            fields: IMU_GPS_FIELDS.iter().map(|f| (*f).to_string()).collect(),
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl SchemaConfig {
    pub fn build(&self) -> Result<FieldSchema, SchemaError> {
        FieldSchema::new(&self.fields, self.delimiter)
    }
}
