//! # Batch Configuration
//!
//! Sizing and submission settings for every batch kind, plus the logging
//! section used by applications driving the batches.
//!
//! All sections use `#[serde(default)]`, so a file only needs to name the
//! values it changes:
//!
//! ```toml
//! submit_mode = "cached"
//!
//! [line]
//! lines_per_batch = 4096
//!
//! [logging]
//! level = "debug"
//! ```

use log::warn;
use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::batch::billboard::DEFAULT_BILLBOARD_CAPACITY;
use crate::batch::line::DEFAULT_LINE_CAPACITY;
use crate::batch::triangle_list::{DEFAULT_TRIANGLE_INDICES, DEFAULT_TRIANGLE_VERTICES};
use crate::batch::{
    BillboardMode, SubmitMode, MAX_BILLBOARDS, MAX_LINES_PER_BATCH, MAX_VERTICES_PER_BATCH,
};

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Line batch sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineBatchConfig {
    /// Lines a fresh batch can hold before its first doubling
    pub initial_capacity: usize,
    /// Lines per sub-batch inside an unbounded line batch
    pub lines_per_batch: usize,
}

impl Default for LineBatchConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_LINE_CAPACITY,
            lines_per_batch: DEFAULT_LINE_CAPACITY,
        }
    }
}

impl LineBatchConfig {
    /// Validate the section
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("line.initial_capacity", self.initial_capacity, MAX_LINES_PER_BATCH)?;
        check_range("line.lines_per_batch", self.lines_per_batch, MAX_LINES_PER_BATCH)
    }
}

/// Billboard batch sizing and vertex layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillboardBatchConfig {
    /// Billboards a fresh batch can hold before its first doubling
    pub initial_capacity: usize,
    /// Hard per-batch ceiling; additions beyond it are rejected
    pub max_objects: usize,
    /// Vertex layout
    pub mode: BillboardMode,
}

impl Default for BillboardBatchConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_BILLBOARD_CAPACITY,
            max_objects: MAX_BILLBOARDS,
            mode: BillboardMode::PointList,
        }
    }
}

impl BillboardBatchConfig {
    /// Validate the section
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("billboard.max_objects", self.max_objects, MAX_BILLBOARDS)?;
        check_range("billboard.initial_capacity", self.initial_capacity, self.max_objects)
    }
}

/// Triangle batch sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangleBatchConfig {
    /// Vertices per fixed triangle batch
    pub max_vertices: usize,
    /// Indices per fixed triangle batch (three per triangle)
    pub max_indices: usize,
}

impl Default for TriangleBatchConfig {
    fn default() -> Self {
        Self {
            max_vertices: DEFAULT_TRIANGLE_VERTICES,
            max_indices: DEFAULT_TRIANGLE_INDICES,
        }
    }
}

impl TriangleBatchConfig {
    /// Validate the section
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("triangle.max_vertices", self.max_vertices, MAX_VERTICES_PER_BATCH)?;
        if self.max_indices < 3 {
            warn!("Rejected triangle.max_indices = {}", self.max_indices);
            return Err(ConfigError::Invalid(format!(
                "triangle.max_indices must hold at least one triangle, got {}",
                self.max_indices
            )));
        }
        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter passed to the logger when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Validate the section
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.to_ascii_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            Ok(())
        } else {
            warn!("Rejected logging.level = {:?}", self.level);
            Err(ConfigError::Invalid(format!("unknown log level '{}'", self.level)))
        }
    }
}

/// # Complete Batch Configuration
///
/// Top-level configuration for all batch kinds. Applications load one of
/// these and hand the sections to the `from_config` constructors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Submission path new batches start with
    pub submit_mode: SubmitMode,
    /// Line batch section
    pub line: LineBatchConfig,
    /// Billboard batch section
    pub billboard: BillboardBatchConfig,
    /// Triangle batch section
    pub triangle: TriangleBatchConfig,
    /// Logging section
    pub logging: LoggingConfig,
}

impl BatchConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.line.validate()?;
        self.billboard.validate()?;
        self.triangle.validate()?;
        self.logging.validate()
    }
}

impl Config for BatchConfig {}

fn check_range(name: &str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        warn!("Rejected {} = {}", name, value);
        return Err(ConfigError::Invalid(format!(
            "{name} must be in 1..={max}, got {value}"
        )));
    }
    Ok(())
}
