use crate::ais_interface::{FeatureStatistics, VesselId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Geographic bounding box in degrees, inclusive on every side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat) && (self.lon_min..=self.lon_max).contains(&lon)
    }
}

impl Default for BoundingBox {
    /// Gulf of Mexico cargo lanes.
    fn default() -> Self {
        Self {
            lat_min: 24.0,
            lat_max: 30.0,
            lon_min: -93.0,
            lon_max: -83.0,
        }
    }
}

/// Shared configuration for each processing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub cadence_seconds: i64,
    pub rolling_window: usize,
    pub speed_range: (f64, f64),
    pub course_range: (f64, f64),
    pub utm_zone: u8,
    pub northern: bool,
    pub region: BoundingBox,
    pub strict_projection: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            cadence_seconds: 60,
            rolling_window: 10,
            speed_range: (0.0, 40.0),
            course_range: (0.0, 360.0),
            utm_zone: 16,
            northern: true,
            region: BoundingBox::default(),
            strict_projection: false,
        }
    }
}

/// A vessel dropped from the corpus, together with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub vessel_id: VesselId,
    pub reason: String,
}

/// Output produced by each stage: the full emitted table plus metadata.
#[derive(Debug, Clone)]
pub struct StageOutput<T> {
    pub table: T,
    pub metadata: StageMetadata,
}

/// Metadata used for chaining stages and telemetry.
#[derive(Debug, Clone, Default)]
pub struct StageMetadata {
    pub rows_in: usize,
    pub rows_out: usize,
    pub excluded: Vec<Exclusion>,
    pub statistics: Option<FeatureStatistics>,
    pub notes: Vec<String>,
}

/// Common error type for stage execution.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("projection failed for ({lat}, {lon}): {reason}")]
    Projection { lat: f64, lon: f64, reason: String },
    #[error("insufficient data for vessel {vessel_id}: {reason}")]
    InsufficientData { vessel_id: VesselId, reason: String },
    #[error("degenerate feature {feature}: {reason}")]
    DegenerateFeature { feature: String, reason: String },
    #[error("schema error: {0}")]
    Schema(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("non-finite {feature} for vessel {vessel_id}")]
    NonFinite { vessel_id: VesselId, feature: String },
    #[error("run cancelled before {0}")]
    Cancelled(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl StageError {
    /// Errors that only concern one vessel. The vessel is dropped and the run continues.
    pub fn is_vessel_scoped(&self) -> bool {
        matches!(
            self,
            StageError::Projection { .. }
                | StageError::InsufficientData { .. }
                | StageError::NonFinite { .. }
        )
    }
}

pub type StageResult<T> = Result<T, StageError>;

/// Trait describing a pipeline stage that consumes a full table and emits a full table.
pub trait ProcessingStage {
    type Input;
    type Output;

    fn initialize(&mut self, config: &StageConfig) -> StageResult<()>;
    fn execute(&mut self, input: Self::Input) -> StageResult<StageOutput<Self::Output>>;
    fn cleanup(&mut self);
}
