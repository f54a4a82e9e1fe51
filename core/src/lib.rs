//! Trajectory-preparation core for AIS vessel telemetry.
//!
//! Raw position reports flow through five stages, each consuming and emitting a
//! full table: projection to a UTM plane, per-vessel resampling onto a fixed
//! cadence, physical validity filtering, corpus-wide normalization and
//! per-vessel kinematic feature derivation. Per-vessel work runs in parallel;
//! normalization is the single global barrier.
//!
//! Features are derived after normalization, so every derived column is in
//! normalized units. [`ais_interface::FeatureStatistics`] is the only way back
//! to physical units.

pub mod ais_interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use prelude::{ProcessingStage, StageConfig, StageError, StageOutput, StageResult};
