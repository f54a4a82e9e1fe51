pub mod features;
pub mod normalize;
pub mod projection;
pub mod resample;
pub mod validity;

pub use features::{derive_trajectory_features, FeatureStage};
pub use normalize::{compute_statistics, NormalizeStage};
pub use projection::{ProjectionStage, Projector};
pub use resample::{resample_trajectory, ResampleStage};
pub use validity::ValidityStage;

use crate::ais_interface::Trajectory;
use crate::prelude::{Exclusion, StageResult};
use crate::telemetry::MetricsRecorder;
use rayon::prelude::*;

/// Applies `process` to every trajectory on the rayon pool, preserving vessel order.
///
/// Vessel-scoped failures drop that vessel and are recorded in `metrics`;
/// any other failure aborts the whole stage.
pub(crate) fn map_trajectories<T, F>(
    trajectories: Vec<Trajectory>,
    metrics: &MetricsRecorder,
    process: F,
) -> StageResult<Vec<T>>
where
    T: Send,
    F: Fn(Trajectory) -> StageResult<T> + Sync + Send,
{
    let results = trajectories
        .into_par_iter()
        .map(|trajectory| {
            let vessel_id = trajectory.vessel_id;
            match process(trajectory) {
                Ok(value) => {
                    metrics.record_processed();
                    Ok(Some(value))
                }
                Err(err) if err.is_vessel_scoped() => {
                    metrics.record_exclusion(Exclusion {
                        vessel_id,
                        reason: err.to_string(),
                    });
                    Ok(None)
                }
                Err(err) => Err(err),
            }
        })
        .collect::<StageResult<Vec<Option<T>>>>()?;
    Ok(results.into_iter().flatten().collect())
}
