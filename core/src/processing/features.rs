use crate::ais_interface::{partition_by_vessel, DerivedRecord, Feature, PositionRecord, Trajectory};
use crate::math::StatsHelper;
use crate::prelude::{
    ProcessingStage, StageConfig, StageError, StageMetadata, StageOutput, StageResult,
};
use crate::processing::map_trajectories;
use crate::telemetry::{LogManager, MetricsRecorder};

/// Keeps `atan2` away from the degenerate `(0, 0)` step.
const BEARING_EPSILON: f64 = 1e-9;

fn column(records: &[PositionRecord], feature: Feature) -> Vec<f64> {
    records
        .iter()
        .map(|r| r.value(feature).unwrap_or(f64::NAN))
        .collect()
}

fn diff(series: &[f64], i: usize) -> Option<f64> {
    (i > 0).then(|| series[i] - series[i - 1])
}

/// Mean and sample std of the trailing `window` samples ending at `i`.
fn rolling(series: &[f64], i: usize, window: usize) -> (Option<f64>, Option<f64>) {
    let start = (i + 1).saturating_sub(window);
    let slice = &series[start..=i];
    (StatsHelper::mean(slice), StatsHelper::sample_std(slice))
}

/// Kinematic and rolling-window features of one time-ordered trajectory.
///
/// Rows with any undefined or non-finite value are dropped, which always removes the
/// first row. `speed_xy` treats the first step as zero movement so that its rolling
/// statistics start from the trajectory's first sample.
pub fn derive_trajectory_features(trajectory: &Trajectory, window: usize) -> Vec<DerivedRecord> {
    let records = &trajectory.records;
    let xs = column(records, Feature::PlanarX);
    let ys = column(records, Feature::PlanarY);
    let sog = column(records, Feature::SpeedOverGround);
    let cog = column(records, Feature::CourseOverGround);
    let heading = column(records, Feature::Heading);

    let step_distance: Vec<Option<f64>> = (0..records.len())
        .map(|i| Some(diff(&xs, i)?.hypot(diff(&ys, i)?)))
        .collect();
    let speed_xy: Vec<f64> = step_distance.iter().map(|d| d.unwrap_or(0.0)).collect();

    let derive = |i: usize| -> Option<DerivedRecord> {
        let record = &records[i];
        let delta_x = diff(&xs, i)?;
        let delta_y = diff(&ys, i)?;
        let delta_heading = diff(&heading, i)?;
        let (sog_mean, sog_std) = rolling(&sog, i, window);
        let (cog_mean, cog_std) = rolling(&cog, i, window);
        let (heading_mean, heading_std) = rolling(&heading, i, window);
        let (speed_mean, speed_std) = rolling(&speed_xy, i, window);

        Some(DerivedRecord {
            vessel_id: record.vessel_id,
            timestamp: record.timestamp,
            planar_x: xs[i],
            planar_y: ys[i],
            speed_over_ground: sog[i],
            course_over_ground: cog[i],
            heading: heading[i],
            delta_x,
            delta_y,
            step_distance: step_distance[i]?,
            speed_xy: speed_xy[i],
            accel_xy: diff(&speed_xy, i)?,
            delta_sog: diff(&sog, i)?,
            delta_cog: diff(&cog, i)?,
            delta_heading,
            turn_rate: delta_heading,
            bearing_xy: delta_y.atan2(delta_x + BEARING_EPSILON).to_degrees(),
            speed_over_ground_rolling_mean: sog_mean?,
            speed_over_ground_rolling_std: sog_std?,
            course_over_ground_rolling_mean: cog_mean?,
            course_over_ground_rolling_std: cog_std?,
            heading_rolling_mean: heading_mean?,
            heading_rolling_std: heading_std?,
            speed_xy_rolling_mean: speed_mean?,
            speed_xy_rolling_std: speed_std?,
        })
    };

    (0..records.len())
        .filter_map(derive)
        .filter(DerivedRecord::is_finite)
        .collect()
}

/// Derives per-vessel features from the normalized table and emits the final,
/// `(vessel_id, timestamp)`-ordered feature table.
pub struct FeatureStage {
    config: Option<StageConfig>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl FeatureStage {
    pub fn new() -> Self {
        Self {
            config: None,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("features"),
        }
    }
}

impl Default for FeatureStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for FeatureStage {
    type Input = Vec<PositionRecord>;
    type Output = Vec<DerivedRecord>;

    fn initialize(&mut self, config: &StageConfig) -> StageResult<()> {
        if config.rolling_window == 0 {
            return Err(StageError::InvalidConfig(
                "rolling window must hold at least one sample".into(),
            ));
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: Self::Input) -> StageResult<StageOutput<Self::Output>> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;

        let window = config.rolling_window;
        let rows_in = input.len();
        let derived = map_trajectories(partition_by_vessel(input), &self.metrics, |mut trajectory| {
            trajectory.sort_by_time();
            let rows = derive_trajectory_features(&trajectory, window);
            if rows.is_empty() {
                return Err(StageError::InsufficientData {
                    vessel_id: trajectory.vessel_id,
                    reason: format!("no fully defined feature rows from {} sample(s)", trajectory.len()),
                });
            }
            Ok(rows)
        })?;
        let table: Vec<DerivedRecord> = derived.into_iter().flatten().collect();

        let (vessels, excluded) = self.metrics.drain();
        excluded.iter().for_each(|e| self.logger.exclusion(e));
        self.logger.record(&format!(
            "derived {} feature rows for {} vessels (window {})",
            table.len(),
            vessels,
            window
        ));

        let metadata = StageMetadata {
            rows_in,
            rows_out: table.len(),
            excluded,
            notes: vec![format!("{} undefined rows dropped", rows_in.saturating_sub(table.len()))],
            ..Default::default()
        };
        Ok(StageOutput { table, metadata })
    }

    fn cleanup(&mut self) {
        self.metrics.drain();
        self.config = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample(vessel_id: i64, minute: i64, x: f64, y: f64, sog: f64, heading: f64) -> PositionRecord {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
        let mut record = PositionRecord::new(vessel_id, ts, 27.0, -88.0).with_motion(sog, 2.0 * heading, heading);
        record.planar_x = Some(x);
        record.planar_y = Some(y);
        record
    }

    fn track() -> Trajectory {
        Trajectory::new(
            1,
            vec![
                sample(1, 0, 0.0, 0.0, 1.0, 10.0),
                sample(1, 1, 3.0, 4.0, 2.0, 12.0),
                sample(1, 2, 3.0, 10.0, 4.0, 11.0),
                sample(1, 3, 3.0, 10.0, 4.0, 11.0),
            ],
        )
    }

    #[test]
    fn first_row_is_dropped_and_differences_follow() {
        let rows = derive_trajectory_features(&track(), 10);
        assert_eq!(rows.len(), 3);

        let second = &rows[0];
        assert_eq!(second.delta_x, 3.0);
        assert_eq!(second.delta_y, 4.0);
        assert_eq!(second.step_distance, 5.0);
        assert_eq!(second.speed_xy, 5.0);
        assert_eq!(second.accel_xy, 5.0);
        assert_eq!(second.delta_sog, 1.0);
        assert_eq!(second.delta_cog, 4.0);
        assert_eq!(second.delta_heading, 2.0);
        assert_eq!(second.turn_rate, 2.0);

        let third = &rows[1];
        assert_eq!(third.step_distance, 6.0);
        assert_eq!(third.accel_xy, 1.0);
        assert_eq!(third.turn_rate, -1.0);
        assert!((third.bearing_xy - 90.0).abs() < 1e-6);
    }

    #[test]
    fn zero_step_bearing_is_finite() {
        let rows = derive_trajectory_features(&track(), 10);
        let still = &rows[2];
        assert_eq!(still.step_distance, 0.0);
        assert!(still.bearing_xy.is_finite());
        assert_eq!(still.bearing_xy, 0.0);
    }

    #[test]
    fn rolling_statistics_use_trailing_window_with_zero_filled_speed() {
        let rows = derive_trajectory_features(&track(), 2);

        let second = &rows[0];
        assert_eq!(second.speed_over_ground_rolling_mean, 1.5);
        assert!((second.speed_over_ground_rolling_std - 0.5_f64.sqrt()).abs() < 1e-12);
        assert_eq!(second.speed_xy_rolling_mean, 2.5);

        let last = &rows[2];
        assert_eq!(last.speed_over_ground_rolling_mean, 4.0);
        assert_eq!(last.speed_over_ground_rolling_std, 0.0);
        assert_eq!(last.speed_xy_rolling_mean, 3.0);
    }

    #[test]
    fn window_of_one_leaves_no_defined_rows() {
        assert!(derive_trajectory_features(&track(), 1).is_empty());
    }

    #[test]
    fn stage_orders_output_and_excludes_vessels_without_rows() {
        let mut stage = FeatureStage::new();
        stage.initialize(&StageConfig::default()).unwrap();

        let mut input = track().records;
        input.reverse();
        input.push(sample(0, 0, 1.0, 1.0, 1.0, 1.0));
        let output = stage.execute(input).unwrap();

        assert_eq!(output.table.len(), 3);
        assert!(output
            .table
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(output.metadata.excluded.len(), 1);
        assert_eq!(output.metadata.excluded[0].vessel_id, 0);
        stage.cleanup();
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut stage = FeatureStage::new();
        let config = StageConfig {
            rolling_window: 0,
            ..Default::default()
        };
        assert!(matches!(
            stage.initialize(&config),
            Err(StageError::InvalidConfig(_))
        ));
    }
}
