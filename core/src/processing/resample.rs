use crate::ais_interface::{concat, partition_by_vessel, PositionRecord, Trajectory};
use crate::math::LinearInterpolator;
use crate::prelude::{
    ProcessingStage, StageConfig, StageError, StageMetadata, StageOutput, StageResult,
};
use crate::processing::map_trajectories;
use crate::telemetry::{LogManager, MetricsRecorder};
use chrono::{TimeZone, Utc};

type Accessor = fn(&PositionRecord) -> Option<f64>;

/// Interpolated columns, in the order of [`assemble`]'s value array.
const COLUMNS: [(&str, Accessor); 7] = [
    ("lat", |r| Some(r.lat)),
    ("lon", |r| Some(r.lon)),
    ("planar_x", |r| r.planar_x),
    ("planar_y", |r| r.planar_y),
    ("speed_over_ground", |r| r.speed_over_ground),
    ("course_over_ground", |r| r.course_over_ground),
    ("heading", |r| r.heading),
];

fn assemble(template: &PositionRecord, timestamp_ms: i64, values: &[f64]) -> StageResult<PositionRecord> {
    let timestamp = Utc
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .ok_or_else(|| StageError::Internal(format!("grid time {timestamp_ms} out of range")))?;
    Ok(PositionRecord {
        vessel_id: template.vessel_id,
        timestamp,
        lat: values[0],
        lon: values[1],
        planar_x: Some(values[2]),
        planar_y: Some(values[3]),
        speed_over_ground: Some(values[4]),
        course_over_ground: Some(values[5]),
        heading: Some(values[6]),
        vessel_category: template.vessel_category,
    })
}

fn cadence_millis(cadence_seconds: i64) -> StageResult<i64> {
    cadence_seconds
        .checked_mul(1000)
        .filter(|ms| *ms > 0)
        .ok_or_else(|| {
            StageError::InvalidConfig(format!(
                "cadence must be positive and representable in milliseconds, got {cadence_seconds}s"
            ))
        })
}

/// Resamples one vessel onto a fixed cadence grid.
///
/// Reports are sorted and same-timestamp duplicates dropped (first kept). Grid
/// points are the cadence multiples inside the span where every column has
/// observations; each column is interpolated linearly from its own present
/// values. Categorical fields come from the first report.
pub fn resample_trajectory(mut trajectory: Trajectory, cadence_seconds: i64) -> StageResult<Trajectory> {
    let vessel_id = trajectory.vessel_id;
    let insufficient = |reason: String| StageError::InsufficientData { vessel_id, reason };

    trajectory.sort_by_time();
    trajectory.dedup_timestamps();
    let template = trajectory
        .records
        .first()
        .cloned()
        .ok_or_else(|| insufficient("no reports".into()))?;

    let knots: Vec<Vec<(i64, f64)>> = COLUMNS
        .iter()
        .map(|(_, accessor)| {
            trajectory
                .records
                .iter()
                .filter_map(|r| {
                    accessor(r)
                        .filter(|v| v.is_finite())
                        .map(|v| (r.timestamp.timestamp_millis(), v))
                })
                .collect()
        })
        .collect();

    let mut start = i64::MIN;
    let mut end = i64::MAX;
    for ((name, _), column) in COLUMNS.iter().zip(&knots) {
        let interp = LinearInterpolator::new(column);
        let (first, last) = interp
            .span()
            .ok_or_else(|| insufficient(format!("no {name} observations")))?;
        start = start.max(first);
        end = end.min(last);
    }

    let cadence_ms = cadence_millis(cadence_seconds)?;
    let floor = start.div_euclid(cadence_ms) * cadence_ms;
    let mut next = if floor < start { floor.checked_add(cadence_ms) } else { Some(floor) };

    let interpolators: Vec<LinearInterpolator> =
        knots.iter().map(|k| LinearInterpolator::new(k)).collect();
    let mut records = Vec::new();
    while let Some(grid_time) = next.filter(|t| *t <= end) {
        let values = interpolators
            .iter()
            .map(|interp| interp.at(grid_time))
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| StageError::Internal("grid point outside observed span".into()))?;
        records.push(assemble(&template, grid_time, &values)?);
        next = grid_time.checked_add(cadence_ms);
    }

    if records.len() < 2 {
        return Err(insufficient(format!(
            "{} report(s) give {} sample(s) on a {}s grid",
            trajectory.len(),
            records.len(),
            cadence_seconds
        )));
    }
    Ok(Trajectory::new(vessel_id, records))
}

/// Converts irregular per-vessel reports into fixed-cadence trajectories.
pub struct ResampleStage {
    config: Option<StageConfig>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl ResampleStage {
    pub fn new() -> Self {
        Self {
            config: None,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("resample"),
        }
    }
}

impl Default for ResampleStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for ResampleStage {
    type Input = Vec<PositionRecord>;
    type Output = Vec<PositionRecord>;

    fn initialize(&mut self, config: &StageConfig) -> StageResult<()> {
        cadence_millis(config.cadence_seconds)?;
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: Self::Input) -> StageResult<StageOutput<Self::Output>> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;

        let cadence = config.cadence_seconds;
        let rows_in = input.len();
        let resampled = map_trajectories(partition_by_vessel(input), &self.metrics, |trajectory| {
            resample_trajectory(trajectory, cadence)
        })?;
        let table = concat(resampled);

        let (vessels, excluded) = self.metrics.drain();
        excluded.iter().for_each(|e| self.logger.exclusion(e));
        self.logger.record(&format!(
            "{} rows -> {} rows on a {}s grid ({} vessels kept, {} excluded)",
            rows_in,
            table.len(),
            cadence,
            vessels,
            excluded.len()
        ));

        let metadata = StageMetadata {
            rows_in,
            rows_out: table.len(),
            excluded,
            notes: vec![format!("cadence {}s", cadence)],
            ..Default::default()
        };
        Ok(StageOutput { table, metadata })
    }

    fn cleanup(&mut self) {
        self.metrics.drain();
        self.config = None;
    }
}
