use crate::ais_interface::{concat, partition_by_vessel, PositionRecord, Trajectory};
use crate::math::TransverseMercator;
use crate::prelude::{
    BoundingBox, ProcessingStage, StageConfig, StageError, StageMetadata, StageOutput,
    StageResult,
};
use crate::processing::map_trajectories;
use crate::telemetry::{LogManager, MetricsRecorder};

/// Geodetic to planar conversion in a single fixed UTM zone.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    projection: TransverseMercator,
    region: BoundingBox,
}

impl Projector {
    pub fn new(zone: u8, northern: bool, region: BoundingBox) -> Self {
        Self {
            projection: TransverseMercator::utm(zone, northern),
            region,
        }
    }

    pub fn from_config(config: &StageConfig) -> Self {
        Self::new(config.utm_zone, config.northern, config.region)
    }

    pub fn central_meridian_deg(&self) -> f64 {
        self.projection.central_meridian_deg()
    }

    /// `(x, y)` in meters. Never rejects; see [`Projector::check`].
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        self.projection.forward(lat, lon)
    }

    /// Garbage-in detection for strict mode.
    pub fn check(&self, lat: f64, lon: f64) -> StageResult<()> {
        let reason = if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            "outside geodetic range"
        } else if !self.region.contains(lat, lon) {
            "outside operating region"
        } else {
            return Ok(());
        };
        Err(StageError::Projection {
            lat,
            lon,
            reason: reason.to_string(),
        })
    }

    fn project_trajectory(&self, mut trajectory: Trajectory, strict: bool) -> StageResult<Trajectory> {
        for record in &mut trajectory.records {
            if strict {
                self.check(record.lat, record.lon)?;
            }
            let (x, y) = self.project(record.lat, record.lon);
            record.planar_x = Some(x);
            record.planar_y = Some(y);
        }
        Ok(trajectory)
    }
}

/// Populates `planar_x`/`planar_y` for every report.
pub struct ProjectionStage {
    config: Option<StageConfig>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl ProjectionStage {
    pub fn new() -> Self {
        Self {
            config: None,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("projection"),
        }
    }
}

impl Default for ProjectionStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for ProjectionStage {
    type Input = Vec<PositionRecord>;
    type Output = Vec<PositionRecord>;

    fn initialize(&mut self, config: &StageConfig) -> StageResult<()> {
        if !(1..=60).contains(&config.utm_zone) {
            return Err(StageError::InvalidConfig(format!(
                "UTM zone {} outside 1..=60",
                config.utm_zone
            )));
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: Self::Input) -> StageResult<StageOutput<Self::Output>> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;

        let projector = Projector::from_config(config);
        let strict = config.strict_projection;
        let rows_in = input.len();

        let projected = map_trajectories(partition_by_vessel(input), &self.metrics, |trajectory| {
            projector.project_trajectory(trajectory, strict)
        })?;
        let table = concat(projected);

        let (vessels, excluded) = self.metrics.drain();
        excluded.iter().for_each(|e| self.logger.exclusion(e));
        self.logger.record(&format!(
            "projected {} rows of {} vessels into UTM zone {}{} (central meridian {:.0})",
            table.len(),
            vessels,
            config.utm_zone,
            if config.northern { 'N' } else { 'S' },
            projector.central_meridian_deg()
        ));

        let metadata = StageMetadata {
            rows_in,
            rows_out: table.len(),
            excluded,
            ..Default::default()
        };
        Ok(StageOutput { table, metadata })
    }

    fn cleanup(&mut self) {
        self.metrics.drain();
        self.config = None;
    }
}
