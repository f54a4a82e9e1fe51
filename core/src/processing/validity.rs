use crate::ais_interface::PositionRecord;
use crate::prelude::{
    ProcessingStage, StageConfig, StageError, StageMetadata, StageOutput, StageResult,
};
use crate::telemetry::LogManager;

fn within(value: Option<f64>, (low, high): (f64, f64)) -> bool {
    value.is_some_and(|v| (low..=high).contains(&v))
}

/// Per-row physical plausibility filter on speed and course. Surviving rows are untouched.
pub struct ValidityStage {
    config: Option<StageConfig>,
    logger: LogManager,
}

impl ValidityStage {
    pub fn new() -> Self {
        Self {
            config: None,
            logger: LogManager::new("validity"),
        }
    }

    pub fn accepts(config: &StageConfig, record: &PositionRecord) -> bool {
        within(record.speed_over_ground, config.speed_range)
            && within(record.course_over_ground, config.course_range)
    }
}

impl Default for ValidityStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for ValidityStage {
    type Input = Vec<PositionRecord>;
    type Output = Vec<PositionRecord>;

    fn initialize(&mut self, config: &StageConfig) -> StageResult<()> {
        let (speed_low, speed_high) = config.speed_range;
        let (course_low, course_high) = config.course_range;
        if speed_low > speed_high || course_low > course_high {
            return Err(StageError::InvalidConfig(
                "validity ranges must be ordered low..=high".into(),
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

        let rows_in = input.len();
        let table: Vec<PositionRecord> = input
            .into_iter()
            .filter(|record| Self::accepts(config, record))
            .collect();
        let dropped = rows_in - table.len();
        self.logger.record(&format!(
            "dropped {} of {} rows outside sog {:?} / cog {:?}",
            dropped, rows_in, config.speed_range, config.course_range
        ));

        let metadata = StageMetadata {
            rows_in,
            rows_out: table.len(),
            notes: vec![format!("{} implausible rows removed", dropped)],
            ..Default::default()
        };
        Ok(StageOutput { table, metadata })
    }

    fn cleanup(&mut self) {
        self.config = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn row(minute: i64, sog: f64, cog: f64) -> PositionRecord {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
        PositionRecord::new(1, ts, 27.0, -88.0).with_motion(sog, cog, 15.0)
    }

    #[test]
    fn removes_rows_outside_physical_ranges() {
        let mut stage = ValidityStage::new();
        stage.initialize(&StageConfig::default()).unwrap();

        let input = vec![
            row(0, 12.0, 90.0),
            row(1, 45.0, 90.0),
            row(2, -0.1, 90.0),
            row(3, 12.0, 361.0),
            row(4, 40.0, 360.0),
            row(5, 0.0, 0.0),
        ];
        let output = stage.execute(input).unwrap();

        let kept: Vec<i64> = output
            .table
            .iter()
            .map(|r| r.timestamp.timestamp() / 60 % 60)
            .collect();
        assert_eq!(kept, vec![0, 4, 5]);
        assert_eq!(output.metadata.rows_in, 6);
        assert_eq!(output.metadata.rows_out, 3);
        stage.cleanup();
    }

    #[test]
    fn surviving_rows_are_unchanged() {
        let mut stage = ValidityStage::new();
        stage.initialize(&StageConfig::default()).unwrap();
        let original = row(0, 3.5, 270.0);
        let output = stage.execute(vec![original.clone()]).unwrap();
        assert_eq!(output.table, vec![original]);
    }
}
