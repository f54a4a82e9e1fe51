use crate::ais_interface::{
    concat, partition_by_vessel, Feature, FeatureStat, FeatureStatistics, PositionRecord,
    Trajectory,
};
use crate::math::RunningStats;
use crate::prelude::{
    ProcessingStage, StageConfig, StageError, StageMetadata, StageOutput, StageResult,
};
use crate::processing::map_trajectories;
use crate::telemetry::{LogManager, MetricsRecorder};
use std::collections::BTreeMap;

/// One accumulator per [`Feature`], in `Feature::ALL` order.
pub type Accumulators = [RunningStats; 5];

/// Per-vessel partial statistics; fails when the vessel carries an unusable value.
fn accumulate(trajectory: &Trajectory) -> StageResult<Accumulators> {
    let mut acc = [RunningStats::new(); 5];
    for record in &trajectory.records {
        for (slot, feature) in acc.iter_mut().zip(Feature::ALL) {
            match record.value(feature) {
                Some(value) if value.is_finite() => slot.push(value),
                _ => {
                    return Err(StageError::NonFinite {
                        vessel_id: trajectory.vessel_id,
                        feature: feature.to_string(),
                    })
                }
            }
        }
    }
    Ok(acc)
}

/// Pooled mean / sample std over every row of the corpus.
///
/// Partials are merged in vessel order so the result does not depend on thread scheduling.
pub fn compute_statistics(partials: &[Accumulators]) -> StageResult<FeatureStatistics> {
    let mut map = BTreeMap::new();
    for (index, feature) in Feature::ALL.into_iter().enumerate() {
        let pooled = partials
            .iter()
            .fold(RunningStats::new(), |acc, partial| acc.merge(partial[index]));
        let degenerate = |reason: String| StageError::DegenerateFeature {
            feature: feature.to_string(),
            reason,
        };
        let mean = pooled
            .mean()
            .ok_or_else(|| degenerate("no samples in corpus".into()))?;
        let std = pooled
            .sample_std()
            .ok_or_else(|| degenerate(format!("{} sample(s) in corpus", pooled.count())))?;
        map.insert(feature, FeatureStat { mean, std });
    }
    FeatureStatistics::from_map(map)
}

/// Corpus-wide z-score normalization. The statistics are computed once, on the
/// pre-normalization rows, and handed out through the stage metadata.
pub struct NormalizeStage {
    config: Option<StageConfig>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl NormalizeStage {
    pub fn new() -> Self {
        Self {
            config: None,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("normalize"),
        }
    }
}

impl Default for NormalizeStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for NormalizeStage {
    type Input = Vec<PositionRecord>;
    type Output = Vec<PositionRecord>;

    fn initialize(&mut self, config: &StageConfig) -> StageResult<()> {
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: Self::Input) -> StageResult<StageOutput<Self::Output>> {
        if self.config.is_none() {
            return Err(StageError::Internal("stage not initialized".into()));
        }

        let rows_in = input.len();
        let screened = map_trajectories(partition_by_vessel(input), &self.metrics, |trajectory| {
            let partial = accumulate(&trajectory)?;
            Ok((trajectory, partial))
        })?;
        let (vessels, excluded) = self.metrics.drain();
        excluded.iter().for_each(|e| self.logger.exclusion(e));

        let partials: Vec<Accumulators> = screened.iter().map(|(_, partial)| *partial).collect();
        let statistics = compute_statistics(&partials)?;

        let mut table = concat(screened.into_iter().map(|(trajectory, _)| trajectory).collect());
        for record in &mut table {
            for feature in Feature::ALL {
                if let Some(value) = record.value(feature) {
                    record.set_value(feature, statistics.normalize(feature, value));
                }
            }
        }

        for feature in Feature::ALL {
            let stat = statistics.get(feature);
            self.logger.detail(&format!(
                "{}: mean {:.6} std {:.6}",
                feature, stat.mean, stat.std
            ));
        }
        self.logger.record(&format!(
            "normalized {} rows across {} vessels",
            table.len(),
            vessels
        ));

        let metadata = StageMetadata {
            rows_in,
            rows_out: table.len(),
            excluded,
            statistics: Some(statistics),
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
    use crate::math::StatsHelper;
    use chrono::{Duration, TimeZone, Utc};

    fn row(vessel_id: i64, minute: i64, x: f64, sog: f64) -> PositionRecord {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
        let mut record = PositionRecord::new(vessel_id, ts, 27.0, -88.0).with_motion(
            sog,
            90.0 + minute as f64,
            80.0 + 2.0 * minute as f64,
        );
        record.planar_x = Some(x);
        record.planar_y = Some(2_990_000.0 + x / 2.0 + minute as f64);
        record
    }

    fn corpus() -> Vec<PositionRecord> {
        vec![
            row(1, 0, 400_000.0, 10.0),
            row(1, 1, 400_300.0, 11.0),
            row(2, 0, 410_000.0, 14.0),
            row(2, 1, 410_250.0, 12.5),
            row(2, 2, 410_500.0, 13.0),
        ]
    }

    #[test]
    fn statistics_are_pooled_across_vessels() {
        let mut stage = NormalizeStage::new();
        stage.initialize(&StageConfig::default()).unwrap();
        let output = stage.execute(corpus()).unwrap();
        let stats = output.metadata.statistics.unwrap();

        let sogs = [10.0, 11.0, 14.0, 12.5, 13.0];
        let sog = stats.get(Feature::SpeedOverGround);
        assert!((sog.mean - StatsHelper::mean(&sogs).unwrap()).abs() < 1e-9);
        assert!((sog.std - StatsHelper::sample_std(&sogs).unwrap()).abs() < 1e-9);
    }

    #[test]
    fn normalized_columns_have_zero_mean_and_invert() {
        let mut stage = NormalizeStage::new();
        stage.initialize(&StageConfig::default()).unwrap();
        let original = corpus();
        let output = stage.execute(original.clone()).unwrap();
        let stats = output.metadata.statistics.unwrap();

        for feature in Feature::ALL {
            let values: Vec<f64> = output
                .table
                .iter()
                .map(|r| r.value(feature).unwrap())
                .collect();
            assert!(StatsHelper::mean(&values).unwrap().abs() < 1e-9);
            assert!((StatsHelper::sample_std(&values).unwrap() - 1.0).abs() < 1e-9);
        }
        for (before, after) in original.iter().zip(&output.table) {
            let restored = stats.denormalize(Feature::PlanarX, after.planar_x.unwrap());
            assert!((restored - before.planar_x.unwrap()).abs() < 1e-6);
            assert_eq!(before.lat, after.lat);
        }
    }

    #[test]
    fn constant_feature_is_degenerate() {
        let mut stage = NormalizeStage::new();
        stage.initialize(&StageConfig::default()).unwrap();
        let table: Vec<PositionRecord> = corpus()
            .into_iter()
            .map(|mut r| {
                r.heading = Some(45.0);
                r
            })
            .collect();

        match stage.execute(table) {
            Err(StageError::DegenerateFeature { feature, .. }) => assert_eq!(feature, "heading"),
            other => panic!("expected degenerate heading, got {other:?}"),
        }
    }

    #[test]
    fn empty_corpus_is_degenerate() {
        let mut stage = NormalizeStage::new();
        stage.initialize(&StageConfig::default()).unwrap();
        assert!(matches!(
            stage.execute(Vec::new()),
            Err(StageError::DegenerateFeature { .. })
        ));
    }

    #[test]
    fn vessel_with_non_finite_value_is_excluded_before_statistics() {
        let mut stage = NormalizeStage::new();
        stage.initialize(&StageConfig::default()).unwrap();
        let mut table = corpus();
        table.push(row(3, 0, f64::NAN, 12.0));
        table.push(row(3, 1, 1.0e9, 12.0));

        let output = stage.execute(table).unwrap();
        assert_eq!(output.metadata.excluded.len(), 1);
        assert_eq!(output.metadata.excluded[0].vessel_id, 3);
        assert!(output.table.iter().all(|r| r.vessel_id != 3));
        let x = output.metadata.statistics.unwrap().get(Feature::PlanarX);
        assert!(x.mean < 411_000.0);
    }
}
