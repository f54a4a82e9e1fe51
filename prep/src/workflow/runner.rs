use crate::workflow::cancel::CancellationFlag;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::info;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use trajcore::ais_interface::{
    read_positions, write_features, DerivedRecord, FeatureStatistics, RawTable,
};
use trajcore::prelude::{ProcessingStage, StageConfig, StageError, StageOutput};
use trajcore::processing::{
    FeatureStage, NormalizeStage, ProjectionStage, ResampleStage, ValidityStage,
};
use trajcore::telemetry::PipelineReport;

#[derive(Debug)]
pub struct WorkflowResult {
    pub report: PipelineReport,
    pub statistics: FeatureStatistics,
    pub table: Vec<DerivedRecord>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    cancel: CancellationFlag,
}

fn run_stage<S: ProcessingStage>(
    mut stage: S,
    name: &str,
    config: &StageConfig,
    input: S::Input,
) -> anyhow::Result<StageOutput<S::Output>> {
    stage
        .initialize(config)
        .with_context(|| format!("initializing {name} stage"))?;
    let output = stage
        .execute(input)
        .with_context(|| format!("executing {name} stage"))?;
    stage.cleanup();
    Ok(output)
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    fn checkpoint(&self, next_stage: &str) -> anyhow::Result<()> {
        if self.cancel.is_cancelled() {
            return Err(StageError::Cancelled(next_stage.to_string()).into());
        }
        Ok(())
    }

    /// Runs every stage on an in-memory corpus and persists the feature statistics
    /// before any feature is derived.
    pub fn process(&self, raw: RawTable) -> anyhow::Result<WorkflowResult> {
        let stage_config = self.config.to_stage_config();
        let mut report = PipelineReport {
            input_rows: raw.records.len(),
            rejected_rows: raw.rejected_rows,
            input_vessels: raw
                .records
                .iter()
                .map(|r| r.vessel_id)
                .collect::<BTreeSet<_>>()
                .len(),
            ..Default::default()
        };
        info!(
            "input: {} rows, {} vessels, {} rejected rows",
            report.input_rows, report.input_vessels, report.rejected_rows
        );

        self.checkpoint("projection")?;
        let projected = run_stage(ProjectionStage::new(), "projection", &stage_config, raw.records)?;
        report.excluded.extend(projected.metadata.excluded);

        self.checkpoint("resampling")?;
        let resampled = run_stage(ResampleStage::new(), "resample", &stage_config, projected.table)?;
        report.resampled_rows = resampled.metadata.rows_out;
        report.excluded.extend(resampled.metadata.excluded);
        info!("after resampling: {} rows", report.resampled_rows);

        self.checkpoint("validity filtering")?;
        let filtered = run_stage(ValidityStage::new(), "validity", &stage_config, resampled.table)?;
        report.filtered_rows = filtered.metadata.rows_out;
        info!("after filtering: {} rows", report.filtered_rows);

        self.checkpoint("normalization")?;
        let normalized = run_stage(NormalizeStage::new(), "normalize", &stage_config, filtered.table)?;
        report.normalized_rows = normalized.metadata.rows_out;
        report.excluded.extend(normalized.metadata.excluded);
        let statistics = normalized
            .metadata
            .statistics
            .context("normalize stage produced no statistics")?;
        statistics.persist(&self.config.statistics).with_context(|| {
            format!(
                "persisting feature statistics {}",
                self.config.statistics.display()
            )
        })?;
        info!("statistics written to {}", self.config.statistics.display());

        self.checkpoint("feature derivation")?;
        let features = run_stage(FeatureStage::new(), "features", &stage_config, normalized.table)?;
        report.excluded.extend(features.metadata.excluded);
        report.final_rows = features.table.len();
        report.output_vessels = features
            .table
            .iter()
            .map(|r| r.vessel_id)
            .collect::<BTreeSet<_>>()
            .len();
        report.excluded.sort_by_key(|e| e.vessel_id);
        info!(
            "final: {} rows, {} vessels, {} excluded",
            report.final_rows,
            report.output_vessels,
            report.excluded.len()
        );

        Ok(WorkflowResult {
            report,
            statistics,
            table: features.table,
        })
    }

    /// Reads the configured input, runs the pipeline and writes the feature table.
    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let raw = read_positions(&self.config.input)
            .with_context(|| format!("reading input table {}", self.config.input.display()))?;
        let result = self.process(raw)?;

        self.checkpoint("writing output")?;
        write_features(&self.config.output, &result.table)
            .with_context(|| format!("writing output table {}", self.config.output.display()))?;

        if let Some(report_path) = self.config.report.as_ref() {
            if let Some(parent) = report_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(report_path)
                .with_context(|| format!("opening run report {}", report_path.display()))?;
            writeln!(file, "{}", result.report.summary_line())?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_corpus, write_corpus, GeneratorConfig, SINGLE_REPORT_VESSEL};
    use std::path::Path;
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> WorkflowConfig {
        let mut cfg = WorkflowConfig::from_args(
            dir.join("ais_merged.csv"),
            dir.join("out").join("ais_final.csv"),
            dir.join("out").join("feature_stats.json"),
            60,
            10,
            false,
        );
        cfg.report = Some(dir.join("out").join("runs.log"));
        cfg
    }

    #[test]
    fn runner_executes_workflow_end_to_end() {
        let dir = tempdir().unwrap();
        let cfg = config_in(dir.path());
        let corpus = build_corpus(&GeneratorConfig {
            vessels: 3,
            reports_per_vessel: 60,
            seed: 7,
            ..Default::default()
        })
        .unwrap();
        write_corpus(&cfg.input, &corpus).unwrap();

        let result = Runner::new(cfg.clone()).execute().unwrap();
        let report = &result.report;

        assert_eq!(report.input_rows, corpus.len());
        assert_eq!(report.input_vessels, 4);
        assert_eq!(report.output_vessels, 3);
        assert!(report.excluded_vessels().contains(&SINGLE_REPORT_VESSEL));
        assert!(report.resampled_rows >= report.filtered_rows);
        assert!(report.filtered_rows >= report.final_rows);
        assert_eq!(report.final_rows, result.table.len());

        assert!(cfg.output.exists());
        let stored = FeatureStatistics::load(&cfg.statistics).unwrap();
        assert_eq!(stored, result.statistics);
        let log = fs::read_to_string(cfg.report.unwrap()).unwrap();
        assert_eq!(log.lines().count(), 1);
    }

    #[test]
    fn cancelled_runner_stops_before_first_stage() {
        let dir = tempdir().unwrap();
        let cfg = config_in(dir.path());
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let err = Runner::new(cfg.clone())
            .with_cancellation(cancel)
            .process(RawTable::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StageError>(),
            Some(StageError::Cancelled(_))
        ));
        assert!(!cfg.statistics.exists());
    }

    #[test]
    fn failed_normalization_leaves_no_statistics_behind() {
        let dir = tempdir().unwrap();
        let cfg = config_in(dir.path());
        let mut corpus = build_corpus(&GeneratorConfig {
            vessels: 2,
            reports_per_vessel: 20,
            ..Default::default()
        })
        .unwrap();
        corpus.iter_mut().for_each(|r| r.heading = Some(90.0));

        let err = Runner::new(cfg.clone())
            .process(RawTable {
                records: corpus,
                rejected_rows: 0,
            })
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StageError>(),
            Some(StageError::DegenerateFeature { .. })
        ));
        assert!(!cfg.statistics.exists());
        assert!(!cfg.output.exists());
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempdir().unwrap();
        let err = Runner::new(config_in(dir.path())).execute().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StageError>(),
            Some(StageError::InputNotFound(_))
        ));
    }
}
