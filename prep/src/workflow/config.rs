use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use trajcore::prelude::StageConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub statistics: PathBuf,
    #[serde(default)]
    pub report: Option<PathBuf>,
    #[serde(default)]
    pub stages: StageConfig,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        input: PathBuf,
        output: PathBuf,
        statistics: PathBuf,
        cadence_seconds: i64,
        rolling_window: usize,
        strict_projection: bool,
    ) -> Self {
        Self {
            input,
            output,
            statistics,
            report: None,
            stages: StageConfig {
                cadence_seconds,
                rolling_window,
                strict_projection,
                ..Default::default()
            },
        }
    }

    pub fn to_stage_config(&self) -> StageConfig {
        self.stages.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_produces_stage_config() {
        let cfg = WorkflowConfig::from_args(
            "in.csv".into(),
            "out.csv".into(),
            "stats.json".into(),
            30,
            5,
            true,
        );
        let stage = cfg.to_stage_config();
        assert_eq!(stage.cadence_seconds, 30);
        assert_eq!(stage.rolling_window, 5);
        assert!(stage.strict_projection);
        assert_eq!(stage.speed_range, (0.0, 40.0));
    }

    #[test]
    fn config_load_reads_yaml_with_partial_stage_overrides() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"input: merged/ais_merged.csv\n\
output: preprocessed/ais_final.csv\n\
statistics: preprocessed/feature_stats.json\n\
stages:\n  cadence_seconds: 120\n  speed_range: [0, 25]\n  region:\n    lat_min: 20\n    lat_max: 31\n    lon_min: -98\n    lon_max: -80\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();

        assert_eq!(cfg.stages.cadence_seconds, 120);
        assert_eq!(cfg.stages.speed_range, (0.0, 25.0));
        assert_eq!(cfg.stages.rolling_window, 10);
        assert_eq!(cfg.stages.region.lon_min, -98.0);
        assert!(cfg.report.is_none());
    }

    #[test]
    fn bundled_workflow_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("workflow.yaml");
        let cfg = WorkflowConfig::load(path).unwrap();
        assert_eq!(cfg.to_stage_config(), StageConfig::default());
        assert!(cfg.report.is_some());
    }

    #[test]
    fn config_load_reports_missing_file() {
        let err = WorkflowConfig::load("/nonexistent/workflow.yaml").unwrap_err();
        assert!(err.to_string().contains("reading workflow config"));
    }
}
