use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use trajcore::ais_interface::{read_features, DerivedRecord, VesselId};
use trajcore::math::{RunningStats, StatsHelper};

const TOP_VESSELS: usize = 10;

/// Count, min, mean and max of the per-vessel time step, in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepSummary {
    pub count: usize,
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub rows: usize,
    pub vessels: usize,
    pub top_vessels: Vec<(VesselId, usize)>,
    pub non_finite: BTreeMap<String, usize>,
    pub step_seconds: StepSummary,
    pub speed_mean: Option<f64>,
    pub speed_std: Option<f64>,
}

impl QualityReport {
    pub fn non_finite_cells(&self) -> usize {
        self.non_finite.values().sum()
    }
}

/// Summarizes a final feature table, which is expected in `(vessel_id, timestamp)` order.
pub fn summarize(records: &[DerivedRecord]) -> QualityReport {
    let mut rows_per_vessel: BTreeMap<VesselId, usize> = BTreeMap::new();
    let mut non_finite: BTreeMap<String, usize> = BTreeMap::new();
    let mut speed = RunningStats::new();

    for record in records {
        *rows_per_vessel.entry(record.vessel_id).or_default() += 1;
        for (name, value) in record.columns() {
            if !value.is_finite() {
                *non_finite.entry(name.to_string()).or_default() += 1;
            }
        }
        if record.speed_over_ground.is_finite() {
            speed.push(record.speed_over_ground);
        }
    }

    let steps: Vec<f64> = records
        .windows(2)
        .filter(|pair| pair[0].vessel_id == pair[1].vessel_id)
        .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_milliseconds() as f64 / 1000.0)
        .collect();
    let step_seconds = StepSummary {
        count: steps.len(),
        min: steps.iter().copied().reduce(f64::min),
        mean: StatsHelper::mean(&steps),
        max: steps.iter().copied().reduce(f64::max),
    };

    let mut top_vessels: Vec<(VesselId, usize)> = rows_per_vessel.iter().map(|(&id, &n)| (id, n)).collect();
    top_vessels.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    top_vessels.truncate(TOP_VESSELS);

    QualityReport {
        rows: records.len(),
        vessels: rows_per_vessel.len(),
        top_vessels,
        non_finite,
        step_seconds,
        speed_mean: speed.mean(),
        speed_std: speed.sample_std(),
    }
}

pub fn check_output<P: AsRef<Path>>(path: P) -> anyhow::Result<QualityReport> {
    let path = path.as_ref();
    let records = read_features(path)
        .with_context(|| format!("reading feature table {}", path.display()))?;
    Ok(summarize(&records))
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows:     {}", self.rows)?;
        writeln!(f, "vessels:  {}", self.vessels)?;
        writeln!(f, "top vessels by rows:")?;
        for (vessel_id, rows) in &self.top_vessels {
            writeln!(f, "  {vessel_id}: {rows}")?;
        }
        if self.non_finite.is_empty() {
            writeln!(f, "non-finite cells: none")?;
        } else {
            writeln!(f, "non-finite cells:")?;
            for (column, count) in &self.non_finite {
                writeln!(f, "  {column}: {count}")?;
            }
        }
        writeln!(
            f,
            "time step (s): count {} min {} mean {} max {}",
            self.step_seconds.count,
            fmt_opt(self.step_seconds.min),
            fmt_opt(self.step_seconds.mean),
            fmt_opt(self.step_seconds.max)
        )?;
        write!(
            f,
            "speed_over_ground (normalized): mean {} std {}",
            fmt_opt(self.speed_mean),
            fmt_opt(self.speed_std)
        )
    }
}
