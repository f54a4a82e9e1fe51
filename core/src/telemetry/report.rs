use crate::ais_interface::VesselId;
use crate::prelude::Exclusion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row counts at every stage boundary plus every vessel dropped along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub input_rows: usize,
    pub rejected_rows: usize,
    pub input_vessels: usize,
    pub resampled_rows: usize,
    pub filtered_rows: usize,
    pub normalized_rows: usize,
    pub final_rows: usize,
    pub output_vessels: usize,
    pub excluded: Vec<Exclusion>,
}

impl PipelineReport {
    pub fn excluded_vessels(&self) -> Vec<VesselId> {
        self.excluded.iter().map(|e| e.vessel_id).collect()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "input={} rejected={} resampled={} filtered={} normalized={} final={} vessels={}/{} excluded={:?}",
            self.input_rows,
            self.rejected_rows,
            self.resampled_rows,
            self.filtered_rows,
            self.normalized_rows,
            self.final_rows,
            self.output_vessels,
            self.input_vessels,
            self.excluded_vessels()
        )
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "input rows:      {}", self.input_rows)?;
        writeln!(f, "rejected rows:   {}", self.rejected_rows)?;
        writeln!(f, "resampled rows:  {}", self.resampled_rows)?;
        writeln!(f, "filtered rows:   {}", self.filtered_rows)?;
        writeln!(f, "normalized rows: {}", self.normalized_rows)?;
        writeln!(f, "final rows:      {}", self.final_rows)?;
        writeln!(
            f,
            "vessels:         {} in, {} out",
            self.input_vessels, self.output_vessels
        )?;
        if self.excluded.is_empty() {
            write!(f, "excluded:        none")
        } else {
            write!(f, "excluded:")?;
            for exclusion in &self.excluded {
                write!(f, "\n  {}: {}", exclusion.vessel_id, exclusion.reason)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_exclusions_with_reasons() {
        let report = PipelineReport {
            input_rows: 10,
            excluded: vec![Exclusion {
                vessel_id: 42,
                reason: "single report".into(),
            }],
            ..Default::default()
        };
        let text = report.to_string();
        assert!(text.contains("input rows:      10"));
        assert!(text.contains("42: single report"));
        assert!(report.summary_line().ends_with("excluded=[42]"));
    }
}
