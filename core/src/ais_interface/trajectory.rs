use crate::ais_interface::record::{PositionRecord, VesselId};
use std::collections::BTreeMap;

/// Time-ordered reports of a single vessel; the unit of per-vessel processing.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub vessel_id: VesselId,
    pub records: Vec<PositionRecord>,
}

impl Trajectory {
    pub fn new(vessel_id: VesselId, records: Vec<PositionRecord>) -> Self {
        Self { vessel_id, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stable sort, so reports sharing a timestamp keep their arrival order.
    pub fn sort_by_time(&mut self) {
        self.records.sort_by_key(|record| record.timestamp);
    }

    /// Drops reports whose timestamp equals the previous one, keeping the first.
    /// Returns how many were removed. Expects a time-sorted trajectory.
    pub fn dedup_timestamps(&mut self) -> usize {
        let before = self.records.len();
        self.records.dedup_by_key(|record| record.timestamp);
        before - self.records.len()
    }
}

/// Splits a table into per-vessel trajectories, ascending by vessel id.
pub fn partition_by_vessel(records: Vec<PositionRecord>) -> Vec<Trajectory> {
    let mut groups: BTreeMap<VesselId, Vec<PositionRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.vessel_id).or_default().push(record);
    }
    groups
        .into_iter()
        .map(|(vessel_id, records)| Trajectory::new(vessel_id, records))
        .collect()
}

pub fn concat(trajectories: Vec<Trajectory>) -> Vec<PositionRecord> {
    trajectories
        .into_iter()
        .flat_map(|trajectory| trajectory.records)
        .collect()
}
