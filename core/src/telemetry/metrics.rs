use crate::prelude::Exclusion;
use std::sync::Mutex;

/// Per-vessel outcome counters shared by parallel workers within one stage.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Default)]
struct Metrics {
    processed: usize,
    excluded: Vec<Exclusion>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_processed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.processed += 1;
        }
    }

    pub fn record_exclusion(&self, exclusion: Exclusion) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.excluded.push(exclusion);
        }
    }

    /// Processed count and exclusions ordered by vessel id; resets the recorder.
    pub fn drain(&self) -> (usize, Vec<Exclusion>) {
        if let Ok(mut metrics) = self.inner.lock() {
            let mut taken = std::mem::take(&mut *metrics);
            taken.excluded.sort_by_key(|exclusion| exclusion.vessel_id);
            (taken.processed, taken.excluded)
        } else {
            (0, Vec::new())
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn counts_from_parallel_workers_and_resets() {
        let recorder = MetricsRecorder::new();
        (0..100i64).into_par_iter().for_each(|vessel_id| {
            if vessel_id % 10 == 0 {
                recorder.record_exclusion(Exclusion {
                    vessel_id,
                    reason: "test".into(),
                });
            } else {
                recorder.record_processed();
            }
        });

        let (processed, excluded) = recorder.drain();
        assert_eq!(processed, 90);
        assert_eq!(excluded.len(), 10);
        assert!(excluded.windows(2).all(|w| w[0].vessel_id < w[1].vessel_id));
        assert_eq!(recorder.drain().0, 0);
    }
}
