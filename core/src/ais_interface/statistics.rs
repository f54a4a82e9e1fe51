use crate::prelude::{StageError, StageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Features rescaled by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    PlanarX,
    PlanarY,
    SpeedOverGround,
    CourseOverGround,
    Heading,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::PlanarX,
        Feature::PlanarY,
        Feature::SpeedOverGround,
        Feature::CourseOverGround,
        Feature::Heading,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature::PlanarX => "planar_x",
            Feature::PlanarY => "planar_y",
            Feature::SpeedOverGround => "speed_over_ground",
            Feature::CourseOverGround => "course_over_ground",
            Feature::Heading => "heading",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStat {
    pub mean: f64,
    pub std: f64,
}

/// Frozen corpus-wide location/scale per feature; the only way back from normalized units.
///
/// Every feature is present and every `std` is finite and non-zero, which the
/// constructor and deserializer both enforce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Feature, FeatureStat>",
    into = "BTreeMap<Feature, FeatureStat>"
)]
pub struct FeatureStatistics {
    stats: [FeatureStat; 5],
}

impl FeatureStatistics {
    pub fn from_map(map: BTreeMap<Feature, FeatureStat>) -> StageResult<Self> {
        let mut stats = [FeatureStat {
            mean: 0.0,
            std: 1.0,
        }; 5];
        for feature in Feature::ALL {
            let stat = map.get(&feature).ok_or_else(|| {
                StageError::Schema(format!("statistics missing feature {}", feature))
            })?;
            if !stat.mean.is_finite() {
                return Err(StageError::DegenerateFeature {
                    feature: feature.to_string(),
                    reason: format!("mean is {}", stat.mean),
                });
            }
            if !stat.std.is_finite() || stat.std == 0.0 {
                return Err(StageError::DegenerateFeature {
                    feature: feature.to_string(),
                    reason: format!("standard deviation is {}", stat.std),
                });
            }
            stats[feature.index()] = *stat;
        }
        Ok(Self { stats })
    }

    pub fn get(&self, feature: Feature) -> FeatureStat {
        self.stats[feature.index()]
    }

    pub fn normalize(&self, feature: Feature, value: f64) -> f64 {
        let stat = self.get(feature);
        (value - stat.mean) / stat.std
    }

    pub fn denormalize(&self, feature: Feature, value: f64) -> f64 {
        let stat = self.get(feature);
        value * stat.std + stat.mean
    }

    /// Writes the statistics as JSON next to `path` and renames into place,
    /// so readers never observe a partial file.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> StageResult<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, self)?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|err| StageError::Io(err.error))?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> StageResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StageError::InputNotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl TryFrom<BTreeMap<Feature, FeatureStat>> for FeatureStatistics {
    type Error = StageError;

    fn try_from(map: BTreeMap<Feature, FeatureStat>) -> Result<Self, Self::Error> {
        Self::from_map(map)
    }
}

impl From<FeatureStatistics> for BTreeMap<Feature, FeatureStat> {
    fn from(statistics: FeatureStatistics) -> Self {
        Feature::ALL
            .into_iter()
            .map(|feature| (feature, statistics.get(feature)))
            .collect()
    }
}
