use crate::ais_interface::statistics::Feature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable vessel identity (MMSI in the source feed).
pub type VesselId = i64;

/// One AIS report. Planar coordinates stay `None` until the projection stage runs;
/// motion fields are `None` where the feed left them blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub vessel_id: VesselId,
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub planar_x: Option<f64>,
    pub planar_y: Option<f64>,
    pub speed_over_ground: Option<f64>,
    pub course_over_ground: Option<f64>,
    pub heading: Option<f64>,
    pub vessel_category: Option<i32>,
}

impl PositionRecord {
    pub fn new(vessel_id: VesselId, timestamp: DateTime<Utc>, lat: f64, lon: f64) -> Self {
        Self {
            vessel_id,
            timestamp,
            lat,
            lon,
            planar_x: None,
            planar_y: None,
            speed_over_ground: None,
            course_over_ground: None,
            heading: None,
            vessel_category: None,
        }
    }

    pub fn with_motion(mut self, sog: f64, cog: f64, heading: f64) -> Self {
        self.speed_over_ground = Some(sog);
        self.course_over_ground = Some(cog);
        self.heading = Some(heading);
        self
    }

    pub fn with_category(mut self, category: i32) -> Self {
        self.vessel_category = Some(category);
        self
    }

    pub fn value(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::PlanarX => self.planar_x,
            Feature::PlanarY => self.planar_y,
            Feature::SpeedOverGround => self.speed_over_ground,
            Feature::CourseOverGround => self.course_over_ground,
            Feature::Heading => self.heading,
        }
    }

    pub fn set_value(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::PlanarX => &mut self.planar_x,
            Feature::PlanarY => &mut self.planar_y,
            Feature::SpeedOverGround => &mut self.speed_over_ground,
            Feature::CourseOverGround => &mut self.course_over_ground,
            Feature::Heading => &mut self.heading,
        };
        *slot = Some(value);
    }
}

/// A resampled, normalized position augmented with kinematic and rolling-window features.
///
/// Only fully defined rows are ever built; see [`DerivedRecord::is_finite`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord {
    pub vessel_id: VesselId,
    pub timestamp: DateTime<Utc>,
    pub planar_x: f64,
    pub planar_y: f64,
    pub speed_over_ground: f64,
    pub course_over_ground: f64,
    pub heading: f64,
    pub delta_x: f64,
    pub delta_y: f64,
    pub step_distance: f64,
    pub speed_xy: f64,
    pub accel_xy: f64,
    pub delta_sog: f64,
    pub delta_cog: f64,
    pub delta_heading: f64,
    pub turn_rate: f64,
    pub bearing_xy: f64,
    pub speed_over_ground_rolling_mean: f64,
    pub speed_over_ground_rolling_std: f64,
    pub course_over_ground_rolling_mean: f64,
    pub course_over_ground_rolling_std: f64,
    pub heading_rolling_mean: f64,
    pub heading_rolling_std: f64,
    pub speed_xy_rolling_mean: f64,
    pub speed_xy_rolling_std: f64,
}

impl DerivedRecord {
    /// Numeric columns in output order, paired with their header names.
    pub fn columns(&self) -> [(&'static str, f64); 23] {
        [
            ("planar_x", self.planar_x),
            ("planar_y", self.planar_y),
            ("speed_over_ground", self.speed_over_ground),
            ("course_over_ground", self.course_over_ground),
            ("heading", self.heading),
            ("delta_x", self.delta_x),
            ("delta_y", self.delta_y),
            ("step_distance", self.step_distance),
            ("speed_xy", self.speed_xy),
            ("accel_xy", self.accel_xy),
            ("delta_sog", self.delta_sog),
            ("delta_cog", self.delta_cog),
            ("delta_heading", self.delta_heading),
            ("turn_rate", self.turn_rate),
            ("bearing_xy", self.bearing_xy),
            (
                "speed_over_ground_rolling_mean",
                self.speed_over_ground_rolling_mean,
            ),
            (
                "speed_over_ground_rolling_std",
                self.speed_over_ground_rolling_std,
            ),
            (
                "course_over_ground_rolling_mean",
                self.course_over_ground_rolling_mean,
            ),
            (
                "course_over_ground_rolling_std",
                self.course_over_ground_rolling_std,
            ),
            ("heading_rolling_mean", self.heading_rolling_mean),
            ("heading_rolling_std", self.heading_rolling_std),
            ("speed_xy_rolling_mean", self.speed_xy_rolling_mean),
            ("speed_xy_rolling_std", self.speed_xy_rolling_std),
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.columns().iter().all(|(_, value)| value.is_finite())
    }
}
