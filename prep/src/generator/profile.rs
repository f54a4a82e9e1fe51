use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use trajcore::ais_interface::{PositionRecord, VesselId};
use trajcore::prelude::BoundingBox;

const METERS_PER_DEGREE_LAT: f64 = 111_320.0;
const METERS_PER_SECOND_PER_KNOT: f64 = 0.514_444;
const FIRST_VESSEL: VesselId = 367_000_000;
const DEFAULT_START_DAY: i64 = 19_723; // 2024-01-01
/// Extra vessel with a single report, appended to every generated corpus.
pub const SINGLE_REPORT_VESSEL: VesselId = 367_999_999;

/// Configuration for generating a synthetic raw AIS corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub vessels: usize,
    pub reports_per_vessel: usize,
    pub seed: u64,
    pub category: i32,
    pub region: BoundingBox,
    pub max_gap_seconds: i64,
    pub duplicate_ratio: f64,
    pub start: DateTime<Utc>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            vessels: 10,
            reports_per_vessel: 240,
            seed: 0,
            category: 70,
            region: BoundingBox::default(),
            max_gap_seconds: 120,
            duplicate_ratio: 0.02,
            start: DateTime::<Utc>::UNIX_EPOCH + Duration::days(DEFAULT_START_DAY),
        }
    }
}

#[derive(Serialize)]
struct CorpusRow {
    vessel_id: VesselId,
    timestamp: DateTime<Utc>,
    lat: f64,
    lon: f64,
    speed_over_ground: Option<f64>,
    course_over_ground: Option<f64>,
    heading: Option<f64>,
    vessel_category: Option<i32>,
}

impl From<&PositionRecord> for CorpusRow {
    fn from(record: &PositionRecord) -> Self {
        Self {
            vessel_id: record.vessel_id,
            timestamp: record.timestamp,
            lat: record.lat,
            lon: record.lon,
            speed_over_ground: record.speed_over_ground,
            course_over_ground: record.course_over_ground,
            heading: record.heading,
            vessel_category: record.vessel_category,
        }
    }
}

fn build_track(config: &GeneratorConfig, rng: &mut StdRng, vessel_id: VesselId) -> Vec<PositionRecord> {
    let region = &config.region;
    let lat_margin = (region.lat_max - region.lat_min) * 0.25;
    let lon_margin = (region.lon_max - region.lon_min) * 0.25;
    let mut lat = rng.gen_range(region.lat_min + lat_margin..region.lat_max - lat_margin);
    let mut lon = rng.gen_range(region.lon_min + lon_margin..region.lon_max - lon_margin);
    let mut course: f64 = rng.gen_range(0.0..360.0);
    let mut speed: f64 = rng.gen_range(8.0..18.0);
    let mut time = config.start + Duration::seconds(rng.gen_range(0..config.max_gap_seconds.max(1)));

    let mut track = Vec::with_capacity(config.reports_per_vessel);
    for index in 0..config.reports_per_vessel {
        let duplicate = index > 0 && rng.gen_bool(config.duplicate_ratio.clamp(0.0, 1.0));
        if !duplicate && index > 0 {
            let gap = rng.gen_range(5..=config.max_gap_seconds.max(5));
            let distance = speed * METERS_PER_SECOND_PER_KNOT * gap as f64;
            let heading_rad = course.to_radians();
            lat += distance * heading_rad.cos() / METERS_PER_DEGREE_LAT;
            lon += distance * heading_rad.sin() / (METERS_PER_DEGREE_LAT * lat.to_radians().cos());
            time += Duration::seconds(gap);
            course = (course + rng.gen_range(-5.0..5.0)).rem_euclid(360.0);
            speed = (speed + rng.gen_range(-0.5..0.5)).clamp(0.0, 30.0);
        }
        let heading = (course + rng.gen_range(-3.0..3.0)).rem_euclid(360.0);
        track.push(
            PositionRecord::new(vessel_id, time, lat, lon)
                .with_motion(speed, course, heading)
                .with_category(config.category),
        );
    }
    track
}

/// Builds a deterministic corpus of irregularly reported cargo tracks, including
/// same-timestamp duplicates and one vessel with a single report.
pub fn build_corpus(config: &GeneratorConfig) -> anyhow::Result<Vec<PositionRecord>> {
    if config.region.lat_min >= config.region.lat_max || config.region.lon_min >= config.region.lon_max {
        anyhow::bail!("generator region is empty: {:?}", config.region);
    }
    let capacity = config
        .vessels
        .checked_mul(config.reports_per_vessel)
        .and_then(|n| n.checked_add(1))
        .context("overflow computing corpus size for generator")?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut records = Vec::with_capacity(capacity);
    for offset in 0..config.vessels {
        records.extend(build_track(config, &mut rng, FIRST_VESSEL + offset as VesselId));
    }

    let center_lat = (config.region.lat_min + config.region.lat_max) / 2.0;
    let center_lon = (config.region.lon_min + config.region.lon_max) / 2.0;
    records.push(
        PositionRecord::new(SINGLE_REPORT_VESSEL, config.start, center_lat, center_lon)
            .with_motion(10.0, 90.0, 90.0)
            .with_category(config.category),
    );
    Ok(records)
}

/// Writes a raw corpus using the canonical input header.
pub fn write_corpus<P: AsRef<Path>>(path: P, records: &[PositionRecord]) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating corpus file {}", path.display()))?;
    for record in records {
        writer.serialize(CorpusRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}
