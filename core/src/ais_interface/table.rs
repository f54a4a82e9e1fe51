use crate::ais_interface::record::{DerivedRecord, PositionRecord, VesselId};
use crate::prelude::{StageError, StageResult};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;

/// Required input columns with the header names used by the raw AIS feed.
const REQUIRED_COLUMNS: [(&str, &str); 7] = [
    ("vessel_id", "MMSI"),
    ("timestamp", "BaseDateTime"),
    ("lat", "LAT"),
    ("lon", "LON"),
    ("speed_over_ground", "SOG"),
    ("course_over_ground", "COG"),
    ("heading", "Heading"),
];

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(alias = "MMSI")]
    vessel_id: Option<VesselId>,
    #[serde(alias = "BaseDateTime")]
    timestamp: Option<String>,
    #[serde(alias = "LAT")]
    lat: Option<f64>,
    #[serde(alias = "LON")]
    lon: Option<f64>,
    #[serde(alias = "SOG")]
    speed_over_ground: Option<f64>,
    #[serde(alias = "COG")]
    course_over_ground: Option<f64>,
    #[serde(alias = "Heading")]
    heading: Option<f64>,
    #[serde(alias = "VesselType", default)]
    vessel_category: Option<i32>,
}

impl RawRow {
    fn into_record(self) -> Option<PositionRecord> {
        let timestamp = parse_timestamp(self.timestamp.as_deref()?)?;
        Some(PositionRecord {
            speed_over_ground: self.speed_over_ground,
            course_over_ground: self.course_over_ground,
            heading: self.heading,
            vessel_category: self.vessel_category,
            ..PositionRecord::new(self.vessel_id?, timestamp, self.lat?, self.lon?)
        })
    }
}

/// Raw reports read from disk, plus the rows that could not enter the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub records: Vec<PositionRecord>,
    pub rejected_rows: usize,
}

/// Accepts RFC 3339 or a naive `YYYY-MM-DD[T ]HH:MM:SS[.fff]` taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Reads raw AIS reports. Rows without identity, position or a readable
/// timestamp are skipped and counted.
pub fn read_positions<P: AsRef<Path>>(path: P) -> StageResult<RawTable> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StageError::InputNotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|(canonical, feed)| {
            !headers
                .iter()
                .any(|header| header == *canonical || header == *feed)
        })
        .map(|(canonical, _)| *canonical)
        .collect();
    if !missing.is_empty() {
        return Err(StageError::Schema(format!(
            "{} lacks required columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let mut table = RawTable::default();
    for row in reader.deserialize::<RawRow>() {
        match row?.into_record() {
            Some(record) => table.records.push(record),
            None => table.rejected_rows += 1,
        }
    }
    Ok(table)
}

/// Writes the feature table through a temporary file renamed into place.
pub fn write_features<P: AsRef<Path>>(path: P, records: &[DerivedRecord]) -> StageResult<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file());
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    temp.persist(path).map_err(|err| StageError::Io(err.error))?;
    Ok(())
}

pub fn read_features<P: AsRef<Path>>(path: P) -> StageResult<Vec<DerivedRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StageError::InputNotFound(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize::<DerivedRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_feed_headers_and_rejects_rows_without_position() {
        let file = write_csv(
            "MMSI,BaseDateTime,LAT,LON,SOG,COG,Heading,VesselType\n\
             367000001,2024-01-01T00:00:00,27.0,-88.0,5.0,90.0,91.0,70\n\
             367000001,2024-01-01T00:02:00,,-88.0,7.0,90.0,91.0,70\n\
             367000002,2024-01-01 00:03:30,27.5,-87.5,,,,\n\
             367000002,not-a-time,27.5,-87.5,1.0,2.0,3.0,70\n",
        );

        let table = read_positions(file.path()).unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.rejected_rows, 2);
        assert_eq!(table.records[0].vessel_category, Some(70));
        assert_eq!(table.records[1].speed_over_ground, None);
        assert_eq!(
            table.records[1].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 3, 30).unwrap()
        );
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let file = write_csv("vessel_id,timestamp,lat,lon,speed_over_ground\n1,2024-01-01T00:00:00Z,1,1,1\n");
        let err = read_positions(file.path()).unwrap_err();
        match err {
            StageError::Schema(message) => {
                assert!(message.contains("course_over_ground"));
                assert!(message.contains("heading"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_input_not_found() {
        let dir = tempdir().unwrap();
        let err = read_positions(dir.path().join("ais_merged.csv")).unwrap_err();
        assert!(matches!(err, StageError::InputNotFound(_)));
    }

    #[test]
    fn parses_supported_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 15).unwrap();
        assert_eq!(parse_timestamp("2024-03-05T12:30:15Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T13:30:15+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T12:30:15"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 12:30:15"), Some(expected));
        assert_eq!(parse_timestamp("05/03/2024"), None);
    }
}
