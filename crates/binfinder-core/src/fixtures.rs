//! YAML fixture files used by the CLI simulator: a static bin set and a
//! scripted sensor track.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;

use crate::location::{Direction, SensorEvent};
use crate::types::{Bin, Coordinate};
use crate::ConfigError;

const DEFAULT_STEP_INTERVAL_MS: u64 = 500;

fn default_true() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    DEFAULT_STEP_INTERVAL_MS
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinEntry {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_true")]
    pub visibility: bool,
    #[serde(default = "default_true")]
    pub accepted: bool,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinsFile {
    pub bins: Vec<BinEntry>,
}

impl BinsFile {
    /// Materializes the entries as [`Bin`] values stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for out-of-range coordinates.
    pub fn to_bins(&self) -> Result<Vec<Bin>, ConfigError> {
        let now = Utc::now();
        self.bins
            .iter()
            .map(|entry| {
                let coordinate = Coordinate::new(entry.latitude, entry.longitude).map_err(|e| {
                    ConfigError::Validation(format!("bin {}: {e}", entry.id))
                })?;
                Ok(Bin {
                    id: entry.id,
                    coordinate,
                    created_at: now,
                    updated_at: now,
                    deleted_at: entry.deleted.then_some(now),
                    accepted_at: entry.accepted.then_some(now),
                    visibility: entry.visibility,
                })
            })
            .collect()
    }
}

/// One scripted step of a simulated sensor track.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackStep {
    Fix { latitude: f64, longitude: f64 },
    Failure { reason: String },
    Denied,
    Nudge { direction: Direction },
    ResetOffset,
}

impl TrackStep {
    /// Sensor-originated steps map to a [`SensorEvent`]; debug steps do not.
    #[must_use]
    pub fn sensor_event(&self) -> Option<SensorEvent> {
        match self {
            TrackStep::Fix {
                latitude,
                longitude,
            } => Some(SensorEvent::Fix(Coordinate {
                latitude: *latitude,
                longitude: *longitude,
            })),
            TrackStep::Failure { reason } => Some(SensorEvent::Failure(reason.clone())),
            TrackStep::Denied => Some(SensorEvent::PermissionDenied),
            TrackStep::Nudge { .. } | TrackStep::ResetOffset => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackFile {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    pub steps: Vec<TrackStep>,
}

/// Load and validate a bins fixture from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_bins_file(path: &Path) -> Result<BinsFile, ConfigError> {
    let content = read_fixture(path)?;
    let file: BinsFile = serde_yaml::from_str(&content)?;
    validate_bins(&file)?;
    Ok(file)
}

/// Load and validate a sensor track fixture from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_track_file(path: &Path) -> Result<TrackFile, ConfigError> {
    let content = read_fixture(path)?;
    let file: TrackFile = serde_yaml::from_str(&content)?;
    validate_track(&file)?;
    Ok(file)
}

fn read_fixture(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::FixtureIo {
        path: path.display().to_string(),
        source: e,
    })
}

fn validate_bins(file: &BinsFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for entry in &file.bins {
        if !seen.insert(entry.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate bin id: {}",
                entry.id
            )));
        }
        Coordinate::new(entry.latitude, entry.longitude)
            .map_err(|e| ConfigError::Validation(format!("bin {}: {e}", entry.id)))?;
    }
    Ok(())
}

fn validate_track(file: &TrackFile) -> Result<(), ConfigError> {
    if file.steps.is_empty() {
        return Err(ConfigError::Validation(
            "track must contain at least one step".to_string(),
        ));
    }
    for (index, step) in file.steps.iter().enumerate() {
        if let TrackStep::Fix {
            latitude,
            longitude,
        } = step
        {
            Coordinate::new(*latitude, *longitude)
                .map_err(|e| ConfigError::Validation(format!("step {index}: {e}")))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_bins(yaml: &str) -> Result<BinsFile, ConfigError> {
        let file: BinsFile = serde_yaml::from_str(yaml)?;
        validate_bins(&file)?;
        Ok(file)
    }

    fn parse_track(yaml: &str) -> Result<TrackFile, ConfigError> {
        let file: TrackFile = serde_yaml::from_str(yaml)?;
        validate_track(&file)?;
        Ok(file)
    }

    #[test]
    fn bins_file_defaults_flags() {
        let file = parse_bins(
            r"
bins:
  - id: 1
    latitude: 52.1005
    longitude: 21.0005
  - id: 2
    latitude: 52.2
    longitude: 21.1
    visibility: false
    accepted: false
",
        )
        .unwrap();
        let bins = file.to_bins().unwrap();
        assert_eq!(bins.len(), 2);
        assert!(bins[0].visibility && bins[0].is_moderated());
        assert!(!bins[1].visibility && !bins[1].is_moderated());
        assert!(bins[0].deleted_at.is_none());
    }

    #[test]
    fn bins_file_rejects_duplicate_ids() {
        let err = parse_bins(
            r"
bins:
  - { id: 1, latitude: 1.0, longitude: 1.0 }
  - { id: 1, latitude: 2.0, longitude: 2.0 }
",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn bins_file_rejects_out_of_range_coordinates() {
        let err = parse_bins("bins:\n  - { id: 1, latitude: 91.0, longitude: 1.0 }\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn track_file_parses_all_step_kinds() {
        let file = parse_track(
            r"
interval_ms: 100
steps:
  - { kind: fix, latitude: 52.1, longitude: 21.0 }
  - { kind: failure, reason: gps timeout }
  - { kind: nudge, direction: north }
  - kind: reset_offset
  - kind: denied
",
        )
        .unwrap();
        assert_eq!(file.interval_ms, 100);
        assert_eq!(file.steps.len(), 5);
        assert_eq!(
            file.steps[2],
            TrackStep::Nudge {
                direction: Direction::North
            }
        );
        assert_eq!(file.steps[4].sensor_event(), Some(SensorEvent::PermissionDenied));
        assert!(file.steps[3].sensor_event().is_none());
    }

    #[test]
    fn track_file_default_interval() {
        let file =
            parse_track("steps:\n  - { kind: fix, latitude: 1.0, longitude: 2.0 }\n").unwrap();
        assert_eq!(file.interval_ms, DEFAULT_STEP_INTERVAL_MS);
    }

    #[test]
    fn empty_track_is_rejected() {
        let err = parse_track("steps: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn unknown_step_kind_is_a_parse_error() {
        let err = parse_track("steps:\n  - kind: teleport\n").unwrap_err();
        assert!(matches!(err, ConfigError::FixtureParse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_bins_file(Path::new("/nonexistent/bins.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::FixtureIo { .. }));
    }
}
