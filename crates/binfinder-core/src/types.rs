//! Value types shared by the proximity engine, the bridge and the backend client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A WGS84 position in decimal degrees.
///
/// Fields are public so the engines can operate on any pair of numbers.
/// Values coming from outside the process go through [`Coordinate::new`],
/// which is where range validation happens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting values outside the valid WGS84 range.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LatitudeOutOfRange`] or
    /// [`CoreError::LongitudeOutOfRange`]. NaN fails both range checks.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Re-validates a coordinate that was built field-by-field.
    ///
    /// # Errors
    ///
    /// Same as [`Coordinate::new`].
    pub fn validated(self) -> Result<Self, CoreError> {
        Self::new(self.latitude, self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A point-of-interest record as delivered by the backend on each fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bin {
    pub id: i64,
    pub coordinate: Coordinate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// `None` while the bin is still awaiting moderation.
    pub accepted_at: Option<DateTime<Utc>>,
    pub visibility: bool,
}

impl Bin {
    /// Whether the bin should be shown to users: visible and not soft-deleted.
    ///
    /// Unmoderated bins are still listed.
    #[must_use]
    pub fn is_listed(&self) -> bool {
        self.visibility && self.deleted_at.is_none()
    }

    #[must_use]
    pub fn is_moderated(&self) -> bool {
        self.accepted_at.is_some()
    }
}

/// A [`Bin`] annotated with its distance in meters from the effective location.
///
/// `distance` is `None` when the bin lies outside the proximity gate or the
/// distance could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinWithDistance {
    pub bin: Bin,
    pub distance: Option<f64>,
}

impl BinWithDistance {
    #[must_use]
    pub fn id(&self) -> i64 {
        self.bin.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(visibility: bool, deleted: bool) -> Bin {
        let now = Utc::now();
        Bin {
            id: 1,
            coordinate: Coordinate {
                latitude: 52.0,
                longitude: 21.0,
            },
            created_at: now,
            updated_at: now,
            deleted_at: deleted.then_some(now),
            accepted_at: None,
            visibility,
        }
    }

    #[test]
    fn coordinate_new_accepts_range_edges() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn coordinate_new_rejects_latitude_out_of_range() {
        let err = Coordinate::new(90.000_1, 0.0).unwrap_err();
        assert!(matches!(err, CoreError::LatitudeOutOfRange(_)));
    }

    #[test]
    fn coordinate_new_rejects_longitude_out_of_range() {
        let err = Coordinate::new(0.0, -180.5).unwrap_err();
        assert!(matches!(err, CoreError::LongitudeOutOfRange(_)));
    }

    #[test]
    fn coordinate_new_rejects_nan() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn hidden_and_deleted_bins_are_not_listed() {
        assert!(bin(true, false).is_listed());
        assert!(!bin(false, false).is_listed());
        assert!(!bin(true, true).is_listed());
    }

    #[test]
    fn unmoderated_bin_is_still_listed() {
        let b = bin(true, false);
        assert!(!b.is_moderated());
        assert!(b.is_listed());
    }

    #[test]
    fn bin_serializes_with_camel_case_timestamps() {
        let json = serde_json::to_value(bin(true, false)).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("acceptedAt").is_some());
        assert!(json.get("deleted_at").is_none());
    }
}
