//! Great-circle distance, compass sector quantization and bounding boxes.
//!
//! Both engines are total: they never fail. Malformed input (NaN) yields a NaN
//! distance, which callers treat as "unknown".

use serde::{Deserialize, Serialize};

use crate::types::Coordinate;

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const SECTOR_WIDTH_DEG: f64 = 45.0;
const SECTOR_HALF_WIDTH_DEG: f64 = 22.5;

/// Haversine distance between `a` and `b`, in meters.
///
/// Symmetric, non-negative, and exactly `0.0` when both coordinates are equal.
#[must_use]
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    // Rounding can push h slightly above 1 for antipodal points. A plain
    // comparison keeps NaN flowing through, unlike f64::min.
    let h = if h > 1.0 { 1.0 } else { h };

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// One of the 8 compass sectors, or `Here` when observer and target coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
    Here,
}

impl Sector {
    /// Sectors clockwise from north; index `i` is centered on `i * 45°`.
    const COMPASS: [Sector; 8] = [
        Sector::North,
        Sector::Northeast,
        Sector::East,
        Sector::Southeast,
        Sector::South,
        Sector::Southwest,
        Sector::West,
        Sector::Northwest,
    ];

    /// Human-readable label used in the nearest-bin summary.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Sector::North => "north",
            Sector::Northeast => "north-east",
            Sector::East => "east",
            Sector::Southeast => "south-east",
            Sector::South => "south",
            Sector::Southwest => "south-west",
            Sector::West => "west",
            Sector::Northwest => "north-west",
            Sector::Here => "here",
        }
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Quantizes the direction from `observer` to `target` into a [`Sector`].
///
/// The angle is `atan2(Δlng, Δlat)`, so 0° points north and angles grow
/// clockwise. Buckets are 45° wide and centered on each direction: north
/// covers [337.5°, 22.5°), north-east [22.5°, 67.5°), and so on.
///
/// Non-finite deltas (NaN input) resolve to `North`; callers only ask for a
/// bearing once a finite distance is known.
#[must_use]
pub fn bearing(observer: Coordinate, target: Coordinate) -> Sector {
    let dlng = target.longitude - observer.longitude;
    let dlat = target.latitude - observer.latitude;
    if dlng == 0.0 && dlat == 0.0 {
        return Sector::Here;
    }

    let angle = dlng.atan2(dlat).to_degrees().rem_euclid(360.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = ((angle + SECTOR_HALF_WIDTH_DEG) / SECTOR_WIDTH_DEG).floor() as usize % 8;
    Sector::COMPASS[index]
}

/// Axis-aligned latitude/longitude rectangle, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// A box extending `span_degrees` in every direction from `center`,
    /// clamped to the valid coordinate range.
    #[must_use]
    pub fn around(center: Coordinate, span_degrees: f64) -> Self {
        let span = span_degrees.abs();
        Self {
            min_latitude: (center.latitude - span).max(-90.0),
            max_latitude: (center.latitude + span).min(90.0),
            min_longitude: (center.longitude - span).max(-180.0),
            max_longitude: (center.longitude + span).min(180.0),
        }
    }

    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }
}
