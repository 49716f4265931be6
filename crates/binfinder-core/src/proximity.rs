//! Distance annotation and nearest-bin selection.

use serde::Serialize;

use crate::geo::{bearing, distance, Sector};
use crate::types::{Bin, BinWithDistance, Coordinate};

const DEFAULT_GATE_DEGREES: f64 = 0.005;
const DEFAULT_AT_LOCATION_METERS: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximitySettings {
    /// Per-axis degree delta beyond which no distance is computed.
    pub gate_degrees: f64,
    /// Below this distance the user is considered to be at the bin.
    pub at_location_meters: f64,
}

impl Default for ProximitySettings {
    fn default() -> Self {
        Self {
            gate_degrees: DEFAULT_GATE_DEGREES,
            at_location_meters: DEFAULT_AT_LOCATION_METERS,
        }
    }
}

/// Result of one [`ProximityResolver::resolve`] pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proximity {
    pub annotated: Vec<BinWithDistance>,
    pub nearest: Option<BinWithDistance>,
    pub nearest_bearing: Option<Sector>,
}

impl Proximity {
    /// The steady state when no effective location is known.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            annotated: Vec::new(),
            nearest: None,
            nearest_bearing: None,
        }
    }

    #[must_use]
    pub fn nearest_id(&self) -> Option<i64> {
        self.nearest.as_ref().map(BinWithDistance::id)
    }
}

/// Where the nearest bin is, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "sector")]
pub enum Placement {
    /// Within the at-location threshold; no direction is shown.
    AtLocation,
    Toward(Sector),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearestSummary {
    pub bin_id: i64,
    pub distance_m: f64,
    pub placement: Placement,
}

impl NearestSummary {
    #[must_use]
    pub fn describe(&self) -> String {
        match self.placement {
            Placement::AtLocation | Placement::Toward(Sector::Here) => {
                "You are next to it".to_string()
            }
            Placement::Toward(sector) => format!("{:.0} m {}", self.distance_m, sector.label()),
        }
    }
}

/// Annotates bins with distances from the effective location and picks the
/// nearest one.
///
/// Stateless: every call recomputes from scratch. Callers memoize on
/// unchanged inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProximityResolver {
    settings: ProximitySettings,
}

impl ProximityResolver {
    #[must_use]
    pub fn new(settings: ProximitySettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> ProximitySettings {
        self.settings
    }

    #[must_use]
    pub fn resolve(&self, bins: &[Bin], location: Option<Coordinate>) -> Proximity {
        let Some(observer) = location else {
            return Proximity::empty();
        };

        let annotated: Vec<BinWithDistance> = bins
            .iter()
            .map(|bin| BinWithDistance {
                bin: bin.clone(),
                distance: self.gated_distance(observer, bin.coordinate),
            })
            .collect();

        let mut nearest: Option<&BinWithDistance> = None;
        for candidate in &annotated {
            let Some(d) = candidate.distance else {
                continue;
            };
            // Strictly-less keeps the first occurrence on ties.
            if nearest.and_then(|n| n.distance).is_none_or(|best| d < best) {
                nearest = Some(candidate);
            }
        }
        let nearest = nearest.cloned();
        let nearest_bearing = nearest
            .as_ref()
            .map(|n| bearing(observer, n.bin.coordinate));

        Proximity {
            annotated,
            nearest,
            nearest_bearing,
        }
    }

    /// Applies the display policy on top of the raw bearing.
    #[must_use]
    pub fn summarize(&self, proximity: &Proximity) -> Option<NearestSummary> {
        let nearest = proximity.nearest.as_ref()?;
        let distance_m = nearest.distance?;
        let placement = if distance_m < self.settings.at_location_meters {
            Placement::AtLocation
        } else {
            Placement::Toward(proximity.nearest_bearing?)
        };
        Some(NearestSummary {
            bin_id: nearest.id(),
            distance_m,
            placement,
        })
    }

    fn gated_distance(&self, observer: Coordinate, target: Coordinate) -> Option<f64> {
        let gate = self.settings.gate_degrees;
        let within = (target.latitude - observer.latitude).abs() <= gate
            && (target.longitude - observer.longitude).abs() <= gate;
        if !within {
            return None;
        }
        let d = distance(observer, target);
        d.is_finite().then_some(d)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn bin(id: i64, latitude: f64, longitude: f64) -> Bin {
        let now = Utc::now();
        Bin {
            id,
            coordinate: Coordinate {
                latitude,
                longitude,
            },
            created_at: now,
            updated_at: now,
            deleted_at: None,
            accepted_at: Some(now),
            visibility: true,
        }
    }

    fn at(latitude: f64, longitude: f64) -> Option<Coordinate> {
        Some(Coordinate {
            latitude,
            longitude,
        })
    }

    #[test]
    fn no_location_is_steady_empty_state() {
        let r = ProximityResolver::default();
        let result = r.resolve(&[bin(1, 52.1, 21.0)], None);
        assert_eq!(result, Proximity::empty());
    }

    #[test]
    fn no_bins_has_no_nearest() {
        let r = ProximityResolver::default();
        let result = r.resolve(&[], at(52.1, 21.0));
        assert!(result.annotated.is_empty());
        assert!(result.nearest.is_none());
        assert!(result.nearest_bearing.is_none());
    }

    #[test]
    fn gate_excludes_far_bins() {
        let r = ProximityResolver::default();
        let bins = [bin(1, 52.100_5, 21.000_5), bin(2, 53.0, 22.0)];
        let result = r.resolve(&bins, at(52.1, 21.0));

        assert_eq!(result.annotated.len(), 2);
        assert!(result.annotated[0].distance.is_some());
        assert!(result.annotated[1].distance.is_none());
        assert_eq!(result.nearest_id(), Some(1));
        assert_eq!(result.nearest_bearing, Some(Sector::Northeast));
    }

    #[test]
    fn gate_applies_per_axis() {
        let r = ProximityResolver::default();
        // Latitude within the gate, longitude just outside it.
        let result = r.resolve(&[bin(1, 52.1, 21.006)], at(52.1, 21.0));
        assert!(result.annotated[0].distance.is_none());
        assert!(result.nearest.is_none());
    }

    #[test]
    fn nearest_is_smallest_distance() {
        let r = ProximityResolver::default();
        let bins = [
            bin(1, 52.103, 21.0),
            bin(2, 52.101, 21.0),
            bin(3, 52.102, 21.0),
        ];
        let result = r.resolve(&bins, at(52.1, 21.0));
        assert_eq!(result.nearest_id(), Some(2));
        assert_eq!(result.nearest_bearing, Some(Sector::North));
    }

    #[test]
    fn ties_keep_first_occurrence() {
        let r = ProximityResolver::default();
        let bins = [bin(7, 52.1, 21.001), bin(3, 52.1, 21.001)];
        let result = r.resolve(&bins, at(52.1, 21.0));
        assert_eq!(result.nearest_id(), Some(7));
    }

    #[test]
    fn bin_at_observer_has_here_bearing() {
        let r = ProximityResolver::default();
        let result = r.resolve(&[bin(1, 52.1, 21.0)], at(52.1, 21.0));
        assert_eq!(result.nearest.as_ref().unwrap().distance, Some(0.0));
        assert_eq!(result.nearest_bearing, Some(Sector::Here));
    }

    #[test]
    fn summary_close_bin_is_at_location() {
        let r = ProximityResolver::default();
        // ~3.3 m south
        let result = r.resolve(&[bin(1, 52.099_97, 21.0)], at(52.1, 21.0));
        let summary = r.summarize(&result).unwrap();
        assert_eq!(summary.placement, Placement::AtLocation);
        assert_eq!(summary.describe(), "You are next to it");
    }

    #[test]
    fn summary_far_bin_has_direction() {
        let r = ProximityResolver::default();
        // ~111 m south
        let result = r.resolve(&[bin(1, 52.099, 21.0)], at(52.1, 21.0));
        let summary = r.summarize(&result).unwrap();
        assert_eq!(summary.placement, Placement::Toward(Sector::South));
        assert_eq!(summary.describe(), "111 m south");
    }

    #[test]
    fn summary_none_without_nearest() {
        let r = ProximityResolver::default();
        assert!(r.summarize(&Proximity::empty()).is_none());
    }
}
