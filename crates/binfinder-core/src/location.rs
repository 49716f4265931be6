//! Device location state: sensor fixes, permission/failure states, and the
//! debug offset used to walk the user around the map without moving.

use crate::geo::distance;
use crate::types::Coordinate;

const DEFAULT_OFFSET_STEP_DEGREES: f64 = 0.000_2;
const DEFAULT_SIGNIFICANT_CHANGE_METERS: f64 = 2.0;

/// Lifecycle of the location subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationState {
    Uninitialized,
    /// Terminal for the session.
    PermissionDenied,
    Tracking,
    /// Recoverable: the next successful fix returns to `Tracking`.
    Errored,
}

impl std::fmt::Display for LocationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationState::Uninitialized => write!(f, "uninitialized"),
            LocationState::PermissionDenied => write!(f, "permission_denied"),
            LocationState::Tracking => write!(f, "tracking"),
            LocationState::Errored => write!(f, "errored"),
        }
    }
}

/// Events pushed by the platform location service.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Fix(Coordinate),
    PermissionDenied,
    Failure(String),
}

/// A user-visible notification raised by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    PermissionDenied,
    SensorFailure { reason: String },
}

impl Notice {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Notice::PermissionDenied => {
                "Location permission was denied. Enable it in settings to find nearby bins."
                    .to_string()
            }
            Notice::SensorFailure { reason } => format!("Could not read your location: {reason}"),
        }
    }
}

/// Display collaborator for [`Notice`]s (a toast, in the mobile client).
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// Direction of one debug offset step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// What a [`SensorEvent`] did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationUpdate {
    /// First fix, or moved at least the significant-change distance.
    Moved,
    /// Raw location overwritten, but within the significant-change distance.
    Jitter,
    /// Entered `PermissionDenied` or `Errored`.
    StateChanged,
    /// Nothing changed (e.g. a fix after permission was denied).
    Ignored,
}

impl LocationUpdate {
    /// Whether dependents should recompute proximity.
    #[must_use]
    pub fn requires_refresh(self) -> bool {
        matches!(self, LocationUpdate::Moved | LocationUpdate::StateChanged)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSettings {
    /// Size of one debug offset step, in degrees (~20 m).
    pub offset_step_degrees: f64,
    pub significant_change_meters: f64,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            offset_step_degrees: DEFAULT_OFFSET_STEP_DEGREES,
            significant_change_meters: DEFAULT_SIGNIFICANT_CHANGE_METERS,
        }
    }
}

/// Holds the latest sensor fix and the accumulated debug offset.
///
/// The offset is stored as whole step counts so that opposite moves cancel
/// exactly, with no floating-point drift.
#[derive(Debug)]
pub struct LocationStore<N> {
    settings: LocationSettings,
    state: LocationState,
    raw: Option<Coordinate>,
    last_significant: Option<Coordinate>,
    north_steps: i32,
    east_steps: i32,
    notifier: N,
}

impl<N: Notifier> LocationStore<N> {
    pub fn new(settings: LocationSettings, notifier: N) -> Self {
        Self {
            settings,
            state: LocationState::Uninitialized,
            raw: None,
            last_significant: None,
            north_steps: 0,
            east_steps: 0,
            notifier,
        }
    }

    #[must_use]
    pub fn state(&self) -> LocationState {
        self.state
    }

    #[must_use]
    pub fn raw_location(&self) -> Option<Coordinate> {
        self.raw
    }

    /// Accumulated debug offset as `(Δlatitude, Δlongitude)` in degrees.
    #[must_use]
    pub fn offset(&self) -> (f64, f64) {
        (
            f64::from(self.north_steps) * self.settings.offset_step_degrees,
            f64::from(self.east_steps) * self.settings.offset_step_degrees,
        )
    }

    /// Raw location shifted by the debug offset, or `None` before the first fix.
    ///
    /// Latitude is clamped to the poles; longitude wraps across the antimeridian.
    #[must_use]
    pub fn effective_location(&self) -> Option<Coordinate> {
        let raw = self.raw?;
        if self.north_steps == 0 && self.east_steps == 0 {
            return Some(raw);
        }
        let (dlat, dlng) = self.offset();
        let latitude = (raw.latitude + dlat).clamp(-90.0, 90.0);
        let mut longitude = raw.longitude + dlng;
        if longitude > 180.0 {
            longitude -= 360.0;
        } else if longitude < -180.0 {
            longitude += 360.0;
        }
        Some(Coordinate {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Applies one event from the platform location service.
    pub fn apply(&mut self, event: SensorEvent) -> LocationUpdate {
        if self.state == LocationState::PermissionDenied {
            tracing::debug!(?event, "ignoring sensor event after permission denial");
            return LocationUpdate::Ignored;
        }

        match event {
            SensorEvent::Fix(fix) => self.apply_fix(fix),
            SensorEvent::PermissionDenied => {
                tracing::warn!(previous = %self.state, "location permission denied");
                self.state = LocationState::PermissionDenied;
                self.raw = None;
                self.last_significant = None;
                self.notifier.notify(Notice::PermissionDenied);
                LocationUpdate::StateChanged
            }
            SensorEvent::Failure(reason) => {
                if self.state == LocationState::Errored {
                    tracing::debug!(%reason, "repeated sensor failure");
                    return LocationUpdate::Ignored;
                }
                tracing::warn!(%reason, previous = %self.state, "location sensor failure");
                self.state = LocationState::Errored;
                self.notifier.notify(Notice::SensorFailure { reason });
                LocationUpdate::StateChanged
            }
        }
    }

    fn apply_fix(&mut self, fix: Coordinate) -> LocationUpdate {
        let was_tracking = self.state == LocationState::Tracking;
        self.state = LocationState::Tracking;
        self.raw = Some(fix);

        let significant = match self.last_significant {
            Some(previous) if was_tracking => {
                distance(previous, fix) >= self.settings.significant_change_meters
            }
            _ => true,
        };

        if significant {
            self.last_significant = Some(fix);
            tracing::debug!(latitude = fix.latitude, longitude = fix.longitude, "location moved");
            LocationUpdate::Moved
        } else {
            LocationUpdate::Jitter
        }
    }

    pub fn move_north(&mut self) {
        self.north_steps = self.north_steps.saturating_add(1);
    }

    pub fn move_south(&mut self) {
        self.north_steps = self.north_steps.saturating_sub(1);
    }

    pub fn move_east(&mut self) {
        self.east_steps = self.east_steps.saturating_add(1);
    }

    pub fn move_west(&mut self) {
        self.east_steps = self.east_steps.saturating_sub(1);
    }

    pub fn nudge(&mut self, direction: Direction) {
        match direction {
            Direction::North => self.move_north(),
            Direction::South => self.move_south(),
            Direction::East => self.move_east(),
            Direction::West => self.move_west(),
        }
    }

    pub fn reset_offset(&mut self) {
        self.north_steps = 0;
        self.east_steps = 0;
    }
}
