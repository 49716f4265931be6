pub mod app_config;
pub mod config;
pub mod fixtures;
pub mod geo;
pub mod location;
pub mod proximity;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use fixtures::{load_bins_file, load_track_file, BinsFile, TrackFile, TrackStep};
pub use geo::{bearing, distance, BoundingBox, Sector, EARTH_RADIUS_M};
pub use location::{
    Direction, LocationSettings, LocationState, LocationStore, LocationUpdate, Notice, Notifier,
    SensorEvent,
};
pub use proximity::{NearestSummary, Placement, Proximity, ProximityResolver, ProximitySettings};
pub use types::{Bin, BinWithDistance, Coordinate};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read fixture file {path}: {source}")]
    FixtureIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse fixture file: {0}")]
    FixtureParse(#[from] serde_yaml::Error),

    #[error("fixture validation failed: {0}")]
    Validation(String),
}
