//! Native side of the bridge: turns location and bin state into renderer
//! commands and routes renderer events back into application state.

pub mod controller;
pub mod digest;
pub mod sensor;

pub use controller::{
    ControllerSettings, HostAction, HostBridgeController, ScriptInjector, Selection,
};
pub use sensor::SensorSubscription;
