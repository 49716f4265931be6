//! Renderer-side half of the bridge: keeps the map's marker set in sync with
//! the snapshots the host pushes, and reports user gestures back.

pub mod layer;
pub mod reconciler;
pub mod runtime;

pub use layer::MarkerLayer;
pub use reconciler::{MarkerHandle, MarkerReconciler, ReconcileStats};
pub use runtime::{EventSink, RendererOptions, RendererRuntime};
