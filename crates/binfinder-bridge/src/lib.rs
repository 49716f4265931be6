//! Message vocabulary between the native host and the embedded map renderer.
//!
//! The channel is asymmetric. Host → renderer messages are script snippets
//! that call a function on the renderer's global scope ([`OutboundCommand`]).
//! Renderer → host messages are JSON events tagged by a `type` field
//! ([`InboundEvent`]). Nothing is acknowledged.

pub mod error;
pub mod inbound;
pub mod outbound;

pub use error::BridgeError;
pub use inbound::{parse_inbound, InboundEvent, LatLng, ScreenPos};
pub use outbound::{parse_script, BinMarker, OutboundCommand};
