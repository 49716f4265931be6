//! Renderer → host events.
//!
//! Each message is one JSON object whose `type` field selects the variant:
//!
//! ```json
//! {"type":"maploaded"}
//! {"type":"log","message":"tiles ready"}
//! {"type":"contextmenu","latlng":{"lat":52.1,"lng":21.0},"screenPos":{"x":120,"y":340},"selectedBins":[7]}
//! ```

use binfinder_core::Coordinate;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

const KNOWN_TYPES: [&str; 3] = ["maploaded", "log", "contextmenu"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<LatLng> for Coordinate {
    fn from(value: LatLng) -> Self {
        Coordinate {
            latitude: value.lat,
            longitude: value.lng,
        }
    }
}

impl From<Coordinate> for LatLng {
    fn from(value: Coordinate) -> Self {
        LatLng {
            lat: value.latitude,
            lng: value.longitude,
        }
    }
}

/// Position of a gesture in renderer view pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPos {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundEvent {
    /// The renderer finished loading and accepts commands.
    #[serde(rename = "maploaded")]
    MapLoaded,

    #[serde(rename = "log")]
    Log { message: String },

    /// Long-press/right-click at a coordinate. `selected_bins` lists the bins
    /// within the tap radius.
    #[serde(rename = "contextmenu")]
    ContextMenu {
        latlng: LatLng,
        #[serde(rename = "screenPos")]
        screen_pos: ScreenPos,
        #[serde(rename = "selectedBins", default)]
        selected_bins: Vec<i64>,
    },
}

impl InboundEvent {
    /// Serializes the event the way the renderer posts it.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Encode`] if JSON encoding fails (non-finite floats
    /// are encoded as `null` by `serde_json`, which the parser then rejects).
    pub fn to_message(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self).map_err(|source| BridgeError::Encode {
            context: "inbound event",
            source,
        })
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            InboundEvent::MapLoaded => "maploaded",
            InboundEvent::Log { .. } => "log",
            InboundEvent::ContextMenu { .. } => "contextmenu",
        }
    }
}

/// Parses one message from the renderer's event channel.
///
/// # Errors
///
/// - [`BridgeError::Parse`] for invalid JSON or a payload that does not match
///   its type's schema.
/// - [`BridgeError::MissingType`] if the message is not an object with a string
///   `type` field.
/// - [`BridgeError::UnknownEventType`] for unrecognized tags.
/// - [`BridgeError::OutOfRange`] / [`BridgeError::NonFinite`] for a
///   `contextmenu` coordinate outside the valid range.
pub fn parse_inbound(raw: &str) -> Result<InboundEvent, BridgeError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|source| BridgeError::Parse { source })?;

    let tag = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(BridgeError::MissingType)?;
    if !KNOWN_TYPES.contains(&tag) {
        return Err(BridgeError::UnknownEventType(tag.to_string()));
    }

    let event: InboundEvent =
        serde_json::from_value(value).map_err(|source| BridgeError::Parse { source })?;

    if let InboundEvent::ContextMenu { latlng, .. } = &event {
        validate_latlng(*latlng)?;
    }
    Ok(event)
}

fn validate_latlng(latlng: LatLng) -> Result<(), BridgeError> {
    for (field, value, limit) in [("lat", latlng.lat, 90.0), ("lng", latlng.lng, 180.0)] {
        if !value.is_finite() {
            return Err(BridgeError::NonFinite { field });
        }
        if value.abs() > limit {
            return Err(BridgeError::OutOfRange { field, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_map_loaded() {
        assert_eq!(
            parse_inbound(r#"{"type":"maploaded"}"#).unwrap(),
            InboundEvent::MapLoaded
        );
    }

    #[test]
    fn parses_log() {
        let event = parse_inbound(r#"{"type":"log","message":"tiles ready"}"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::Log {
                message: "tiles ready".to_string()
            }
        );
    }

    #[test]
    fn parses_context_menu_with_selected_bins() {
        let event = parse_inbound(
            r#"{"type":"contextmenu","latlng":{"lat":52.1,"lng":21.0},"screenPos":{"x":120,"y":340.5},"selectedBins":[7,9]}"#,
        )
        .unwrap();
        let InboundEvent::ContextMenu {
            latlng,
            screen_pos,
            selected_bins,
        } = event
        else {
            panic!("expected contextmenu, got {event:?}");
        };
        assert_eq!(latlng, LatLng { lat: 52.1, lng: 21.0 });
        assert_eq!(screen_pos, ScreenPos { x: 120.0, y: 340.5 });
        assert_eq!(selected_bins, vec![7, 9]);
    }

    #[test]
    fn context_menu_selected_bins_defaults_to_empty() {
        let event = parse_inbound(
            r#"{"type":"contextmenu","latlng":{"lat":1,"lng":2},"screenPos":{"x":0,"y":0}}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            InboundEvent::ContextMenu { ref selected_bins, .. } if selected_bins.is_empty()
        ));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        assert!(matches!(
            parse_inbound("{not json").unwrap_err(),
            BridgeError::Parse { .. }
        ));
    }

    #[test]
    fn missing_type_is_reported() {
        assert!(matches!(
            parse_inbound(r#"{"message":"hi"}"#).unwrap_err(),
            BridgeError::MissingType
        ));
        assert!(matches!(
            parse_inbound(r#"{"type":3}"#).unwrap_err(),
            BridgeError::MissingType
        ));
        assert!(matches!(
            parse_inbound("[1,2]").unwrap_err(),
            BridgeError::MissingType
        ));
    }

    #[test]
    fn unknown_type_is_reported() {
        assert!(matches!(
            parse_inbound(r#"{"type":"zoomchanged"}"#).unwrap_err(),
            BridgeError::UnknownEventType(ref t) if t == "zoomchanged"
        ));
    }

    #[test]
    fn schema_mismatch_is_parse_error() {
        assert!(matches!(
            parse_inbound(r#"{"type":"log"}"#).unwrap_err(),
            BridgeError::Parse { .. }
        ));
    }

    #[test]
    fn out_of_range_context_menu_is_rejected() {
        let err = parse_inbound(
            r#"{"type":"contextmenu","latlng":{"lat":91,"lng":0},"screenPos":{"x":0,"y":0}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::OutOfRange { field: "lat", .. }));
    }

    #[test]
    fn to_message_uses_wire_field_names() {
        let msg = InboundEvent::ContextMenu {
            latlng: LatLng { lat: 1.0, lng: 2.0 },
            screen_pos: ScreenPos { x: 3.0, y: 4.0 },
            selected_bins: vec![5],
        }
        .to_message()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["type"], "contextmenu");
        assert_eq!(value["screenPos"]["x"], 3.0);
        assert_eq!(value["selectedBins"][0], 5);
    }
}
