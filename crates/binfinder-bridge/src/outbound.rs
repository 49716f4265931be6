//! Host → renderer commands and their script encoding.
//!
//! Every command becomes a single call on the renderer's global scope, for
//! example `window.updateMapPosition(52.1,21.0);`. Arguments are produced by
//! `serde_json` after validation, never by string interpolation, so no
//! payload can smuggle script into the generated text.

use binfinder_core::{Bin, Coordinate};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

pub const UPDATE_MAP_POSITION: &str = "updateMapPosition";
pub const UPDATE_BINS: &str = "updateBins";
pub const MARK_CLOSEST_BIN: &str = "markClosestBin";
pub const CLEAR_SELECTED_POS: &str = "clearSelectedPos";

/// Largest integer a JavaScript number represents exactly (2^53 - 1).
const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Bin payload carried by `updateBins`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinMarker {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl BinMarker {
    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl From<&Bin> for BinMarker {
    fn from(bin: &Bin) -> Self {
        Self {
            id: bin.id,
            latitude: bin.coordinate.latitude,
            longitude: bin.coordinate.longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundCommand {
    /// Recenter the view and move the observer marker.
    UpdatePosition(Coordinate),
    /// Reconcile the renderer's marker set against this full snapshot.
    UpdateBins(Vec<BinMarker>),
    /// Move the "closest" highlight to this bin.
    MarkClosest { bin_id: i64 },
    /// Drop the highlight; no bin is in range. Encoded as `markClosestBin(null)`.
    ClearClosest,
    /// Remove the transient selection marker.
    ClearSelection,
}

impl OutboundCommand {
    /// Name of the renderer global this command invokes.
    #[must_use]
    pub fn function_name(&self) -> &'static str {
        match self {
            OutboundCommand::UpdatePosition(_) => UPDATE_MAP_POSITION,
            OutboundCommand::UpdateBins(_) => UPDATE_BINS,
            OutboundCommand::MarkClosest { .. } | OutboundCommand::ClearClosest => {
                MARK_CLOSEST_BIN
            }
            OutboundCommand::ClearSelection => CLEAR_SELECTED_POS,
        }
    }

    /// Serializes the command into the script the host injects.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::NonFinite`] / [`BridgeError::OutOfRange`] for invalid coordinates.
    /// - [`BridgeError::UnsafeInteger`] for ids JavaScript cannot represent exactly.
    /// - [`BridgeError::Encode`] if JSON encoding fails.
    pub fn to_script(&self) -> Result<String, BridgeError> {
        let args = self.encode_args()?;
        Ok(format!("window.{}({});", self.function_name(), args.join(",")))
    }

    fn encode_args(&self) -> Result<Vec<String>, BridgeError> {
        match self {
            OutboundCommand::UpdatePosition(position) => {
                check_coordinate(position.latitude, position.longitude)?;
                Ok(vec![
                    encode_number(position.latitude)?,
                    encode_number(position.longitude)?,
                ])
            }
            OutboundCommand::UpdateBins(bins) => {
                for bin in bins {
                    check_id("bins[].id", bin.id)?;
                    check_coordinate(bin.latitude, bin.longitude)?;
                }
                let encoded = serde_json::to_string(bins).map_err(|source| BridgeError::Encode {
                    context: "bins",
                    source,
                })?;
                Ok(vec![encoded])
            }
            OutboundCommand::MarkClosest { bin_id } => {
                check_id("binId", *bin_id)?;
                Ok(vec![bin_id.to_string()])
            }
            OutboundCommand::ClearClosest => Ok(vec!["null".to_owned()]),
            OutboundCommand::ClearSelection => Ok(Vec::new()),
        }
    }
}

fn encode_number(value: f64) -> Result<String, BridgeError> {
    serde_json::to_string(&value).map_err(|source| BridgeError::Encode {
        context: "number",
        source,
    })
}

fn check_coordinate(latitude: f64, longitude: f64) -> Result<(), BridgeError> {
    check_range("latitude", latitude, 90.0)?;
    check_range("longitude", longitude, 180.0)
}

fn check_range(field: &'static str, value: f64, limit: f64) -> Result<(), BridgeError> {
    if !value.is_finite() {
        return Err(BridgeError::NonFinite { field });
    }
    if value.abs() > limit {
        return Err(BridgeError::OutOfRange { field, value });
    }
    Ok(())
}

fn check_id(field: &'static str, value: i64) -> Result<(), BridgeError> {
    if value.unsigned_abs() > MAX_SAFE_INTEGER.unsigned_abs() {
        return Err(BridgeError::UnsafeInteger { field, value });
    }
    Ok(())
}

/// Decodes an injected script back into the command it invokes.
///
/// Used on the renderer side to dispatch calls. Arguments are parsed as a
/// JSON array, so anything other than plain literals is rejected.
///
/// # Errors
///
/// - [`BridgeError::MalformedScript`] if the text is not a single call, or the
///   arguments have the wrong arity or types.
/// - [`BridgeError::Parse`] if the argument list is not valid JSON.
/// - [`BridgeError::UnknownFunction`] for calls outside the protocol vocabulary.
/// - Range errors as in [`OutboundCommand::to_script`].
pub fn parse_script(script: &str) -> Result<OutboundCommand, BridgeError> {
    let body = script.trim().trim_end_matches(';').trim_end();
    let body = body.strip_prefix("window.").unwrap_or(body);
    let open = body
        .find('(')
        .ok_or_else(|| BridgeError::MalformedScript(format!("no call in {body:?}")))?;
    let name = &body[..open];
    let args_src = body[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| BridgeError::MalformedScript(format!("unterminated call to {name}")))?;

    let args: Vec<serde_json::Value> = serde_json::from_str(&format!("[{args_src}]"))
        .map_err(|source| BridgeError::Parse { source })?;

    let command = match (name, args.as_slice()) {
        (UPDATE_MAP_POSITION, [lat, lng]) => OutboundCommand::UpdatePosition(Coordinate {
            latitude: number_arg(name, lat)?,
            longitude: number_arg(name, lng)?,
        }),
        (UPDATE_BINS, [bins]) => {
            let markers: Vec<BinMarker> = serde_json::from_value(bins.clone())
                .map_err(|source| BridgeError::Parse { source })?;
            OutboundCommand::UpdateBins(markers)
        }
        (MARK_CLOSEST_BIN, [serde_json::Value::Null]) => OutboundCommand::ClearClosest,
        (MARK_CLOSEST_BIN, [id]) => OutboundCommand::MarkClosest {
            bin_id: id.as_i64().ok_or_else(|| {
                BridgeError::MalformedScript(format!("{name} expects an integer id, got {id}"))
            })?,
        },
        (CLEAR_SELECTED_POS, []) => OutboundCommand::ClearSelection,
        (UPDATE_MAP_POSITION | UPDATE_BINS | MARK_CLOSEST_BIN | CLEAR_SELECTED_POS, _) => {
            return Err(BridgeError::MalformedScript(format!(
                "{name} called with {} argument(s)",
                args.len()
            )));
        }
        (other, _) => return Err(BridgeError::UnknownFunction(other.to_string())),
    };

    // Re-run the encoder's checks so both directions enforce the same bounds.
    command.encode_args()?;
    Ok(command)
}

fn number_arg(name: &str, value: &serde_json::Value) -> Result<f64, BridgeError> {
    value
        .as_f64()
        .ok_or_else(|| BridgeError::MalformedScript(format!("{name} expects numbers, got {value}")))
}
