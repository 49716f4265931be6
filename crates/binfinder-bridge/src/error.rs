use thiserror::Error;

/// Errors raised while encoding or decoding bridge messages.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A numeric payload was NaN or infinite.
    #[error("non-finite value for {field}")]
    NonFinite { field: &'static str },

    /// A coordinate payload fell outside the valid WGS84 range.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    /// An identifier cannot be represented exactly by a JavaScript number.
    #[error("{field} {value} exceeds the safe integer range")]
    UnsafeInteger { field: &'static str, value: i64 },

    #[error("failed to encode {context}: {source}")]
    Encode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The payload was not valid JSON or did not match the event schema.
    #[error("malformed bridge message: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },

    #[error("bridge message has no string `type` field")]
    MissingType,

    #[error("unknown bridge event type: {0}")]
    UnknownEventType(String),

    #[error("malformed command script: {0}")]
    MalformedScript(String),

    #[error("unknown renderer function: {0}")]
    UnknownFunction(String),
}
