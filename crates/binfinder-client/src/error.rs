use thiserror::Error;

/// Errors returned by [`crate::BinsClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a status the client does not handle.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] binfinder_core::ConfigError),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// A record decoded fine but carries values the core types reject.
    #[error("invalid bin record {id}: {source}")]
    InvalidRecord {
        id: i64,
        #[source]
        source: binfinder_core::CoreError,
    },
}
