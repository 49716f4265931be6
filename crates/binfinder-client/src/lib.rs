//! REST client for the bins backend.

pub mod client;
pub mod error;
mod retry;
pub mod types;

pub use client::BinsClient;
pub use error::ClientError;
pub use types::{BinRecord, NewBin};
