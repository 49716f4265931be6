//! Wire types for the bins REST API.

use binfinder_core::{Bin, Coordinate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// One bin as returned by `GET /bins`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinRecord {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default = "default_visibility")]
    pub visibility: bool,
}

fn default_visibility() -> bool {
    true
}

impl TryFrom<BinRecord> for Bin {
    type Error = ClientError;

    fn try_from(record: BinRecord) -> Result<Self, Self::Error> {
        let coordinate = Coordinate::new(record.latitude, record.longitude).map_err(|source| {
            ClientError::InvalidRecord {
                id: record.id,
                source,
            }
        })?;
        Ok(Bin {
            id: record.id,
            coordinate,
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted_at: record.deleted_at,
            accepted_at: record.accepted_at,
            visibility: record.visibility,
        })
    }
}

/// Body of `POST /bins`. New bins start unmoderated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NewBin {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Coordinate> for NewBin {
    fn from(at: Coordinate) -> Self {
        Self {
            latitude: at.latitude,
            longitude: at.longitude,
        }
    }
}
