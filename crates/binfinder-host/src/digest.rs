//! Content hash of a renderer bin snapshot.
//!
//! `updateBins` is only re-sent when this digest changes, so distance
//! recomputation on every fix does not flood the bridge.

use binfinder_bridge::BinMarker;
use sha2::{Digest, Sha256};

pub type SnapshotDigest = [u8; 32];

/// Hashes ids and coordinate bits in the given order.
#[must_use]
pub fn snapshot_digest(snapshot: &[BinMarker]) -> SnapshotDigest {
    let mut hasher = Sha256::new();
    hasher.update((snapshot.len() as u64).to_le_bytes());
    for marker in snapshot {
        hasher.update(marker.id.to_le_bytes());
        hasher.update(marker.latitude.to_bits().to_le_bytes());
        hasher.update(marker.longitude.to_bits().to_le_bytes());
    }
    hasher.finalize().into()
}
