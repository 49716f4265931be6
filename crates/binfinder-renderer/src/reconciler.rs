use std::collections::{HashMap, HashSet};

use binfinder_bridge::BinMarker;
use binfinder_core::{distance, Coordinate};

use crate::layer::MarkerLayer;

/// A live bin marker and the snapshot entry it was created from.
#[derive(Debug)]
pub struct MarkerHandle<M> {
    pub bin: BinMarker,
    pub marker: M,
}

/// Marker churn caused by one [`MarkerReconciler::update_bins`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub removed: usize,
    pub kept: usize,
}

impl ReconcileStats {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.removed == 0
    }
}

/// Owns every marker on the map: one per bin, at most one "closest"
/// highlight, and at most one selection marker.
pub struct MarkerReconciler<L: MarkerLayer> {
    layer: L,
    markers: HashMap<i64, MarkerHandle<L::Marker>>,
    closest: Option<i64>,
    selection: Option<L::Marker>,
}

impl<L: MarkerLayer> MarkerReconciler<L> {
    pub fn new(layer: L) -> Self {
        Self {
            layer,
            markers: HashMap::new(),
            closest: None,
            selection: None,
        }
    }

    /// Brings the marker set in line with `snapshot`.
    ///
    /// Markers whose id is absent from the snapshot are destroyed, ids not yet
    /// on the map get a new marker, and markers present in both are left
    /// alone so an unchanged snapshot causes no flicker. Duplicate ids in the
    /// snapshot keep their first entry.
    pub fn update_bins(&mut self, snapshot: &[BinMarker]) -> ReconcileStats {
        let wanted: HashSet<i64> = snapshot.iter().map(|b| b.id).collect();
        let mut stats = ReconcileStats::default();

        let stale: Vec<i64> = self
            .markers
            .keys()
            .copied()
            .filter(|id| !wanted.contains(id))
            .collect();
        for id in stale {
            if let Some(handle) = self.markers.remove(&id) {
                self.layer.remove_marker(handle.marker);
                stats.removed += 1;
            }
            if self.closest == Some(id) {
                self.closest = None;
            }
        }

        for bin in snapshot {
            if self.markers.contains_key(&bin.id) {
                continue;
            }
            let marker = self.layer.add_bin_marker(bin);
            self.markers.insert(bin.id, MarkerHandle { bin: *bin, marker });
            stats.created += 1;
        }

        stats.kept = self.markers.len() - stats.created;
        tracing::debug!(
            created = stats.created,
            removed = stats.removed,
            kept = stats.kept,
            "reconciled bin markers"
        );
        stats
    }

    /// Moves the highlight to `bin_id`.
    ///
    /// Returns `false` (and changes nothing beyond clearing the old
    /// highlight) when `bin_id` has no marker, e.g. a command that raced
    /// with a removal.
    pub fn mark_closest(&mut self, bin_id: i64) -> bool {
        if self.closest == Some(bin_id) && self.markers.contains_key(&bin_id) {
            return true;
        }
        self.clear_closest();
        match self.markers.get(&bin_id) {
            Some(handle) => {
                self.layer.set_highlight(&handle.marker, true);
                self.closest = Some(bin_id);
                true
            }
            None => {
                tracing::debug!(bin_id, "markClosestBin for unknown bin ignored");
                false
            }
        }
    }

    /// Removes the highlight. Returns whether a highlighted marker was reset.
    pub fn clear_closest(&mut self) -> bool {
        let Some(previous) = self.closest.take() else {
            return false;
        };
        match self.markers.get(&previous) {
            Some(handle) => {
                self.layer.set_highlight(&handle.marker, false);
                true
            }
            None => false,
        }
    }

    /// Places the selection marker, replacing any previous one.
    pub fn place_selection(&mut self, at: Coordinate) {
        self.clear_selection();
        self.selection = Some(self.layer.add_selection_marker(at));
    }

    /// Removes the selection marker. Returns whether one was present.
    pub fn clear_selection(&mut self) -> bool {
        match self.selection.take() {
            Some(marker) => {
                self.layer.remove_marker(marker);
                true
            }
            None => false,
        }
    }

    /// Recenters the view and moves the observer marker. Bin markers are untouched.
    pub fn update_position(&mut self, at: Coordinate) {
        self.layer.set_view(at);
        self.layer.move_observer(at);
    }

    /// Ids of held bins within `radius_m` of `at`, nearest first.
    #[must_use]
    pub fn bins_near(&self, at: Coordinate, radius_m: f64) -> Vec<i64> {
        let mut hits: Vec<(f64, i64)> = self
            .markers
            .values()
            .filter_map(|handle| {
                let d = distance(at, handle.bin.coordinate());
                (d <= radius_m).then_some((d, handle.bin.id))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.into_iter().map(|(_, id)| id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    #[must_use]
    pub fn contains(&self, bin_id: i64) -> bool {
        self.markers.contains_key(&bin_id)
    }

    #[must_use]
    pub fn closest(&self) -> Option<i64> {
        self.closest
    }

    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    pub fn layer(&self) -> &L {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut L {
        &mut self.layer
    }
}
