use binfinder_bridge::BinMarker;
use binfinder_core::Coordinate;

/// The drawing surface the reconciler drives (a tile map with a marker layer).
///
/// `Marker` is whatever live object the surface hands back for a placed
/// marker; the reconciler owns it until it is passed back to
/// [`MarkerLayer::remove_marker`].
pub trait MarkerLayer {
    type Marker;

    fn add_bin_marker(&mut self, bin: &BinMarker) -> Self::Marker;

    fn add_selection_marker(&mut self, at: Coordinate) -> Self::Marker;

    fn remove_marker(&mut self, marker: Self::Marker);

    fn set_highlight(&mut self, marker: &Self::Marker, highlighted: bool);

    fn set_view(&mut self, center: Coordinate);

    fn move_observer(&mut self, at: Coordinate);

    /// Draws the debug overlay text. Surfaces without an overlay ignore it.
    fn show_overlay(&mut self, _text: &str) {}
}
