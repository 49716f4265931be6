//! Script dispatch and event emission for the embedded renderer.

use binfinder_bridge::{
    parse_script, BridgeError, InboundEvent, LatLng, OutboundCommand, ScreenPos,
};
use binfinder_core::Coordinate;

use crate::layer::MarkerLayer;
use crate::reconciler::{MarkerReconciler, ReconcileStats};

const DEFAULT_TAP_RADIUS_METERS: f64 = 6.0;

/// The renderer's only way to talk to the host: post one serialized event.
pub trait EventSink {
    fn post(&mut self, message: String);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererOptions {
    /// Emit a `log` event and draw an overlay after every reconciliation.
    pub debug_overlay: bool,
    /// Radius around a context-menu tap within which bins are reported as selected.
    pub tap_radius_meters: f64,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            debug_overlay: false,
            tap_radius_meters: DEFAULT_TAP_RADIUS_METERS,
        }
    }
}

/// Executes injected command scripts against a [`MarkerReconciler`] and
/// posts gesture events back through an [`EventSink`].
pub struct RendererRuntime<L: MarkerLayer, S: EventSink> {
    reconciler: MarkerReconciler<L>,
    sink: S,
    options: RendererOptions,
    loaded: bool,
}

impl<L: MarkerLayer, S: EventSink> RendererRuntime<L, S> {
    pub fn new(layer: L, sink: S, options: RendererOptions) -> Self {
        Self {
            reconciler: MarkerReconciler::new(layer),
            sink,
            options,
            loaded: false,
        }
    }

    /// Signals readiness to the host. Only the first call posts `maploaded`.
    pub fn load(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;
        self.emit(&InboundEvent::MapLoaded);
    }

    /// Runs one injected script.
    ///
    /// A script that fails to parse is reported to the host as a `log` event
    /// and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns the [`BridgeError`] from [`parse_script`].
    pub fn execute(&mut self, script: &str) -> Result<(), BridgeError> {
        match parse_script(script) {
            Ok(command) => {
                self.apply(&command);
                Ok(())
            }
            Err(err) => {
                self.log(format!("rejected command: {err}"));
                Err(err)
            }
        }
    }

    pub fn apply(&mut self, command: &OutboundCommand) {
        match command {
            OutboundCommand::UpdatePosition(at) => self.reconciler.update_position(*at),
            OutboundCommand::UpdateBins(snapshot) => {
                let stats = self.reconciler.update_bins(snapshot);
                if self.options.debug_overlay {
                    self.report(stats);
                }
            }
            OutboundCommand::MarkClosest { bin_id } => {
                self.reconciler.mark_closest(*bin_id);
            }
            OutboundCommand::ClearClosest => {
                self.reconciler.clear_closest();
            }
            OutboundCommand::ClearSelection => {
                self.reconciler.clear_selection();
            }
        }
    }

    /// Handles a long-press at `at`: places the selection marker and posts a
    /// `contextmenu` event listing the bins within the tap radius.
    pub fn context_menu(&mut self, at: Coordinate, screen_pos: ScreenPos) {
        self.reconciler.place_selection(at);
        let selected_bins = self
            .reconciler
            .bins_near(at, self.options.tap_radius_meters);
        self.emit(&InboundEvent::ContextMenu {
            latlng: LatLng::from(at),
            screen_pos,
            selected_bins,
        });
    }

    pub fn log(&mut self, message: String) {
        self.emit(&InboundEvent::Log { message });
    }

    pub fn reconciler(&self) -> &MarkerReconciler<L> {
        &self.reconciler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn report(&mut self, stats: ReconcileStats) {
        let text = format!(
            "markers: {} (+{} -{})",
            self.reconciler.len(),
            stats.created,
            stats.removed
        );
        self.reconciler.layer_mut().show_overlay(&text);
        self.log(text);
    }

    fn emit(&mut self, event: &InboundEvent) {
        match event.to_message() {
            Ok(message) => self.sink.post(message),
            Err(err) => {
                tracing::warn!(error = %err, kind = event.type_name(), "dropping renderer event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use binfinder_bridge::{parse_inbound, BinMarker};

    use super::*;
    use crate::reconciler::tests::{marker, RecordingLayer};

    #[derive(Debug, Default)]
    struct Outbox(Vec<String>);

    impl EventSink for Outbox {
        fn post(&mut self, message: String) {
            self.0.push(message);
        }
    }

    fn runtime(options: RendererOptions) -> RendererRuntime<RecordingLayer, Outbox> {
        RendererRuntime::new(RecordingLayer::default(), Outbox::default(), options)
    }

    fn events(rt: &RendererRuntime<RecordingLayer, Outbox>) -> Vec<InboundEvent> {
        rt.sink()
            .0
            .iter()
            .map(|m| parse_inbound(m).unwrap())
            .collect()
    }

    fn bins_script(bins: &[BinMarker]) -> String {
        OutboundCommand::UpdateBins(bins.to_vec()).to_script().unwrap()
    }

    #[test]
    fn load_posts_map_loaded_once() {
        let mut rt = runtime(RendererOptions::default());
        rt.load();
        rt.load();
        assert_eq!(events(&rt), vec![InboundEvent::MapLoaded]);
    }

    #[test]
    fn execute_dispatches_host_scripts() {
        let mut rt = runtime(RendererOptions::default());
        rt.execute(&bins_script(&[marker(1, 52.1, 21.0), marker(2, 52.2, 21.0)]))
            .unwrap();
        rt.execute("window.markClosestBin(2);").unwrap();
        rt.execute("window.updateMapPosition(52.1,21.0);").unwrap();
        assert_eq!(rt.reconciler().len(), 2);
        assert_eq!(rt.reconciler().closest(), Some(2));
        assert_eq!(rt.reconciler().layer().views.len(), 1);
    }

    #[test]
    fn rejected_script_is_logged_not_applied() {
        let mut rt = runtime(RendererOptions::default());
        assert!(rt.execute("window.markClosestBin(alert(1));").is_err());
        let evs = events(&rt);
        assert_eq!(evs.len(), 1);
        assert!(matches!(
            evs[0],
            InboundEvent::Log { ref message } if message.starts_with("rejected command")
        ));
    }

    #[test]
    fn null_mark_closest_clears_highlight() {
        let mut rt = runtime(RendererOptions::default());
        rt.execute(&bins_script(&[marker(1, 52.1, 21.0), marker(2, 52.2, 21.0)]))
            .unwrap();
        rt.execute("window.markClosestBin(1);").unwrap();
        rt.execute("window.markClosestBin(null);").unwrap();
        assert_eq!(rt.reconciler().closest(), None);
        assert_eq!(rt.reconciler().layer().highlights, vec![(1, true), (1, false)]);
        assert_eq!(rt.reconciler().len(), 2);
    }

    #[test]
    fn stale_mark_closest_is_silent() {
        let mut rt = runtime(RendererOptions::default());
        rt.execute("window.markClosestBin(5);").unwrap();
        assert!(rt.sink().0.is_empty());
        assert_eq!(rt.reconciler().closest(), None);
    }

    #[test]
    fn context_menu_reports_bins_within_tap_radius() {
        let mut rt = runtime(RendererOptions::default());
        rt.execute(&bins_script(&[
            marker(1, 52.100_02, 21.0),
            marker(2, 52.101, 21.0),
        ]))
        .unwrap();
        let at = Coordinate {
            latitude: 52.1,
            longitude: 21.0,
        };
        rt.context_menu(at, ScreenPos { x: 10.0, y: 20.0 });

        assert!(rt.reconciler().has_selection());
        let evs = events(&rt);
        assert_eq!(
            evs,
            vec![InboundEvent::ContextMenu {
                latlng: LatLng { lat: 52.1, lng: 21.0 },
                screen_pos: ScreenPos { x: 10.0, y: 20.0 },
                selected_bins: vec![1],
            }]
        );
    }

    #[test]
    fn clear_selection_removes_marker() {
        let mut rt = runtime(RendererOptions::default());
        rt.context_menu(
            Coordinate {
                latitude: 1.0,
                longitude: 1.0,
            },
            ScreenPos { x: 0.0, y: 0.0 },
        );
        rt.execute("window.clearSelectedPos();").unwrap();
        assert!(!rt.reconciler().has_selection());
    }

    #[test]
    fn debug_overlay_reports_reconciliation() {
        let mut rt = runtime(RendererOptions {
            debug_overlay: true,
            ..RendererOptions::default()
        });
        rt.execute(&bins_script(&[marker(1, 1.0, 1.0)])).unwrap();
        assert_eq!(rt.reconciler().layer().overlays, vec!["markers: 1 (+1 -0)"]);
        assert!(matches!(
            events(&rt).as_slice(),
            [InboundEvent::Log { message }] if message == "markers: 1 (+1 -0)"
        ));
    }

    #[test]
    fn overlay_disabled_by_default() {
        let mut rt = runtime(RendererOptions::default());
        rt.execute(&bins_script(&[marker(1, 1.0, 1.0)])).unwrap();
        assert!(rt.reconciler().layer().overlays.is_empty());
        assert!(rt.sink().0.is_empty());
    }
}
