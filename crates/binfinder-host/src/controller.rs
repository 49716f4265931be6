//! Wiring between location/proximity state and the renderer bridge.

use binfinder_bridge::{parse_inbound, BinMarker, InboundEvent, OutboundCommand, ScreenPos};
use binfinder_core::{
    Bin, BoundingBox, Coordinate, Direction, LocationState, LocationStore, LocationUpdate,
    NearestSummary, Notifier, Proximity, ProximityResolver, SensorEvent,
};
use tokio::sync::mpsc;

use crate::digest::{snapshot_digest, SnapshotDigest};
use crate::sensor::SensorSubscription;

/// Delivers a generated script into the renderer (e.g. a webview's
/// `injectJavaScript`). Fire-and-forget: there is no result.
pub trait ScriptInjector {
    fn inject(&mut self, script: &str);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub forward_renderer_logs: bool,
    /// Half-size of the area requested from the backend around the user.
    pub fetch_span_degrees: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            forward_renderer_logs: true,
            fetch_span_degrees: 0.01,
        }
    }
}

/// State of the context menu opened by a long-press in the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub at: Coordinate,
    pub screen_pos: ScreenPos,
    pub selected_bins: Vec<i64>,
}

/// Application-side inputs handled by [`HostBridgeController::run`].
#[derive(Debug, Clone)]
pub enum HostAction {
    Nudge(Direction),
    ResetOffset,
    ClearSelection,
    /// A completed backend fetch.
    SetBins(Vec<Bin>),
    FetchFailed(String),
}

enum Input {
    Sensor(Option<SensorEvent>),
    Message(Option<String>),
    Action(Option<HostAction>),
}

pub struct HostBridgeController<I: ScriptInjector, N: Notifier> {
    settings: ControllerSettings,
    store: LocationStore<N>,
    resolver: ProximityResolver,
    injector: I,
    bins: Vec<Bin>,
    proximity: Proximity,
    ready: bool,
    disposed: bool,
    sent_digest: Option<SnapshotDigest>,
    sent_closest: Option<i64>,
    selection: Option<Selection>,
    subscription: Option<SensorSubscription>,
    fetch_requests: Option<mpsc::UnboundedSender<BoundingBox>>,
    fetch_area: Option<BoundingBox>,
    dropped_commands: usize,
}

impl<I: ScriptInjector, N: Notifier> HostBridgeController<I, N> {
    pub fn new(
        settings: ControllerSettings,
        store: LocationStore<N>,
        resolver: ProximityResolver,
        injector: I,
    ) -> Self {
        Self {
            settings,
            store,
            resolver,
            injector,
            bins: Vec::new(),
            proximity: Proximity::empty(),
            ready: false,
            disposed: false,
            sent_digest: None,
            sent_closest: None,
            selection: None,
            subscription: None,
            fetch_requests: None,
            fetch_area: None,
            dropped_commands: 0,
        }
    }

    /// Takes ownership of the sensor subscription; it is released on
    /// [`HostBridgeController::shutdown`] or drop.
    pub fn attach_sensor(&mut self, subscription: SensorSubscription) {
        self.subscription = Some(subscription);
    }

    /// Enables backend fetch requests: a bounding box is sent whenever the
    /// effective location leaves the inner half of the last requested area.
    pub fn request_fetches(&mut self, requests: mpsc::UnboundedSender<BoundingBox>) {
        self.fetch_requests = Some(requests);
    }

    pub fn on_sensor_event(&mut self, event: SensorEvent) -> LocationUpdate {
        if self.disposed {
            return LocationUpdate::Ignored;
        }
        let update = self.store.apply(event);
        if update.requires_refresh() {
            self.refresh();
        }
        update
    }

    /// Replaces the bin set with the latest fetch. Hidden and deleted bins are dropped.
    pub fn set_bins(&mut self, bins: Vec<Bin>) {
        let total = bins.len();
        self.bins = bins.into_iter().filter(Bin::is_listed).collect();
        tracing::info!(total, listed = self.bins.len(), "bin set updated");
        self.refresh();
    }

    pub fn nudge(&mut self, direction: Direction) {
        self.store.nudge(direction);
        self.refresh();
    }

    pub fn reset_offset(&mut self) {
        self.store.reset_offset();
        self.refresh();
    }

    /// Closes the context menu and removes the renderer's selection marker.
    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.send(&OutboundCommand::ClearSelection);
    }

    pub fn apply_action(&mut self, action: HostAction) {
        match action {
            HostAction::Nudge(direction) => self.nudge(direction),
            HostAction::ResetOffset => self.reset_offset(),
            HostAction::ClearSelection => self.clear_selection(),
            HostAction::SetBins(bins) => self.set_bins(bins),
            HostAction::FetchFailed(reason) => {
                // Keep the previous bins; the next move triggers a new request.
                tracing::warn!(%reason, "bin fetch failed");
                self.fetch_area = None;
            }
        }
    }

    /// Handles one raw message from the renderer's event channel.
    ///
    /// Malformed messages are logged and dropped.
    pub fn handle_message(&mut self, raw: &str) {
        if self.disposed {
            return;
        }
        match parse_inbound(raw) {
            Ok(event) => self.handle_event(event),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    raw_len = raw.len(),
                    "dropping malformed bridge message"
                );
            }
        }
    }

    pub fn handle_event(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::MapLoaded => {
                tracing::info!(dropped = self.dropped_commands, "renderer ready");
                self.ready = true;
                self.sent_digest = None;
                self.sent_closest = None;
                self.publish();
            }
            InboundEvent::Log { message } => {
                if self.settings.forward_renderer_logs {
                    tracing::debug!(target: "renderer", "{message}");
                }
            }
            InboundEvent::ContextMenu {
                latlng,
                screen_pos,
                selected_bins,
            } => {
                tracing::debug!(
                    lat = latlng.lat,
                    lng = latlng.lng,
                    selected = selected_bins.len(),
                    "context menu opened"
                );
                self.selection = Some(Selection {
                    at: latlng.into(),
                    screen_pos,
                    selected_bins,
                });
            }
        }
    }

    /// Drives the controller until the action channel closes.
    ///
    /// Everything is handled on the calling task. When several inputs are
    /// ready at once, sensor events go first, then renderer messages.
    pub async fn run(
        &mut self,
        mut messages: mpsc::Receiver<String>,
        mut actions: mpsc::Receiver<HostAction>,
    ) {
        let mut messages_open = true;
        loop {
            let input = tokio::select! {
                biased;
                event = next_sensor_event(self.subscription.as_mut()) => Input::Sensor(event),
                message = messages.recv(), if messages_open => Input::Message(message),
                action = actions.recv() => Input::Action(action),
            };
            match input {
                Input::Sensor(Some(event)) => {
                    self.on_sensor_event(event);
                }
                Input::Sensor(None) => {
                    tracing::debug!("location subscription ended");
                    self.subscription = None;
                }
                Input::Message(Some(raw)) => self.handle_message(&raw),
                Input::Message(None) => messages_open = false,
                Input::Action(Some(action)) => self.apply_action(action),
                Input::Action(None) => break,
            }
        }
    }

    /// Releases the sensor subscription; later events and messages are ignored.
    pub fn shutdown(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.fetch_requests = None;
        self.disposed = true;
        tracing::info!("bridge controller shut down");
    }

    #[must_use]
    pub fn proximity(&self) -> &Proximity {
        &self.proximity
    }

    #[must_use]
    pub fn summary(&self) -> Option<NearestSummary> {
        self.resolver.summarize(&self.proximity)
    }

    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    #[must_use]
    pub fn location_state(&self) -> LocationState {
        self.store.state()
    }

    #[must_use]
    pub fn store(&self) -> &LocationStore<N> {
        &self.store
    }

    #[must_use]
    pub fn injector(&self) -> &I {
        &self.injector
    }

    pub fn injector_mut(&mut self) -> &mut I {
        &mut self.injector
    }

    /// Commands dropped because the renderer was not ready yet.
    #[must_use]
    pub fn dropped_commands(&self) -> usize {
        self.dropped_commands
    }

    fn refresh(&mut self) {
        let location = self.store.effective_location();
        self.proximity = self.resolver.resolve(&self.bins, location);
        if let Some(at) = location {
            self.maybe_request_fetch(at);
        }
        self.publish();
    }

    /// Sends whatever the renderer has not seen yet. Before `maploaded` every
    /// command is counted as dropped.
    fn publish(&mut self) {
        if let Some(at) = self.store.effective_location() {
            self.send(&OutboundCommand::UpdatePosition(at));
        }

        let mut snapshot: Vec<BinMarker> = self
            .proximity
            .annotated
            .iter()
            .map(|b| BinMarker::from(&b.bin))
            .collect();
        snapshot.sort_by_key(|m| m.id);
        let digest = snapshot_digest(&snapshot);
        if self.sent_digest != Some(digest) {
            let count = snapshot.len();
            if self.send(&OutboundCommand::UpdateBins(snapshot)) {
                tracing::debug!(count, "sent bin snapshot");
                self.sent_digest = Some(digest);
            }
        }

        let nearest = self.proximity.nearest_id();
        if nearest != self.sent_closest {
            match nearest {
                Some(bin_id) => {
                    if self.send(&OutboundCommand::MarkClosest { bin_id }) {
                        self.sent_closest = Some(bin_id);
                    }
                }
                None => {
                    if self.send(&OutboundCommand::ClearClosest) {
                        self.sent_closest = None;
                    }
                }
            }
        }
    }

    /// Returns whether the command reached the injector.
    fn send(&mut self, command: &OutboundCommand) -> bool {
        if self.disposed {
            return false;
        }
        if !self.ready {
            self.dropped_commands += 1;
            tracing::debug!(
                command = command.function_name(),
                "renderer not ready; dropping command"
            );
            return false;
        }
        match command.to_script() {
            Ok(script) => {
                self.injector.inject(&script);
                true
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    command = command.function_name(),
                    "refusing to encode command"
                );
                false
            }
        }
    }

    fn maybe_request_fetch(&mut self, at: Coordinate) {
        let Some(requests) = &self.fetch_requests else {
            return;
        };
        let span = self.settings.fetch_span_degrees;
        let covered = self
            .fetch_area
            .is_some_and(|area| inner_half(area).contains(at));
        if covered {
            return;
        }
        let area = BoundingBox::around(at, span);
        if requests.send(area).is_err() {
            tracing::warn!("bin fetcher is gone; disabling fetch requests");
            self.fetch_requests = None;
            return;
        }
        tracing::debug!(?area, "requested bins");
        self.fetch_area = Some(area);
    }
}

fn inner_half(area: BoundingBox) -> BoundingBox {
    let lat_margin = (area.max_latitude - area.min_latitude) / 4.0;
    let lng_margin = (area.max_longitude - area.min_longitude) / 4.0;
    BoundingBox {
        min_latitude: area.min_latitude + lat_margin,
        max_latitude: area.max_latitude - lat_margin,
        min_longitude: area.min_longitude + lng_margin,
        max_longitude: area.max_longitude - lng_margin,
    }
}

async fn next_sensor_event(subscription: Option<&mut SensorSubscription>) -> Option<SensorEvent> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
