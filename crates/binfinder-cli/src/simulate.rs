//! Track replay: host controller and renderer runtime wired through channels.
//!
//! The renderer runs as its own task and only sees script strings; the host
//! only sees serialized events. This mirrors the webview boundary.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use binfinder_bridge::BinMarker;
use binfinder_client::BinsClient;
use binfinder_core::{
    load_bins_file, load_track_file, AppConfig, BoundingBox, Coordinate, LocationStore, Notice,
    Notifier, ProximityResolver, SensorEvent, TrackFile, TrackStep,
};
use binfinder_host::{
    ControllerSettings, HostAction, HostBridgeController, ScriptInjector, SensorSubscription,
};
use binfinder_renderer::{EventSink, MarkerLayer, RendererOptions, RendererRuntime};
use tokio::sync::mpsc;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const ACTION_CHANNEL_CAPACITY: usize = 16;

/// Forwards scripts to the renderer task.
struct ChannelInjector(mpsc::UnboundedSender<String>);

impl ScriptInjector for ChannelInjector {
    fn inject(&mut self, script: &str) {
        if self.0.send(script.to_owned()).is_err() {
            tracing::debug!("renderer gone; script discarded");
        }
    }
}

/// Posts renderer events back to the host.
struct ChannelSink(mpsc::Sender<String>);

impl EventSink for ChannelSink {
    fn post(&mut self, message: String) {
        if let Err(err) = self.0.try_send(message) {
            tracing::warn!(error = %err, "host event channel unavailable; event dropped");
        }
    }
}

/// Prints notices where the mobile client would show a toast.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, notice: Notice) {
        println!("! {}", notice.message());
    }
}

/// Map surface that draws nothing and traces every marker operation.
#[derive(Default)]
struct TracingLayer {
    next: u64,
}

impl MarkerLayer for TracingLayer {
    type Marker = u64;

    fn add_bin_marker(&mut self, bin: &BinMarker) -> u64 {
        self.next += 1;
        tracing::debug!(target: "renderer", marker = self.next, bin_id = bin.id, "add bin marker");
        self.next
    }

    fn add_selection_marker(&mut self, at: Coordinate) -> u64 {
        self.next += 1;
        tracing::debug!(target: "renderer", marker = self.next, %at, "add selection marker");
        self.next
    }

    fn remove_marker(&mut self, marker: u64) {
        tracing::debug!(target: "renderer", marker, "remove marker");
    }

    fn set_highlight(&mut self, marker: &u64, highlighted: bool) {
        tracing::debug!(target: "renderer", marker = *marker, highlighted, "highlight");
    }

    fn set_view(&mut self, center: Coordinate) {
        tracing::debug!(target: "renderer", %center, "set view");
    }

    fn move_observer(&mut self, at: Coordinate) {
        tracing::debug!(target: "renderer", %at, "move observer");
    }

    fn show_overlay(&mut self, text: &str) {
        println!("[overlay] {text}");
    }
}

/// Replays `track_path` and prints the final nearest-bin summary.
///
/// Bins come from `bins_path` when given, otherwise from the backend around
/// each new location.
///
/// # Errors
///
/// Returns an error if a fixture cannot be loaded or the backend client
/// cannot be constructed.
pub(crate) async fn run_simulation(
    config: &AppConfig,
    track_path: &Path,
    bins_path: Option<&Path>,
    debug_overlay: bool,
) -> anyhow::Result<()> {
    let track = load_track_file(track_path)
        .with_context(|| format!("failed to load track {}", track_path.display()))?;
    let local_bins = match bins_path {
        Some(path) => Some(
            load_bins_file(path)
                .and_then(|file| file.to_bins())
                .with_context(|| format!("failed to load bins {}", path.display()))?,
        ),
        None => None,
    };

    let (script_tx, script_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (action_tx, action_rx) = mpsc::channel(ACTION_CHANNEL_CAPACITY);

    let options = RendererOptions {
        debug_overlay: debug_overlay || config.debug_overlay,
        tap_radius_meters: config.at_location_meters,
    };
    let renderer = tokio::spawn(run_renderer(options, script_rx, ChannelSink(event_tx)));

    let mut controller = HostBridgeController::new(
        ControllerSettings {
            forward_renderer_logs: config.forward_renderer_logs,
            fetch_span_degrees: config.fetch_span_degrees,
        },
        LocationStore::new(config.location_settings(), ConsoleNotifier),
        ProximityResolver::new(config.proximity_settings()),
        ChannelInjector(script_tx),
    );

    let fetcher = match local_bins {
        Some(bins) => {
            controller.set_bins(bins);
            None
        }
        None => {
            let client = BinsClient::new(config)?;
            let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
            controller.request_fetches(fetch_tx);
            Some(tokio::spawn(run_fetcher(client, fetch_rx, action_tx.downgrade())))
        }
    };

    let steps = track.steps.len();
    controller.attach_sensor(SensorSubscription::spawn(move |sensor_tx| {
        play_track(track, sensor_tx, action_tx)
    }));

    tracing::info!(steps, "simulation started");
    controller.run(event_rx, action_rx).await;
    controller.shutdown();

    match controller.summary() {
        Some(summary) => println!("nearest: bin {} ({})", summary.bin_id, summary.describe()),
        None => println!("no bin nearby (location: {})", controller.location_state()),
    }

    // Dropping the controller closes the script channel, which ends the renderer.
    drop(controller);
    if let Some(fetcher) = fetcher {
        fetcher.abort();
    }
    let markers = renderer.await.context("renderer task failed")?;
    tracing::info!(markers, "simulation finished");
    Ok(())
}

async fn run_renderer(
    options: RendererOptions,
    mut scripts: mpsc::UnboundedReceiver<String>,
    sink: ChannelSink,
) -> usize {
    let mut runtime = RendererRuntime::new(TracingLayer::default(), sink, options);
    runtime.load();
    while let Some(script) = scripts.recv().await {
        if let Err(err) = runtime.execute(&script) {
            tracing::warn!(target: "renderer", error = %err, "script rejected");
        }
    }
    runtime.reconciler().len()
}

/// Services bounding-box requests until the controller or the action channel goes away.
async fn run_fetcher(
    client: BinsClient,
    mut requests: mpsc::UnboundedReceiver<BoundingBox>,
    actions: mpsc::WeakSender<HostAction>,
) {
    while let Some(area) = requests.recv().await {
        let action = match client.fetch_bins(&area).await {
            Ok(bins) => HostAction::SetBins(bins),
            Err(err) => HostAction::FetchFailed(err.to_string()),
        };
        let Some(actions) = actions.upgrade() else {
            break;
        };
        if actions.send(action).await.is_err() {
            break;
        }
    }
}

/// Feeds the track into the sensor channel and the action channel in order.
///
/// Returning drops both senders, which lets the controller loop finish.
async fn play_track(
    track: TrackFile,
    sensor: mpsc::Sender<SensorEvent>,
    actions: mpsc::Sender<HostAction>,
) {
    let interval = Duration::from_millis(track.interval_ms);
    for step in track.steps {
        tokio::time::sleep(interval).await;
        let delivered = match step.sensor_event() {
            Some(event) => sensor.send(event).await.is_ok(),
            None => {
                let action = match step {
                    TrackStep::Nudge { direction } => HostAction::Nudge(direction),
                    _ => HostAction::ResetOffset,
                };
                actions.send(action).await.is_ok()
            }
        };
        if !delivered {
            return;
        }
    }
    // One more interval so an in-flight fetch can land.
    tokio::time::sleep(interval).await;
}
