//! Call event loop

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use vroom_capture::{
    CameraProvider, CaptureLoop, CaptureStats, CapturedSample, ModelLoader, ModelOptions, TrackingModel,
};
use vroom_core::{Clock, ParticipantIdentity, TelemetryPayload, Timestamp, VroomError, VroomResult};
use vroom_layout::{ContainerSize, Layout, LayoutTracker};
use vroom_state::{ParticipantViewModel, Reconciler};
use vroom_transport::{ChannelAdapter, ChannelStats, ConnectionState, DataTransport, Inbound, RoomEvent};
use vroom_wire::ReactionMessage;

use crate::RuntimeConfig;

/// Camera plus a loaded tracking model: everything needed for local capture
pub struct LocalCapture {
    pub camera: Arc<dyn CameraProvider>,
    pub model: TrackingModel,
}

impl LocalCapture {
    /// Load the tracking model for this call.
    ///
    /// A model that fails to load leaves the call without local telemetry;
    /// the failure is logged and `None` returned.
    pub fn prepare(
        camera: Arc<dyn CameraProvider>,
        loader: &dyn ModelLoader,
        options: ModelOptions,
    ) -> Option<Self> {
        match TrackingModel::load(loader, options) {
            Ok(model) => Some(LocalCapture { camera, model }),
            Err(e) => {
                tracing::warn!(error = %e, "Tracking model unavailable, continuing without local telemetry");
                None
            }
        }
    }
}

/// Collaborators a call runs against
pub struct CallDeps {
    pub clock: Arc<dyn Clock>,
    pub transport: Arc<dyn DataTransport>,
    /// Provider room events, in arrival order
    pub events: mpsc::Receiver<RoomEvent>,
    pub capture: Option<LocalCapture>,
}

/// Complete render state published after every change
#[derive(Debug, Clone, PartialEq)]
pub struct RoomView {
    pub participants: Arc<[ParticipantViewModel]>,
    pub layout: Layout,
    pub connection: ConnectionState,
    /// Whether the local camera is feeding telemetry
    pub local_capture: bool,
}

impl Default for RoomView {
    fn default() -> Self {
        RoomView {
            participants: Arc::from(Vec::new()),
            layout: Layout::ZERO,
            connection: ConnectionState::Disconnected,
            local_capture: false,
        }
    }
}

/// Local requests into the loop
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SendReaction(String),
    Shutdown,
}

/// Counters reported when a call ends
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallStats {
    pub local_samples: u64,
    pub remote_samples: u64,
    pub reactions_received: u64,
    pub reactions_sent: u64,
    pub roster_updates: u64,
    pub views_published: u64,
    pub capture: Option<CaptureStats>,
    pub channel: ChannelStats,
}

/// Handle to a running call
pub struct CallHandle {
    commands: mpsc::Sender<Command>,
    resize: watch::Sender<ContainerSize>,
    view: watch::Receiver<RoomView>,
    task: JoinHandle<CallStats>,
}

impl CallHandle {
    /// Subscribe to view snapshots
    pub fn view(&self) -> watch::Receiver<RoomView> {
        self.view.clone()
    }

    /// Latest published snapshot
    pub fn current(&self) -> RoomView {
        self.view.borrow().clone()
    }

    /// Report the container's new size
    pub fn resize(&self, size: ContainerSize) {
        self.resize.send_replace(size);
    }

    /// Show a reaction locally and broadcast it
    pub async fn send_reaction(&self, emoji: impl Into<String>) -> VroomResult<()> {
        self.commands
            .send(Command::SendReaction(emoji.into()))
            .await
            .map_err(|_| VroomError::ChannelClosed)
    }

    /// End the call: stops capture, closes the channel, waits for the loop
    pub async fn shutdown(self) -> CallStats {
        // The loop may already be gone; the join below still collects its stats
        let _ = self.commands.send(Command::Shutdown).await;
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!("Call task failed: {}", e);
                CallStats::default()
            }
        }
    }
}

/// Start a call. Must be called from within a tokio runtime.
pub fn spawn_call(config: &RuntimeConfig, deps: CallDeps) -> CallHandle {
    let CallDeps {
        clock,
        transport,
        events,
        capture,
    } = deps;

    let local_identity = transport.local_identity();
    let adapter = ChannelAdapter::new(transport, config.channel());

    let (capture, samples) = match capture {
        Some(local) => start_capture(local, config, Arc::clone(&clock)),
        None => (None, None),
    };

    let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
    let (resize_tx, resize_rx) = watch::channel(ContainerSize::default());
    let (view_tx, view_rx) = watch::channel(RoomView::default());

    let call = CallLoop {
        clock,
        local_identity,
        adapter,
        reconciler: Reconciler::new(config.reconciler()),
        tracker: LayoutTracker::new(),
        capture,
        connection: ConnectionState::Disconnected,
        view_tx,
        stats: CallStats::default(),
    };
    let task = tokio::spawn(call.run(
        Sources {
            events,
            commands: command_rx,
            resize: resize_rx,
            samples,
        },
        config.sweep_interval,
    ));

    CallHandle {
        commands: command_tx,
        resize: resize_tx,
        view: view_rx,
        task,
    }
}

fn start_capture(
    local: LocalCapture,
    config: &RuntimeConfig,
    clock: Arc<dyn Clock>,
) -> (Option<CaptureLoop>, Option<mpsc::Receiver<CapturedSample>>) {
    let (sample_tx, sample_rx) = mpsc::channel(config.sample_buffer);
    let capture = CaptureLoop::new(local.model, config.capture(), clock);

    match capture.start(local.camera.as_ref(), sample_tx) {
        Ok(_) => (Some(capture), Some(sample_rx)),
        Err(e) => {
            tracing::info!(error = %e, "Joining without local telemetry");
            (None, None)
        }
    }
}

struct Sources {
    events: mpsc::Receiver<RoomEvent>,
    commands: mpsc::Receiver<Command>,
    resize: watch::Receiver<ContainerSize>,
    samples: Option<mpsc::Receiver<CapturedSample>>,
}

struct CallLoop {
    clock: Arc<dyn Clock>,
    local_identity: ParticipantIdentity,
    adapter: ChannelAdapter,
    reconciler: Reconciler,
    tracker: LayoutTracker,
    capture: Option<CaptureLoop>,
    connection: ConnectionState,
    view_tx: watch::Sender<RoomView>,
    stats: CallStats,
}

impl CallLoop {
    async fn run(mut self, sources: Sources, sweep_interval: Duration) -> CallStats {
        let Sources {
            mut events,
            mut commands,
            mut resize,
            mut samples,
        } = sources;

        let mut sweep = tokio::time::interval(sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut events_open = true;
        let mut resize_open = true;

        tracing::info!(local = %self.local_identity, "Call started");
        self.publish(self.clock.now());

        loop {
            tokio::select! {
                sample = next_sample(&mut samples) => match sample {
                    Some(sample) => self.on_local_sample(sample),
                    None => {
                        tracing::info!("Local capture ended");
                        samples = None;
                        self.publish(self.clock.now());
                    }
                },
                event = events.recv(), if events_open => match event {
                    Some(event) => self.on_room_event(event),
                    None => {
                        tracing::info!("Provider event stream closed");
                        events_open = false;
                    }
                },
                changed = resize.changed(), if resize_open => match changed {
                    Ok(()) => {
                        let size = *resize.borrow_and_update();
                        self.on_resize(size);
                    }
                    Err(_) => resize_open = false,
                },
                _ = sweep.tick() => self.on_sweep(),
                command = commands.recv() => match command {
                    Some(Command::SendReaction(emoji)) => self.on_send_reaction(emoji),
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        self.teardown()
    }

    fn on_local_sample(&mut self, sample: CapturedSample) {
        let now = self.clock.now();
        self.stats.local_samples += 1;

        // Throttled on capture time so queueing delay cannot drop a sample
        // the capture gate already spaced out. Failures are recoverable and
        // already logged by the adapter.
        if let Err(e) = self.adapter.send_telemetry(&sample.payload, sample.captured_at) {
            tracing::trace!(error = %e, "Telemetry not sent");
        }

        self.reconciler.apply_local(sample.payload);
        self.publish(now);
    }

    fn on_room_event(&mut self, event: RoomEvent) {
        let now = self.clock.now();
        match event {
            RoomEvent::Data(message) => {
                let Some(inbound) = self.adapter.dispatch(message) else {
                    return;
                };
                match inbound {
                    Inbound::Telemetry { from, payload } => {
                        self.stats.remote_samples += 1;
                        self.reconciler.apply_remote(from, payload);
                    }
                    Inbound::Reaction { from, emoji } => {
                        self.stats.reactions_received += 1;
                        self.reconciler.set_reaction(from, emoji, now);
                    }
                }
            }
            RoomEvent::RosterChanged(roster) => {
                self.stats.roster_updates += 1;
                let count = roster.len();
                self.reconciler.set_roster(roster);
                self.tracker.set_count(count);
            }
            RoomEvent::ConnectionStateChanged(state) => {
                tracing::info!(%state, "Connection state changed");
                self.connection = state;
            }
        }
        self.publish(now);
    }

    fn on_resize(&mut self, size: ContainerSize) {
        if self.tracker.resize(size).is_some() {
            self.publish(self.clock.now());
        }
    }

    fn on_sweep(&mut self) {
        let now = self.clock.now();
        if self.reconciler.sweep(now) {
            self.publish(now);
        }
    }

    fn on_send_reaction(&mut self, emoji: String) {
        let now = self.clock.now();
        let reaction = ReactionMessage::new(self.local_identity.clone(), emoji);

        match self.adapter.send_reaction(&reaction) {
            Ok(()) => self.stats.reactions_sent += 1,
            Err(e) => tracing::debug!(error = %e, "Reaction shown locally only"),
        }

        self.reconciler
            .set_reaction(reaction.identity, reaction.emoji, now);
        self.publish(now);
    }

    fn publish(&mut self, now: Timestamp) {
        let view = RoomView {
            participants: self.reconciler.snapshot(now),
            layout: self.tracker.layout(),
            connection: self.connection,
            local_capture: self.capture.as_ref().map_or(false, |c| c.is_running()),
        };

        let changed = self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
        if changed {
            self.stats.views_published += 1;
        }
    }

    fn teardown(mut self) -> CallStats {
        if let Some(capture) = self.capture.take() {
            capture.stop();
            self.stats.capture = Some(capture.stats());
        }
        self.adapter.close();
        self.stats.channel = self.adapter.stats();

        tracing::info!(
            local_samples = self.stats.local_samples,
            remote_samples = self.stats.remote_samples,
            "Call ended"
        );
        self.stats
    }
}

async fn next_sample(samples: &mut Option<mpsc::Receiver<CapturedSample>>) -> Option<CapturedSample> {
    match samples {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
