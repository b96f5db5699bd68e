//! Connection supervisor: the single owner of the connection state machine.
//!
//! The supervisor runs as an actor on its own task. Commands from callers,
//! callbacks from the radio and timer expiries all arrive as messages and
//! are handled one at a time, so every transition is linearised.
//!
//! Each connection attempt gets a monotonically increasing number and a
//! [`CancellationToken`]. Timers post a message tagged with the attempt
//! that armed them; a message from an older attempt is ignored, so a
//! superseded attempt can never move the state machine.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use smarttrack_domain::adapter::AdapterState;
use smarttrack_domain::connection::{ConnectionState, FailureReason};
use smarttrack_domain::device::DeviceRef;
use smarttrack_domain::error::TrackerError;
use smarttrack_domain::event::{Event, EventKind};
use smarttrack_domain::id::DeviceId;

use super::characteristic_subscriber::{CharacteristicSubscriber, SubscriptionReport};
use super::device_registry::DeviceRegistry;
use super::scanner::{ScanVerdict, Scanner};
use crate::ports::{
    AdapterEvents, DiscoveredPeripheral, EventPublisher, KeyValueStore, RadioAdapter,
};
use crate::telemetry::{RawPayload, TelemetryInput};

const COMMAND_BUFFER: usize = 32;
/// How often the adapter is re-read while waiting for it to power on.
const POWER_ON_POLL: Duration = Duration::from_millis(250);

/// Errors returned to callers of the [`SupervisorHandle`].
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("connection failed: {0}")]
    Failed(FailureReason),
    #[error("superseded by a newer connection attempt")]
    Superseded,
    #[error("connection attempt cancelled")]
    Cancelled,
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        state: ConnectionState,
        operation: &'static str,
    },
    #[error("bluetooth adapter not ready ({0})")]
    AdapterNotReady(AdapterState),
    #[error("device registry error")]
    Registry(#[source] TrackerError),
    #[error("connection supervisor stopped")]
    Stopped,
}

/// Timing knobs of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// How long to wait for the adapter to power on.
    pub power_on_timeout: Duration,
    /// How long scanning plus connecting may take.
    pub connect_timeout: Duration,
    /// Default duration of a discovery scan.
    pub discovery_window: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            power_on_timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(10),
            discovery_window: Duration::from_secs(3),
        }
    }
}

/// Published view of the supervisor for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupervisorStatus {
    pub state: ConnectionState,
    pub target: Option<DeviceRef>,
    pub failure: Option<FailureReason>,
    pub failure_message: Option<&'static str>,
    pub adapter: AdapterState,
    pub adapter_message: &'static str,
    pub discovering: bool,
    pub nearby: Vec<DeviceRef>,
}

impl Default for SupervisorStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Idle,
            target: None,
            failure: None,
            failure_message: None,
            adapter: AdapterState::Unknown,
            adapter_message: AdapterState::Unknown.message(),
            discovering: false,
            nearby: Vec::new(),
        }
    }
}

// -- adapter callbacks -------------------------------------------------------

#[derive(Debug)]
enum AdapterEvent {
    State(AdapterState),
    Discovered(DiscoveredPeripheral),
    Connected(DeviceId),
    ConnectFailed(DeviceId, TrackerError),
    Disconnected(DeviceId),
    Value {
        id: DeviceId,
        characteristic: uuid::Uuid,
        value: Vec<u8>,
    },
}

/// [`AdapterEvents`] implementation that queues callbacks for the supervisor.
#[derive(Debug, Clone)]
pub struct AdapterEventSink {
    tx: mpsc::UnboundedSender<AdapterEvent>,
}

impl AdapterEventSink {
    fn push(&self, event: AdapterEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("supervisor gone, dropping adapter event");
        }
    }
}

impl AdapterEvents for AdapterEventSink {
    fn on_adapter_state(&self, state: AdapterState) {
        self.push(AdapterEvent::State(state));
    }

    fn on_discovered(&self, peripheral: DiscoveredPeripheral) {
        self.push(AdapterEvent::Discovered(peripheral));
    }

    fn on_connected(&self, id: DeviceId) {
        self.push(AdapterEvent::Connected(id));
    }

    fn on_connect_failed(&self, id: DeviceId, error: TrackerError) {
        self.push(AdapterEvent::ConnectFailed(id, error));
    }

    fn on_disconnected(&self, id: DeviceId) {
        self.push(AdapterEvent::Disconnected(id));
    }

    fn on_value(&self, id: DeviceId, characteristic: uuid::Uuid, value: Vec<u8>) {
        self.push(AdapterEvent::Value {
            id,
            characteristic,
            value,
        });
    }
}

/// Receiving end of an [`AdapterEventSink`], consumed by the supervisor.
#[derive(Debug)]
pub struct AdapterEventInbox {
    rx: mpsc::UnboundedReceiver<AdapterEvent>,
}

/// Create the callback queue between a radio adapter and the supervisor.
///
/// The sink is handed to the radio before the supervisor is spawned.
#[must_use]
pub fn adapter_event_channel() -> (AdapterEventSink, AdapterEventInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AdapterEventSink { tx }, AdapterEventInbox { rx })
}

// -- handle ------------------------------------------------------------------

type ConnectReply = oneshot::Sender<Result<DeviceRef, ConnectError>>;

enum Command {
    Connect {
        device: DeviceRef,
        reply: ConnectReply,
    },
    Retry {
        reply: ConnectReply,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Forget {
        reply: oneshot::Sender<Result<(), ConnectError>>,
    },
    Discover {
        window: Option<Duration>,
        reply: oneshot::Sender<Result<(), ConnectError>>,
    },
    StopDiscovery {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable client of a running supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SupervisorStatus>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect { device, .. } => f.debug_tuple("Connect").field(&device.id).finish(),
            Self::Retry { .. } => f.write_str("Retry"),
            Self::Disconnect { .. } => f.write_str("Disconnect"),
            Self::Forget { .. } => f.write_str("Forget"),
            Self::Discover { window, .. } => f.debug_tuple("Discover").field(window).finish(),
            Self::StopDiscovery { .. } => f.write_str("StopDiscovery"),
        }
    }
}

impl SupervisorHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ConnectError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| ConnectError::Stopped)?;
        rx.await.map_err(|_| ConnectError::Stopped)
    }

    /// Start a new attempt against `device`, superseding any other, and
    /// wait until it is connected or has failed.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Failed`] when the attempt fails, or
    /// [`ConnectError::Superseded`] / [`ConnectError::Cancelled`] when a
    /// later command ended it first.
    pub async fn connect(&self, device: DeviceRef) -> Result<DeviceRef, ConnectError> {
        self.request(|reply| Command::Connect { device, reply })
            .await?
    }

    /// Restart the failed attempt for the same target.
    ///
    /// # Errors
    ///
    /// Same as [`Self::connect`], plus [`ConnectError::InvalidTransition`]
    /// outside of `Failed`.
    pub async fn retry(&self) -> Result<DeviceRef, ConnectError> {
        self.request(|reply| Command::Retry { reply }).await?
    }

    /// Cancel everything and return to `Idle`. Valid from any state.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Stopped`] if the supervisor is gone.
    pub async fn disconnect(&self) -> Result<(), ConnectError> {
        self.request(|reply| Command::Disconnect { reply }).await
    }

    /// Forget the remembered device and return to `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidTransition`] outside of `Failed` and
    /// `Connected`, or [`ConnectError::Registry`] if the registry write fails.
    pub async fn forget_device(&self) -> Result<(), ConnectError> {
        self.request(|reply| Command::Forget { reply }).await?
    }

    /// Scan for nearby devices for `window` (or the configured default).
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidTransition`] unless `Idle`, or
    /// [`ConnectError::AdapterNotReady`] when the adapter is not powered on.
    pub async fn discover(&self, window: Option<Duration>) -> Result<(), ConnectError> {
        self.request(|reply| Command::Discover { window, reply })
            .await?
    }

    /// End a discovery scan early.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Stopped`] if the supervisor is gone.
    pub async fn stop_discovery(&self) -> Result<(), ConnectError> {
        self.request(|reply| Command::StopDiscovery { reply }).await
    }

    /// The latest published status.
    #[must_use]
    pub fn status(&self) -> SupervisorStatus {
        self.status.borrow().clone()
    }

    /// A receiver notified on every status change.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SupervisorStatus> {
        self.status.clone()
    }
}

// -- actor -------------------------------------------------------------------

#[derive(Debug)]
enum Internal {
    PowerOnCheck { attempt: u64, deadline: Instant },
    ConnectElapsed { attempt: u64 },
    DiscoveryElapsed { generation: u64 },
    ActivationFinished {
        attempt: u64,
        device_id: DeviceId,
        report: SubscriptionReport,
    },
}

/// The state machine. Constructed and driven by [`ConnectionSupervisor::spawn`].
pub struct ConnectionSupervisor<R, S, P> {
    radio: Arc<R>,
    registry: DeviceRegistry<S>,
    publisher: P,
    telemetry: mpsc::Sender<TelemetryInput>,
    config: SupervisorConfig,

    commands: mpsc::Receiver<Command>,
    inbox: AdapterEventInbox,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    status: watch::Sender<SupervisorStatus>,

    state: ConnectionState,
    adapter: AdapterState,
    target: Option<DeviceRef>,
    failure: Option<FailureReason>,
    scanner: Scanner,
    attempt: u64,
    attempt_token: CancellationToken,
    phase_token: CancellationToken,
    waiters: Vec<ConnectReply>,
    connecting_to: Option<DeviceId>,
    link: Option<DeviceId>,
    discovery_generation: u64,
    discovery_token: CancellationToken,
}

impl<R, S, P> ConnectionSupervisor<R, S, P>
where
    R: RadioAdapter + Send + Sync + 'static,
    S: KeyValueStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    /// Spawn the supervisor actor.
    ///
    /// The actor stops, tearing down any link, once every
    /// [`SupervisorHandle`] is dropped.
    pub fn spawn(
        radio: Arc<R>,
        registry: DeviceRegistry<S>,
        publisher: P,
        inbox: AdapterEventInbox,
        telemetry: mpsc::Sender<TelemetryInput>,
        config: SupervisorConfig,
    ) -> (SupervisorHandle, JoinHandle<()>) {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(SupervisorStatus::default());
        let supervisor = Self {
            radio,
            registry,
            publisher,
            telemetry,
            config,
            commands,
            inbox,
            internal_tx,
            internal_rx,
            status,
            state: ConnectionState::Idle,
            adapter: AdapterState::Unknown,
            target: None,
            failure: None,
            scanner: Scanner::default(),
            attempt: 0,
            attempt_token: CancellationToken::new(),
            phase_token: CancellationToken::new(),
            waiters: Vec::new(),
            connecting_to: None,
            link: None,
            discovery_generation: 0,
            discovery_token: CancellationToken::new(),
        };
        let task = tokio::spawn(supervisor.run());
        (
            SupervisorHandle {
                commands: command_tx,
                status: status_rx,
            },
            task,
        )
    }

    async fn run(mut self) {
        let adapter = self.radio.adapter_state().await;
        self.adapter = adapter;
        self.publish_status();
        tracing::debug!(%adapter, "connection supervisor started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(event) = self.inbox.rx.recv() => self.handle_adapter_event(event).await,
                Some(message) = self.internal_rx.recv() => self.handle_internal(message).await,
            }
        }

        self.teardown().await;
        self.discovery_token.cancel();
        tracing::debug!("connection supervisor stopped");
    }

    // -- commands ------------------------------------------------------------

    async fn handle_command(&mut self, command: Command) {
        tracing::trace!(?command, state = %self.state, "command received");
        match command {
            Command::Connect { device, reply } => {
                self.begin_attempt(device, reply).await;
            }
            Command::Retry { reply } => match (self.state, self.target.clone()) {
                (ConnectionState::Failed, Some(target)) => {
                    self.begin_attempt(target, reply).await;
                }
                _ => {
                    let _ = reply.send(Err(self.invalid("retry")));
                }
            },
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::Forget { reply } => {
                let _ = reply.send(self.forget().await);
            }
            Command::Discover { window, reply } => {
                let _ = reply.send(self.begin_discovery(window).await);
            }
            Command::StopDiscovery { reply } => {
                self.end_discovery().await;
                let _ = reply.send(());
            }
        }
    }

    fn invalid(&self, operation: &'static str) -> ConnectError {
        ConnectError::InvalidTransition {
            state: self.state,
            operation,
        }
    }

    #[tracing::instrument(skip(self, reply), fields(device_id = %device.id, attempt = self.attempt + 1))]
    async fn begin_attempt(&mut self, device: DeviceRef, reply: ConnectReply) {
        self.reply_waiters(|| Err(ConnectError::Superseded));
        self.end_discovery().await;
        self.teardown().await;

        self.attempt += 1;
        self.failure = None;
        self.target = Some(device);
        self.waiters.push(reply);
        self.transition(ConnectionState::AwaitingAdapterReady).await;

        let adapter = self.radio.adapter_state().await;
        self.set_adapter(adapter);
        if adapter.is_ready() {
            self.enter_scanning().await;
        } else {
            tracing::debug!(%adapter, "waiting for adapter to power on");
            self.arm_power_on_check(Instant::now() + self.config.power_on_timeout);
        }
    }

    async fn enter_scanning(&mut self) {
        let Some(target) = self.target.as_ref().map(|device| device.id.clone()) else {
            return;
        };
        self.phase_token.cancel();
        self.scanner.target(target.clone());
        self.transition(ConnectionState::Scanning).await;
        self.emit(EventKind::ScanStarted {
            target: Some(target.clone()),
        })
        .await;
        if let Err(err) = self.radio.start_scan(Some(&target)).await {
            tracing::warn!(%err, "failed to start scan");
        }
        self.arm(
            self.config.connect_timeout,
            Internal::ConnectElapsed {
                attempt: self.attempt,
            },
        );
    }

    async fn disconnect(&mut self) {
        self.reply_waiters(|| Err(ConnectError::Cancelled));
        self.end_discovery().await;
        self.teardown().await;
        self.target = None;
        self.failure = None;
        self.transition(ConnectionState::Idle).await;
    }

    #[tracing::instrument(skip(self))]
    async fn forget(&mut self) -> Result<(), ConnectError> {
        if !matches!(
            self.state,
            ConnectionState::Failed | ConnectionState::Connected
        ) {
            return Err(self.invalid("forget device"));
        }
        self.registry
            .forget()
            .await
            .map_err(ConnectError::Registry)?;
        self.disconnect().await;
        self.emit(EventKind::DeviceForgotten).await;
        Ok(())
    }

    async fn begin_discovery(&mut self, window: Option<Duration>) -> Result<(), ConnectError> {
        if self.state != ConnectionState::Idle {
            return Err(self.invalid("discover devices"));
        }
        if !self.adapter.is_ready() {
            return Err(ConnectError::AdapterNotReady(self.adapter));
        }
        self.end_discovery().await;
        self.scanner.begin_discovery();
        self.discovery_generation += 1;
        self.discovery_token = CancellationToken::new();
        if let Err(err) = self.radio.start_scan(None).await {
            tracing::warn!(%err, "failed to start discovery scan");
        }
        spawn_timer(
            &self.discovery_token,
            window.unwrap_or(self.config.discovery_window),
            self.internal_tx.clone(),
            Internal::DiscoveryElapsed {
                generation: self.discovery_generation,
            },
        );
        self.publish_status();
        self.emit(EventKind::ScanStarted { target: None }).await;
        Ok(())
    }

    async fn end_discovery(&mut self) {
        if !self.scanner.is_discovering() {
            return;
        }
        self.discovery_token.cancel();
        self.scanner.stop();
        if let Err(err) = self.radio.stop_scan().await {
            tracing::warn!(%err, "failed to stop discovery scan");
        }
        tracing::debug!(found = self.scanner.nearby().len(), "discovery finished");
        self.publish_status();
    }

    /// Stop whatever the current attempt has in flight on the radio.
    async fn teardown(&mut self) {
        self.attempt_token.cancel();
        self.attempt_token = CancellationToken::new();
        self.phase_token.cancel();

        if self.state == ConnectionState::Scanning {
            if let Err(err) = self.radio.stop_scan().await {
                tracing::warn!(%err, "failed to stop scan");
            }
        }
        self.scanner.stop();
        let pending = self.connecting_to.take();
        let linked = self.link.take();
        for id in pending.into_iter().chain(linked) {
            if let Err(err) = self.radio.disconnect(&id).await {
                tracing::warn!(%err, device_id = %id, "failed to disconnect");
            }
        }
    }

    // -- adapter events ------------------------------------------------------

    async fn handle_adapter_event(&mut self, event: AdapterEvent) {
        match event {
            AdapterEvent::State(adapter) => self.on_adapter_state(adapter).await,
            AdapterEvent::Discovered(peripheral) => self.on_discovered(peripheral).await,
            AdapterEvent::Connected(id) => self.on_connected(id).await,
            AdapterEvent::ConnectFailed(id, err) => {
                tracing::warn!(%err, device_id = %id, "connect request failed");
            }
            AdapterEvent::Disconnected(id) => self.on_disconnected(id).await,
            AdapterEvent::Value {
                id,
                characteristic,
                value,
            } => self.on_value(id, characteristic, value),
        }
    }

    async fn on_adapter_state(&mut self, adapter: AdapterState) {
        tracing::info!(%adapter, "adapter state changed");
        self.set_adapter(adapter);
        if !adapter.is_ready() {
            self.end_discovery().await;
        }
        if adapter.is_ready() && self.state == ConnectionState::AwaitingAdapterReady {
            self.enter_scanning().await;
        }
        self.publish_status();
    }

    async fn on_discovered(&mut self, peripheral: DiscoveredPeripheral) {
        match self.scanner.accept(peripheral) {
            ScanVerdict::Matched(device) if self.state == ConnectionState::Scanning => {
                self.begin_connecting(device).await;
            }
            ScanVerdict::Listed(device) => {
                tracing::debug!(device_id = %device.id, name = %device.display_name, "device discovered");
                self.emit(EventKind::DeviceDiscovered { device }).await;
                self.publish_status();
            }
            ScanVerdict::Matched(_) | ScanVerdict::Ignored => {}
        }
    }

    async fn begin_connecting(&mut self, device: DeviceRef) {
        if let Err(err) = self.radio.stop_scan().await {
            tracing::warn!(%err, "failed to stop scan");
        }
        self.scanner.stop();
        // keep the advertised name when the caller only knew the identifier
        if let Some(target) = self.target.as_mut() {
            if !target.has_name() && device.has_name() {
                target.display_name = device.display_name;
            }
        }
        self.connecting_to = Some(device.id.clone());
        self.transition(ConnectionState::Connecting).await;
        if let Err(err) = self.radio.connect(&device.id).await {
            tracing::warn!(%err, device_id = %device.id, "failed to issue connect request");
        }
    }

    async fn on_connected(&mut self, id: DeviceId) {
        if self.state != ConnectionState::Connecting || self.connecting_to.as_ref() != Some(&id) {
            tracing::debug!(device_id = %id, "dropping stale connection");
            if self.link.as_ref() != Some(&id) {
                if let Err(err) = self.radio.disconnect(&id).await {
                    tracing::warn!(%err, device_id = %id, "failed to drop stale connection");
                }
            }
            return;
        }
        let Some(device) = self.target.clone() else {
            return;
        };
        self.phase_token.cancel();
        self.connecting_to = None;
        self.link = Some(id.clone());

        if self.telemetry.send(TelemetryInput::Reset).await.is_err() {
            tracing::warn!("telemetry pipeline gone");
        }
        self.spawn_activation(id);

        self.transition(ConnectionState::Connected).await;
        if let Err(err) = self.registry.remember(&device).await {
            tracing::warn!(%err, "failed to remember device");
        }
        tracing::info!(device_id = %device.id, name = %device.display_name, "device connected");
        self.emit(EventKind::Connected {
            device: device.clone(),
        })
        .await;
        self.reply_waiters(|| Ok(device.clone()));
    }

    fn spawn_activation(&self, device_id: DeviceId) {
        let subscriber = CharacteristicSubscriber::new(Arc::clone(&self.radio));
        let token = self.attempt_token.child_token();
        let tx = self.internal_tx.clone();
        let attempt = self.attempt;
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                report = subscriber.activate(&device_id) => {
                    let _ = tx.send(Internal::ActivationFinished { attempt, device_id, report });
                }
            }
        });
    }

    async fn on_disconnected(&mut self, id: DeviceId) {
        if self.link.as_ref() == Some(&id) && self.state == ConnectionState::Connected {
            tracing::warn!(device_id = %id, "link lost");
            self.link = None;
            self.attempt_token.cancel();
            self.attempt_token = CancellationToken::new();
            self.fail(FailureReason::LinkLost).await;
        } else if self.connecting_to.as_ref() == Some(&id) {
            tracing::debug!(device_id = %id, "disconnected while connecting");
        }
    }

    fn on_value(&self, id: DeviceId, characteristic: uuid::Uuid, value: Vec<u8>) {
        if self.link.as_ref() != Some(&id) {
            tracing::trace!(device_id = %id, "dropping value from unlinked peripheral");
            return;
        }
        let payload = RawPayload {
            device_id: id,
            characteristic,
            bytes: value,
        };
        if let Err(err) = self.telemetry.try_send(TelemetryInput::Payload(payload)) {
            tracing::warn!(%err, "dropping telemetry payload");
        }
    }

    // -- timers --------------------------------------------------------------

    fn arm(&mut self, after: Duration, message: Internal) {
        self.phase_token.cancel();
        self.phase_token = self.attempt_token.child_token();
        spawn_timer(&self.phase_token, after, self.internal_tx.clone(), message);
    }

    fn arm_power_on_check(&mut self, deadline: Instant) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.arm(
            remaining.min(POWER_ON_POLL),
            Internal::PowerOnCheck {
                attempt: self.attempt,
                deadline,
            },
        );
    }

    async fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::PowerOnCheck { attempt, deadline }
                if attempt == self.attempt
                    && self.state == ConnectionState::AwaitingAdapterReady =>
            {
                let adapter = self.radio.adapter_state().await;
                self.set_adapter(adapter);
                if adapter.is_ready() {
                    self.enter_scanning().await;
                } else if Instant::now() >= deadline {
                    self.fail(FailureReason::AdapterNotReady { adapter }).await;
                } else {
                    self.arm_power_on_check(deadline);
                }
            }
            Internal::ConnectElapsed { attempt }
                if attempt == self.attempt
                    && matches!(
                        self.state,
                        ConnectionState::Scanning | ConnectionState::Connecting
                    ) =>
            {
                tracing::warn!(state = %self.state, "connect timeout");
                self.teardown().await;
                self.fail(FailureReason::ConnectTimeout).await;
            }
            Internal::DiscoveryElapsed { generation } if generation == self.discovery_generation => {
                self.end_discovery().await;
            }
            Internal::ActivationFinished {
                attempt,
                device_id,
                report,
            } if attempt == self.attempt && self.state == ConnectionState::Connected => {
                if let Some(detail) = report.incomplete_detail() {
                    tracing::warn!(device_id = %device_id, %detail, "characteristic discovery incomplete");
                    self.emit(EventKind::DiscoveryIncomplete { device_id, detail })
                        .await;
                }
            }
            stale => tracing::trace!(?stale, "ignoring stale message"),
        }
    }

    // -- state ---------------------------------------------------------------

    async fn fail(&mut self, reason: FailureReason) {
        self.phase_token.cancel();
        self.scanner.stop();
        self.failure = Some(reason);
        self.transition(ConnectionState::Failed).await;
        self.emit(EventKind::Failed {
            reason,
            message: reason.message().to_owned(),
        })
        .await;
        self.reply_waiters(|| Err(ConnectError::Failed(reason)));
    }

    async fn transition(&mut self, to: ConnectionState) {
        let from = self.state;
        self.state = to;
        self.publish_status();
        if from == to {
            return;
        }
        tracing::debug!(%from, %to, attempt = self.attempt, "state changed");
        self.emit(EventKind::StateChanged { from, to }).await;
    }

    fn set_adapter(&mut self, adapter: AdapterState) {
        if adapter != self.adapter {
            self.adapter = adapter;
            self.scanner.clear_nearby();
            self.publish_status();
        }
    }

    fn reply_waiters(&mut self, outcome: impl Fn() -> Result<DeviceRef, ConnectError>) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(outcome());
        }
    }

    fn publish_status(&self) {
        let status = SupervisorStatus {
            state: self.state,
            target: self.target.clone(),
            failure: self.failure,
            failure_message: self.failure.map(FailureReason::message),
            adapter: self.adapter,
            adapter_message: self.adapter.message(),
            discovering: self.scanner.is_discovering(),
            nearby: self.scanner.nearby().to_vec(),
        };
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    async fn emit(&self, kind: EventKind) {
        if let Err(err) = self.publisher.publish(Event::new(kind)).await {
            tracing::warn!(%err, "failed to publish event");
        }
    }
}

fn spawn_timer(
    token: &CancellationToken,
    after: Duration,
    tx: mpsc::UnboundedSender<Internal>,
    message: Internal,
) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            () = tokio::time::sleep(after) => {
                let _ = tx.send(message);
            }
        }
    });
}
