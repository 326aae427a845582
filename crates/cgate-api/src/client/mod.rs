// ── Gateway client ──
//
// Cheap-to-clone handle over one background connection task. Callers submit
// commands through a channel and await a oneshot; the task owns the socket,
// the queue, and the reconnect loop.

mod connection;
mod dispatch;
mod operations;
mod subscription;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::address::NetworkAddress;
use crate::error::Error;
use crate::protocol::{Reply, Request};
use crate::transport::ClientConfig;

use self::connection::Connection;
use self::dispatch::{Dispatcher, PendingCommand};
use self::subscription::SubscriberRegistry;

pub use self::subscription::EventSubscription;

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    /// No socket; a reconnect is pending.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The socket is up and commands are flowing.
    Connected,
    /// Reconnect attempts exhausted. Terminal.
    Failed,
    /// Shut down by [`GatewayClient::stop`]. Terminal.
    Stopped,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }
}

// ── GatewayClient ────────────────────────────────────────────────

/// Persistent client for a C-Gate command interface.
///
/// Cloning shares the same connection. The background task is cancelled
/// when the last clone is dropped or [`stop`](Self::stop) is called.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    command_tx: mpsc::Sender<PendingCommand>,
    state: watch::Receiver<ConnectionState>,
    registry: Arc<SubscriberRegistry>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl GatewayClient {
    /// Spawn the connection task and return immediately.
    ///
    /// The first connection attempt happens in the background; commands
    /// submitted before it succeeds wait for it. Must be called from within
    /// a Tokio runtime.
    pub fn start(config: ClientConfig) -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();

        let connection = Connection::new(
            config.clone(),
            command_rx,
            state_tx,
            Dispatcher::new(Arc::clone(&registry)),
            cancel.clone(),
        );
        let task = tokio::spawn(connection.run());
        debug!(endpoint = %config.endpoint(), "gateway client started");

        Self {
            inner: Arc::new(ClientInner {
                config,
                command_tx,
                state: state_rx,
                registry,
                cancel,
                task: Mutex::new(Some(task)),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // ── State observation ────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.clone()
    }

    /// Wait until the client is connected, or fail if it shuts down or the
    /// limit passes first.
    pub async fn wait_connected(&self, limit: Duration) -> Result<(), Error> {
        let mut state = self.watch_state();
        let reached = tokio::time::timeout(
            limit,
            state.wait_for(|s| *s == ConnectionState::Connected || s.is_terminal()),
        )
        .await
        .map_err(|_| {
            Error::Connection(format!(
                "not connected to {} after {}s",
                self.inner.config.endpoint(),
                limit.as_secs()
            ))
        })?
        .map(|s| *s)
        .map_err(|_| Error::Stopped)?;

        match reached {
            ConnectionState::Connected => Ok(()),
            _ => Err(self.closed_error()),
        }
    }

    /// Shut the connection down. Every pending command fails with
    /// [`Error::Stopped`]. Idempotent.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        let task = self.inner.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                debug!(error = %e, "connection task ended abnormally");
            }
        }
    }

    // ── Subscriptions ────────────────────────────────────────────

    /// Receive status events for one address.
    pub fn subscribe(&self, address: &NetworkAddress) -> EventSubscription {
        self.inner.registry.subscribe(address)
    }

    /// Receive every status event the gateway emits.
    pub fn events(&self) -> EventSubscription {
        self.inner.registry.subscribe_all()
    }

    // ── Command execution ────────────────────────────────────────

    /// Queue a command and await its interpreted reply.
    ///
    /// The configured response timeout covers queueing and transmission as
    /// well as the gateway's answer.
    pub async fn execute(&self, request: Request) -> Result<Reply, Error> {
        request.validate()?;
        debug!(verb = request.verb(), address = ?request.address(), "execute");

        let (tx, rx) = oneshot::channel();
        let round_trip = async {
            self.inner
                .command_tx
                .send(PendingCommand { request, reply: tx })
                .await
                .map_err(|_| self.closed_error())?;
            rx.await.map_err(|_| self.closed_error())?
        };

        match self.inner.config.response_timeout {
            Some(limit) => tokio::time::timeout(limit, round_trip)
                .await
                .map_err(|_| Error::Timeout {
                    timeout_secs: limit.as_secs(),
                })?,
            None => round_trip.await,
        }
    }

    fn closed_error(&self) -> Error {
        match self.state() {
            ConnectionState::Failed => {
                Error::Connection("gateway unreachable, reconnection limit reached".into())
            }
            _ => Error::Stopped,
        }
    }
}
