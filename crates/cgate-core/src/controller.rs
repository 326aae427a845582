// ── Controller abstraction ──
//
// One gateway connection plus the object database of the configured
// network. Handles connection wait, snapshot loading, periodic refresh,
// and address shorthand for the CLI.

use std::sync::Arc;
use std::time::Duration;

use cgate_api::{EventSubscription, GatewayClient, NetworkAddress};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::database::ObjectDatabase;
use crate::error::CoreError;
use crate::snapshot::Snapshot;

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: GatewayConfig,
    client: GatewayClient,
    database: ObjectDatabase,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Validate the configuration and start the background connection.
    ///
    /// Returns immediately; call [`connect()`](Self::connect) to wait for
    /// the gateway and load the object model.
    pub fn start(config: GatewayConfig) -> Result<Self, CoreError> {
        let network = config.network_address()?;
        let database = ObjectDatabase::new(network)?;
        let client = GatewayClient::start(config.client_config());

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                database,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &GatewayClient {
        &self.inner.client
    }

    pub fn database(&self) -> &ObjectDatabase {
        &self.inner.database
    }

    /// `//PROJECT/NETWORK` this controller works with.
    pub fn network(&self) -> &NetworkAddress {
        self.inner.database.network()
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Wait for the gateway, then load the object snapshot and start the
    /// periodic refresh when configured.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        self.inner
            .client
            .wait_connected(config.connect_timeout)
            .await?;
        info!(endpoint = %config.client_config().endpoint(), "connected to gateway");

        if config.load_objects {
            self.refresh_objects().await?;
        }

        if let Some(interval) = config.refresh_interval.filter(|i| !i.is_zero()) {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(refresh_task(ctrl, interval, cancel)));
        }
        Ok(())
    }

    /// Stop background tasks and the connection. Pending commands fail
    /// with [`CoreError::Stopped`].
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        // Stop the client first so an in-progress refresh fails fast.
        self.inner.client.stop().await;

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("controller shut down");
    }

    /// One-shot: connect, run closure, shut down.
    ///
    /// Skips the periodic refresh since only one exchange is needed.
    pub async fn oneshot<F, Fut, T>(config: GatewayConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.refresh_interval = None;

        let controller = Controller::start(cfg)?;
        let result = match controller.connect().await {
            Ok(()) => f(controller.clone()).await,
            Err(e) => Err(e),
        };
        controller.shutdown().await;
        result
    }

    // ── Object model ─────────────────────────────────────────────

    /// Fetch a fresh object snapshot from the gateway.
    pub async fn refresh_objects(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.inner.database.fetch(&self.inner.client).await
    }

    /// The loaded snapshot, or [`CoreError::NotLoaded`].
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.inner
            .database
            .snapshot()
            .ok_or_else(|| CoreError::NotLoaded {
                network: self.network().to_string(),
            })
    }

    /// Display name for an address (never fails).
    pub fn tag(&self, address: &NetworkAddress) -> String {
        self.inner.database.tag(address)
    }

    // ── Events ───────────────────────────────────────────────────

    pub fn subscribe(&self, address: &NetworkAddress) -> EventSubscription {
        self.inner.client.subscribe(address)
    }

    pub fn events(&self) -> EventSubscription {
        self.inner.client.events()
    }

    // ── Address shorthand ────────────────────────────────────────

    /// Parse an address, accepting shorthand relative to the configured
    /// network: `56` (application), `56/3` (group), `p/12` (unit).
    /// Fully qualified `//PROJECT/...` text is parsed as-is.
    pub fn resolve(&self, text: &str) -> Result<NetworkAddress, CoreError> {
        if text.starts_with("//") {
            return Ok(NetworkAddress::parse(text)?);
        }

        let network = self.network();
        let project = network.project_name();
        let number = i64::from(network.network_number().unwrap_or_default());

        let field = |s: &str| {
            s.parse::<i64>().map_err(|_| CoreError::InvalidAddress {
                message: format!("'{text}': '{s}' is not a number"),
            })
        };

        let segments: Vec<&str> = text.split('/').collect();
        let address = match segments.as_slice() {
            ["p", unit] => NetworkAddress::unit(project, number, field(*unit)?)?,
            [application] => NetworkAddress::application(project, number, field(*application)?)?,
            [application, group] => {
                NetworkAddress::group(project, number, field(*application)?, field(*group)?)?
            }
            _ => {
                return Err(CoreError::InvalidAddress {
                    message: format!(
                        "'{text}': expected //PROJECT/..., <application>, <application>/<group> or p/<unit>"
                    ),
                });
            }
        };
        Ok(address)
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically re-fetch the object snapshot.
async fn refresh_task(controller: Controller, interval: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.refresh_objects().await {
                    warn!(error = %e, "periodic object refresh failed");
                }
            }
        }
    }
}
