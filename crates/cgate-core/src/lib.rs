// cgate-core: Object database and controller facade between cgate-api and the CLI.

pub mod config;
pub mod controller;
pub mod database;
pub mod error;
pub mod model;
pub mod snapshot;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::GatewayConfig;
pub use controller::Controller;
pub use database::{ObjectDatabase, SnapshotSource};
pub use error::CoreError;
pub use model::{Application, Group, Unit};
pub use snapshot::Snapshot;

// Client-layer types consumers need alongside the controller.
pub use cgate_api::{
    AddressKind, ApplicationKind, ConnectionState, EventSubscription, GatewayClient,
    NetworkAddress, ReconnectConfig, StatusEvent, ZoneState, percent_to_raw, raw_to_percent,
};
pub use cgate_api::Error as ClientError;
