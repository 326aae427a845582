// cgate-api: Async Rust client for the Clipsal C-Gate text protocol.

pub mod address;
pub mod client;
pub mod error;
pub mod level;
pub mod protocol;
pub mod transport;

pub use address::{AddressError, AddressField, AddressKey, AddressKind, NetworkAddress};
pub use client::{ConnectionState, EventSubscription, GatewayClient};
pub use error::Error;
pub use level::{ZoneState, percent_to_raw, raw_to_percent, raw_to_zone_state};
pub use protocol::{ApplicationKind, Reply, Request, StatusEvent};
pub use transport::{ClientConfig, DEFAULT_PORT, ReconnectConfig};
