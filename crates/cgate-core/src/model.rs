// ── Object model ──
//
// Entities described by a network's object snapshot. Addresses are fully
// qualified so each record stands on its own in CLI output.

use cgate_api::NetworkAddress;
use serde::Serialize;

/// A C-Bus application on the network (lighting, trigger control, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub address: NetworkAddress,
    pub name: String,
}

/// A group address within an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub application: NetworkAddress,
    pub address: NetworkAddress,
    pub name: String,
}

/// A physical unit (dimmer, relay, input) on the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub address: NetworkAddress,
    pub tag: String,
    pub firmware_version: Option<String>,
    pub serial_number: Option<String>,
    pub catalog_number: Option<String>,
    pub unit_type: Option<String>,
}
