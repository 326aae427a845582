// Typed command helpers on top of `GatewayClient::execute`.

use std::time::Duration;

use super::GatewayClient;
use crate::address::NetworkAddress;
use crate::error::Error;
use crate::level::{self, ZoneState};
use crate::protocol::{Reply, Request};

impl GatewayClient {
    // ── Lighting ─────────────────────────────────────────────────

    pub async fn turn_on(&self, group: &NetworkAddress) -> Result<(), Error> {
        self.execute_ack(Request::On(group.clone())).await
    }

    pub async fn turn_off(&self, group: &NetworkAddress) -> Result<(), Error> {
        self.execute_ack(Request::Off(group.clone())).await
    }

    /// Set a raw level (0-255), optionally ramping over `ramp`.
    pub async fn set_level(
        &self,
        group: &NetworkAddress,
        level: u8,
        ramp: Option<Duration>,
    ) -> Result<(), Error> {
        self.execute_ack(Request::Ramp {
            address: group.clone(),
            level,
            duration: ramp,
        })
        .await
    }

    /// Set a brightness percentage. Values above 100 are treated as 100.
    pub async fn set_brightness(
        &self,
        group: &NetworkAddress,
        percent: u8,
        ramp: Option<Duration>,
    ) -> Result<(), Error> {
        self.set_level(group, level::percent_to_raw(percent), ramp)
            .await
    }

    pub async fn terminate_ramp(&self, group: &NetworkAddress) -> Result<(), Error> {
        self.execute_ack(Request::TerminateRamp(group.clone())).await
    }

    /// Current raw level of a group.
    pub async fn get_level(&self, group: &NetworkAddress) -> Result<u8, Error> {
        let value = self.get(group, "level").await?;
        value.trim().parse::<u8>().map_err(|_| Error::Protocol {
            line: value.clone(),
            reason: format!("level '{value}' is not in 0-255"),
        })
    }

    /// Current brightness of a group as a percentage.
    pub async fn get_brightness(&self, group: &NetworkAddress) -> Result<u8, Error> {
        self.get_level(group).await.map(level::raw_to_percent)
    }

    // ── Other applications ───────────────────────────────────────

    /// Current state of a security zone.
    pub async fn get_zone_state(&self, zone: &NetworkAddress) -> Result<ZoneState, Error> {
        let value = self.get(zone, "level").await?;
        value
            .trim()
            .parse::<u32>()
            .map(level::raw_to_zone_state)
            .map_err(|_| Error::Protocol {
                line: value.clone(),
                reason: format!("zone level '{value}' is not numeric"),
            })
    }

    /// Fire a trigger-control action selector.
    pub async fn trigger_action(&self, group: &NetworkAddress, action: u8) -> Result<(), Error> {
        self.execute_ack(Request::TriggerEvent {
            address: group.clone(),
            action,
        })
        .await
    }

    /// Set an enable-control variable.
    pub async fn enable_set(&self, group: &NetworkAddress, value: u8) -> Result<(), Error> {
        self.execute_ack(Request::EnableSet {
            address: group.clone(),
            value,
        })
        .await
    }

    // ── Generic ──────────────────────────────────────────────────

    /// Read one named parameter of an object.
    pub async fn get(&self, address: &NetworkAddress, parameter: &str) -> Result<String, Error> {
        let request = Request::Get {
            address: address.clone(),
            parameter: parameter.to_owned(),
        };
        match self.execute(request).await? {
            Reply::Value(value) => Ok(value),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Export a network's object model as an XML document.
    pub async fn get_snapshot_xml(&self, network: &NetworkAddress) -> Result<String, Error> {
        match self.execute(Request::DbGetXml(network.clone())).await? {
            Reply::Document(xml) => Ok(xml),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Round-trip with no side effects.
    pub async fn noop(&self) -> Result<(), Error> {
        self.execute_ack(Request::Noop).await
    }

    async fn execute_ack(&self, request: Request) -> Result<(), Error> {
        self.execute(request).await.map(|_| ())
    }
}

fn unexpected_reply(reply: &Reply) -> Error {
    Error::Protocol {
        line: String::new(),
        reason: format!("unexpected reply {reply:?}"),
    }
}
