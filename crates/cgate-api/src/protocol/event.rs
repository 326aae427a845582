// Status-change events.
//
// `<application> <action> <address> [values...] [#key=value key=value ...]`
//
// Everything after the first `#` is gateway metadata (source unit, object
// id, session/command ids) and is kept as string attributes.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::address::NetworkAddress;
use crate::error::Error;
use crate::level::{self, ZoneState};

/// C-Bus application an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApplicationKind {
    Lighting,
    Trigger,
    Enable,
    Security,
    Measurement,
    /// Any application keyword this client does not interpret.
    Other(String),
}

impl ApplicationKind {
    fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "lighting" => Self::Lighting,
            "trigger" => Self::Trigger,
            "enable" => Self::Enable,
            "security" => Self::Security,
            "measurement" => Self::Measurement,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Lighting => "lighting",
            Self::Trigger => "trigger",
            Self::Enable => "enable",
            Self::Security => "security",
            Self::Measurement => "measurement",
            Self::Other(keyword) => keyword,
        }
    }
}

impl fmt::Display for ApplicationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ApplicationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A parsed status-change notification.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub application: ApplicationKind,
    /// Action word, e.g. `on`, `off`, `ramp`, `event`, `zone_unsealed`.
    pub action: String,
    pub address: NetworkAddress,
    /// Numeric arguments following the address (level, ramp seconds, ...).
    pub values: Vec<u32>,
    /// Unit that originated the change, when the gateway reports it.
    pub source_unit: Option<u8>,
    pub attributes: BTreeMap<String, String>,
    pub received_at: DateTime<Utc>,
}

impl StatusEvent {
    pub fn parse(line: &str) -> Result<Self, Error> {
        let (body, metadata) = match line.split_once('#') {
            Some((body, metadata)) => (body, Some(metadata)),
            None => (line, None),
        };

        let mut tokens = body.split_whitespace();
        let keyword = tokens
            .next()
            .filter(|k| k.bytes().all(|b| b.is_ascii_lowercase() || b == b'_'))
            .ok_or_else(|| Error::protocol(line, "missing application keyword"))?;
        let action = tokens
            .next()
            .ok_or_else(|| Error::protocol(line, "missing action"))?;
        let address_text = tokens
            .next()
            .ok_or_else(|| Error::protocol(line, "missing address"))?;
        let address = NetworkAddress::parse(address_text)
            .map_err(|e| Error::protocol(line, format!("bad event address: {e}")))?;

        let values = tokens
            .map(|t| {
                t.parse::<u32>()
                    .map_err(|_| Error::protocol(line, format!("non-numeric event value '{t}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let attributes: BTreeMap<String, String> = metadata
            .unwrap_or_default()
            .split_whitespace()
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_owned(), value.to_owned()),
                None => (pair.to_owned(), String::new()),
            })
            .collect();

        let source_unit = attributes
            .get("sourceunit")
            .and_then(|v| v.parse::<u8>().ok());

        Ok(Self {
            application: ApplicationKind::from_keyword(keyword),
            action: action.to_owned(),
            address,
            values,
            source_unit,
            attributes,
            received_at: Utc::now(),
        })
    }

    /// First numeric argument, uninterpreted.
    pub fn raw_value(&self) -> Option<u32> {
        self.values.first().copied()
    }

    /// Raw lighting level carried by this event (`on` = 255, `off` = 0).
    pub fn level(&self) -> Option<u8> {
        if self.application != ApplicationKind::Lighting {
            return None;
        }
        match self.action.as_str() {
            "on" => Some(level::RAW_MAX),
            "off" => Some(0),
            "ramp" => self.raw_value().and_then(|v| u8::try_from(v).ok()),
            _ => None,
        }
    }

    /// Lighting level as a percentage.
    pub fn brightness(&self) -> Option<u8> {
        self.level().map(level::raw_to_percent)
    }

    /// Ramp duration of a lighting `ramp` event.
    pub fn ramp_time(&self) -> Option<Duration> {
        if self.application != ApplicationKind::Lighting || self.action != "ramp" {
            return None;
        }
        self.values.get(1).map(|secs| Duration::from_secs(u64::from(*secs)))
    }

    /// Zone state of a security event.
    pub fn zone_state(&self) -> Option<ZoneState> {
        if self.application != ApplicationKind::Security {
            return None;
        }
        let state = match self.action.as_str() {
            "zone_sealed" => ZoneState::Sealed,
            "zone_unsealed" => ZoneState::Unsealed,
            "zone_open" => ZoneState::Open,
            "zone_short" => ZoneState::Short,
            _ => return self.raw_value().map(level::raw_to_zone_state),
        };
        Some(state)
    }
}
