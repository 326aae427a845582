// Raw wire value translation.
//
// C-Bus carries lighting levels as a byte (0-255) and security zone states
// as small integers. Consumers think in percentages and named states.

use serde::{Deserialize, Serialize};

/// Full-on raw level.
pub const RAW_MAX: u8 = 255;

/// Convert a raw level to a percentage, rounding half up.
pub fn raw_to_percent(raw: u8) -> u8 {
    // round(raw * 100 / 255) == floor((raw * 200 + 255) / 510)
    let scaled = (u32::from(raw) * 200 + 255) / 510;
    u8::try_from(scaled).unwrap_or(100)
}

/// Convert a percentage to a raw level, rounding half up.
///
/// Values above 100 clamp to full on.
pub fn percent_to_raw(percent: u8) -> u8 {
    let percent = u32::from(percent.min(100));
    // round(percent * 255 / 100) == floor((percent * 510 + 100) / 200)
    let scaled = (percent * 510 + 100) / 200;
    u8::try_from(scaled).unwrap_or(RAW_MAX)
}

/// State of a security zone (C-Bus security application).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ZoneState {
    /// Zone closed / at rest.
    Sealed,
    /// Zone open (door open, motion detected).
    Unsealed,
    /// Circuit open (wiring fault or tamper).
    Open,
    /// Circuit short.
    Short,
    Unknown,
}

impl ZoneState {
    /// Whether the zone reports "closed" to a contact-sensor style consumer.
    pub fn is_closed(self) -> bool {
        self == Self::Sealed
    }
}

/// Map a raw zone value to a [`ZoneState`]. Unmapped values are `Unknown`.
pub fn raw_to_zone_state(raw: u32) -> ZoneState {
    match raw {
        0 => ZoneState::Sealed,
        1 => ZoneState::Unsealed,
        2 => ZoneState::Open,
        3 => ZoneState::Short,
        _ => ZoneState::Unknown,
    }
}
