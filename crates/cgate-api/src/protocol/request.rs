// Outbound commands and their response interpretation.
//
// Each command is rendered as `[tag] verb args...`. The gateway echoes the
// tag on every line of the matching response.

use std::time::Duration;

use crate::address::NetworkAddress;
use crate::error::Error;
use crate::protocol::response::{ResponseLine, status};

/// A command the client can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Switch a lighting group fully on.
    On(NetworkAddress),
    /// Switch a lighting group off.
    Off(NetworkAddress),
    /// Ramp a lighting group to a raw level, optionally over a duration.
    Ramp {
        address: NetworkAddress,
        level: u8,
        duration: Option<Duration>,
    },
    /// Stop a ramp in progress, leaving the group at its current level.
    TerminateRamp(NetworkAddress),
    /// Read one parameter of an object (`level`, `state`, ...).
    Get {
        address: NetworkAddress,
        parameter: String,
    },
    /// Fire a trigger-control action selector.
    TriggerEvent { address: NetworkAddress, action: u8 },
    /// Set an enable-control variable.
    EnableSet { address: NetworkAddress, value: u8 },
    /// Export the object model of a network as XML.
    DbGetXml(NetworkAddress),
    /// Round-trip with no side effects.
    Noop,
}

/// The interpreted outcome of a completed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The gateway accepted the command.
    Ack,
    /// A single parameter value.
    Value(String),
    /// A multi-line document (object-model XML).
    Document(String),
}

impl Request {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::On(_) => "on",
            Self::Off(_) => "off",
            Self::Ramp { .. } => "ramp",
            Self::TerminateRamp(_) => "terminate_ramp",
            Self::Get { .. } => "get",
            Self::TriggerEvent { .. } => "trigger event",
            Self::EnableSet { .. } => "enable set",
            Self::DbGetXml(_) => "dbgetxml",
            Self::Noop => "noop",
        }
    }

    /// The address this command targets, if any.
    pub fn address(&self) -> Option<&NetworkAddress> {
        match self {
            Self::On(address)
            | Self::Off(address)
            | Self::TerminateRamp(address)
            | Self::DbGetXml(address)
            | Self::Ramp { address, .. }
            | Self::Get { address, .. }
            | Self::TriggerEvent { address, .. }
            | Self::EnableSet { address, .. } => Some(address),
            Self::Noop => None,
        }
    }

    /// Check the target granularity before anything is queued.
    pub fn validate(&self) -> Result<(), Error> {
        let require = |address: &NetworkAddress, ok: bool, expected: &'static str| {
            if ok {
                Ok(())
            } else {
                Err(Error::InvalidTarget {
                    address: address.clone(),
                    expected,
                })
            }
        };

        match self {
            Self::On(address)
            | Self::Off(address)
            | Self::TerminateRamp(address)
            | Self::Ramp { address, .. }
            | Self::TriggerEvent { address, .. }
            | Self::EnableSet { address, .. } => require(address, address.is_group_id(), "a group"),
            Self::DbGetXml(address) => require(address, address.is_network_id(), "a network"),
            Self::Get { address, parameter } => {
                require(address, !address.is_project_id(), "a network, application, group or unit")?;
                if parameter.is_empty()
                    || !parameter.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
                {
                    return Err(Error::protocol(
                        &self.render_args(),
                        format!("invalid parameter name '{parameter}'"),
                    ));
                }
                Ok(())
            }
            Self::Noop => Ok(()),
        }
    }

    /// Render the full command line (without terminator).
    pub fn render(&self, tag: u32) -> String {
        format!("[{tag}] {}", self.render_args())
    }

    fn render_args(&self) -> String {
        let verb = self.verb();
        match self {
            Self::On(address)
            | Self::Off(address)
            | Self::TerminateRamp(address)
            | Self::DbGetXml(address) => format!("{verb} {address}"),
            Self::Ramp {
                address,
                level,
                duration,
            } => match duration.map(|d| d.as_secs()).filter(|secs| *secs > 0) {
                Some(secs) => format!("{verb} {address} {level} {secs}s"),
                None => format!("{verb} {address} {level}"),
            },
            Self::Get { address, parameter } => format!("{verb} {address} {parameter}"),
            Self::TriggerEvent { address, action } => format!("{verb} {address} {action}"),
            Self::EnableSet { address, value } => format!("{verb} {address} {value}"),
            Self::Noop => verb.to_owned(),
        }
    }

    /// Turn the collected response lines into a [`Reply`].
    ///
    /// `lines` holds every line of the response, the final one last.
    pub fn interpret(&self, lines: &[ResponseLine]) -> Result<Reply, Error> {
        if let Some(failure) = lines.iter().find(|l| l.is_error()) {
            return Err(Error::Rejected {
                code: failure.code,
                message: failure.text.clone(),
            });
        }

        match self {
            Self::Get { parameter, .. } => find_parameter(lines, parameter).map(Reply::Value),
            Self::DbGetXml(_) => collect_document(lines).map(Reply::Document),
            _ => Ok(Reply::Ack),
        }
    }
}

/// Extract `param=value` from a `300 //ADDR: param=value` line.
fn find_parameter(lines: &[ResponseLine], parameter: &str) -> Result<String, Error> {
    let raw = lines
        .iter()
        .rev()
        .find(|l| l.code == status::OBJECT_STATUS)
        .ok_or_else(|| Error::protocol(&last_text(lines), "no object status line in response"))?;

    let (_address, assignments) = raw
        .text
        .split_once(": ")
        .ok_or_else(|| Error::protocol(&raw.text, "expected '<address>: <param>=<value>'"))?;

    assignments
        .split_whitespace()
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.eq_ignore_ascii_case(parameter))
        .map(|(_, value)| value.to_owned())
        .ok_or_else(|| Error::protocol(&raw.text, format!("parameter '{parameter}' missing")))
}

/// Reassemble a `343` / `347`... / `344` XML snippet.
fn collect_document(lines: &[ResponseLine]) -> Result<String, Error> {
    let terminated = lines.last().is_some_and(|l| l.code == status::XML_END);
    if !terminated {
        return Err(Error::protocol(&last_text(lines), "XML snippet not terminated by 344"));
    }

    let body: Vec<&str> = lines
        .iter()
        .filter(|l| l.code == status::XML_LINE)
        .map(|l| l.text.as_str())
        .collect();
    if body.is_empty() {
        return Err(Error::protocol(&last_text(lines), "empty XML snippet"));
    }
    Ok(body.join("\n"))
}

fn last_text(lines: &[ResponseLine]) -> String {
    lines.last().map(|l| l.text.clone()).unwrap_or_default()
}
