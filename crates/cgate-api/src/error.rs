use thiserror::Error;

use crate::address::{AddressError, NetworkAddress};

/// Top-level error type for the `cgate-api` crate.
///
/// Address errors surface synchronously from parsing and construction.
/// Everything else is delivered through the future returned by a client
/// operation, never thrown across the connection task. `cgate-core` maps
/// these into user-facing diagnostics.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // ── Addressing ──────────────────────────────────────────────────
    /// Malformed address text, reserved project, or out-of-range field.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// The address has the wrong granularity for the operation.
    #[error("{address} is not a valid target: expected {expected} address")]
    InvalidTarget {
        address: NetworkAddress,
        expected: &'static str,
    },

    // ── Protocol ────────────────────────────────────────────────────
    /// A line or response did not match the expected grammar.
    /// Fails only the affected command.
    #[error("Protocol error: {reason} (line: {line:?})")]
    Protocol { line: String, reason: String },

    /// The gateway answered with an error status code.
    #[error("Gateway rejected command ({code}): {message}")]
    Rejected { code: u16, message: String },

    // ── Connection ──────────────────────────────────────────────────
    /// Transport failure or unexpected close. Fails every pending command.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No response arrived within the configured response timeout.
    #[error("No response from gateway after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The client was stopped before the command completed.
    #[error("Client stopped")]
    Stopped,
}

impl Error {
    pub(crate) fn protocol(line: &str, reason: impl Into<String>) -> Self {
        Self::Protocol {
            line: line.to_owned(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if retrying after a reconnect might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout { .. })
    }

    /// Returns `true` if the failure came from the connection rather than
    /// from the command itself.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout { .. } | Self::Stopped
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(Error::Connection("reset".into()).is_transient());
        assert!(Error::Timeout { timeout_secs: 5 }.is_transient());
        assert!(!Error::Stopped.is_transient());
        assert!(Error::Stopped.is_connection());
        assert!(
            !Error::Rejected {
                code: 401,
                message: "Bad object or device ID".into()
            }
            .is_connection()
        );
    }

    #[test]
    fn address_errors_pass_through() {
        let err: Error = NetworkAddress::parse("//P").unwrap_err().into();
        assert!(err.to_string().contains("reserved"), "{err}");
    }
}
