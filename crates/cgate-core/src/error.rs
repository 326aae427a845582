// ── Core error types ──
//
// User-facing errors from cgate-core. Consumers never see raw response
// lines or status-code plumbing directly. The `From<cgate_api::Error>` impl
// translates client-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach gateway: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Gateway did not respond within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Gateway client stopped")]
    Stopped,

    // ── Addressing errors ────────────────────────────────────────────
    #[error("Invalid address: {message}")]
    InvalidAddress { message: String },

    #[error("{address} is not a valid target: expected {expected} address")]
    InvalidTarget { address: String, expected: String },

    #[error("Object database needs a project/network address, got {address}")]
    InvalidDatabaseAddress { address: String },

    // ── Gateway errors ───────────────────────────────────────────────
    #[error("Gateway rejected command ({code}): {message}")]
    Rejected { code: u16, message: String },

    #[error("Unexpected gateway response: {message}")]
    Protocol { message: String },

    // ── Object model errors ──────────────────────────────────────────
    #[error("Object snapshot could not be parsed: {message}")]
    Snapshot { message: String },

    #[error("Object database for {network} has not been loaded")]
    NotLoaded { network: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if the gateway could not be reached or went away.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::Stopped
        )
    }
}

// ── Conversion from client-layer errors ──────────────────────────────

impl From<cgate_api::Error> for CoreError {
    fn from(err: cgate_api::Error) -> Self {
        match err {
            cgate_api::Error::Address(e) => CoreError::InvalidAddress {
                message: e.to_string(),
            },
            cgate_api::Error::InvalidTarget { address, expected } => CoreError::InvalidTarget {
                address: address.to_string(),
                expected: expected.to_owned(),
            },
            cgate_api::Error::Protocol { line, reason } => CoreError::Protocol {
                message: if line.is_empty() {
                    reason
                } else {
                    format!("{reason} (line: {line:?})")
                },
            },
            cgate_api::Error::Rejected { code, message } => CoreError::Rejected { code, message },
            cgate_api::Error::Connection(reason) => CoreError::ConnectionFailed { reason },
            cgate_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            cgate_api::Error::Stopped => CoreError::Stopped,
        }
    }
}

impl From<cgate_api::AddressError> for CoreError {
    fn from(err: cgate_api::AddressError) -> Self {
        CoreError::InvalidAddress {
            message: err.to_string(),
        }
    }
}
