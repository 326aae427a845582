//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use cgate_config::ConfigError;
use cgate_core::{ClientError, CoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the C-Gate server")]
    #[diagnostic(
        code(cgate::connection_failed),
        help(
            "{reason}\n\
             Check that C-Gate is running and that this host is allowed in its access.txt.\n\
             Try: cgate -vv --host <host> level 56/1"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Gateway did not respond within {seconds}s")]
    #[diagnostic(
        code(cgate::timeout),
        help("Increase the timeout with --timeout or check the gateway's load.")
    )]
    Timeout { seconds: u64 },

    #[error("Interrupted before the gateway answered")]
    #[diagnostic(code(cgate::stopped))]
    Stopped,

    // ── Gateway ──────────────────────────────────────────────────────
    #[error("Gateway rejected the command ({code}): {message}")]
    #[diagnostic(
        code(cgate::rejected),
        help("Check that the address exists in the project and that the network is online.")
    )]
    Rejected { code: u16, message: String },

    #[error("Unexpected gateway response: {message}")]
    #[diagnostic(code(cgate::protocol))]
    Protocol { message: String },

    // ── Addressing ───────────────────────────────────────────────────
    #[error("Invalid address: {message}")]
    #[diagnostic(
        code(cgate::invalid_address),
        help(
            "Use //PROJECT/NETWORK/APPLICATION/GROUP, //PROJECT/NETWORK/p/UNIT,\n\
             or the short forms APPLICATION, APPLICATION/GROUP and p/UNIT."
        )
    )]
    InvalidAddress { message: String },

    // ── Object database ──────────────────────────────────────────────
    #[error("Object database for {network} is not loaded")]
    #[diagnostic(
        code(cgate::objects_not_loaded),
        help(
            "The gateway did not return its object database.\n\
             Check that the project is started in C-Gate, then retry with: cgate -vv tree"
        )
    )]
    ObjectsNotLoaded { network: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(cgate::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(cgate::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: cgate config init --name {name} --host <host> --project <project>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No gateway configured")]
    #[diagnostic(
        code(cgate::no_config),
        help(
            "Create a profile with: cgate config init --host <host> --project <project>\n\
             or pass --host and --project.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(cgate::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(cgate::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Stopped => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::ObjectsNotLoaded { .. } => exit_code::NOT_FOUND,
            Self::InvalidAddress { .. }
            | Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Stopped => CliError::Stopped,

            CoreError::InvalidAddress { message } => CliError::InvalidAddress { message },

            CoreError::InvalidTarget { address, expected } => CliError::InvalidAddress {
                message: format!("{address} is not a {expected} address"),
            },

            CoreError::InvalidDatabaseAddress { address } => CliError::Validation {
                field: "network".into(),
                reason: format!("{address} does not name a network"),
            },

            CoreError::Rejected { code, message } => CliError::Rejected { code, message },

            CoreError::Protocol { message } | CoreError::Snapshot { message } => {
                CliError::Protocol { message }
            }

            CoreError::NotLoaded { network } => CliError::ObjectsNotLoaded { network },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        CoreError::from(err).into()
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name, available } => CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other),
        }
    }
}
