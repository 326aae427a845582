//! Clap derive structures for the `cgate` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// cgate -- drive a C-Bus network through a C-Gate server
#[derive(Debug, Parser)]
#[command(
    name = "cgate",
    version,
    about = "Switch, query, and watch C-Bus networks through a C-Gate server",
    long_about = "Talks to the C-Gate command interface (TCP port 20023 by default).\n\n\
        Addresses may be fully qualified (//HOME/254/56/3) or relative to the\n\
        configured project and network: 56/3 for a group, p/12 for a unit.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "CGATE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Gateway host (overrides profile)
    #[arg(long, short = 'H', env = "CGATE_HOST", global = true)]
    pub host: Option<String>,

    /// Gateway command port (overrides profile)
    #[arg(long, env = "CGATE_PORT", global = true)]
    pub port: Option<u16>,

    /// C-Gate project name (overrides profile)
    #[arg(long, env = "CGATE_PROJECT", global = true)]
    pub project: Option<String>,

    /// C-Bus network number (overrides profile)
    #[arg(long, short = 'n', env = "CGATE_NETWORK", global = true)]
    pub network: Option<u8>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CGATE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Response timeout in seconds (0 waits forever)
    #[arg(long, env = "CGATE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON (one event per line for `watch`)
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Switch a lighting group on
    On {
        /// Group address (56/3 or //PROJECT/NET/56/3)
        group: String,
    },

    /// Switch a lighting group off
    Off {
        /// Group address
        group: String,
    },

    /// Ramp a lighting group to a brightness percentage
    Ramp {
        /// Group address
        group: String,

        /// Target brightness (0-100)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,

        /// Ramp duration, e.g. 4s or 2m
        #[arg(long, short = 't', value_parser = humantime::parse_duration)]
        time: Option<Duration>,
    },

    /// Stop a ramp in progress, holding the current level
    Terminate {
        /// Group address
        group: String,
    },

    /// Read the current level of a group
    Level {
        /// Group address
        group: String,
    },

    /// Read the state of a security zone
    Zone {
        /// Zone group address
        zone: String,
    },

    /// Fire a trigger-control action
    Trigger {
        /// Trigger group address
        group: String,

        /// Action selector (0-255)
        action: u8,
    },

    /// Set an enable-control variable
    Enable {
        /// Enable group address
        group: String,

        /// Value (0-255)
        value: u8,
    },

    /// Read a raw gateway parameter of any object
    Get {
        /// Object address
        address: String,

        /// Parameter name, e.g. level or TagName
        parameter: String,
    },

    /// Resolve an address to its tag name
    Tag {
        /// Address to resolve
        address: String,
    },

    /// List the applications, groups, and units of the network
    #[command(alias = "ls")]
    Tree(TreeArgs),

    /// Stream status-change events until interrupted
    Watch {
        /// Only show events for this address
        address: Option<String>,
    },

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Command {
    /// Whether the object snapshot must be loaded before running.
    pub fn needs_objects(&self) -> bool {
        matches!(
            self,
            Self::Tag { .. } | Self::Tree(_) | Self::Watch { .. }
        )
    }
}

// ── Tree ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Only list groups of this application number
    #[arg(long, short = 'a')]
    pub application: Option<u8>,

    /// List units instead of applications and groups
    #[arg(long, short = 'u')]
    pub units: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile and make it the default
    Init {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Gateway host
        #[arg(long)]
        host: String,

        /// C-Gate project name
        #[arg(long)]
        project: String,

        /// C-Bus network number
        #[arg(long, default_value = "254")]
        network: u8,

        /// Gateway command port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
