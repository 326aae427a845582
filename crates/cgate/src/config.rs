//! CLI-side configuration: `GlobalOpts`-aware wrappers over `cgate_config`.
//!
//! Core never sees these types -- it receives a pre-built `GatewayConfig`.

use cgate_config::{Config, ConfigError, Profile};
use cgate_core::GatewayConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Network used when neither a profile nor `--network` names one.
const DEFAULT_NETWORK: u8 = 254;

/// Build a `GatewayConfig` from the config file, profile, and CLI overrides.
///
/// Without a config file, `--host` and `--project` alone are enough.
pub fn resolve_gateway_config(global: &GlobalOpts) -> Result<GatewayConfig, CliError> {
    let cfg = cgate_config::load_config()?;
    resolve_with(&cfg, global)
}

fn resolve_with(cfg: &Config, global: &GlobalOpts) -> Result<GatewayConfig, CliError> {
    let mut profile = match cfg.profile(global.profile.as_deref()) {
        Ok((_, profile)) => profile.clone(),
        // An implicit default profile may be absent when flags say enough.
        Err(ConfigError::ProfileNotFound { .. }) if global.profile.is_none() => {
            flag_profile(global)?
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(port) = global.port {
        profile.port = Some(port);
    }
    if let Some(ref project) = global.project {
        profile.project.clone_from(project);
    }
    if let Some(network) = global.network {
        profile.network = network;
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    Ok(cgate_config::profile_to_gateway_config(
        &profile,
        &cfg.defaults,
    )?)
}

fn flag_profile(global: &GlobalOpts) -> Result<Profile, CliError> {
    let host = global.host.clone().ok_or_else(|| CliError::NoConfig {
        path: cgate_config::config_path().display().to_string(),
    })?;
    let project = global.project.clone().ok_or_else(|| CliError::Validation {
        field: "project".into(),
        reason: "required when no profile is configured (--project or CGATE_PROJECT)".into(),
    })?;
    Ok(Profile::new(
        host,
        project,
        global.network.unwrap_or(DEFAULT_NETWORK),
    ))
}
