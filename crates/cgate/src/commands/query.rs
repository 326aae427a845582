//! Read commands: levels, zone states, raw parameters.

use serde::Serialize;

use cgate_core::{Controller, NetworkAddress, ZoneState, raw_to_percent};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct LevelReport {
    address: NetworkAddress,
    raw: u8,
    percent: u8,
}

#[derive(Debug, Serialize)]
struct ZoneReport {
    address: NetworkAddress,
    state: ZoneState,
    closed: bool,
}

#[derive(Debug, Serialize)]
struct ParameterReport {
    address: NetworkAddress,
    parameter: String,
    value: String,
}

pub async fn level(
    controller: &Controller,
    group: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let address = controller.resolve(group)?;
    let raw = controller.client().get_level(&address).await?;
    let report = LevelReport {
        address,
        raw,
        percent: raw_to_percent(raw),
    };

    let out = output::render_single(
        &global.output,
        &report,
        |r| format!("{}  level {} ({}%)", r.address, r.raw, r.percent),
        |r| r.raw.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn zone(
    controller: &Controller,
    zone: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let address = controller.resolve(zone)?;
    let state = controller.client().get_zone_state(&address).await?;
    let report = ZoneReport {
        address,
        state,
        closed: state.is_closed(),
    };

    let out = output::render_single(
        &global.output,
        &report,
        |r| format!("{}  {}", r.address, r.state),
        |r| r.state.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn get(
    controller: &Controller,
    address: &str,
    parameter: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let address = controller.resolve(address)?;
    let value = controller.client().get(&address, parameter).await?;
    let report = ParameterReport {
        address,
        parameter: parameter.to_owned(),
        value,
    };

    let out = output::render_single(
        &global.output,
        &report,
        |r| format!("{}  {}={}", r.address, r.parameter, r.value),
        |r| r.value.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
