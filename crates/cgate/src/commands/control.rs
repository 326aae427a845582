//! Write commands: lighting, trigger, and enable control.

use std::time::Duration;

use cgate_core::Controller;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn switch(
    controller: &Controller,
    group: &str,
    on: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let address = controller.resolve(group)?;
    if on {
        controller.client().turn_on(&address).await?;
    } else {
        controller.client().turn_off(&address).await?;
    }
    if !global.quiet {
        eprintln!("{address} {}", if on { "on" } else { "off" });
    }
    Ok(())
}

pub async fn ramp(
    controller: &Controller,
    group: &str,
    percent: u8,
    time: Option<Duration>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let address = controller.resolve(group)?;
    controller
        .client()
        .set_brightness(&address, percent, time)
        .await?;
    if !global.quiet {
        match time {
            Some(t) => eprintln!(
                "{address} ramping to {percent}% over {}",
                humantime::format_duration(t)
            ),
            None => eprintln!("{address} set to {percent}%"),
        }
    }
    Ok(())
}

pub async fn terminate(
    controller: &Controller,
    group: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let address = controller.resolve(group)?;
    controller
        .client()
        .terminate_ramp(&address)
        .await?;
    if !global.quiet {
        eprintln!("{address} ramp stopped");
    }
    Ok(())
}

pub async fn trigger(
    controller: &Controller,
    group: &str,
    action: u8,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let address = controller.resolve(group)?;
    controller
        .client()
        .trigger_action(&address, action)
        .await?;
    if !global.quiet {
        eprintln!("{address} action {action}");
    }
    Ok(())
}

pub async fn enable(
    controller: &Controller,
    group: &str,
    value: u8,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let address = controller.resolve(group)?;
    controller
        .client()
        .enable_set(&address, value)
        .await?;
    if !global.quiet {
        eprintln!("{address} set to {value}");
    }
    Ok(())
}
