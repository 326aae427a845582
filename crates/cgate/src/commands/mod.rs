//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod control;
pub mod objects;
pub mod query;
pub mod watch;

use cgate_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a gateway-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::On { group } => control::switch(controller, &group, true, global).await,
        Command::Off { group } => control::switch(controller, &group, false, global).await,
        Command::Ramp {
            group,
            percent,
            time,
        } => control::ramp(controller, &group, percent, time, global).await,
        Command::Terminate { group } => control::terminate(controller, &group, global).await,
        Command::Trigger { group, action } => {
            control::trigger(controller, &group, action, global).await
        }
        Command::Enable { group, value } => control::enable(controller, &group, value, global).await,
        Command::Level { group } => query::level(controller, &group, global).await,
        Command::Zone { zone } => query::zone(controller, &zone, global).await,
        Command::Get { address, parameter } => {
            query::get(controller, &address, &parameter, global).await
        }
        Command::Tag { address } => objects::tag(controller, &address, global),
        Command::Tree(args) => objects::tree(controller, &args, global),
        Command::Watch { address } => watch::handle(controller, address.as_deref(), global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
