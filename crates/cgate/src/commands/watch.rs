//! `watch`: stream status-change events until Ctrl-C.

use owo_colors::OwoColorize;

use cgate_core::{Controller, StatusEvent};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    controller: &Controller,
    address: Option<&str>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let filter = address.map(|a| controller.resolve(a)).transpose()?;
    let mut events = match filter {
        Some(ref address) => controller.subscribe(address),
        None => controller.events(),
    };
    let mut state = controller.client().watch_state();
    let color = output::should_color(&global.color);

    if !global.quiet {
        let scope = filter.as_ref().unwrap_or(controller.network());
        eprintln!("Watching {scope} (Ctrl-C to stop)");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Ok(()) = state.changed() => {
                let current = *state.borrow_and_update();
                if !global.quiet {
                    eprintln!("connection {current}");
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                let line = render_event(controller, &event, &global.output, color)?;
                output::print_output(&line, false);
            }
        }
    }
    Ok(())
}

fn render_event(
    controller: &Controller,
    event: &StatusEvent,
    format: &OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => return Ok(serde_json::to_string_pretty(event)?),
        OutputFormat::JsonCompact => return Ok(serde_json::to_string(event)?),
        OutputFormat::Table | OutputFormat::Plain => {}
    }

    let time = event.received_at.with_timezone(&chrono::Local).format("%H:%M:%S");
    let tag = controller.tag(&event.address);
    let detail = match (event.brightness(), event.zone_state()) {
        (Some(percent), _) => format!("{percent}%"),
        (None, Some(zone)) => zone.to_string(),
        (None, None) => event
            .values
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(" "),
    };

    let action = if color {
        event.action.green().to_string()
    } else {
        event.action.clone()
    };
    Ok(format!(
        "{time} {} {action} {} ({tag}) {detail}",
        event.application, event.address
    )
    .trim_end()
    .to_owned())
}
