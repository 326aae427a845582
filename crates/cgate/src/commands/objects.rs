//! Object-model commands: tag lookup and the network tree.

use serde::Serialize;
use tabled::Tabled;

use cgate_core::{Controller, NetworkAddress, Unit};

use crate::cli::{GlobalOpts, TreeArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct TagReport {
    address: NetworkAddress,
    tag: String,
}

/// One line of the application/group listing.
#[derive(Debug, Serialize)]
struct Entry {
    kind: &'static str,
    address: NetworkAddress,
    name: String,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Name")]
    name: String,
}

#[derive(Tabled)]
struct UnitRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Type")]
    unit_type: String,
    #[tabled(rename = "Catalog")]
    catalog: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
}

fn unit_row(unit: &Unit) -> UnitRow {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    UnitRow {
        address: unit.address.to_string(),
        tag: unit.tag.clone(),
        unit_type: or_dash(&unit.unit_type),
        catalog: or_dash(&unit.catalog_number),
        firmware: or_dash(&unit.firmware_version),
    }
}

pub fn tag(controller: &Controller, address: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let address = controller.resolve(address)?;
    let report = TagReport {
        tag: controller.tag(&address),
        address,
    };

    let out = output::render_single(
        &global.output,
        &report,
        |r| format!("{}  {}", r.address, r.tag),
        |r| r.tag.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn tree(controller: &Controller, args: &TreeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = controller.snapshot()?;

    if args.units {
        let out = output::render_list(&global.output, snapshot.units(), unit_row, |u| {
            u.address.to_string()
        })?;
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    let mut entries = Vec::new();
    for app in snapshot.applications() {
        if args
            .application
            .is_some_and(|n| app.address.application_number() != Some(n))
        {
            continue;
        }
        entries.push(Entry {
            kind: "application",
            address: app.address.clone(),
            name: app.name.clone(),
        });
        entries.extend(snapshot.groups_of(&app.address).map(|g| Entry {
            kind: "group",
            address: g.address.clone(),
            name: g.name.clone(),
        }));
    }

    let out = output::render_list(
        &global.output,
        &entries,
        |e| EntryRow {
            kind: e.kind,
            address: e.address.to_string(),
            name: e.name.clone(),
        },
        |e| e.address.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
