//! Config subcommand handlers.

use cgate_config::{self as config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init {
            name,
            host,
            project,
            network,
            port,
        } => {
            let mut cfg = config::load_config()?;

            let mut profile = Profile::new(host, project, network);
            profile.port = port;
            // Validate before writing anything.
            config::profile_to_gateway_config(&profile, &cfg.defaults)?;

            cfg.profiles.insert(name.clone(), profile);
            cfg.default_profile = Some(name.clone());
            let path = config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!("✓ Configuration written to {}", path.display());
                eprintln!("  Active profile: {name}");
                eprintln!("\n  Test it: cgate level 56/1");
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| {
                    let default = c.default_profile.as_deref().unwrap_or("default");
                    let mut lines = vec![format!("default profile: {default}")];
                    for name in c.profile_names() {
                        let p = &c.profiles[&name];
                        let port = p.port.map(|port| format!(":{port}")).unwrap_or_default();
                        lines.push(format!(
                            "  {name}: {}{port} //{}/{}",
                            p.host, p.project, p.network
                        ));
                    }
                    lines.join("\n")
                },
                |c| c.profile_names().join("\n"),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}
