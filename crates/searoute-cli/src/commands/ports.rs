//! `ports` subcommands: list, add, disable, enable and remove.

use anyhow::Result;
use clap::{Args, Subcommand};

use searoute_lib::{Coordinates, NewPort, PortFilter, PortId};

use super::{friendly_error, AppContext};
use crate::output::{format_port_line, format_ports_text, format_transition_text, TransitionOutput};

#[derive(Debug, Clone, Subcommand)]
pub enum PortsCommand {
    /// List registered ports.
    List {
        /// Only disabled ports.
        #[arg(long, conflicts_with = "enabled")]
        disabled: bool,
        /// Only enabled ports.
        #[arg(long)]
        enabled: bool,
    },
    /// Register a new port.
    Add(AddPortArgs),
    /// Take a port out of service.
    Disable {
        id: PortId,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        actor: Option<String>,
    },
    /// Return a port to service.
    Enable {
        id: PortId,
        #[arg(long)]
        actor: Option<String>,
    },
    /// Delete a port. Lanes naming it are kept but no longer routable.
    Remove {
        id: PortId,
        #[arg(long)]
        actor: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct AddPortArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub continent: String,
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
}

pub fn handle_ports(ctx: &AppContext, command: &PortsCommand) -> Result<()> {
    let registry = ctx.registry();
    match command {
        PortsCommand::List { disabled, enabled } => {
            let filter = match (disabled, enabled) {
                (true, _) => PortFilter::Disabled,
                (_, true) => PortFilter::Enabled,
                _ => PortFilter::All,
            };
            let ports = registry.list(filter).map_err(friendly_error)?;
            ctx.format.emit(ports.as_slice(), format_ports_text)
        }
        PortsCommand::Add(args) => {
            let port = registry
                .register_port(NewPort {
                    name: args.name.clone(),
                    continent: args.continent.clone(),
                    coordinates: Coordinates::new(args.lat, args.lon),
                })
                .map_err(friendly_error)?;
            ctx.format
                .emit(&port, |port| format!("Registered {}\n", format_port_line(port)))
        }
        PortsCommand::Disable { id, reason, actor } => {
            let port = registry.get(*id).map_err(friendly_error)?;
            let transition = registry
                .disable(*id, reason.as_deref(), actor.as_deref())
                .map_err(friendly_error)?;
            let output = TransitionOutput {
                port: port.key().to_string(),
                transition,
            };
            ctx.format.emit(&output, format_transition_text)
        }
        PortsCommand::Enable { id, actor } => {
            let port = registry.get(*id).map_err(friendly_error)?;
            let transition = registry
                .enable(*id, actor.as_deref())
                .map_err(friendly_error)?;
            let output = TransitionOutput {
                port: port.key().to_string(),
                transition,
            };
            ctx.format.emit(&output, format_transition_text)
        }
        PortsCommand::Remove { id, actor } => {
            let port = registry
                .remove(*id, actor.as_deref())
                .map_err(friendly_error)?;
            ctx.format
                .emit(&port, |port| format!("Removed {}\n", format_port_line(port)))
        }
    }
}
