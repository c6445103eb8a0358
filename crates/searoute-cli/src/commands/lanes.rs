//! `lanes` subcommands.

use anyhow::Result;
use clap::{Args, Subcommand};

use searoute_lib::{NewLane, PortKey};

use super::{friendly_error, AppContext};
use crate::output::format_lanes_text;

#[derive(Debug, Clone, Subcommand)]
pub enum LanesCommand {
    /// List documented lanes in insertion order.
    List,
    /// Document a lane between two registered ports.
    Add(AddLaneArgs),
}

#[derive(Debug, Clone, Args)]
pub struct AddLaneArgs {
    #[arg(long)]
    pub from_name: String,
    #[arg(long)]
    pub from_continent: String,
    #[arg(long)]
    pub to_name: String,
    #[arg(long)]
    pub to_continent: String,
    /// Sailing distance in kilometres.
    #[arg(long)]
    pub distance: f64,
}

pub fn handle_lanes(ctx: &AppContext, command: &LanesCommand) -> Result<()> {
    let registry = ctx.registry();
    match command {
        LanesCommand::List => {
            let lanes = registry.list_lanes().map_err(friendly_error)?;
            ctx.format.emit(lanes.as_slice(), format_lanes_text)
        }
        LanesCommand::Add(args) => {
            let lane = registry
                .register_lane(NewLane {
                    from: PortKey::new(args.from_name.as_str(), args.from_continent.as_str()),
                    to: PortKey::new(args.to_name.as_str(), args.to_continent.as_str()),
                    distance_km: args.distance,
                })
                .map_err(friendly_error)?;
            ctx.format.emit(&lane, |lane| {
                format!(
                    "Registered lane {} <-> {} ({:.1} km)\n",
                    lane.from, lane.to, lane.distance_km
                )
            })
        }
    }
}
