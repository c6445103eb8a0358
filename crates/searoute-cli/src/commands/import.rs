//! `import` command: seed ports and lanes from CSV files.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use searoute_lib::{import_lanes, import_ports, ImportSummary};

use super::{friendly_error, AppContext};
use crate::output::format_import_text;

#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    /// CSV with name, continent, latitude and longitude columns.
    #[arg(long)]
    pub ports: Option<PathBuf>,
    /// CSV with from_name, from_continent, to_name, to_continent and distance_km columns.
    #[arg(long)]
    pub lanes: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<ImportSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lanes: Option<ImportSummary>,
}

fn format_import_output(output: &ImportOutput) -> String {
    let mut text = String::new();
    if let Some(ports) = &output.ports {
        text.push_str(&format_import_text("Ports", ports));
    }
    if let Some(lanes) = &output.lanes {
        text.push_str(&format_import_text("Lanes", lanes));
    }
    text
}

/// Ports are imported before lanes so a lane file may refer to ports from the
/// port file of the same run.
pub fn handle_import(ctx: &AppContext, args: &ImportArgs) -> Result<()> {
    if args.ports.is_none() && args.lanes.is_none() {
        bail!("nothing to import: pass --ports and/or --lanes");
    }
    let registry = ctx.registry();
    let mut output = ImportOutput::default();

    if let Some(path) = &args.ports {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        output.ports = Some(import_ports(&registry, file).map_err(friendly_error)?);
    }
    if let Some(path) = &args.lanes {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        output.lanes = Some(import_lanes(&registry, file).map_err(friendly_error)?);
    }

    ctx.format.emit(&output, format_import_output)
}
