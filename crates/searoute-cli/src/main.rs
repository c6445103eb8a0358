use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use searoute_cli::commands::history::{handle_history, HistoryCommand};
use searoute_cli::commands::import::{handle_import, ImportArgs};
use searoute_cli::commands::lanes::{handle_lanes, LanesCommand};
use searoute_cli::commands::popular::{handle_popular, PopularArgs};
use searoute_cli::commands::ports::{handle_ports, PortsCommand};
use searoute_cli::commands::route::{
    handle_distance, handle_recalculate, handle_route, DistanceArgs, RecalculateArgs, RouteArgs,
};
use searoute_cli::commands::AppContext;
use searoute_cli::logging::{init_logging, LoggingConfig};
use searoute_cli::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about = "Maritime route graph utilities")]
struct Cli {
    /// Override the route database path (defaults to SEAROUTE_DATABASE, then
    /// the platform data directory).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON file with routing settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for command results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the shortest route between two port ids.
    Route(RouteArgs),
    /// Re-verify a stored route against current port availability.
    Recalculate(RecalculateArgs),
    /// Total distance along an explicit path of port ids.
    Distance(DistanceArgs),
    /// Port administration.
    #[command(subcommand)]
    Ports(PortsCommand),
    /// Lane administration.
    #[command(subcommand)]
    Lanes(LanesCommand),
    /// Seed ports and lanes from CSV files.
    Import(ImportArgs),
    /// Query and archive route history.
    #[command(subcommand)]
    History(HistoryCommand),
    /// Most searched origin/destination pairs.
    Popular(PopularArgs),
}

fn main() -> Result<()> {
    init_logging(&LoggingConfig::from_env());
    let cli = Cli::parse();
    let ctx = AppContext::open(cli.db.as_deref(), cli.config.as_deref(), cli.format)?;

    match &cli.command {
        Command::Route(args) => handle_route(&ctx, args),
        Command::Recalculate(args) => handle_recalculate(&ctx, args),
        Command::Distance(args) => handle_distance(&ctx, args),
        Command::Ports(command) => handle_ports(&ctx, command),
        Command::Lanes(command) => handle_lanes(&ctx, command),
        Command::Import(args) => handle_import(&ctx, args),
        Command::History(command) => handle_history(&ctx, command),
        Command::Popular(args) => handle_popular(&ctx, args),
    }
}
