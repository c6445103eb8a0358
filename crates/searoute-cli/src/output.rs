//! Output formatting for command results.
//!
//! Every command builds a serialisable result. `--format json` prints it as
//! pretty JSON; `--format text` uses the `format_*` helpers below, which return
//! strings so they can be tested without capturing stdout.

use std::fmt::Write as _;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use searoute_lib::port::AvailabilityTransition;
use searoute_lib::{
    ImportSummary, Lane, Page, Port, PortId, RouteCalculation, RouteHistory, RoutePopularity,
    RouteRecalculation,
};

/// How command results are printed on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    /// Print `value` as JSON, or as the text produced by `text`.
    pub fn emit<T, F>(self, value: &T, text: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> String,
    {
        match self {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => print!("{}", text(value)),
        }
        Ok(())
    }
}

pub fn format_route_text(route: &RouteCalculation) -> String {
    let mut out = String::new();
    let start = route.path.first().map(String::as_str).unwrap_or("<unknown>");
    let goal = route.path.last().map(String::as_str).unwrap_or("<unknown>");
    let _ = writeln!(
        out,
        "Route from {} to {} ({} hops):",
        start,
        goal,
        route.hop_count()
    );
    for (index, (name, id)) in route.path.iter().zip(&route.port_ids).enumerate() {
        let marker = if index == 0 { '+' } else { '-' };
        let _ = writeln!(out, "{marker} {name} [{id}]");
    }
    let _ = writeln!(out, "\nTotal distance: {:.1} km", route.total_distance_km);
    for warning in &route.warnings {
        let _ = writeln!(out, "Warning: {warning}");
    }
    out
}

pub fn format_recalculation_text(result: &RouteRecalculation) -> String {
    let mut out = String::new();
    if result.recalculated {
        let avoided = join_ids(&result.avoided_port_ids);
        let _ = writeln!(
            out,
            "Route {} recalculated around disabled ports {}:",
            result.route_id, avoided
        );
    } else {
        let _ = writeln!(out, "Route {} unchanged:", result.route_id);
    }
    let _ = writeln!(out, "{}", result.path.join(" -> "));
    out
}

/// Result of the `distance` command.
#[derive(Debug, Clone, Serialize)]
pub struct DistanceOutput {
    pub port_ids: Vec<PortId>,
    pub total_distance_km: f64,
}

pub fn format_distance_text(distance: &DistanceOutput) -> String {
    format!(
        "Total distance over {} ports: {:.1} km\n",
        distance.port_ids.len(),
        distance.total_distance_km
    )
}

pub fn format_port_line(port: &Port) -> String {
    let id = port
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{id:>5}  {} ({})  {:.4}, {:.4}",
        port.name, port.continent, port.coordinates.latitude, port.coordinates.longitude
    );
    if let Some(state) = &port.disabled {
        line.push_str("  [disabled");
        if let Some(reason) = &state.reason {
            let _ = write!(line, ": {reason}");
        }
        line.push(']');
    }
    line
}

pub fn format_ports_text(ports: &[Port]) -> String {
    if ports.is_empty() {
        return "No ports.\n".to_string();
    }
    let mut out = String::new();
    for port in ports {
        let _ = writeln!(out, "{}", format_port_line(port));
    }
    out
}

/// An availability change together with the port it applies to.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutput {
    pub port: String,
    #[serde(flatten)]
    pub transition: AvailabilityTransition,
}

pub fn format_transition_text(output: &TransitionOutput) -> String {
    let transition = &output.transition;
    let state = if transition.now_disabled {
        "disabled"
    } else {
        "enabled"
    };
    let previous = if transition.was_disabled {
        "disabled"
    } else {
        "enabled"
    };
    format!("Port {} is now {state} (was {previous}).\n", output.port)
}

pub fn format_lanes_text(lanes: &[Lane]) -> String {
    if lanes.is_empty() {
        return "No lanes.\n".to_string();
    }
    let mut out = String::new();
    for lane in lanes {
        let id = lane
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{id:>5}  {} <-> {}  {:.1} km",
            lane.from, lane.to, lane.distance_km
        );
    }
    out
}

pub fn format_import_text(label: &str, summary: &ImportSummary) -> String {
    format!(
        "{label}: {} inserted, {} skipped\n",
        summary.inserted, summary.skipped
    )
}

fn format_history_line(entry: &RouteHistory) -> String {
    let id = entry
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let origin = entry.origin_port_name.as_deref().unwrap_or("?");
    let destination = entry.destination_port_name.as_deref().unwrap_or("?");
    let distance = entry
        .total_distance_km
        .map(|km| format!("{km:.1} km"))
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{id:>5}  {}  {} -> {}  {}  {}",
        entry.computed_at.format("%Y-%m-%d %H:%M:%S"),
        origin,
        destination,
        entry.status,
        distance
    );
    if entry.archived {
        line.push_str("  [archived]");
    }
    line
}

pub fn format_history_page_text(page: &Page<RouteHistory>) -> String {
    let mut out = String::new();
    for entry in &page.items {
        let _ = writeln!(out, "{}", format_history_line(entry));
    }
    let _ = writeln!(
        out,
        "Page {} of {} ({} entries)",
        page.page + 1,
        page.total_pages().max(1),
        page.total
    );
    out
}

pub fn format_history_entry_text(entry: &RouteHistory) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", format_history_line(entry));
    if let Some(user) = &entry.user_id {
        let _ = writeln!(out, "  user: {user}");
    }
    if let Some(tenant) = &entry.tenant_id {
        let _ = writeln!(out, "  tenant: {tenant}");
    }
    if let Some(route) = &entry.route_id {
        let _ = writeln!(out, "  route: {route}");
    }
    let _ = writeln!(out, "  source: {}", entry.source);
    if !entry.waypoint_port_ids.is_empty() {
        let _ = writeln!(out, "  waypoints: {}", join_ids(&entry.waypoint_port_ids));
    }
    if !entry.avoided_port_ids.is_empty() {
        let _ = writeln!(out, "  avoided: {}", join_ids(&entry.avoided_port_ids));
    }
    if let Some(notes) = &entry.notes {
        let _ = writeln!(out, "  notes: {notes}");
    }
    let _ = writeln!(out, "  fingerprint: {}", entry.dedup_hash);
    out
}

pub fn format_popular_text(routes: &[RoutePopularity]) -> String {
    if routes.is_empty() {
        return "No searches recorded.\n".to_string();
    }
    let mut out = String::new();
    for (rank, route) in routes.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {} -> {}  {} searches (last {})",
            rank + 1,
            route.origin_port_name,
            route.destination_port_name,
            route.searches_count,
            route.last_searched_at.format("%Y-%m-%d %H:%M")
        );
    }
    out
}

pub fn join_ids(ids: &[PortId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
