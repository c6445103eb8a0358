//! Subcommand handlers.
//!
//! `main.rs` parses arguments and dispatches here; each module owns one
//! command family.

pub mod history;
pub mod import;
pub mod lanes;
pub mod popular;
pub mod ports;
pub mod route;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use searoute_lib::{
    resolve_database_path, Error as RouteError, PopularityTracker, PortRegistry,
    RouteHistoryService, RouteService, RoutingConfig, SqliteStore, SystemClock, TracingAuditSink,
};

use crate::output::{join_ids, OutputFormat};

/// Everything a command needs: the opened database, the routing config and
/// the requested output format.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub config: RoutingConfig,
    pub format: OutputFormat,
}

impl AppContext {
    pub fn open(db: Option<&Path>, config: Option<&Path>, format: OutputFormat) -> Result<Self> {
        let config = RoutingConfig::load(config).context("failed to load routing config")?;
        let path =
            resolve_database_path(db).context("failed to resolve the route database location")?;
        let store = SqliteStore::open(&path)
            .with_context(|| format!("failed to open route database {}", path.display()))?;
        debug!(database = %path.display(), "opened route database");

        Ok(Self {
            store: Arc::new(store),
            config,
            format,
        })
    }

    pub fn registry(&self) -> PortRegistry {
        PortRegistry::new(
            self.store.clone(),
            Arc::new(SystemClock),
            Arc::new(TracingAuditSink),
        )
    }

    pub fn route_service(&self) -> RouteService {
        RouteService::with_defaults(self.store.clone(), &self.config)
    }

    pub fn history(&self) -> RouteHistoryService {
        RouteHistoryService::new(
            self.store.clone(),
            Arc::new(SystemClock),
            Arc::new(TracingAuditSink),
        )
        .with_max_page_size(self.config.max_history_page_size)
    }

    pub fn popularity(&self) -> PopularityTracker {
        PopularityTracker::new(self.store.clone(), Arc::new(SystemClock))
    }
}

/// Turn library errors into the one-line messages shown on stderr.
pub fn friendly_error(err: RouteError) -> anyhow::Error {
    match err {
        RouteError::PortNotFound { query, suggestions } => {
            anyhow::anyhow!(format_unknown_port_message(&query, &suggestions))
        }
        RouteError::LaneNotFound { id } => anyhow::anyhow!(
            "No stored route with id {}. Run 'searoute lanes list' for route ids.",
            id
        ),
        RouteError::RouteNotFound { start, goal, reason } => anyhow::anyhow!(
            "No route found between {} and {}: {}. Enable ports or drop --avoid entries.",
            start,
            goal,
            reason
        ),
        RouteError::NoViableRouteAvoidingDisabledPorts {
            avoided_port_ids,
            message,
            ..
        } => anyhow::anyhow!(
            "{}. Blocking ports: {}.",
            message,
            join_ids(&avoided_port_ids)
        ),
        other => anyhow::Error::new(other),
    }
}

fn format_unknown_port_message(query: &str, suggestions: &[String]) -> String {
    let mut message = format!("Unknown port '{}'.", query);
    match suggestions {
        [] => {}
        [only] => message.push_str(&format!(" Did you mean '{only}'?")),
        many => {
            let joined = many
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ");
            message.push_str(&format!(" Did you mean one of: {}?", joined));
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_port_message_lists_suggestions() {
        assert_eq!(
            format_unknown_port_message("Calao (Asia)", &["Callao".to_string()]),
            "Unknown port 'Calao (Asia)'. Did you mean 'Callao'?"
        );
        assert_eq!(format_unknown_port_message("42", &[]), "Unknown port '42'.");
    }

    #[test]
    fn unknown_stored_route_points_at_lane_list() {
        let err = friendly_error(RouteError::LaneNotFound { id: 999 });
        assert_eq!(
            err.to_string(),
            "No stored route with id 999. Run 'searoute lanes list' for route ids."
        );
    }

    #[test]
    fn blocked_recalculation_names_ports() {
        let err = friendly_error(RouteError::NoViableRouteAvoidingDisabledPorts {
            route_id: 3,
            avoided_port_ids: vec![2, 7],
            message: "no viable route for 3 when avoiding 2 disabled ports".to_string(),
        });
        assert!(err.to_string().ends_with("Blocking ports: 2, 7."));
    }
}
