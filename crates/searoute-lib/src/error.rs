use std::fmt;

use thiserror::Error;

use crate::history::HistoryId;
use crate::lane::LaneId;
use crate::port::PortId;

/// Convenient result alias for the searoute library.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a structurally valid route request produced no path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFailure {
    /// The origin or destination port is currently disabled.
    EndpointDisabled,
    /// The origin or destination port was part of the caller's avoid-set.
    EndpointAvoided,
    /// The graph has no path between the endpoints after exclusions.
    Disconnected,
}

impl RouteFailure {
    /// Stable snake_case label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            RouteFailure::EndpointDisabled => "endpoint_disabled",
            RouteFailure::EndpointAvoided => "endpoint_avoided",
            RouteFailure::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for RouteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RouteFailure::EndpointDisabled => "an endpoint port is disabled",
            RouteFailure::EndpointAvoided => "an endpoint port is excluded",
            RouteFailure::Disconnected => "no connecting lanes remain",
        };
        f.write_str(value)
    }
}

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a port id or (name, continent) pair does not resolve.
    #[error("unknown port: {query}{}", format_suggestions(.suggestions))]
    PortNotFound {
        query: String,
        suggestions: Vec<String>,
    },

    /// Raised when a stored lane (route) id does not exist.
    #[error("route {id} not found")]
    LaneNotFound { id: LaneId },

    /// Raised when no route could be found between two ports.
    #[error("no route found between {start} and {goal}: {reason}")]
    RouteNotFound {
        start: String,
        goal: String,
        reason: RouteFailure,
    },

    /// Raised by the calculator when an endpoint was excluded from the graph.
    #[error("port {port} is excluded from the route graph")]
    EndpointUnavailable { port: PortId },

    /// Raised by the calculator when the graph does not connect the endpoints.
    #[error("no viable route between port {start} and port {goal}")]
    NoViableRoute { start: PortId, goal: PortId },

    /// Raised when recalculating a stored route cannot avoid its disabled ports.
    #[error("{message} (avoided ports: {})", format_ids(.avoided_port_ids))]
    NoViableRouteAvoidingDisabledPorts {
        route_id: LaneId,
        avoided_port_ids: Vec<PortId>,
        message: String,
    },

    /// Raised when a route history entry does not exist.
    #[error("route history entry {id} not found")]
    HistoryNotFound { id: HistoryId },

    /// Raised when a port fails validation on registration.
    #[error("invalid port: {message}")]
    InvalidPort { message: String },

    /// Raised when a lane fails validation on registration.
    #[error("invalid lane: {message}")]
    InvalidLane { message: String },

    /// Raised when registering a port whose business identity already exists.
    #[error("port {name} ({continent}) is already registered")]
    DuplicatePort { name: String, continent: String },

    /// Raised when an import file is malformed.
    #[error("import failed: {message}")]
    ImportValidation { message: String },

    /// No suitable project directories could be resolved for this platform.
    #[error("failed to resolve project directories for the route database")]
    ProjectDirsUnavailable,

    /// Raised when the stored data cannot be decoded.
    #[error("corrupt record in {table}: {message}")]
    CorruptRecord { table: &'static str, message: String },

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON encoding errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for CSV parsing errors.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Build a [`Error::PortNotFound`] for a bare port id.
    pub fn unknown_port_id(id: PortId) -> Self {
        Error::PortNotFound {
            query: id.to_string(),
            suggestions: Vec::new(),
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else if suggestions.len() == 1 {
        format!(". Did you mean '{}'?", suggestions[0])
    } else {
        format!(
            ". Did you mean one of: {}?",
            suggestions
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

fn format_ids(ids: &[PortId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
