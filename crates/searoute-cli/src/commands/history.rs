//! `history` subcommands.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use searoute_lib::{
    Error as RouteError, HistoryId, HistoryQuery, PageRequest, RouteHistorySource,
    RouteHistoryStatus,
};

use super::{friendly_error, AppContext};
use crate::output::{format_history_entry_text, format_history_page_text};

#[derive(Debug, Clone, Subcommand)]
pub enum HistoryCommand {
    /// List history entries, newest first.
    List(HistoryListArgs),
    /// Show one entry.
    Show { id: HistoryId },
    /// Mark an entry archived.
    Archive {
        id: HistoryId,
        /// Replace the entry's notes.
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        actor: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct HistoryListArgs {
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub tenant: Option<String>,
    #[arg(long)]
    pub route: Option<String>,
    /// SUCCESS, NO_VIABLE_ROUTE or CANCELLED.
    #[arg(long, value_parser = parse_status)]
    pub status: Option<RouteHistoryStatus>,
    /// AUTO, MANUAL or OPERATOR_OVERRIDE.
    #[arg(long, value_parser = parse_source)]
    pub source: Option<RouteHistorySource>,
    #[arg(long)]
    pub archived: Option<bool>,
    /// Earliest computation time (RFC 3339).
    #[arg(long, value_parser = parse_timestamp)]
    pub from: Option<DateTime<Utc>>,
    /// Latest computation time (RFC 3339).
    #[arg(long, value_parser = parse_timestamp)]
    pub to: Option<DateTime<Utc>>,
    /// Zero-based page number.
    #[arg(long, default_value_t = 0)]
    pub page: u32,
    #[arg(long)]
    pub size: Option<u32>,
}

impl HistoryListArgs {
    pub fn query(&self) -> HistoryQuery {
        HistoryQuery {
            tenant_id: self.tenant.clone(),
            user_id: self.user.clone(),
            route_id: self.route.clone(),
            status: self.status,
            source: self.source,
            archived: self.archived,
            from: self.from,
            to: self.to,
        }
    }
}

fn parse_status(value: &str) -> std::result::Result<RouteHistoryStatus, String> {
    value.parse()
}

fn parse_source(value: &str) -> std::result::Result<RouteHistorySource, String> {
    value.parse()
}

fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| format!("invalid RFC 3339 timestamp '{value}': {err}"))
}

pub fn handle_history(ctx: &AppContext, command: &HistoryCommand) -> Result<()> {
    let history = ctx.history();
    match command {
        HistoryCommand::List(args) => {
            let size = args.size.unwrap_or(ctx.config.history_page_size);
            let page = history
                .find_history(&args.query(), PageRequest::new(args.page, size))
                .map_err(friendly_error)?;
            ctx.format.emit(&page, format_history_page_text)
        }
        HistoryCommand::Show { id } => {
            let entry = history
                .find_by_id(*id)
                .map_err(friendly_error)?
                .ok_or_else(|| friendly_error(RouteError::HistoryNotFound { id: *id }))?;
            ctx.format.emit(&entry, format_history_entry_text)
        }
        HistoryCommand::Archive { id, notes, actor } => {
            let entry = history
                .archive(*id, notes.as_deref(), actor.as_deref())
                .map_err(friendly_error)
                .with_context(|| format!("failed to archive history entry {id}"))?;
            ctx.format.emit(&entry, format_history_entry_text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_args_map_onto_query() {
        let args = HistoryListArgs {
            user: Some("ana".to_string()),
            status: Some(RouteHistoryStatus::NoViableRoute),
            archived: Some(false),
            ..HistoryListArgs::default()
        };
        let query = args.query();
        assert_eq!(query.user_id.as_deref(), Some("ana"));
        assert_eq!(query.status, Some(RouteHistoryStatus::NoViableRoute));
        assert_eq!(query.archived, Some(false));
        assert!(query.tenant_id.is_none());
    }

    #[test]
    fn timestamps_must_be_rfc3339() {
        assert!(parse_timestamp("2025-06-01T08:15:00Z").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
