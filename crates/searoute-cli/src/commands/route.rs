//! Route computation commands: `route`, `recalculate` and `distance`.

use anyhow::Result;
use clap::Args;
use tracing::info;

use searoute_lib::{
    HistoryContext, LaneId, PortId, RecalculationRequest, RouteHistorySource, RouteRequest,
};

use super::{friendly_error, AppContext};
use crate::output::{
    format_distance_text, format_recalculation_text, format_route_text, DistanceOutput,
};

/// Who asked for a computation. History is only written when `--user` is set.
#[derive(Debug, Clone, Default, Args)]
pub struct HistoryArgs {
    /// User the computation is recorded for.
    #[arg(long)]
    pub user: Option<String>,
    /// Tenant the user belongs to.
    #[arg(long)]
    pub tenant: Option<String>,
}

impl HistoryArgs {
    fn context(&self) -> Option<HistoryContext> {
        let user = self.user.as_deref()?;
        let mut context = HistoryContext::for_user(user);
        if let Some(tenant) = &self.tenant {
            context = context.tenant(tenant.as_str());
        }
        Some(context)
    }
}

#[derive(Debug, Clone, Args)]
pub struct RouteArgs {
    /// Origin port id.
    #[arg(long = "from")]
    pub from: PortId,
    /// Destination port id.
    #[arg(long = "to")]
    pub to: PortId,
    /// Port ids the route must not cross (repeatable).
    #[arg(long = "avoid")]
    pub avoid: Vec<PortId>,
    #[command(flatten)]
    pub history: HistoryArgs,
    /// What triggered the request: auto, manual or operator-override.
    #[arg(long, value_parser = parse_source)]
    pub source: Option<RouteHistorySource>,
    /// Free-form notes stored with the history entry.
    #[arg(long)]
    pub notes: Option<String>,
}

impl RouteArgs {
    pub fn to_request(&self) -> RouteRequest {
        let mut request = RouteRequest::new(self.from, self.to).avoiding(self.avoid.iter().copied());
        if let Some(mut context) = self.history.context() {
            if let Some(source) = self.source {
                context = context.source(source);
            }
            if let Some(notes) = &self.notes {
                context = context.notes(notes.as_str());
            }
            request = request.with_history(context);
        }
        request
    }
}

#[derive(Debug, Clone, Args)]
pub struct RecalculateArgs {
    /// Id of the stored route (lane) to re-verify.
    #[arg(long = "route")]
    pub route: LaneId,
    #[command(flatten)]
    pub history: HistoryArgs,
}

#[derive(Debug, Clone, Args)]
pub struct DistanceArgs {
    /// Port ids in travel order.
    #[arg(required = true, num_args = 1..)]
    pub ports: Vec<PortId>,
}

fn parse_source(value: &str) -> std::result::Result<RouteHistorySource, String> {
    value.parse()
}

pub fn handle_route(ctx: &AppContext, args: &RouteArgs) -> Result<()> {
    let request = args.to_request();
    let route = ctx
        .route_service()
        .calculate_optimal_route(&request)
        .map_err(friendly_error)?;
    info!(
        from = args.from,
        to = args.to,
        hops = route.hop_count(),
        "route computed"
    );
    ctx.format.emit(&route, format_route_text)
}

pub fn handle_recalculate(ctx: &AppContext, args: &RecalculateArgs) -> Result<()> {
    let mut request = RecalculationRequest::new(args.route);
    if let Some(context) = args.history.context() {
        request = request.with_history(context);
    }
    let result = ctx
        .route_service()
        .recalculate_route(&request)
        .map_err(friendly_error)?;
    ctx.format.emit(&result, format_recalculation_text)
}

pub fn handle_distance(ctx: &AppContext, args: &DistanceArgs) -> Result<()> {
    let total_distance_km = ctx
        .route_service()
        .total_distance(&args.ports)
        .map_err(friendly_error)?;
    let output = DistanceOutput {
        port_ids: args.ports.clone(),
        total_distance_km,
    };
    ctx.format.emit(&output, format_distance_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RouteArgs {
        RouteArgs {
            from: 1,
            to: 3,
            avoid: vec![2],
            history: HistoryArgs::default(),
            source: Some(RouteHistorySource::Auto),
            notes: Some("weekly run".to_string()),
        }
    }

    #[test]
    fn request_without_user_carries_no_history() {
        let request = args().to_request();
        assert!(request.history.is_none());
        assert!(request.avoid.contains(&2));
    }

    #[test]
    fn request_with_user_carries_source_and_notes() {
        let mut args = args();
        args.history.user = Some("ana".to_string());
        args.history.tenant = Some("acme".to_string());
        let context = args.to_request().history.expect("history context");
        assert_eq!(context.user_id.as_deref(), Some("ana"));
        assert_eq!(context.tenant_id.as_deref(), Some("acme"));
        assert_eq!(context.source, Some(RouteHistorySource::Auto));
        assert_eq!(context.notes.as_deref(), Some("weekly run"));
    }
}
