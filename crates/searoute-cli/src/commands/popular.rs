//! `popular` command.

use anyhow::Result;
use clap::Args;

use super::{friendly_error, AppContext};
use crate::output::format_popular_text;

#[derive(Debug, Clone, Args)]
pub struct PopularArgs {
    /// How many pairs to show; capped by the routing config.
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn handle_popular(ctx: &AppContext, args: &PopularArgs) -> Result<()> {
    let limit = ctx.config.popular_limit(args.limit);
    let routes = ctx
        .popularity()
        .top_routes(limit)
        .map_err(friendly_error)?;
    ctx.format.emit(routes.as_slice(), format_popular_text)
}
