use mcpdeck_core::ViewQuery;
use mcpdeck_models::{EntityStatus, ToolKind, ToolServerDraft};

use crate::cli::{
    CachedArgs, IdArgs, IdsArgs, OutputFormat, ServerAddArgs, ServerListArgs, ServerUpdateArgs,
    ToggleArgs,
};
use crate::client::{AppContext, CliError, CliResult, committed, stale_failure};
use crate::output::{render_compat, render_server, render_servers};

fn parse_kind(value: &str) -> CliResult<ToolKind> {
    ToolKind::parse(value).ok_or_else(|| CliError::validation("type must be LOCAL or REMOTE"))
}

pub(crate) fn parse_status(value: &str) -> CliResult<EntityStatus> {
    EntityStatus::parse(value)
        .ok_or_else(|| CliError::validation("status must be ENABLED or DISABLED"))
}

/// Load the page holding the records a mutation refers to.
async fn prime(ctx: &AppContext, page: u32) -> CliResult<()> {
    let query = ViewQuery::new(ctx.config.default_page_size).with_page(page);
    let outcome = ctx.servers.load(&query).await;
    stale_failure(&outcome)
}

pub(crate) async fn handle_server_list(
    ctx: &AppContext,
    args: ServerListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut query = ViewQuery::new(args.size.unwrap_or(ctx.config.default_page_size))
        .with_page(args.page)
        .with_keyword(args.keyword.unwrap_or_default());
    if let Some(kind) = args.kind.as_deref() {
        query = query.with_filter("type", parse_kind(kind)?.as_str());
    }
    if let Some(status) = args.status.as_deref() {
        query = query.with_filter("status", parse_status(status)?.as_str());
    }

    let outcome = ctx.servers.load(&query).await;
    render_servers(outcome.page(), format)?;
    stale_failure(&outcome)
}

pub(crate) async fn handle_server_add(
    ctx: &AppContext,
    args: ServerAddArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let draft = ToolServerDraft {
        name: Some(args.name),
        description: args.description,
        kind: Some(parse_kind(&args.kind)?),
        status: Some(if args.disabled {
            EntityStatus::Disabled
        } else {
            EntityStatus::Enabled
        }),
        config_json: args.config_json,
    };
    let (created, message) = committed(ctx.servers.create(draft).await)?;
    match created {
        Some(server) => render_server(&server, format)?,
        None => println!("{message}"),
    }
    Ok(())
}

pub(crate) async fn handle_server_update(
    ctx: &AppContext,
    args: ServerUpdateArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let draft = ToolServerDraft {
        name: args.name,
        description: args.description,
        kind: args.kind.as_deref().map(parse_kind).transpose()?,
        status: None,
        config_json: args.config_json,
    };
    if draft == ToolServerDraft::default() {
        return Err(CliError::validation("nothing to update"));
    }
    prime(ctx, args.page).await?;
    let (updated, message) = committed(ctx.servers.update(&args.id, draft).await)?;
    match updated {
        Some(server) => render_server(&server, format)?,
        None => println!("{message}"),
    }
    Ok(())
}

pub(crate) async fn handle_server_delete(ctx: &AppContext, args: IdArgs) -> CliResult<()> {
    let (id, message) = committed(ctx.servers.delete(&args.id).await)?;
    println!("{message} (id: {id})");
    Ok(())
}

pub(crate) async fn handle_server_batch_delete(ctx: &AppContext, args: IdsArgs) -> CliResult<()> {
    let (ids, message) = committed(ctx.servers.batch_delete(args.ids).await)?;
    println!("{message} ({} records)", ids.len());
    Ok(())
}

pub(crate) async fn handle_server_toggle(ctx: &AppContext, args: ToggleArgs) -> CliResult<()> {
    prime(ctx, args.page).await?;
    let (status, message) = committed(ctx.servers.toggle_status(&args.id).await)?;
    println!("{message} (id: {}, status: {status})", args.id);
    Ok(())
}

pub(crate) async fn handle_server_test(ctx: &AppContext, args: IdArgs) -> CliResult<()> {
    let message = ctx.servers.test(&args.id).await?;
    println!("{message}");
    Ok(())
}

pub(crate) fn handle_server_cached(
    ctx: &AppContext,
    args: CachedArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if args.all {
        render_compat(&ctx.mirror.servers(), format)
    } else {
        render_compat(&ctx.mirror.active(), format)
    }
}
