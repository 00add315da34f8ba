use mcpdeck_core::ViewQuery;
use mcpdeck_models::{EntityId, EntityStatus, Market, MarketDraft};

use crate::cli::{
    IdArgs, MarketAddArgs, MarketListArgs, MarketUpdateArgs, OutputFormat, ToggleArgs,
    ToolBatchLoadArgs, ToolListArgs, ToolLoadArgs,
};
use crate::client::{AppContext, CliError, CliResult, committed, stale_failure};
use crate::commands::servers::parse_status;
use crate::output::{render_market, render_markets, render_tools};

/// Walk the market list until `id` shows up.
async fn find_market(ctx: &AppContext, id: &EntityId) -> CliResult<Market> {
    let mut page = 1;
    loop {
        let query = ViewQuery::new(ctx.config.default_page_size).with_page(page);
        let outcome = ctx.markets.load(&query).await;
        stale_failure(&outcome)?;
        if let Some(market) = outcome.page().rows.iter().find(|market| &market.id == id) {
            return Ok(market.clone());
        }
        if u64::from(page) >= outcome.page().pages() {
            return Err(CliError::validation(format!("market {id} is not listed")));
        }
        page += 1;
    }
}

async fn browse(ctx: &AppContext, market_id: &EntityId, page: u32) -> CliResult<()> {
    let market = find_market(ctx, market_id).await?;
    let outcome = ctx.tools.browse(&market, page).await?;
    stale_failure(&outcome)
}

pub(crate) async fn handle_market_list(
    ctx: &AppContext,
    args: MarketListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut query = ViewQuery::new(args.size.unwrap_or(ctx.config.default_page_size))
        .with_page(args.page)
        .with_keyword(args.keyword.unwrap_or_default());
    if let Some(status) = args.status.as_deref() {
        query = query.with_filter("status", parse_status(status)?.as_str());
    }

    let outcome = ctx.markets.load(&query).await;
    render_markets(outcome.page(), format)?;
    stale_failure(&outcome)
}

pub(crate) async fn handle_market_add(
    ctx: &AppContext,
    args: MarketAddArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let draft = MarketDraft {
        name: Some(args.name),
        url: Some(args.url),
        description: args.description,
        auth_config: args.auth_config,
        status: Some(EntityStatus::Enabled),
    };
    let (created, message) = committed(ctx.markets.create(draft).await)?;
    match created {
        Some(market) => render_market(&market, format)?,
        None => println!("{message}"),
    }
    Ok(())
}

pub(crate) async fn handle_market_update(
    ctx: &AppContext,
    args: MarketUpdateArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let draft = MarketDraft {
        name: args.name,
        url: args.url,
        description: args.description,
        auth_config: args.auth_config,
        status: None,
    };
    if draft == MarketDraft::default() {
        return Err(CliError::validation("nothing to update"));
    }
    let query = ViewQuery::new(ctx.config.default_page_size).with_page(args.page);
    stale_failure(&ctx.markets.load(&query).await)?;
    let (updated, message) = committed(ctx.markets.update(&args.id, draft).await)?;
    match updated {
        Some(market) => render_market(&market, format)?,
        None => println!("{message}"),
    }
    Ok(())
}

pub(crate) async fn handle_market_delete(ctx: &AppContext, args: IdArgs) -> CliResult<()> {
    let (id, message) = committed(ctx.markets.delete(&args.id).await)?;
    println!("{message} (id: {id})");
    Ok(())
}

pub(crate) async fn handle_market_toggle(ctx: &AppContext, args: ToggleArgs) -> CliResult<()> {
    let query = ViewQuery::new(ctx.config.default_page_size).with_page(args.page);
    stale_failure(&ctx.markets.load(&query).await)?;
    let (status, message) = committed(ctx.markets.toggle_status(&args.id).await)?;
    println!("{message} (id: {}, status: {status})", args.id);
    Ok(())
}

pub(crate) async fn handle_market_refresh(ctx: &AppContext, args: IdArgs) -> CliResult<()> {
    let ticket = ctx.markets.refresh(&ctx.gate, &args.id);
    if !ticket.accepted() {
        return Err(CliError::validation(ticket.notice()));
    }
    println!("{}", ticket.notice());
    if !ticket.finished().await {
        return Err(CliError::failure(anyhow::anyhow!(
            "refresh job stopped before completing"
        )));
    }
    Ok(())
}

pub(crate) async fn handle_tool_list(
    ctx: &AppContext,
    args: ToolListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let market = find_market(ctx, &args.market).await?;
    let outcome = ctx.tools.browse(&market, args.page).await?;
    render_tools(outcome.page(), format)?;
    stale_failure(&outcome)
}

pub(crate) async fn handle_tool_load(ctx: &AppContext, args: ToolLoadArgs) -> CliResult<()> {
    browse(ctx, &args.market, args.page).await?;
    let (id, message) = committed(ctx.tools.load_tool(&args.tool).await)?;
    println!("{message} (id: {id})");
    Ok(())
}

pub(crate) async fn handle_tool_batch_load(
    ctx: &AppContext,
    args: ToolBatchLoadArgs,
) -> CliResult<()> {
    if args.tools.is_empty() {
        let outcome = ctx.tools.batch_load(Vec::new()).await;
        return committed(outcome).map(|_| ());
    }
    browse(ctx, &args.market, args.page).await?;
    let (loaded, message) = committed(ctx.tools.batch_load(args.tools).await)?;
    println!("{message} ({loaded} loaded)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::build_backend;
    use httpmock::prelude::*;
    use mcpdeck_core::SyncConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn context_for(server: &MockServer, storage: &TempDir) -> AppContext {
        let url = server.base_url().parse().expect("mock url");
        let backend = build_backend(url, 5, "trace-2").expect("backend");
        let config = SyncConfig {
            storage_dir: storage.path().to_path_buf(),
            ..SyncConfig::default()
        };
        AppContext::new(&backend, config)
    }

    fn market_listing(status: &str) -> serde_json::Value {
        json!({
            "success": true,
            "total": 1,
            "data": [{"id": 5, "name": "hub", "url": "https://hub.example", "status": status}]
        })
    }

    #[tokio::test]
    async fn tools_of_disabled_market_are_refused() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/mcp/markets");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(market_listing("DISABLED"));
        });
        let tools = server.mock(|when, then| {
            when.method(GET).path("/api/mcp/markets/5/tools");
            then.status(200);
        });
        let storage = TempDir::new().expect("tempdir");
        let ctx = context_for(&server, &storage);

        let err = handle_tool_list(
            &ctx,
            ToolListArgs {
                market: EntityId::Number(5),
                page: 1,
            },
            OutputFormat::Table,
        )
        .await
        .expect_err("disabled market");
        assert!(matches!(
            err,
            CliError::Validation(message) if message == "market is disabled; enable it first"
        ));
        #[allow(deprecated)]
        tools.assert_hits(0);
    }

    #[tokio::test]
    async fn unknown_market_is_a_validation_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/mcp/markets");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(market_listing("ENABLED"));
        });
        let storage = TempDir::new().expect("tempdir");
        let ctx = context_for(&server, &storage);

        let err = handle_tool_list(
            &ctx,
            ToolListArgs {
                market: EntityId::Number(9),
                page: 1,
            },
            OutputFormat::Table,
        )
        .await
        .expect_err("unknown market");
        assert_eq!(err.display_message(), "market 9 is not listed");
    }

    #[tokio::test]
    async fn batch_load_reports_success_count() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/mcp/markets");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(market_listing("ENABLED"));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/mcp/markets/5/tools");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "success": true,
                    "total": 2,
                    "data": [
                        {"id": 40, "marketId": 5, "toolName": "fetch"},
                        {"id": 41, "marketId": 5, "toolName": "shell"}
                    ]
                }));
        });
        let load = server.mock(|when, then| {
            when.method(POST)
                .path("/api/mcp/markets/tools/batch-load")
                .json_body(json!({"toolIds": [40, 41]}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true, "successCount": 2}));
        });
        let storage = TempDir::new().expect("tempdir");
        let ctx = context_for(&server, &storage);

        handle_tool_batch_load(
            &ctx,
            ToolBatchLoadArgs {
                tools: vec![EntityId::Number(40), EntityId::Number(41)],
                market: EntityId::Number(5),
                page: 1,
            },
        )
        .await
        .expect("batch load should succeed");
        load.assert();
    }

    #[tokio::test]
    async fn refresh_waits_for_the_job() {
        let server = MockServer::start_async().await;
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/api/mcp/markets/5/refresh");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true}));
        });
        let storage = TempDir::new().expect("tempdir");
        let ctx = context_for(&server, &storage);

        handle_market_refresh(
            &ctx,
            IdArgs {
                id: EntityId::Number(5),
            },
        )
        .await
        .expect("refresh should start");
        refresh.assert();

        let err = handle_market_refresh(
            &ctx,
            IdArgs {
                id: EntityId::Number(5),
            },
        )
        .await
        .expect_err("cooldown");
        assert!(err.display_message().starts_with("refresh already pending"));
    }
}
