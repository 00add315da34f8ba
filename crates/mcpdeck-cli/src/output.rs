//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use mcpdeck_core::Page;
use mcpdeck_models::{CompatServer, Market, MarketTool, ToolServer};
use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

fn print_json(value: &impl Serialize) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

fn page_json<T: Serialize>(page: &Page<T>) -> serde_json::Value {
    json!({
        "data": &*page.rows,
        "total": page.total,
        "page": page.page,
        "size": page.page_size,
        "pages": page.pages(),
    })
}

fn print_footer<T>(page: &Page<T>) {
    println!("page {}/{} ({} total)", page.page, page.pages().max(1), page.total);
}

pub(crate) fn render_servers(page: &Page<ToolServer>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&page_json(page))?,
        OutputFormat::Table => {
            println!("{:<8} {:<8} {:<9} NAME", "ID", "TYPE", "STATUS");
            for server in page.rows.iter() {
                println!(
                    "{:<8} {:<8} {:<9} {}",
                    server.id.to_string(),
                    server.kind.as_str(),
                    server.status.as_str(),
                    server.name
                );
            }
            print_footer(page);
        }
    }
    Ok(())
}

pub(crate) fn render_server(server: &ToolServer, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(server),
        OutputFormat::Table => {
            println!("id: {}", server.id);
            println!("name: {}", server.name);
            println!("type: {}", server.kind.as_str());
            println!("status: {}", server.status);
            if let Some(description) = &server.description {
                println!("description: {description}");
            }
            if let Some(config) = &server.config_json {
                println!("config: {config}");
            }
            Ok(())
        }
    }
}

pub(crate) fn render_markets(page: &Page<Market>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&page_json(page))?,
        OutputFormat::Table => {
            println!("{:<8} {:<9} {:<24} URL", "ID", "STATUS", "NAME");
            for market in page.rows.iter() {
                println!(
                    "{:<8} {:<9} {:<24} {}",
                    market.id.to_string(),
                    market.status.as_str(),
                    market.name,
                    market.url
                );
            }
            print_footer(page);
        }
    }
    Ok(())
}

pub(crate) fn render_market(market: &Market, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(market),
        OutputFormat::Table => {
            println!("id: {}", market.id);
            println!("name: {}", market.name);
            println!("url: {}", market.url);
            println!("status: {}", market.status);
            if let Some(description) = &market.description {
                println!("description: {description}");
            }
            Ok(())
        }
    }
}

pub(crate) fn render_tools(page: &Page<MarketTool>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&page_json(page))?,
        OutputFormat::Table => {
            println!("{:<8} {:<10} {:<7} NAME", "ID", "VERSION", "LOADED");
            for tool in page.rows.iter() {
                println!(
                    "{:<8} {:<10} {:<7} {}",
                    tool.id.to_string(),
                    tool.tool_version.as_deref().unwrap_or("-"),
                    loaded_marker(tool.is_loaded),
                    tool.tool_name
                );
            }
            print_footer(page);
        }
    }
    Ok(())
}

pub(crate) fn render_compat(servers: &[CompatServer], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&servers),
        OutputFormat::Table => {
            println!("{:<8} {:<7} NAME", "ID", "ACTIVE");
            for server in servers {
                let id = server
                    .id
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string);
                println!("{:<8} {:<7} {}", id, loaded_marker(server.is_active), server.name);
            }
            Ok(())
        }
    }
}

const fn loaded_marker(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
