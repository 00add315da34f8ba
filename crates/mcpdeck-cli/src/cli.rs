//! Argument parsing, logging setup and command dispatch.

use clap::{Args, Parser, Subcommand, ValueEnum};
use mcpdeck_core::{ConfigError, SyncConfig};
use mcpdeck_models::EntityId;
use mcpdeck_telemetry::{LogFormat, LoggingConfig, command_span, init_logging};
use tracing::{Instrument, debug};
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliError, CliResult, build_backend, parse_url};
use crate::commands::markets::{
    handle_market_add, handle_market_delete, handle_market_list, handle_market_refresh,
    handle_market_toggle, handle_market_update, handle_tool_batch_load, handle_tool_list,
    handle_tool_load,
};
use crate::commands::servers::{
    handle_server_add, handle_server_batch_delete, handle_server_cached, handle_server_delete,
    handle_server_list, handle_server_test, handle_server_toggle, handle_server_update,
};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Parses CLI arguments, executes the requested command and reports the
/// outcome. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.map_or_else(LogFormat::infer, LogFormat::from),
        build_sha: option_env!("MCPDECK_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err}");
    }

    let span = command_span(command_label(&cli.command));
    let result = dispatch(cli).instrument(span).await;
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let trace_id = Uuid::new_v4().to_string();
    debug!(trace_id = %trace_id, api_url = %cli.api_url, "command started");
    let config = SyncConfig::from_env().map_err(|err| match err {
        ConfigError::InvalidField {
            field,
            value,
            reason,
        } => CliError::validation(format!("invalid {field} '{value}': {reason}")),
    })?;
    let backend = build_backend(cli.api_url, cli.timeout, &trace_id)?;
    let ctx = AppContext::new(&backend, config);
    let output = cli.output;

    match cli.command {
        Command::Servers(command) => match command {
            ServersCommand::List(args) => handle_server_list(&ctx, args, output).await,
            ServersCommand::Add(args) => handle_server_add(&ctx, args, output).await,
            ServersCommand::Update(args) => handle_server_update(&ctx, args, output).await,
            ServersCommand::Delete(args) => handle_server_delete(&ctx, args).await,
            ServersCommand::DeleteBatch(args) => handle_server_batch_delete(&ctx, args).await,
            ServersCommand::Toggle(args) => handle_server_toggle(&ctx, args).await,
            ServersCommand::Test(args) => handle_server_test(&ctx, args).await,
            ServersCommand::Cached(args) => handle_server_cached(&ctx, args, output),
        },
        Command::Markets(command) => match command {
            MarketsCommand::List(args) => handle_market_list(&ctx, args, output).await,
            MarketsCommand::Add(args) => handle_market_add(&ctx, args, output).await,
            MarketsCommand::Update(args) => handle_market_update(&ctx, args, output).await,
            MarketsCommand::Delete(args) => handle_market_delete(&ctx, args).await,
            MarketsCommand::Toggle(args) => handle_market_toggle(&ctx, args).await,
            MarketsCommand::Refresh(args) => handle_market_refresh(&ctx, args).await,
            MarketsCommand::Tools(args) => handle_tool_list(&ctx, args, output).await,
            MarketsCommand::Load(args) => handle_tool_load(&ctx, args).await,
            MarketsCommand::LoadBatch(args) => handle_tool_batch_load(&ctx, args).await,
        },
    }
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Servers(command) => match command {
            ServersCommand::List(_) => "servers list",
            ServersCommand::Add(_) => "servers add",
            ServersCommand::Update(_) => "servers update",
            ServersCommand::Delete(_) => "servers delete",
            ServersCommand::DeleteBatch(_) => "servers delete-batch",
            ServersCommand::Toggle(_) => "servers toggle",
            ServersCommand::Test(_) => "servers test",
            ServersCommand::Cached(_) => "servers cached",
        },
        Command::Markets(command) => match command {
            MarketsCommand::List(_) => "markets list",
            MarketsCommand::Add(_) => "markets add",
            MarketsCommand::Update(_) => "markets update",
            MarketsCommand::Delete(_) => "markets delete",
            MarketsCommand::Toggle(_) => "markets toggle",
            MarketsCommand::Refresh(_) => "markets refresh",
            MarketsCommand::Tools(_) => "markets tools",
            MarketsCommand::Load(_) => "markets load",
            MarketsCommand::LoadBatch(_) => "markets load-batch",
        },
    }
}

#[derive(Parser)]
#[command(name = "mcpdeck", about = "Manage MCP tool servers and tool markets")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "MCPDECK_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    api_url: Url,
    #[arg(
        long,
        global = true,
        env = "MCPDECK_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "MCPDECK_LOG_LEVEL",
        default_value = mcpdeck_telemetry::DEFAULT_LOG_LEVEL
    )]
    log_level: String,
    #[arg(long, global = true, value_enum, env = "MCPDECK_LOG_FORMAT")]
    log_format: Option<LogFormatArg>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    #[command(subcommand)]
    Servers(ServersCommand),
    #[command(subcommand)]
    Markets(MarketsCommand),
}

#[derive(Subcommand)]
pub(crate) enum ServersCommand {
    List(ServerListArgs),
    Add(ServerAddArgs),
    Update(ServerUpdateArgs),
    Delete(IdArgs),
    DeleteBatch(IdsArgs),
    Toggle(ToggleArgs),
    Test(IdArgs),
    Cached(CachedArgs),
}

#[derive(Subcommand)]
pub(crate) enum MarketsCommand {
    List(MarketListArgs),
    Add(MarketAddArgs),
    Update(MarketUpdateArgs),
    Delete(IdArgs),
    Toggle(ToggleArgs),
    Refresh(IdArgs),
    Tools(ToolListArgs),
    Load(ToolLoadArgs),
    LoadBatch(ToolBatchLoadArgs),
}

#[derive(Args, Default)]
pub(crate) struct ServerListArgs {
    #[arg(long)]
    pub(crate) keyword: Option<String>,
    #[arg(long = "type", help = "LOCAL or REMOTE")]
    pub(crate) kind: Option<String>,
    #[arg(long, help = "ENABLED or DISABLED")]
    pub(crate) status: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub(crate) page: u32,
    #[arg(long)]
    pub(crate) size: Option<u32>,
}

#[derive(Args, Default)]
pub(crate) struct ServerAddArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long = "type", help = "LOCAL or REMOTE")]
    pub(crate) kind: String,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long, help = "Server configuration as a JSON document")]
    pub(crate) config_json: Option<String>,
    #[arg(long, help = "Create the server disabled")]
    pub(crate) disabled: bool,
}

#[derive(Args)]
pub(crate) struct ServerUpdateArgs {
    #[arg(help = "Server identifier")]
    pub(crate) id: EntityId,
    #[arg(long)]
    pub(crate) name: Option<String>,
    #[arg(long = "type", help = "LOCAL or REMOTE")]
    pub(crate) kind: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long, help = "Server configuration as a JSON document")]
    pub(crate) config_json: Option<String>,
    #[arg(long, default_value_t = 1, help = "List page holding the server")]
    pub(crate) page: u32,
}

#[derive(Args)]
pub(crate) struct IdArgs {
    #[arg(help = "Record identifier")]
    pub(crate) id: EntityId,
}

#[derive(Args)]
pub(crate) struct IdsArgs {
    #[arg(value_delimiter = ',', help = "Comma-separated record identifiers")]
    pub(crate) ids: Vec<EntityId>,
}

#[derive(Args)]
pub(crate) struct ToggleArgs {
    #[arg(help = "Record identifier")]
    pub(crate) id: EntityId,
    #[arg(long, default_value_t = 1, help = "List page holding the record")]
    pub(crate) page: u32,
}

#[derive(Args, Default)]
pub(crate) struct CachedArgs {
    #[arg(long, help = "Include disabled servers")]
    pub(crate) all: bool,
}

#[derive(Args, Default)]
pub(crate) struct MarketListArgs {
    #[arg(long)]
    pub(crate) keyword: Option<String>,
    #[arg(long, help = "ENABLED or DISABLED")]
    pub(crate) status: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub(crate) page: u32,
    #[arg(long)]
    pub(crate) size: Option<u32>,
}

#[derive(Args, Default)]
pub(crate) struct MarketAddArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) url: String,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long, help = "Authentication settings as a JSON document")]
    pub(crate) auth_config: Option<String>,
}

#[derive(Args)]
pub(crate) struct MarketUpdateArgs {
    #[arg(help = "Market identifier")]
    pub(crate) id: EntityId,
    #[arg(long)]
    pub(crate) name: Option<String>,
    #[arg(long)]
    pub(crate) url: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long, help = "Authentication settings as a JSON document")]
    pub(crate) auth_config: Option<String>,
    #[arg(long, default_value_t = 1, help = "List page holding the market")]
    pub(crate) page: u32,
}

#[derive(Args)]
pub(crate) struct ToolListArgs {
    #[arg(help = "Market identifier")]
    pub(crate) market: EntityId,
    #[arg(long, default_value_t = 1)]
    pub(crate) page: u32,
}

#[derive(Args)]
pub(crate) struct ToolLoadArgs {
    #[arg(help = "Tool identifier")]
    pub(crate) tool: EntityId,
    #[arg(long, help = "Market offering the tool")]
    pub(crate) market: EntityId,
    #[arg(long, default_value_t = 1, help = "Tool page holding the tool")]
    pub(crate) page: u32,
}

#[derive(Args)]
pub(crate) struct ToolBatchLoadArgs {
    #[arg(value_delimiter = ',', help = "Comma-separated tool identifiers")]
    pub(crate) tools: Vec<EntityId>,
    #[arg(long, help = "Market offering the tools")]
    pub(crate) market: EntityId,
    #[arg(long, default_value_t = 1, help = "Tool page holding the tools")]
    pub(crate) page: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum LogFormatArg {
    Json,
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Json => Self::Json,
            LogFormatArg::Pretty => Self::Pretty,
        }
    }
}
