//! Application context, CLI error types and outcome mapping.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use mcpdeck_client::{HttpBackend, MarketsClient, ServersClient};
use mcpdeck_core::{
    CollectionSync, CompatibilityMirror, EntityStore, Failure, FailureKind, FileStore, JobGate,
    KeyValueStore, LoadOutcome, MarketToolsSync, MutationOutcome, SnapshotObserver, SyncConfig,
};
use mcpdeck_models::{Market, ToolServer};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<Failure> for CliError {
    fn from(failure: Failure) -> Self {
        match failure.kind {
            FailureKind::Validation => Self::Validation(failure.message),
            FailureKind::Transport | FailureKind::Application => Self::Failure(failure.into()),
        }
    }
}

/// Committed payload and message, or the failure as a CLI error.
pub(crate) fn committed<T>(outcome: MutationOutcome<T>) -> CliResult<(T, String)> {
    outcome.into_result().map_err(CliError::from)
}

/// Failure of a stale load, raised after the caller rendered the kept rows.
pub(crate) fn stale_failure<E>(outcome: &LoadOutcome<E>) -> CliResult<()> {
    outcome
        .failure()
        .map_or(Ok(()), |failure| Err(CliError::from(failure.clone())))
}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) config: SyncConfig,
    pub(crate) servers: CollectionSync<ToolServer, ServersClient>,
    pub(crate) markets: CollectionSync<Market, MarketsClient>,
    pub(crate) tools: MarketToolsSync<MarketsClient>,
    pub(crate) gate: JobGate,
    pub(crate) mirror: Arc<CompatibilityMirror>,
}

impl AppContext {
    /// Wire stores, the compatibility mirror and controllers over `backend`.
    pub(crate) fn new(backend: &HttpBackend, config: SyncConfig) -> Self {
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.storage_dir.clone()));
        let mirror = Arc::new(CompatibilityMirror::open(storage, config.storage_key.clone()));
        let observer: Arc<dyn SnapshotObserver<ToolServer>> = mirror.clone();
        let servers = CollectionSync::new(
            Arc::new(EntityStore::with_observer(observer)),
            backend.servers(),
            &config,
        );
        let markets = CollectionSync::new(Arc::new(EntityStore::new()), backend.markets(), &config);
        let tools = MarketToolsSync::new(Arc::new(EntityStore::new()), backend.markets(), &config);
        Self {
            gate: JobGate::from_config(&config),
            config,
            servers,
            markets,
            tools,
            mirror,
        }
    }
}

/// Build the HTTP backend, tagging every request with `trace_id`.
pub(crate) fn build_backend(
    base_url: Url,
    timeout_secs: u64,
    trace_id: &str,
) -> CliResult<HttpBackend> {
    let mut default_headers = HeaderMap::new();
    let request_id = HeaderValue::from_str(trace_id)
        .map_err(|_| CliError::failure(anyhow!("trace identifier contains invalid characters")))?;
    default_headers.insert(HEADER_REQUEST_ID, request_id);

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(default_headers)
        .build()
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;
    HttpBackend::with_client(client, base_url).map_err(|err| CliError::validation(err.to_string()))
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}
