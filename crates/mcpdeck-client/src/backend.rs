//! Shared HTTP plumbing: URL building, request dispatch and error classification.

use std::time::Duration;

use mcpdeck_core::{RemoteError, ViewQuery};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::markets::MarketsClient;
use crate::servers::ServersClient;

/// Connection pool and base URL of one backend.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl HttpBackend {
    /// Backend at `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the URL cannot carry a path or the client
    /// cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Build { source })?;
        Self::with_client(client, base_url)
    }

    /// Backend reusing an existing reqwest client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnsupportedBaseUrl`] when the URL cannot carry a path.
    pub fn with_client(client: Client, base_url: Url) -> ClientResult<Self> {
        if base_url.cannot_be_a_base() {
            return Err(ClientError::UnsupportedBaseUrl {
                url: base_url.to_string(),
            });
        }
        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Tool server collection.
    #[must_use]
    pub fn servers(&self) -> ServersClient {
        ServersClient::new(self.clone())
    }

    /// Market collection and its tool catalogues.
    #[must_use]
    pub fn markets(&self) -> MarketsClient {
        MarketsClient::new(self.clone())
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| RemoteError::network("base URL cannot carry API paths"))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    pub(crate) fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url)
    }

    pub(crate) fn post(&self, url: Url) -> RequestBuilder {
        self.client.post(url)
    }

    pub(crate) fn put(&self, url: Url) -> RequestBuilder {
        self.client.put(url)
    }

    pub(crate) fn delete(&self, url: Url) -> RequestBuilder {
        self.client.delete(url)
    }

    /// Send `request` and decode a 2xx body as `T`.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = request.send().await.map_err(|err| {
            debug!(operation, error = %err, "request was not delivered");
            if err.is_timeout() {
                RemoteError::network("request timed out")
            } else {
                RemoteError::network("could not reach the server")
            }
        })?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|err| {
            debug!(operation, error = %err, "response body could not be read");
            RemoteError::status(status.as_u16(), None)
        })?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(|body| body.message);
            debug!(operation, status = status.as_u16(), "request failed");
            return Err(RemoteError::status(status.as_u16(), message));
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            debug!(operation, error = %err, "response body did not parse");
            RemoteError::status(
                status.as_u16(),
                Some("unexpected response from server".to_string()),
            )
        })
    }
}

/// Query pairs of a list request.
pub(crate) fn list_params(query: &ViewQuery) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity(query.filters().len() + 3);
    if let Some(keyword) = query.keyword() {
        params.push(("keyword".to_string(), keyword.to_string()));
    }
    for (key, value) in query.filters() {
        params.push((key.clone(), value.clone()));
    }
    params.push(("page".to_string(), query.page().to_string()));
    params.push(("size".to_string(), query.page_size().to_string()));
    params
}
