use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::config::TransportConfig;
use crate::error::BridgeError;

const PARSED_ENDPOINT_CACHE_MAX_ENTRIES: usize = 64;

fn build_reqwest_client(config: &TransportConfig) -> Result<reqwest::Client, BridgeError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(config.http_pool_max_idle_per_host)
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.timeout));

    if let Some(proxy_url) = config.proxy.as_deref() {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|err| BridgeError::Transport(format!("Invalid proxy URL: {err}")))?;
        builder = builder.no_proxy().proxy(proxy);
    } else if !config.http_use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| BridgeError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// HTTP client for the messages endpoint.
///
/// One attempt per exchange; there is no retry loop.
pub struct HttpTransport {
    client: reqwest::Client,
    parsed_url_cache: RwLock<HashMap<String, Arc<url::Url>>>,
}

impl HttpTransport {
    /// Build the transport from config.
    ///
    /// A client that fails to build (e.g. a malformed proxy URL) is logged
    /// and replaced by reqwest's default client.
    #[must_use]
    pub fn new(config: &TransportConfig) -> Self {
        let client = match build_reqwest_client(config) {
            Ok(client) => client,
            Err(err) => {
                tracing::error!(error = %err, "failed to build configured reqwest client, falling back to default client");
                reqwest::Client::new()
            }
        };
        Self {
            client,
            parsed_url_cache: RwLock::new(HashMap::new()),
        }
    }

    fn parsed_url(&self, url: &str) -> Result<Arc<url::Url>, BridgeError> {
        if let Some(cached) = self.parsed_url_cache.read().get(url) {
            return Ok(cached.clone());
        }

        let parsed = url::Url::parse(url)
            .map_err(|e| BridgeError::Transport(format!("Invalid endpoint URL: {e}")))?;

        let mut cache = self.parsed_url_cache.write();
        if let Some(existing) = cache.get(url) {
            return Ok(existing.clone());
        }
        if cache.len() >= PARSED_ENDPOINT_CACHE_MAX_ENTRIES {
            cache.clear();
        }
        let parsed = Arc::new(parsed);
        cache.insert(url.to_string(), parsed.clone());
        Ok(parsed)
    }

    /// POST a streaming request and return the response once its status is known.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] when the URL is invalid or the
    /// request cannot be sent, and [`BridgeError::Upstream`] carrying the
    /// status and response body text when the status is not 2xx.
    pub async fn send_stream(
        &self,
        url: &str,
        headers: &http::HeaderMap,
        body: bytes::Bytes,
    ) -> Result<reqwest::Response, BridgeError> {
        let parsed_url = self.parsed_url(url)?;
        let mut request = reqwest::Request::new(http::Method::POST, parsed_url.as_ref().clone());
        *request.headers_mut() = headers.clone();
        *request.body_mut() = Some(reqwest::Body::from(body));

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| BridgeError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(error = %err, "failed to read error response body");
                String::new()
            }
        };
        Err(BridgeError::Upstream {
            status: status.as_u16(),
            message,
        })
    }
}
