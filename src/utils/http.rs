use std::time::Duration;

use log::debug;
use reqwest::{Client, Proxy};

use crate::error::{Error, Result};
use crate::models::RemoteResponse;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT: u64 = 15;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Explicit outbound proxy, e.g. `http://127.0.0.1:7890`.
    /// `None` lets reqwest pick up the environment proxy variables.
    pub proxy: Option<String>,
    pub timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            proxy: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }
}

impl ProxyConfig {
    pub fn with_proxy(proxy: Option<String>) -> Self {
        ProxyConfig {
            proxy: proxy.filter(|p| !p.is_empty()),
            ..Default::default()
        }
    }
}

/// Makes a GET request and returns the whole response, whatever its status.
///
/// Status handling is left to the caller so a non-success upstream answer
/// can be forwarded verbatim.
pub async fn web_get_async(url: &str, proxy_config: &ProxyConfig) -> Result<RemoteResponse> {
    let mut client_builder = Client::builder()
        .timeout(proxy_config.timeout)
        .user_agent(concat!("subrewrite/", env!("CARGO_PKG_VERSION")));

    if let Some(proxy) = &proxy_config.proxy {
        let proxy =
            Proxy::all(proxy).map_err(|e| Error::Http(format!("Failed to set proxy: {}", e)))?;
        client_builder = client_builder.proxy(proxy);
    }

    let client = client_builder
        .build()
        .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Http(format!("Failed to send request: {}", e)))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(key, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (key.as_str().to_string(), v.to_string()))
        })
        .collect();

    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Http(format!("Failed to read response body: {}", e)))?
        .to_vec();

    debug!("GET {} -> {} ({} bytes)", url, status, body.len());

    Ok(RemoteResponse {
        status,
        headers,
        body,
    })
}

/// Synchronous version of [`web_get_async`] driven by a current-thread
/// tokio runtime.
///
/// # Arguments
/// * `url` - The URL to fetch
/// * `proxy_config` - Outbound proxy and timeout
///
/// # Returns
/// * The response with its status, headers and body, whatever the status
/// * `Error::Http` if the runtime, client or request fails
pub fn web_get(url: &str, proxy_config: &ProxyConfig) -> Result<RemoteResponse> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Http(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(web_get_async(url, proxy_config))
}

/// Like [`web_get`] but turns a non-success status into
/// [`Error::UpstreamFetch`].
pub fn web_get_ok(url: &str, proxy_config: &ProxyConfig) -> Result<RemoteResponse> {
    let response = web_get(url, proxy_config)?;
    response.ensure_success()?;
    Ok(response)
}
