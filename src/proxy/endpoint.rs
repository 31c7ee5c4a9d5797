use crate::ConfigError;
use serde::Deserialize;
use url::Url;

/// Schemes reqwest can tunnel through
const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// Whether requests may bypass the proxy pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyMode {
    /// Use proxies when there are any, otherwise connect directly
    #[default]
    BestEffort,

    /// Never connect directly; fail requests when the pool is empty
    Required,
}

/// A proxy endpoint as handed out by the pool
///
/// This is a snapshot: `healthy` reflects the health at acquisition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    /// Position in the pool, stable for the lifetime of the pool
    pub index: usize,

    /// Proxy URL, e.g. `http://194.126.37.94:8080`
    pub address: String,

    pub healthy: bool,
}

/// Parses a proxy address into a proxy URL
///
/// Bare `host:port` values are treated as HTTP proxies.
///
/// # Examples
///
/// ```
/// use github_crawler::proxy::parse_proxy_address;
///
/// let url = parse_proxy_address("194.126.37.94:8080").unwrap();
/// assert_eq!(url.as_str(), "http://194.126.37.94:8080/");
/// ```
pub fn parse_proxy_address(address: &str) -> Result<Url, ConfigError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(ConfigError::InvalidProxy(
            "proxy address cannot be empty".to_string(),
        ));
    }

    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ConfigError::InvalidProxy(format!("'{}': {}", address, e)))?;

    if !PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(ConfigError::InvalidProxy(format!(
            "'{}': unsupported scheme '{}'",
            address,
            url.scheme()
        )));
    }

    if url.host_str().is_none() || url.port_or_known_default().is_none() {
        return Err(ConfigError::InvalidProxy(format!(
            "'{}': missing host or port",
            address
        )));
    }

    Ok(url)
}
