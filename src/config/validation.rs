use crate::config::types::{Config, CrawlerConfig, OutputConfig, ProxyConfig, UserAgentConfig};
use crate::proxy::{parse_proxy_address, ProxyMode};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Run this on the final configuration, after proxies from the command line
/// and the input file have been merged in.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_settings(config)?;
    validate_proxy_requirement(&config.proxy)?;
    Ok(())
}

/// Validates each setting on its own, as read from a configuration file
///
/// A file may select `required` proxy mode without listing endpoints, since
/// they can still arrive from the command line or an input file.
pub(crate) fn validate_settings(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_proxy_config(&config.proxy)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use HTTP or HTTPS, got '{}'",
            config.base_url
        )));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.base_backoff_ms < 1 {
        return Err(ConfigError::Validation(
            "base_backoff_ms must be >= 1ms".to_string(),
        ));
    }

    if config.max_backoff_ms < config.base_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max_backoff_ms ({}) must be >= base_backoff_ms ({})",
            config.max_backoff_ms, config.base_backoff_ms
        )));
    }

    if config.request_timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request and connect timeouts must be >= 1s".to_string(),
        ));
    }

    if config.search_pages < 1 || config.search_pages > 100 {
        return Err(ConfigError::Validation(format!(
            "search_pages must be between 1 and 100, got {}",
            config.search_pages
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates proxy configuration
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    for endpoint in &config.endpoints {
        parse_proxy_address(endpoint)?;
    }

    Ok(())
}

/// Checks that required proxy mode has something to rotate over
fn validate_proxy_requirement(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.mode == ProxyMode::Required && config.endpoints.is_empty() {
        return Err(ConfigError::Validation(
            "proxy mode 'required' needs at least one endpoint".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
