use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::ClientBuildError;

pub(crate) fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client, ClientBuildError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}

/// Validates `base_url` and returns it without a trailing slash so callers can
/// append `/path` segments with `format!`.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<String, ClientBuildError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|e| ClientBuildError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(ClientBuildError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }
    Ok(trimmed.to_string())
}
