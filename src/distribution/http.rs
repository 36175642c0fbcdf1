use reqwest::StatusCode;
use reqwest::blocking::Client;

use super::errors::DeliveryError;

/// Builds a fresh client for one upload. Clients are never shared between
/// destinations or requests, and keep reqwest's own timeout.
pub fn build_client() -> Result<Client, DeliveryError> {
    Client::builder()
        .build()
        .map_err(|err| DeliveryError::transport("https", err))
}

pub fn status_error(
    provider: &'static str,
    status: StatusCode,
    body: Option<String>,
) -> DeliveryError {
    let message = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        "authentication failed".to_string()
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        "rate limit exceeded".to_string()
    } else {
        match body.filter(|body| !body.trim().is_empty()) {
            Some(body) => format!("{status}: {body}"),
            None => status.to_string(),
        }
    };
    DeliveryError::Provider { provider, message }
}
