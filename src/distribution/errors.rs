use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("destination provider '{0}' does not exist")]
    UnknownProvider(String),
    #[error("destination config is missing the 'provider' key")]
    MissingProvider,
    #[error("invalid value for field '{field}': {reason}")]
    ConfigDecode { field: String, reason: String },
    #[error("{destination} transport failed: {message}")]
    Transport {
        destination: &'static str,
        message: String,
    },
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
    #[error(
        "certificate {id} covers multiple domain names ({}) and cannot be replaced",
        domains.join(", ")
    )]
    UnsupportedCertificate { id: u64, domains: Vec<String> },
    #[error("{provider} API error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },
}

impl DeliveryError {
    pub fn transport(destination: &'static str, err: impl std::fmt::Display) -> Self {
        DeliveryError::Transport {
            destination,
            message: err.to_string(),
        }
    }

    pub fn decode(field: &str, reason: impl Into<String>) -> Self {
        DeliveryError::ConfigDecode {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Aggregate failure of a fan-out run.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FanoutError {
    #[error("error uploading some certificates: {failed} of {attempted} destinations failed")]
    PartialFailure { failed: usize, attempted: usize },
}
