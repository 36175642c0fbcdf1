use std::{collections::HashMap, fmt, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use zeroize::Zeroizing;

/// Untyped configuration for one destination. Always carries a `provider`
/// key; the remaining keys are provider specific.
pub type DestinationConfig = Map<String, Value>;

/// Key selecting the destination variant inside a [`DestinationConfig`].
pub const PROVIDER_KEY: &str = "provider";

/// Returns the `provider` value of a destination config, if it is a string.
pub fn provider_name(config: &DestinationConfig) -> Option<&str> {
    config.get(PROVIDER_KEY).and_then(Value::as_str)
}

/// A request to issue one certificate and deliver it to every destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRequest {
    /// Contact email for the ACME account
    #[serde(rename = "email")]
    pub requester_email: String,
    /// Single domain the certificate is issued for (no multi-SAN requests)
    pub domain: String,
    /// DNS-01 challenge credentials, handed to the issuance collaborator as-is
    #[serde(rename = "dns", default)]
    pub dns_credentials: HashMap<String, String>,
    /// Delivery targets, processed in order
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
    /// Use a locally generated dummy certificate instead of a real one
    #[serde(rename = "dummy", default)]
    pub use_dummy_certificate: bool,
    /// Use the staging certificate authority
    #[serde(rename = "stage", default)]
    pub use_staging: bool,
}

impl CertificateRequest {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("failed to parse certificate request JSON")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read certificate request {}", path.display()))?;
        Self::from_json_str(&raw)
    }
}

/// Certificate and private key handed back by the issuance collaborator.
/// Both are PEM bytes and treated as opaque by every destination.
#[derive(Clone)]
pub struct IssuedCertificate {
    pub domain: String,
    pub certificate_pem: Vec<u8>,
    pub private_key_pem: Zeroizing<Vec<u8>>,
}

impl IssuedCertificate {
    pub fn new(
        domain: impl Into<String>,
        certificate_pem: Vec<u8>,
        private_key_pem: Vec<u8>,
    ) -> Self {
        Self {
            domain: domain.into(),
            certificate_pem,
            private_key_pem: Zeroizing::new(private_key_pem),
        }
    }
}

impl fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("domain", &self.domain)
            .field("certificate_pem", &format_args!("{} bytes", self.certificate_pem.len()))
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Describes one configuration field of a destination variant. Used by
/// external configuration tooling only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationFieldDescriptor {
    pub field: String,
    pub description: String,
    pub is_secret: bool,
}

/// Catalog entry for one destination variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationDescriptor {
    pub provider: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Result returned to whichever wrapper invoked the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub message: String,
}

impl CertResponse {
    pub fn success() -> Self {
        Self {
            status: ResponseStatus::Success,
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failed,
            message: message.into(),
        }
    }
}
