use std::collections::HashMap;

use thiserror::Error;

use crate::core::types::{CertificateRequest, IssuedCertificate};

pub const LETS_ENCRYPT_PRODUCTION: &str = "https://acme-v02.api.letsencrypt.org/directory";
pub const LETS_ENCRYPT_STAGING: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// Obtains a certificate + private key pair for one domain. The ACME/DNS-01
/// exchange lives behind this trait.
pub trait CertificateIssuer {
    fn issue(&self, order: &IssuanceOrder) -> Result<IssuedCertificate, IssuerError>;
}

/// Everything an issuer needs, passed explicitly rather than through the
/// process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceOrder {
    pub contact_email: String,
    pub domain: String,
    pub dns_provider: Option<String>,
    pub dns_credentials: HashMap<String, String>,
    pub directory_url: String,
}

impl IssuanceOrder {
    pub fn from_request(request: &CertificateRequest) -> Self {
        let mut dns_credentials = request.dns_credentials.clone();
        let dns_provider = dns_credentials.remove("provider");
        let directory_url = if request.use_staging {
            LETS_ENCRYPT_STAGING
        } else {
            LETS_ENCRYPT_PRODUCTION
        };
        Self {
            contact_email: request.requester_email.clone(),
            domain: request.domain.clone(),
            dns_provider,
            dns_credentials,
            directory_url: directory_url.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum IssuerError {
    #[error("issuer unavailable: {0}")]
    Unavailable(String),
    #[error("issuer configuration invalid: {0}")]
    InvalidConfig(String),
    #[error("issuer operation failed: {0}")]
    Operation(String),
}

/// The issuers available to one pipeline run.
#[derive(Clone, Copy)]
pub struct IssuerSet<'a> {
    pub acme: &'a dyn CertificateIssuer,
    pub dummy: Option<&'a dyn CertificateIssuer>,
}

impl<'a> IssuerSet<'a> {
    pub fn select(
        &self,
        request: &CertificateRequest,
    ) -> Result<&'a dyn CertificateIssuer, IssuerError> {
        if request.use_dummy_certificate {
            return self.dummy.ok_or_else(|| {
                IssuerError::InvalidConfig(
                    "dummy certificate requested but no dummy issuer is configured".to_string(),
                )
            });
        }
        Ok(self.acme)
    }
}
